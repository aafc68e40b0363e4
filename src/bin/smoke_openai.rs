use std::env;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use reqwest::StatusCode;
use serde_json::{json, Value};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const SAMPLE_IMAGE_URL: &str =
    "https://upload.wikimedia.org/wikipedia/commons/thumb/3/3b/Quadratic_formula.svg/640px-Quadratic_formula.svg.png";
const IMAGE_PROMPTS: [&str; 2] = [
    "A friendly cartoon owl tutor pointing at a chalkboard with a simple equation",
    "A flat illustration of colorful geometric shapes for a math worksheet header",
];
const IMAGE_DELAY: Duration = Duration::from_secs(12);

struct OpenAi {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    text_model: String,
    vision_model: String,
    image_model: String,
}

impl OpenAi {
    fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let api_key = env::var("OPENAI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| anyhow!("OPENAI_API_KEY is not set"))?;
        let base_url =
            env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url,
            api_key,
            text_model: env::var("AI_MODEL").unwrap_or_else(|_| "gpt-4o".to_string()),
            vision_model: env::var("AI_VISION_MODEL").unwrap_or_else(|_| "gpt-4o".to_string()),
            image_model: env::var("AI_IMAGE_MODEL").unwrap_or_else(|_| "dall-e-3".to_string()),
        })
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value> {
        let url = format!("{}/{path}", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("POST {path} did not respond"))?;

        let status = response.status();
        let json = response.json::<Value>().await.unwrap_or(Value::Null);
        match status {
            StatusCode::UNAUTHORIZED => bail!("{path}: 401 unauthorized, check OPENAI_API_KEY"),
            StatusCode::TOO_MANY_REQUESTS => bail!("{path}: 429 rate limited by provider"),
            status if !status.is_success() => {
                bail!("{path}: {status} {}", json["error"]["message"].as_str().unwrap_or(""))
            }
            _ => Ok(json),
        }
    }

    async fn chat(&self, model: &str, content: Value) -> Result<String> {
        let body = json!({
            "model": model,
            "max_tokens": 300,
            "messages": [{ "role": "user", "content": content }],
        });
        let response = self.post("chat/completions", body).await?;
        response["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("chat/completions response has no message content"))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let openai = match OpenAi::from_env() {
        Ok(openai) => openai,
        Err(err) => {
            eprintln!("FAILED: {err:#}");
            std::process::exit(1);
        }
    };

    if let Err(err) = run(&openai).await {
        eprintln!("FAILED: {err:#}");
        std::process::exit(1);
    }

    println!("All OpenAI checks passed");
    Ok(())
}

async fn run(openai: &OpenAi) -> Result<()> {
    println!("== text completion ({})", openai.text_model);
    let text = openai
        .chat(
            &openai.text_model,
            json!("Ask me one guiding question that helps me solve 3x + 4 = 19. Do not solve it."),
        )
        .await?;
    println!("{text}\n");

    println!("== vision ({})", openai.vision_model);
    let description = openai
        .chat(
            &openai.vision_model,
            json!([
                { "type": "text", "text": "Transcribe the math shown in this image." },
                { "type": "image_url", "image_url": { "url": SAMPLE_IMAGE_URL } },
            ]),
        )
        .await?;
    println!("{description}\n");

    println!("== image generation ({})", openai.image_model);
    for (index, prompt) in IMAGE_PROMPTS.iter().enumerate() {
        if index > 0 {
            println!("   waiting {}s before next image", IMAGE_DELAY.as_secs());
            tokio::time::sleep(IMAGE_DELAY).await;
        }

        let body = json!({
            "model": openai.image_model,
            "prompt": prompt,
            "n": 1,
            "size": "1024x1024",
        });
        let response = openai.post("images/generations", body).await?;
        let url = response["data"][0]["url"]
            .as_str()
            .ok_or_else(|| anyhow!("images/generations response has no image url"))?;
        println!("   image {}: {url}", index + 1);
    }

    Ok(())
}
