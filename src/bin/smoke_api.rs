use std::env;

use anyhow::{anyhow, bail, Context, Result};
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};

struct Step {
    status: StatusCode,
    json: Value,
}

struct SmokeClient {
    client: reqwest::Client,
    base: String,
}

impl SmokeClient {
    async fn call(&self, method: Method, path: &str, body: Option<Value>) -> Result<Step> {
        let url = format!("{}{path}", self.base.trim_end_matches('/'));
        let mut builder = self.client.request(method.clone(), &url);
        if let Some(body) = &body {
            builder = builder.json(body);
        }

        let response =
            builder.send().await.with_context(|| format!("{method} {path} did not respond"))?;
        let status = response.status();
        let bytes = response.bytes().await?;
        let json = serde_json::from_slice::<Value>(&bytes).unwrap_or(Value::Null);

        Ok(Step { status, json })
    }

    async fn expect(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        expected: StatusCode,
    ) -> Result<Value> {
        let step = self.call(method.clone(), path, body).await?;
        if step.status != expected {
            bail!("{method} {path}: expected {expected}, got {} body={}", step.status, step.json);
        }
        println!("OK {method} {path} -> {}", step.status);
        Ok(step.json)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let base = parse_args()?;
    println!("Smoke-testing tutor API at {base}");

    let api = SmokeClient { client: reqwest::Client::new(), base };
    if let Err(err) = run(&api).await {
        eprintln!("FAILED: {err:#}");
        std::process::exit(1);
    }

    println!("All API checks passed");
    Ok(())
}

fn parse_args() -> Result<String> {
    let mut base =
        env::var("API_BASE_URL").unwrap_or_else(|_| "http://localhost:8000".to_string());

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--base" => {
                base = args.next().ok_or_else(|| anyhow!("--base missing value"))?;
            }
            _ => return Err(anyhow!("Unknown argument: {arg}")),
        }
    }

    Ok(base)
}

async fn run(api: &SmokeClient) -> Result<()> {
    let health = api.expect(Method::GET, "/health", None, StatusCode::OK).await?;
    println!("   health: {}", health["status"]);

    let created = api.expect(Method::POST, "/api/sessions", None, StatusCode::CREATED).await?;
    let code = created["session_code"]
        .as_str()
        .ok_or_else(|| anyhow!("create response has no session_code"))?
        .to_string();
    println!("   session code: {code}");

    let session_path = format!("/api/sessions/{code}");
    api.expect(Method::GET, &session_path, None, StatusCode::OK).await?;

    let problem = api
        .expect(
            Method::POST,
            &format!("{session_path}/problems"),
            Some(json!({ "text": "Solve for x: 2x + 3 = 11" })),
            StatusCode::CREATED,
        )
        .await?;
    println!("   problem category: {} ({})", problem["category"], problem["difficulty"]);

    let mut last_step = 0;
    for message in ["I'm not sure where to start.", "Should I subtract 3 from both sides?"] {
        let reply = api
            .expect(
                Method::POST,
                &format!("{session_path}/chat"),
                Some(json!({ "message": message })),
                StatusCode::OK,
            )
            .await?;

        let context = &reply["conversation_context"];
        let step = context["step_number"]
            .as_i64()
            .ok_or_else(|| anyhow!("chat response has no step_number"))?;
        if step != last_step + 1 {
            bail!("step_number went from {last_step} to {step}");
        }
        last_step = step;

        println!("   student: {message}");
        println!("   tutor:   {}", reply["tutor_message"].as_str().unwrap_or_default());
        println!(
            "   step={} hints_used={} progress_made={} stuck_turns={}",
            context["step_number"],
            context["hints_used"],
            context["progress_made"],
            context["stuck_turns"]
        );
    }

    let resumed = api
        .expect(
            Method::POST,
            "/api/sessions",
            Some(json!({ "session_code": code })),
            StatusCode::OK,
        )
        .await?;
    let transcript_len = resumed["transcript"].as_array().map_or(0, Vec::len);
    if transcript_len as i64 != last_step {
        bail!("resumed session has {transcript_len} transcript entries, expected {last_step}");
    }
    println!("   resumed with {transcript_len} transcript entries");

    let missing = api
        .call(
            Method::POST,
            "/api/sessions/ZZZZZZ/problems",
            Some(json!({ "text": "Solve for y: y - 1 = 0" })),
        )
        .await?;
    if missing.status != StatusCode::NOT_FOUND {
        bail!("problem for unknown session returned {}, expected 404", missing.status);
    }
    println!("OK POST /api/sessions/ZZZZZZ/problems -> {}", missing.status);

    Ok(())
}
