#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = math_tutor::run().await {
        eprintln!("math-tutor fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
