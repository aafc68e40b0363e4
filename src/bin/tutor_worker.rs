#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = math_tutor::run_worker().await {
        eprintln!("tutor-worker fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
