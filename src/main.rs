#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = aulasync::run().await {
        eprintln!("aulasync fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
