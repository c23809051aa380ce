#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = aulasync::run_import().await {
        eprintln!("classroom-import fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
