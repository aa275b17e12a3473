use registry_sync::cli::{Args, Runner};

#[tokio::main]
async fn main() {
    let args = Args::parse_args();
    let runner = Runner::new(args);
    runner.output().init_subscriber();

    if let Err(e) = runner.run().await {
        runner.output().error(&format!("Sync failed: {}", e));
        std::process::exit(1);
    }
}
