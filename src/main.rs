#[tokio::main]
async fn main() {
    medicare_lib::init_tracing();

    if let Err(e) = medicare_lib::run().await {
        tracing::error!("Startup failed: {e}");
        std::process::exit(1);
    }
}
