#[tokio::main]
async fn main() {
    if let Err(e) = lawn_server::control::run_with_config().await {
        tracing::error!(error = %e, "server error");
        std::process::exit(1);
    }
}
