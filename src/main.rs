use std::sync::Arc;

use sessiongate::config::{load_config, print_schema};
use sessiongate::startup;
use sessiongate::utils::logger::init_logging;

#[tokio::main]
async fn main() {
    if std::env::args().any(|arg| arg == "--schema") {
        if let Err(e) = print_schema() {
            eprintln!("Error printing schema: {}", e);
            std::process::exit(1);
        }
        return;
    }

    let config = load_config();
    init_logging(&config.logging);

    if let Err(e) = startup::run(Arc::new(config)).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
