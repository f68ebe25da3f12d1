use simple_git_notify::delivery::HttpDeliveryClient;
use simple_git_notify::dispatch::Dispatcher;
use simple_git_notify::logging::{FileLogger, setup_logging};
use simple_git_notify::{AppState, RelayConfig, api};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

const DEFAULT_CONFIG_PATH: &str = "relay_config.toml";

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    let config_path =
        std::env::var("RELAY_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

    let mut config = match RelayConfig::load(&PathBuf::from(&config_path)) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };
    config.apply_env(|key| std::env::var(key).ok());

    let file_logger = config.logging.directory.clone().map(FileLogger::new);
    let _log_guard = match setup_logging(&config.logging.level, file_logger.as_ref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Logging error: {}", e);
            std::process::exit(1);
        }
    };

    info!("Starting Feishu GitHub notifier");
    info!("Using config at {:?}", config_path);
    config.log_summary();

    if let Err(e) = config.validate() {
        error!("{}", e);
        std::process::exit(1);
    }

    let client = match HttpDeliveryClient::new(config.feishu.timeout()) {
        Ok(client) => client,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    let state = Arc::new(AppState::new(Dispatcher::new(&config, Box::new(client))));
    let app = api::router(state);

    let listener = match tokio::net::TcpListener::bind(&config.server.bind_address).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", config.server.bind_address, e);
            std::process::exit(1);
        }
    };
    info!("Listening on {}", config.server.bind_address);

    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}
