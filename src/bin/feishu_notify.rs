//! Posts a Feishu card for the current GitHub Actions event.
//!
//! Exits 1 when the notification cannot be built or delivered, so the
//! workflow step fails visibly.

use simple_git_notify::RelayConfig;
use simple_git_notify::ci::notification_from_env;
use simple_git_notify::delivery::HttpDeliveryClient;
use simple_git_notify::dispatch::Dispatcher;
use simple_git_notify::error::Result;
use simple_git_notify::logging::setup_logging;
use tracing::{error, info, warn};

async fn run() -> Result<()> {
    let mut config = RelayConfig::default();
    config.apply_env(|key| std::env::var(key).ok());

    if config.feishu.webhook_url.is_empty() {
        warn!("FEISHU_WEBHOOK_URL not set, skipping Feishu notification");
        return Ok(());
    }

    let Some(payload) =
        notification_from_env(|key| std::env::var(key).ok(), &config.format).await?
    else {
        return Ok(());
    };

    let client = HttpDeliveryClient::new(config.feishu.timeout())?;
    Dispatcher::new(&config, Box::new(client))
        .send(&payload)
        .await?;
    info!("Feishu notification sent");
    Ok(())
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    let level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    if let Err(e) = setup_logging(&level, None) {
        eprintln!("Logging error: {}", e);
    }

    if let Err(e) = run().await {
        error!("Feishu notification failed: {}", e);
        std::process::exit(1);
    }
}
