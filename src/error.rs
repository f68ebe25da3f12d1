use std::io;

/// Custom error type for simple_git_notify operations
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Authentication failed: {0}")]
    AuthenticationFailure(String),

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Delivery failed: {0}")]
    DeliveryFailure(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParseError(#[from] toml::de::Error),
}

impl NotifyError {
    pub fn malformed(message: impl Into<String>) -> Self {
        NotifyError::MalformedPayload(message.into())
    }
}

impl From<serde_json::Error> for NotifyError {
    fn from(e: serde_json::Error) -> Self {
        NotifyError::MalformedPayload(format!("invalid JSON body: {}", e))
    }
}

/// Helper type for Results that use NotifyError
pub type Result<T> = std::result::Result<T, NotifyError>;
