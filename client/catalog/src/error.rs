use thiserror::Error;

pub const DEFAULT_RETRY_AFTER: u64 = 60;
pub const DEFAULT_RATE_LIMIT_MESSAGE: &str = "Too many requests. Please wait before trying again.";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{message}")]
    RateLimited { retry_after: u64, message: String },

    #[error("{0}")]
    Rejected(String),

    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Request cancelled")]
    Cancelled,
}

impl ApiError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ApiError::Cancelled)
    }
}
