use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimitError(String),

    #[error("Invalid API response: {0}")]
    ParseError(String),

    #[error("Exchange API error: {code} - {message}")]
    ExchangeError { code: String, message: String },

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Timeout: {0}")]
    TimeoutError(String),

    #[error("Exchange not found: {name}")]
    ExchangeNotFound { name: String },

    #[error("Operation not supported by {exchange}: {operation}")]
    UnsupportedOperation { exchange: String, operation: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ApiError {
    /// Classify a reqwest failure the way callers reason about it
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::TimeoutError(err.to_string())
        } else if err.is_connect() {
            ApiError::NetworkError(err.to_string())
        } else {
            ApiError::HttpError(err)
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::ParseError(err.to_string())
    }
}
