use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ServiceError {
    #[error("classifier request timed out")]
    Timeout,
    #[error("classifier transport failed: {0}")]
    Transport(String),
    #[error("classifier answered with status {0}")]
    Status(u16),
    #[error("unexpected classifier reply: {0:?}")]
    UnexpectedReply(String),
    #[error("invalid classifier endpoint: {0}")]
    InvalidEndpoint(String),
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ServiceError::Timeout
        } else {
            ServiceError::Transport(err.to_string())
        }
    }
}
