use thiserror::Error;

#[derive(Error, Debug)]
pub enum BotError {
    #[error("API error {code}: {message}")]
    Api { code: i64, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Handler error: {0}")]
    Handler(#[from] HandlerError),

    #[error("Config error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Dispatcher is already running")]
    AlreadyRunning,
}

#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("Unauthorized access")]
    Unauthorized,

    #[error("Missing field: {0}")]
    MissingField(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    Other(String),
}

impl BotError {
    /// True for failures of the poll transport (network, timeout, bad body); the loop backs off and retries these.
    pub fn is_transport(&self) -> bool {
        matches!(self, BotError::Transport(_))
    }
}

pub type Result<T> = std::result::Result<T, BotError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handler_error_converts_into_bot_error() {
        let err: BotError = HandlerError::Unauthorized.into();
        assert!(matches!(err, BotError::Handler(HandlerError::Unauthorized)));
        assert!(!err.is_transport());
    }

    #[test]
    fn test_api_error_display() {
        let err = BotError::Api {
            code: 5,
            message: "User authorization failed".to_string(),
        };
        assert_eq!(err.to_string(), "API error 5: User authorization failed");
    }
}
