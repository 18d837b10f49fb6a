use thiserror::Error;

/// Failures while starting a service: configuration, binding, I/O.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Internal server error: {0}")]
    InternalError(#[from] anyhow::Error),

    #[error("Configuration error: {0}")]
    ConfigError(anyhow::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(anyhow::Error::new(err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalError(anyhow::Error::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_is_internal() {
        let err: AppError = std::io::Error::other("disk gone").into();
        assert!(matches!(err, AppError::InternalError(_)));
        assert_eq!(err.to_string(), "Internal server error: disk gone");
    }

    #[test]
    fn config_error_message_mentions_configuration() {
        let err = AppError::ConfigError(anyhow::anyhow!("GEMINI_API_KEY is required"));
        assert_eq!(
            err.to_string(),
            "Configuration error: GEMINI_API_KEY is required"
        );
    }

    #[test]
    fn config_crate_errors_convert() {
        let err: AppError = config::ConfigError::NotFound("port".to_string()).into();
        assert!(matches!(err, AppError::ConfigError(_)));
    }
}
