use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("invalid log level: {0}")]
    InvalidLogLevel(String),
}

pub(crate) type AppResult<T> = Result<T, AppError>;
