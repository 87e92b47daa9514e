use tracing::Level;

use crate::errors::{AppError, AppResult};

pub(crate) fn parse_log_level(level: &str) -> AppResult<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => Err(AppError::InvalidLogLevel(level.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use tracing::Level;

    use super::parse_log_level;

    #[test]
    fn known_levels_parse() {
        assert_eq!(parse_log_level("info").unwrap(), Level::INFO);
        assert_eq!(parse_log_level("WARN").unwrap(), Level::WARN);
        assert!(parse_log_level("loud").is_err());
    }
}
