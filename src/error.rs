use thiserror::Error;

use crate::domain::error::DomainError;

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

/// Exchange-related errors with structured variants.
#[derive(Error, Debug, Clone)]
pub enum ExchangeError {
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    #[error("exchange API error{}: {message}", code_suffix(.code))]
    Api { code: Option<i64>, message: String },

    #[error("request failed: {0}")]
    Transport(String),

    #[error("request timed out")]
    Timeout,

    #[error("unexpected response: {0}")]
    Decode(String),
}

fn code_suffix(code: &Option<i64>) -> String {
    code.map(|c| format!(" ({c})")).unwrap_or_default()
}

impl From<reqwest::Error> for ExchangeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Exchange(#[from] ExchangeError),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("credential cipher error: {0}")]
    Crypto(String),

    #[error("telegram error: {0}")]
    Telegram(String),

    #[error("parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<diesel::result::Error> for Error {
    fn from(err: diesel::result::Error) -> Self {
        Error::Database(err.to_string())
    }
}

impl From<teloxide::RequestError> for Error {
    fn from(err: teloxide::RequestError) -> Self {
        Error::Telegram(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_includes_code_when_present() {
        let err = ExchangeError::Api {
            code: Some(4001),
            message: "invalid symbol".into(),
        };
        assert_eq!(err.to_string(), "exchange API error (4001): invalid symbol");
    }

    #[test]
    fn api_error_without_code() {
        let err = ExchangeError::Api {
            code: None,
            message: "rejected".into(),
        };
        assert_eq!(err.to_string(), "exchange API error: rejected");
    }

    #[test]
    fn config_error_wraps_transparently() {
        let err: Error = ConfigError::MissingField {
            field: "TELEGRAM_BOT_TOKEN",
        }
        .into();
        assert_eq!(
            err.to_string(),
            "missing required field: TELEGRAM_BOT_TOKEN"
        );
    }

    #[test]
    fn diesel_not_found_maps_to_database_error() {
        let err: Error = diesel::result::Error::NotFound.into();
        assert!(matches!(err, Error::Database(_)));
    }
}
