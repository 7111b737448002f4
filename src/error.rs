use thiserror::Error;

#[derive(Error, Debug)]
pub enum StatusboardError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[cfg(feature = "http")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Malformed response from {source_name}: {details}")]
    MalformedResponse { source_name: String, details: String },

    #[error("Source {source_name} failed: {message}")]
    Source {
        source_name: String,
        message: String,
    },

    #[error("Settings store error: {message}")]
    Settings { message: String },
}

impl StatusboardError {
    pub fn source_failed<S: Into<String>, M: Into<String>>(source_name: S, message: M) -> Self {
        Self::Source {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    pub fn settings<S: Into<String>>(message: S) -> Self {
        Self::Settings {
            message: message.into(),
        }
    }

    pub fn malformed<S: Into<String>, D: Into<String>>(source_name: S, details: D) -> Self {
        Self::MalformedResponse {
            source_name: source_name.into(),
            details: details.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, StatusboardError>;
