use thiserror::Error;

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),

    #[error("failed to initialize logging: {0}")]
    Logging(String),
}

/// A failure reported by the underlying transport.
///
/// Returned synchronously from `start`/`stop`/`close`/`create_connection`,
/// and handed to exception listeners when the transport detects a failure
/// outside of any caller's call stack.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}{}", code_suffix(.code))]
pub struct ConnectionError {
    message: String,
    code: Option<String>,
}

impl ConnectionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    /// Attach a vendor-specific error code.
    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }
}

fn code_suffix(code: &Option<String>) -> String {
    code.as_ref()
        .map(|code| format!(" (code {code})"))
        .unwrap_or_default()
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("connection error: {0}")]
    Connection(#[from] ConnectionError),

    #[error("illegal state: {0}")]
    IllegalState(String),

    #[error("connection factory has been shut down")]
    Shutdown,

    #[error("no live connection left in the fixed connection source")]
    Exhausted,
}

impl Error {
    pub(crate) fn illegal_state(reason: impl Into<String>) -> Self {
        Self::IllegalState(reason.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_error_display_includes_code() {
        assert_eq!(ConnectionError::new("reset").to_string(), "reset");
        assert_eq!(
            ConnectionError::new("reset").with_code("1").to_string(),
            "reset (code 1)"
        );
    }

    #[test]
    fn connection_error_wraps_into_error() {
        let err: Error = ConnectionError::new("reset").into();
        assert_eq!(err.to_string(), "connection error: reset");
    }
}
