//! Shared error type across zbxbridge crates.

use thiserror::Error;

/// Stable error classification, used as a structured log field and by tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Metric catalog is unusable (startup only).
    Catalog,
    /// Wire envelope is short, mismatched or oversized.
    Framing,
    /// Payload is not a well-formed sender request.
    Decode,
    /// A single item's value could not be coerced to a number.
    Value,
    /// Process configuration is invalid (startup only).
    Config,
    /// Socket or filesystem failure.
    Io,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Catalog => "CATALOG",
            ErrorKind::Framing => "FRAMING",
            ErrorKind::Decode => "DECODE",
            ErrorKind::Value => "VALUE",
            ErrorKind::Config => "CONFIG",
            ErrorKind::Io => "IO",
        }
    }

    /// Whether an error of this kind must stop the process from starting.
    pub fn is_fatal(self) -> bool {
        matches!(self, ErrorKind::Catalog | ErrorKind::Config)
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Unified error type used by core and gateway.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("catalog: {0}")]
    Catalog(String),
    #[error("framing: {0}")]
    Framing(String),
    #[error("decode: {0}")]
    Decode(String),
    #[error("value: {0}")]
    Value(String),
    #[error("config: {0}")]
    Config(String),
    #[error("io: {0}")]
    Io(String),
}

impl BridgeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BridgeError::Catalog(_) => ErrorKind::Catalog,
            BridgeError::Framing(_) => ErrorKind::Framing,
            BridgeError::Decode(_) => ErrorKind::Decode,
            BridgeError::Value(_) => ErrorKind::Value,
            BridgeError::Config(_) => ErrorKind::Config,
            BridgeError::Io(_) => ErrorKind::Io,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startup_kinds_are_fatal() {
        assert!(BridgeError::Catalog("x".into()).kind().is_fatal());
        assert!(BridgeError::Config("x".into()).kind().is_fatal());
        assert!(!BridgeError::Framing("x".into()).kind().is_fatal());
        assert!(!BridgeError::Value("x".into()).kind().is_fatal());
    }
}
