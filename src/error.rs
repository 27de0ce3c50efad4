//! Error taxonomy shared by every backend operation.
//!
//! Only `Validation` and `Transport` are meant to reach the operator as
//! blocking feedback. Soft failures (summary lookup, employee lookup, resolver
//! fallbacks) are logged where they happen and never become a `CajaError`.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CajaError {
    /// Missing or malformed local input. No request was sent.
    #[error("{0}")]
    Validation(String),
    /// Backend unreachable or answered with a non-success status.
    #[error("{0}")]
    Transport(String),
    /// OS credential store failure.
    #[error("credential store: {0}")]
    Storage(String),
}

impl CajaError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

impl From<keyring::Error> for CajaError {
    fn from(err: keyring::Error) -> Self {
        Self::Storage(err.to_string())
    }
}
