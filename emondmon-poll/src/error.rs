//! Errors surfaced by a poll.

use thiserror::Error;

/// Error type for polling operations.
///
/// A register the device has no data for is not an error; it shows up as an
/// absent value in the poll results.
#[derive(Debug, Error)]
pub enum PollerError {
    /// The session could not be established or broke down mid-poll.
    #[error("Connection failed: {0}")]
    Connection(String),
    /// The requested target is not a valid selection.
    #[error("Invalid selection: {0}")]
    InvalidSelection(String),
}

impl PollerError {
    pub(crate) fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    pub(crate) fn invalid_selection(msg: impl Into<String>) -> Self {
        Self::InvalidSelection(msg.into())
    }
}
