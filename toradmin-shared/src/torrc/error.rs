use thiserror::Error;

/// Errors produced by the torrc model and the field validators.
#[derive(Debug, Error)]
pub enum TorrcError {
    /// The file could not be opened, read or written.
    #[error("torrc I/O failure: {0}")]
    Io(#[from] std::io::Error),

    /// A multi-valued key has no entries at all.
    #[error("no {0} entries found")]
    NoSuchKey(String),

    /// A validator rejected a proposed value.
    #[error("{0}")]
    InvalidFormat(String),
}

impl TorrcError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidFormat(reason.into())
    }

    /// Returns the rejection reason for [`TorrcError::InvalidFormat`].
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::InvalidFormat(reason) => Some(reason),
            _ => None,
        }
    }
}
