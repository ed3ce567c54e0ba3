//! Error types for the board store.
//!
//! [`StoreError::OutOfRange`] and [`StoreError::InvalidValue`] are
//! precondition violations raised before the backing store is touched.
//! Everything else means the backing store could not complete the call.

use beli_types::CodecError;

/// Errors that can occur in the board store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The offset lies outside the board.
    #[error("offset {offset} is outside the board ({cell_count} cells)")]
    OutOfRange {
        /// Requested offset.
        offset: u64,
        /// Number of cells on the board.
        cell_count: u64,
    },

    /// The color does not fit in the board's bit width.
    #[error("color {color} does not fit in {bit_width} bits")]
    InvalidValue {
        /// Requested color.
        color: u32,
        /// Board bit width.
        bit_width: u32,
    },

    /// A `Dragonfly`/Redis operation failed.
    #[error("board store unavailable: {0}")]
    Unavailable(#[from] fred::error::Error),

    /// The backing store answered with something other than what the
    /// command promises.
    #[error("unexpected reply from board store: {0}")]
    UnexpectedReply(String),

    /// A configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl StoreError {
    /// True for errors caused by the caller's input rather than the store.
    pub const fn is_caller_error(&self) -> bool {
        matches!(self, Self::OutOfRange { .. } | Self::InvalidValue { .. })
    }
}

impl From<CodecError> for StoreError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::OffsetOutOfRange { offset, cell_count } => {
                Self::OutOfRange { offset, cell_count }
            }
            other => Self::Config(other.to_string()),
        }
    }
}
