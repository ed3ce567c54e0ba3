//! Error types for the `beli-types` crate.
//!
//! Caller input errors ([`CodecError::OutOfRange`], [`CodecError::InvalidValue`])
//! are rejected before any store access happens.

/// Errors produced by the tile codec.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// A coordinate lies outside `[0, dimension)`.
    #[error("coordinate ({x}, {y}) is outside the {dimension}x{dimension} grid")]
    OutOfRange {
        /// Requested column.
        x: i64,
        /// Requested row.
        y: i64,
        /// Grid side length.
        dimension: u32,
    },

    /// A linear offset lies outside `[0, cell_count)`.
    #[error("offset {offset} is outside the grid ({cell_count} cells)")]
    OffsetOutOfRange {
        /// Requested offset.
        offset: u64,
        /// Total number of cells.
        cell_count: u64,
    },

    /// A color does not fit in the configured bit width.
    #[error("color {color} does not fit in {bit_width} bits")]
    InvalidValue {
        /// Requested color.
        color: i64,
        /// Configured bit width.
        bit_width: u32,
    },

    /// The grid geometry itself is unusable.
    #[error("invalid grid: {0}")]
    InvalidGrid(String),

    /// A change frame could not be parsed.
    #[error("malformed change frame: {0:?}")]
    MalformedFrame(String),
}
