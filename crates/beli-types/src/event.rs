//! Change events produced by committed writes.
//!
//! A [`ChangeEvent`] is ephemeral: it is handed to the notification hub
//! after the store accepts a write and is never persisted. On the change
//! stream it travels as a UTF-8 text frame `"<offset>,<color>"`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CodecError;
use crate::grid::{Color, Offset};

/// A single committed cell write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Linear offset of the cell that changed.
    pub offset: Offset,
    /// The color now stored at `offset`.
    pub color: Color,
}

impl ChangeEvent {
    /// Create a new change event.
    pub const fn new(offset: Offset, color: Color) -> Self {
        Self { offset, color }
    }

    /// Encode as the compact change-stream frame `"<offset>,<color>"`.
    pub fn to_frame(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.offset, self.color)
    }
}

impl FromStr for ChangeEvent {
    type Err = CodecError;

    fn from_str(frame: &str) -> Result<Self, Self::Err> {
        let malformed = || CodecError::MalformedFrame(frame.to_owned());
        let (offset, color) = frame.split_once(',').ok_or_else(malformed)?;
        Ok(Self {
            offset: offset.trim().parse().map_err(|_e| malformed())?,
            color: color.trim().parse().map_err(|_e| malformed())?,
        })
    }
}
