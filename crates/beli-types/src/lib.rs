//! Shared type definitions for the Beli canvas.
//!
//! This crate is the single source of truth for how a canvas cell is
//! addressed. Every other crate in the workspace (the board store, the
//! notification hub, the HTTP layer) computes offsets through
//! [`GridSpec`] so that all of them agree bit-for-bit on the layout.
//!
//! # Modules
//!
//! - [`grid`] -- Tile codec: `(x, y)` to offset linearization, color range
//!   checks, and bit-level buffer geometry
//! - [`event`] -- [`ChangeEvent`] and its `"<offset>,<color>"` wire form
//! - [`ids`] -- Type-safe UUID wrapper for connected observers
//! - [`error`] -- Codec error type

pub mod error;
pub mod event;
pub mod grid;
pub mod ids;

// Re-export all public types at crate root for convenience.
pub use error::CodecError;
pub use event::ChangeEvent;
pub use grid::{Color, GridSpec, MAX_BIT_WIDTH, MAX_BUFFER_BYTES, Offset};
pub use ids::ObserverId;
