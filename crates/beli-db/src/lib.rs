//! Board store for the Beli canvas.
//!
//! The canvas lives in a single bit-packed byte buffer. Every cell write is
//! one atomic sub-word update, so concurrent writers to different cells
//! never block each other and never lose updates, without a canvas-wide
//! lock.
//!
//! # Architecture
//!
//! ```text
//! BoardStore (offset/color checks, snapshot normalization)
//!     |
//!     +-- Dragonfly backend --> BITFIELD SET/GET u<B> #<offset> on one key
//!     |
//!     +-- Memory backend ----> CAS on 32-bit words (MemoryBoard)
//! ```
//!
//! # Modules
//!
//! - [`board`] -- [`BoardStore`], the single source of truth for cell colors
//! - [`dragonfly`] -- `Dragonfly` (Redis-compatible) connection and `BITFIELD` commands
//! - [`memory`] -- Lock-free in-process bit-field buffer
//! - [`error`] -- Shared error types

pub mod board;
pub mod dragonfly;
pub mod error;
pub mod memory;

// Re-export primary types for convenience.
pub use board::{BoardBackend, BoardStore, DEFAULT_BOARD_KEY};
pub use dragonfly::DragonflyPool;
pub use error::StoreError;
pub use memory::MemoryBoard;
