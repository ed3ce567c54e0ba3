//! Board service: the glue between requests, the store, and the hub.
//!
//! A write is validated through the tile codec, committed to the
//! [`BoardStore`], and only then queued for broadcast. Queueing never
//! waits, so the caller's response is independent of how many observers
//! are connected or how slow they are.
//!
//! The commit and the publish run together on their own task. If the
//! request future is dropped mid-write (request timeout, client gone), a
//! write that reaches the store is still broadcast.

use beli_db::{BoardStore, StoreError};
use beli_events::ChangeQueue;
use beli_types::{ChangeEvent, Color, GridSpec, Offset};
use tracing::{debug, warn};

use crate::error::ApiError;

/// Request-facing operations on the canvas.
#[derive(Clone)]
pub struct BoardService {
    store: BoardStore,
    changes: ChangeQueue,
}

impl BoardService {
    /// Wrap a store handle and the producer side of the change queue.
    pub const fn new(store: BoardStore, changes: ChangeQueue) -> Self {
        Self { store, changes }
    }

    /// Geometry of the canvas.
    pub const fn grid(&self) -> &GridSpec {
        self.store.grid()
    }

    /// The underlying store handle.
    pub const fn store(&self) -> &BoardStore {
        &self.store
    }

    /// Set the cell at `(x, y)` to `color` and queue the change.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Codec`] for out-of-range input (nothing is
    /// written), [`ApiError::Store`] if the store failed (nothing is
    /// broadcast), or [`ApiError::Internal`] if the commit task died.
    pub async fn draw(&self, x: i64, y: i64, color: i64) -> Result<ChangeEvent, ApiError> {
        let grid = self.store.grid();
        let offset = grid.offset(x, y)?;
        let color = grid.check_color(color)?;

        let store = self.store.clone();
        let changes = self.changes.clone();
        let event = tokio::spawn(async move { commit(&store, &changes, offset, color).await })
            .await
            .map_err(|e| ApiError::Internal(format!("draw task failed: {e}")))??;
        Ok(event)
    }

    /// Read the color at `(x, y)`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Codec`] for out-of-range coordinates or
    /// [`ApiError::Store`] if the store failed.
    pub async fn tile(&self, x: i64, y: i64) -> Result<Color, ApiError> {
        let offset = self.store.grid().offset(x, y)?;
        Ok(self.store.get_tile(offset).await?)
    }

    /// The whole board as packed bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Store`] if the store failed.
    pub async fn board(&self) -> Result<Vec<u8>, ApiError> {
        Ok(self.store.snapshot().await?)
    }
}

/// Write one cell, then queue its change event.
async fn commit(
    store: &BoardStore,
    changes: &ChangeQueue,
    offset: Offset,
    color: Color,
) -> Result<ChangeEvent, StoreError> {
    store.set_tile(offset, color).await?;

    let event = ChangeEvent::new(offset, color);
    if changes.publish(event) {
        debug!(offset, color, "Tile drawn");
    } else {
        warn!(offset, color, "Change dispatcher is not running, notification dropped");
    }
    Ok(event)
}
