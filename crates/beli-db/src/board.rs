//! The board store: single source of truth for cell colors.
//!
//! [`BoardStore`] checks offsets and colors against its [`GridSpec`],
//! forwards each cell operation to the backend as one atomic primitive,
//! and normalizes snapshots to the exact buffer length. It is an explicit
//! handle: constructed once at startup, cloned into whoever needs it, and
//! closed at shutdown.
//!
//! Dropping a pending `set_tile` future (for example when an HTTP client
//! disconnects) is safe: the backend primitive either ran in full or not
//! at all, so a half-written cell is never observable.

use std::sync::Arc;

use beli_types::{Color, GridSpec, Offset};

use crate::dragonfly::DragonflyPool;
use crate::error::StoreError;
use crate::memory::MemoryBoard;

/// Well-known key the canvas lives under.
pub const DEFAULT_BOARD_KEY: &str = "CURRENT_BOARD";

/// Storage behind a [`BoardStore`].
#[derive(Clone)]
pub enum BoardBackend {
    /// Redis-compatible server, cells addressed with `BITFIELD`.
    Dragonfly(DragonflyPool),
    /// In-process atomic buffer. Lost on restart.
    Memory(Arc<MemoryBoard>),
}

/// Handle to the canonical canvas.
#[derive(Clone)]
pub struct BoardStore {
    grid: GridSpec,
    key: Arc<str>,
    backend: BoardBackend,
}

impl BoardStore {
    /// Connect to `Dragonfly` at `url` and address the board under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] for a bad URL or
    /// [`StoreError::Unavailable`] if the server cannot be reached.
    pub async fn connect_dragonfly(
        url: &str,
        key: &str,
        grid: GridSpec,
    ) -> Result<Self, StoreError> {
        let pool = DragonflyPool::connect(url).await?;
        tracing::info!(
            key,
            dimension = grid.dimension(),
            bit_width = grid.bit_width(),
            "Board store ready"
        );
        Ok(Self {
            grid,
            key: Arc::from(key),
            backend: BoardBackend::Dragonfly(pool),
        })
    }

    /// Create a board held entirely in process memory.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] if the grid's bit width does not
    /// divide 32.
    pub fn in_memory(grid: GridSpec) -> Result<Self, StoreError> {
        Ok(Self {
            grid,
            key: Arc::from(DEFAULT_BOARD_KEY),
            backend: BoardBackend::Memory(Arc::new(MemoryBoard::new(grid)?)),
        })
    }

    /// Geometry of the board.
    pub const fn grid(&self) -> &GridSpec {
        &self.grid
    }

    /// Key the board is stored under.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Short backend name for logs and health output.
    pub const fn backend_name(&self) -> &'static str {
        match self.backend {
            BoardBackend::Dragonfly(_) => "dragonfly",
            BoardBackend::Memory(_) => "memory",
        }
    }

    fn check(&self, offset: Offset, color: Color) -> Result<(), StoreError> {
        self.grid.check_offset(offset)?;
        if color > self.grid.max_color() {
            return Err(StoreError::InvalidValue {
                color,
                bit_width: self.grid.bit_width(),
            });
        }
        Ok(())
    }

    /// Atomically replace the cell at `offset` with `color`.
    ///
    /// Concurrent writes to the same cell resolve last-committed-wins.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::OutOfRange`] or [`StoreError::InvalidValue`]
    /// without touching the store, or a store error if the write failed,
    /// in which case the previous value is intact.
    pub async fn set_tile(&self, offset: Offset, color: Color) -> Result<(), StoreError> {
        self.check(offset, color)?;
        match &self.backend {
            BoardBackend::Dragonfly(pool) => {
                pool.set_bits(&self.key, self.grid.bit_width(), offset, color)
                    .await
            }
            BoardBackend::Memory(board) => board.set(offset, color),
        }
    }

    /// Read the cell at `offset`. Never-written cells read as zero.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::OutOfRange`] for offsets off the board, or a
    /// store error if the read failed.
    pub async fn get_tile(&self, offset: Offset) -> Result<Color, StoreError> {
        self.grid.check_offset(offset)?;
        match &self.backend {
            BoardBackend::Dragonfly(pool) => {
                pool.get_bits(&self.key, self.grid.bit_width(), offset)
                    .await
            }
            BoardBackend::Memory(board) => board.get(offset),
        }
    }

    /// The whole board as `buffer_len()` bytes in offset order.
    ///
    /// Cells may reflect writes that landed while the read was in flight.
    ///
    /// # Errors
    ///
    /// Returns a store error if the read failed.
    pub async fn snapshot(&self) -> Result<Vec<u8>, StoreError> {
        let mut bytes = match &self.backend {
            BoardBackend::Dragonfly(pool) => pool.get_buffer(&self.key).await?,
            BoardBackend::Memory(board) => board.snapshot(),
        };
        // Redis only grows the string up to the highest bit written so far.
        bytes.resize(self.grid.buffer_len(), 0);
        Ok(bytes)
    }

    /// Reset every cell to zero.
    ///
    /// # Errors
    ///
    /// Returns a store error if the delete failed.
    pub async fn clear(&self) -> Result<(), StoreError> {
        match &self.backend {
            BoardBackend::Dragonfly(pool) => pool.delete(&self.key).await,
            BoardBackend::Memory(board) => {
                board.clear();
                Ok(())
            }
        }
    }

    /// Check the backend is reachable.
    ///
    /// # Errors
    ///
    /// Returns a store error if the backend does not answer.
    pub async fn ping(&self) -> Result<(), StoreError> {
        match &self.backend {
            BoardBackend::Dragonfly(pool) => pool.ping().await,
            BoardBackend::Memory(_) => Ok(()),
        }
    }

    /// Release the backend connection.
    ///
    /// # Errors
    ///
    /// Returns a store error if the connection could not be closed cleanly.
    pub async fn close(self) -> Result<(), StoreError> {
        match self.backend {
            BoardBackend::Dragonfly(pool) => pool.close().await,
            BoardBackend::Memory(_) => Ok(()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::collections::BTreeSet;

    use futures::future::join_all;
    use rand::Rng;

    use super::*;

    fn store() -> BoardStore {
        BoardStore::in_memory(GridSpec::default()).unwrap()
    }

    #[tokio::test]
    async fn set_then_get_round_trips_every_color() {
        let store = BoardStore::in_memory(GridSpec::new(4, 8).unwrap()).unwrap();
        for color in 0..=255 {
            let offset = u64::from(color % 16);
            store.set_tile(offset, color).await.unwrap();
            assert_eq!(store.get_tile(offset).await.unwrap(), color);
        }
    }

    #[tokio::test]
    async fn canvas_example_lands_at_offset_23() {
        let store = store();
        let offset = store.grid().offset(3, 2).unwrap();
        assert_eq!(offset, 23);
        store.set_tile(offset, 200).await.unwrap();
        assert_eq!(store.get_tile(23).await.unwrap(), 200);
        assert_eq!(store.snapshot().await.unwrap()[23], 200);
    }

    #[tokio::test]
    async fn repeated_set_is_idempotent() {
        let store = store();
        store.set_tile(42, 17).await.unwrap();
        store.set_tile(42, 17).await.unwrap();
        assert_eq!(store.get_tile(42).await.unwrap(), 17);
    }

    #[tokio::test]
    async fn invalid_arguments_are_rejected_before_the_store() {
        let store = store();
        store.set_tile(5, 1).await.unwrap();

        let err = store.set_tile(5, 256).await.unwrap_err();
        assert!(err.is_caller_error());
        assert!(matches!(err, StoreError::InvalidValue { .. }));

        let err = store.set_tile(100, 1).await.unwrap_err();
        assert!(matches!(err, StoreError::OutOfRange { offset: 100, cell_count: 100 }));

        assert!(matches!(store.get_tile(100).await, Err(StoreError::OutOfRange { .. })));
        assert_eq!(store.get_tile(5).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn snapshot_length_is_constant() {
        for (dimension, bit_width) in [(10, 8), (3, 1), (5, 4), (4, 16)] {
            let grid = GridSpec::new(dimension, bit_width).unwrap();
            let store = BoardStore::in_memory(grid).unwrap();
            assert_eq!(store.snapshot().await.unwrap().len(), grid.buffer_len());
            store.set_tile(grid.cell_count() - 1, 1).await.unwrap();
            assert_eq!(store.snapshot().await.unwrap().len(), grid.buffer_len());
        }
    }

    #[tokio::test]
    async fn clear_resets_the_board() {
        let store = store();
        store.set_tile(7, 70).await.unwrap();
        store.clear().await.unwrap();
        assert_eq!(store.get_tile(7).await.unwrap(), 0);
        assert!(store.ping().await.is_ok());
        assert_eq!(store.backend_name(), "memory");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_writes_to_distinct_cells_all_land() {
        // 4-bit cells: eight cells share every 32-bit word, so this also
        // exercises writers contending on the same word.
        let grid = GridSpec::new(16, 4).unwrap();
        let store = BoardStore::in_memory(grid).unwrap();
        let expected: Vec<Color> = (0..grid.cell_count())
            .map(|offset| u32::try_from(offset % 15).unwrap() + 1)
            .collect();

        let tasks = expected.iter().enumerate().map(|(offset, color)| {
            let store = store.clone();
            let color = *color;
            tokio::spawn(async move { store.set_tile(offset as u64, color).await })
        });
        for result in join_all(tasks).await {
            result.unwrap().unwrap();
        }

        for (offset, color) in expected.iter().enumerate() {
            assert_eq!(store.get_tile(offset as u64).await.unwrap(), *color);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn racing_writes_to_one_cell_leave_one_of_the_values() {
        let grid = GridSpec::new(4, 16).unwrap();
        for _ in 0..50 {
            let store = BoardStore::in_memory(grid).unwrap();
            let (c1, c2) = {
                let mut rng = rand::rng();
                (rng.random_range(0..=0xFFFF_u32), rng.random_range(0..=0xFFFF_u32))
            };
            let a = tokio::spawn({
                let store = store.clone();
                async move { store.set_tile(9, c1).await }
            });
            let b = tokio::spawn({
                let store = store.clone();
                async move { store.set_tile(9, c2).await }
            });
            a.await.unwrap().unwrap();
            b.await.unwrap().unwrap();

            let seen = store.get_tile(9).await.unwrap();
            assert!(BTreeSet::from([c1, c2]).contains(&seen), "{seen:#x} is neither");
        }
    }

    #[test]
    fn in_memory_refuses_unaligned_widths() {
        let grid = GridSpec::new(10, 24).unwrap();
        assert!(matches!(BoardStore::in_memory(grid), Err(StoreError::Config(_))));
    }
}
