//! Lock-free in-process bit-field buffer.
//!
//! The board is held as big-endian 32-bit words. Only bit widths that
//! divide 32 are accepted, so each cell lies inside exactly one word and a
//! cell write is a single compare-and-swap on that word. Writers to cells in different
//! words never touch the same atomic; writers to cells sharing a word retry
//! the CAS but can never overwrite each other's bits. Contention
//! granularity is therefore one 32-bit word.
//!
//! The byte image produced by [`MemoryBoard::snapshot`] is identical to
//! what Redis `BITFIELD` would leave in a string: bit 0 of the buffer is the
//! most significant bit of byte 0.

use std::sync::atomic::{AtomicU32, Ordering};

use beli_types::{Color, GridSpec, Offset};

use crate::error::StoreError;

const WORD_BITS: u64 = 32;

/// In-process board buffer with atomic per-cell get/set.
#[derive(Debug)]
pub struct MemoryBoard {
    grid: GridSpec,
    words: Box<[AtomicU32]>,
}

/// Position of one cell inside the word array.
#[derive(Debug, Clone, Copy)]
struct CellSlot {
    word: usize,
    shift: u32,
    mask: u32,
}

impl MemoryBoard {
    /// Allocate a zeroed board for `grid`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] if the bit width does not divide 32.
    /// Such grids need the `Dragonfly` backend.
    pub fn new(grid: GridSpec) -> Result<Self, StoreError> {
        if !grid.is_word_aligned() {
            return Err(StoreError::Config(format!(
                "in-memory board needs a bit width dividing 32, got {}",
                grid.bit_width()
            )));
        }
        let word_count = grid.buffer_len().div_ceil(4);
        let words = (0..word_count).map(|_| AtomicU32::new(0)).collect();
        Ok(Self { grid, words })
    }

    /// Geometry of this board.
    pub const fn grid(&self) -> &GridSpec {
        &self.grid
    }

    fn slot(&self, offset: Offset) -> Result<CellSlot, StoreError> {
        self.grid.check_offset(offset)?;
        let bit = self.grid.bit_offset(offset);
        let word = usize::try_from(bit / WORD_BITS)
            .map_err(|e| StoreError::Config(format!("offset {offset}: {e}")))?;
        let within = u32::try_from(bit % WORD_BITS)
            .map_err(|e| StoreError::Config(format!("offset {offset}: {e}")))?;
        // Cells are aligned to their width, so within + width <= 32.
        let shift = 32_u32
            .saturating_sub(within)
            .saturating_sub(self.grid.bit_width());
        let mask = self.grid.max_color().checked_shl(shift).unwrap_or(0);
        Ok(CellSlot { word, shift, mask })
    }

    fn word(&self, slot: CellSlot, offset: Offset) -> Result<&AtomicU32, StoreError> {
        self.words.get(slot.word).ok_or(StoreError::OutOfRange {
            offset,
            cell_count: self.grid.cell_count(),
        })
    }

    /// Atomically replace the cell at `offset` with `color`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::OutOfRange`] or [`StoreError::InvalidValue`] if
    /// the arguments do not fit the grid. The buffer is untouched in that
    /// case.
    pub fn set(&self, offset: Offset, color: Color) -> Result<(), StoreError> {
        if color > self.grid.max_color() {
            return Err(StoreError::InvalidValue {
                color,
                bit_width: self.grid.bit_width(),
            });
        }
        let slot = self.slot(offset)?;
        let bits = color.checked_shl(slot.shift).unwrap_or(0);

        // The closure never returns None, so fetch_update cannot fail.
        let _ = self.word(slot, offset)?.fetch_update(
            Ordering::AcqRel,
            Ordering::Acquire,
            |current| Some((current & !slot.mask) | bits),
        );
        Ok(())
    }

    /// Read the cell at `offset`. Unwritten cells read as zero.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::OutOfRange`] if `offset` is outside the grid.
    pub fn get(&self, offset: Offset) -> Result<Color, StoreError> {
        let slot = self.slot(offset)?;
        let current = self.word(slot, offset)?.load(Ordering::Acquire);
        Ok((current & slot.mask).checked_shr(slot.shift).unwrap_or(0))
    }

    /// Copy the whole buffer, word by word.
    ///
    /// Each word is loaded atomically; the copy as a whole is not a single
    /// point-in-time image under concurrent writes.
    pub fn snapshot(&self) -> Vec<u8> {
        let mut bytes: Vec<u8> = self
            .words
            .iter()
            .flat_map(|w| w.load(Ordering::Acquire).to_be_bytes())
            .collect();
        bytes.truncate(self.grid.buffer_len());
        bytes
    }

    /// Reset every cell to zero.
    pub fn clear(&self) {
        for word in &*self.words {
            word.store(0, Ordering::Release);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn fresh_board_reads_zero() {
        let board = MemoryBoard::new(GridSpec::default()).unwrap();
        assert_eq!(board.get(0).unwrap(), 0);
        assert_eq!(board.get(99).unwrap(), 0);
        assert_eq!(board.snapshot(), vec![0; 100]);
    }

    #[test]
    fn byte_cells_land_on_their_own_byte() {
        let board = MemoryBoard::new(GridSpec::default()).unwrap();
        board.set(23, 200).unwrap();
        assert_eq!(board.get(23).unwrap(), 200);
        let snap = board.snapshot();
        assert_eq!(snap[23], 200);
        assert_eq!(snap.iter().filter(|b| **b != 0).count(), 1);
    }

    #[test]
    fn sub_byte_cells_pack_msb_first() {
        // Two 4-bit cells share byte 0: cell 0 is the high nibble.
        let board = MemoryBoard::new(GridSpec::new(2, 4).unwrap()).unwrap();
        board.set(0, 0xA).unwrap();
        board.set(1, 0x5).unwrap();
        assert_eq!(board.snapshot(), vec![0xA5, 0x00]);
        assert_eq!(board.get(0).unwrap(), 0xA);
        assert_eq!(board.get(1).unwrap(), 0x5);
    }

    #[test]
    fn single_bit_cells_pack_msb_first() {
        let board = MemoryBoard::new(GridSpec::new(3, 1).unwrap()).unwrap();
        board.set(0, 1).unwrap();
        board.set(8, 1).unwrap();
        assert_eq!(board.snapshot(), vec![0b1000_0000, 0b1000_0000]);
    }

    #[test]
    fn wide_cells_are_big_endian() {
        let board = MemoryBoard::new(GridSpec::new(2, 16).unwrap()).unwrap();
        board.set(1, 0x1234).unwrap();
        assert_eq!(board.snapshot(), vec![0, 0, 0x12, 0x34, 0, 0, 0, 0]);

        let full = MemoryBoard::new(GridSpec::new(1, 32).unwrap()).unwrap();
        full.set(0, u32::MAX).unwrap();
        assert_eq!(full.get(0).unwrap(), u32::MAX);
    }

    #[test]
    fn overwrite_keeps_neighbours() {
        let board = MemoryBoard::new(GridSpec::new(4, 2).unwrap()).unwrap();
        for offset in 0..16 {
            board.set(offset, 3).unwrap();
        }
        board.set(5, 1).unwrap();
        for offset in 0..16 {
            let expected = if offset == 5 { 1 } else { 3 };
            assert_eq!(board.get(offset).unwrap(), expected);
        }
    }

    #[test]
    fn rejected_writes_leave_buffer_untouched() {
        let board = MemoryBoard::new(GridSpec::default()).unwrap();
        board.set(4, 7).unwrap();
        assert!(matches!(
            board.set(4, 256),
            Err(StoreError::InvalidValue { color: 256, bit_width: 8 })
        ));
        assert!(matches!(
            board.set(100, 1),
            Err(StoreError::OutOfRange { offset: 100, .. })
        ));
        assert_eq!(board.get(4).unwrap(), 7);
        assert!(matches!(board.get(100), Err(StoreError::OutOfRange { .. })));
    }

    #[test]
    fn clear_zeroes_every_cell() {
        let board = MemoryBoard::new(GridSpec::default()).unwrap();
        board.set(1, 9).unwrap();
        board.clear();
        assert_eq!(board.get(1).unwrap(), 0);
    }

    #[test]
    fn unaligned_widths_are_refused() {
        for width in [3, 12, 24] {
            let grid = GridSpec::new(4, width).unwrap();
            assert!(matches!(MemoryBoard::new(grid), Err(StoreError::Config(_))));
        }
    }
}
