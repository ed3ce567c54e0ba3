//! Tile codec: grid geometry and cell addressing.
//!
//! A canvas is an `N x N` grid of cells, each holding an unsigned color of
//! `B` bits. Cells are linearized row-major (`offset = y * N + x`) and packed
//! back to back into a single byte buffer, so cell `o` occupies bits
//! `[o * B, (o + 1) * B)`. Bit 0 is the most significant bit of byte 0,
//! which is the layout Redis `BITFIELD` uses.
//!
//! [`GridSpec`] is pure and carries no state beyond the two parameters, so
//! the HTTP layer and the board store always compute identical offsets.

use crate::error::CodecError;

/// Linear index of a cell, dense in `[0, N * N)`.
pub type Offset = u64;

/// Unsigned cell color. Widths up to 32 bits are supported.
pub type Color = u32;

/// Widest cell supported. Colors are [`Color`] (`u32`).
pub const MAX_BIT_WIDTH: u32 = Color::BITS;

/// Largest buffer a board may occupy (the Redis string size limit).
pub const MAX_BUFFER_BYTES: u64 = 512 * 1024 * 1024;

/// Default grid side length.
pub const DEFAULT_DIMENSION: u32 = 10;

/// Default bits per cell (one byte, 256 colors).
pub const DEFAULT_BIT_WIDTH: u32 = 8;

/// Immutable geometry of a canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridSpec {
    dimension: u32,
    bit_width: u32,
    cell_count: u64,
    buffer_len: usize,
}

impl GridSpec {
    /// Build a grid of `dimension x dimension` cells of `bit_width` bits.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidGrid`] if the dimension is zero, the bit
    /// width is outside `1..=`[`MAX_BIT_WIDTH`], or the packed buffer would
    /// exceed [`MAX_BUFFER_BYTES`].
    pub fn new(dimension: u32, bit_width: u32) -> Result<Self, CodecError> {
        if dimension == 0 {
            return Err(CodecError::InvalidGrid(
                "dimension must be at least 1".to_owned(),
            ));
        }
        if !(1..=MAX_BIT_WIDTH).contains(&bit_width) {
            return Err(CodecError::InvalidGrid(format!(
                "bit width {bit_width} is outside 1..={MAX_BIT_WIDTH}"
            )));
        }

        let cell_count = u64::from(dimension)
            .checked_mul(u64::from(dimension))
            .ok_or_else(|| CodecError::InvalidGrid(format!("dimension {dimension} overflows")))?;
        let bytes = cell_count
            .checked_mul(u64::from(bit_width))
            .map(|bits| bits.div_ceil(8))
            .filter(|bytes| *bytes <= MAX_BUFFER_BYTES)
            .ok_or_else(|| {
                CodecError::InvalidGrid(format!(
                    "{dimension}x{dimension} grid of {bit_width}-bit cells exceeds \
                     {MAX_BUFFER_BYTES} bytes"
                ))
            })?;
        let buffer_len = usize::try_from(bytes)
            .map_err(|e| CodecError::InvalidGrid(format!("buffer length {bytes}: {e}")))?;

        Ok(Self {
            dimension,
            bit_width,
            cell_count,
            buffer_len,
        })
    }

    /// Side length `N` of the grid.
    pub const fn dimension(&self) -> u32 {
        self.dimension
    }

    /// Bits per cell `B`.
    pub const fn bit_width(&self) -> u32 {
        self.bit_width
    }

    /// Number of cells `N * N`.
    pub const fn cell_count(&self) -> u64 {
        self.cell_count
    }

    /// Exact snapshot length in bytes: `ceil(N * N * B / 8)`.
    pub const fn buffer_len(&self) -> usize {
        self.buffer_len
    }

    /// True if `B` divides 32, so no cell straddles a 32-bit word.
    ///
    /// Widths such as 12 or 24 are valid grids but only word-aligned
    /// widths can be updated with a single 32-bit compare-and-swap.
    pub const fn is_word_aligned(&self) -> bool {
        matches!(MAX_BIT_WIDTH.checked_rem(self.bit_width), Some(0))
    }

    /// Largest representable color, `2^B - 1`.
    pub const fn max_color(&self) -> Color {
        match Color::MAX.checked_shr(Color::BITS.saturating_sub(self.bit_width)) {
            Some(max) => max,
            None => 0,
        }
    }

    /// Map `(x, y)` to its row-major offset `y * N + x`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::OutOfRange`] if either coordinate lies outside
    /// `[0, N)`.
    pub fn offset(&self, x: i64, y: i64) -> Result<Offset, CodecError> {
        let out_of_range = || CodecError::OutOfRange {
            x,
            y,
            dimension: self.dimension,
        };
        let dim = u64::from(self.dimension);
        let col = u64::try_from(x)
            .ok()
            .filter(|c| *c < dim)
            .ok_or_else(out_of_range)?;
        let row = u64::try_from(y)
            .ok()
            .filter(|r| *r < dim)
            .ok_or_else(out_of_range)?;

        // row, col < dim <= u32::MAX, so the result stays below dim^2.
        Ok(row.saturating_mul(dim).saturating_add(col))
    }

    /// Inverse of [`GridSpec::offset`].
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::OffsetOutOfRange`] if `offset >= N * N`.
    pub fn coordinates(&self, offset: Offset) -> Result<(u32, u32), CodecError> {
        self.check_offset(offset)?;
        let out_of_range = || CodecError::OffsetOutOfRange {
            offset,
            cell_count: self.cell_count,
        };
        let dim = u64::from(self.dimension);
        let x = offset
            .checked_rem(dim)
            .and_then(|x| u32::try_from(x).ok())
            .ok_or_else(out_of_range)?;
        let y = offset
            .checked_div(dim)
            .and_then(|y| u32::try_from(y).ok())
            .ok_or_else(out_of_range)?;
        Ok((x, y))
    }

    /// Reject offsets outside `[0, N * N)`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::OffsetOutOfRange`].
    pub const fn check_offset(&self, offset: Offset) -> Result<(), CodecError> {
        if offset < self.cell_count {
            Ok(())
        } else {
            Err(CodecError::OffsetOutOfRange {
                offset,
                cell_count: self.cell_count,
            })
        }
    }

    /// True iff `0 <= color < 2^B`.
    pub fn validate_color(&self, color: i64) -> bool {
        Color::try_from(color).is_ok_and(|c| c <= self.max_color())
    }

    /// Narrow a caller-supplied color to [`Color`].
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidValue`] if the color is negative or does
    /// not fit in `B` bits.
    pub fn check_color(&self, color: i64) -> Result<Color, CodecError> {
        Color::try_from(color)
            .ok()
            .filter(|c| *c <= self.max_color())
            .ok_or(CodecError::InvalidValue {
                color,
                bit_width: self.bit_width,
            })
    }

    /// First bit of the cell at `offset` inside the packed buffer.
    pub fn bit_offset(&self, offset: Offset) -> u64 {
        offset.saturating_mul(u64::from(self.bit_width))
    }
}

impl Default for GridSpec {
    fn default() -> Self {
        Self {
            dimension: DEFAULT_DIMENSION,
            bit_width: DEFAULT_BIT_WIDTH,
            cell_count: 100,
            buffer_len: 100,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    #[test]
    fn default_matches_explicit_construction() {
        assert_eq!(
            GridSpec::default(),
            GridSpec::new(DEFAULT_DIMENSION, DEFAULT_BIT_WIDTH).unwrap()
        );
    }

    #[test]
    fn offset_is_row_major() {
        let grid = GridSpec::default();
        assert_eq!(grid.offset(0, 0).unwrap(), 0);
        assert_eq!(grid.offset(9, 0).unwrap(), 9);
        assert_eq!(grid.offset(0, 1).unwrap(), 10);
        assert_eq!(grid.offset(3, 2).unwrap(), 23);
        assert_eq!(grid.offset(9, 9).unwrap(), 99);
    }

    #[test]
    fn offset_is_a_bijection() {
        let grid = GridSpec::new(7, 4).unwrap();
        let mut seen = BTreeSet::new();
        for y in 0..7_i64 {
            for x in 0..7_i64 {
                let offset = grid.offset(x, y).unwrap();
                assert!(seen.insert(offset), "duplicate offset {offset}");
                let (cx, cy) = grid.coordinates(offset).unwrap();
                assert_eq!((i64::from(cx), i64::from(cy)), (x, y));
            }
        }
        assert_eq!(seen.len(), 49);
        assert_eq!(seen.last().copied(), Some(48));
    }

    #[test]
    fn offset_rejects_coordinates_outside_grid() {
        let grid = GridSpec::default();
        for (x, y) in [(-1, 0), (0, -1), (10, 0), (0, 10), (10, 10), (i64::MAX, 0)] {
            assert_eq!(
                grid.offset(x, y),
                Err(CodecError::OutOfRange {
                    x,
                    y,
                    dimension: 10
                })
            );
        }
    }

    #[test]
    fn coordinates_reject_offsets_past_the_end() {
        let grid = GridSpec::default();
        assert!(matches!(
            grid.coordinates(100),
            Err(CodecError::OffsetOutOfRange {
                offset: 100,
                cell_count: 100
            })
        ));
    }

    #[test]
    fn color_range_follows_bit_width() {
        let byte = GridSpec::default();
        assert!(byte.validate_color(0));
        assert!(byte.validate_color(255));
        assert!(!byte.validate_color(256));
        assert!(!byte.validate_color(-1));
        assert_eq!(byte.check_color(200), Ok(200));
        assert_eq!(
            byte.check_color(256),
            Err(CodecError::InvalidValue {
                color: 256,
                bit_width: 8
            })
        );

        let mono = GridSpec::new(4, 1).unwrap();
        assert_eq!(mono.max_color(), 1);
        assert!(!mono.validate_color(2));

        let wide = GridSpec::new(2, 32).unwrap();
        assert_eq!(wide.max_color(), u32::MAX);
        assert!(wide.validate_color(i64::from(u32::MAX)));
        assert!(!wide.validate_color(i64::from(u32::MAX) + 1));
    }

    #[test]
    fn buffer_len_rounds_up_to_whole_bytes() {
        assert_eq!(GridSpec::default().buffer_len(), 100);
        assert_eq!(GridSpec::new(3, 1).unwrap().buffer_len(), 2);
        assert_eq!(GridSpec::new(3, 4).unwrap().buffer_len(), 5);
        assert_eq!(GridSpec::new(4, 16).unwrap().buffer_len(), 32);
    }

    #[test]
    fn bit_offset_scales_by_width() {
        let grid = GridSpec::new(10, 4).unwrap();
        assert_eq!(grid.bit_offset(0), 0);
        assert_eq!(grid.bit_offset(23), 92);
    }

    #[test]
    fn invalid_geometry_is_rejected() {
        assert!(matches!(GridSpec::new(0, 8), Err(CodecError::InvalidGrid(_))));
        assert!(matches!(GridSpec::new(10, 0), Err(CodecError::InvalidGrid(_))));
        assert!(matches!(GridSpec::new(10, 33), Err(CodecError::InvalidGrid(_))));
        assert!(matches!(GridSpec::new(10, 64), Err(CodecError::InvalidGrid(_))));
        assert!(matches!(
            GridSpec::new(100_000, 8),
            Err(CodecError::InvalidGrid(_))
        ));
    }

    #[test]
    fn odd_widths_are_valid_grids() {
        let rgb = GridSpec::new(3, 24).unwrap();
        assert_eq!(rgb.max_color(), 0x00FF_FFFF);
        assert_eq!(rgb.buffer_len(), 27);
        assert!(!rgb.is_word_aligned());

        let twelve = GridSpec::new(3, 12).unwrap();
        assert_eq!(twelve.buffer_len(), 14);
        assert_eq!(twelve.bit_offset(5), 60);
        assert!(!twelve.is_word_aligned());

        for width in [1, 2, 4, 8, 16, 32] {
            assert!(GridSpec::new(2, width).unwrap().is_word_aligned());
        }
        assert!(!GridSpec::new(2, 3).unwrap().is_word_aligned());
    }
}
