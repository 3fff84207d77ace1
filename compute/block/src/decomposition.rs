//! Domain decomposition of the mesh interior into blocks

use data::{array2, parameters::stencil_offset, Precision};
use ndarray::{ArrayView2, ArrayViewMut2, Axis};
use std::{num::NonZeroUsize, ops::Range};

/// Minimal height of a row band
///
/// Used when the interior has fewer rows than there are bands to create.
pub const FALLBACK_BAND_HEIGHT: usize = 1;

/// Default tile shape in [rows, cols] order
pub const DEFAULT_TILE_SHAPE: [NonZeroUsize; 2] = [nonzero(16), nonzero(32)];

/// Compile-time checked nonzero length
const fn nonzero(len: usize) -> NonZeroUsize {
    match NonZeroUsize::new(len) {
        Some(len) => len,
        None => panic!("length must be nonzero"),
    }
}

/// Policy for splitting the mesh interior into blocks
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum Decomposition {
    /// Bands of rows spanning the full interior width
    RowBands {
        /// Number of bands, defaults to the executor's number of workers
        num_bands: Option<NonZeroUsize>,
    },

    /// Fixed-size tiles, clipped at the far edges of the interior
    Tiles {
        /// Tile shape in [rows, cols] order
        shape: [NonZeroUsize; 2],
    },
}
//
impl Decomposition {
    /// Tiles of the default shape
    pub fn default_tiles() -> Self {
        Self::Tiles {
            shape: DEFAULT_TILE_SHAPE,
        }
    }

    /// Split a region of the mesh into blocks
    ///
    /// `interior` is the region to be split, in mesh coordinates.
    /// `num_workers` is the number of workers that will process the blocks.
    pub fn partition(&self, interior: [Range<usize>; 2], num_workers: NonZeroUsize) -> Partition {
        let [rows, cols] = interior;
        match *self {
            Self::RowBands { num_bands } => Partition::new(
                band_ranges(rows, num_bands.unwrap_or(num_workers)),
                vec![cols],
            ),
            Self::Tiles { shape } => Partition::new(
                tile_ranges(rows, shape[0]),
                tile_ranges(cols, shape[1]),
            ),
        }
    }
}
//
impl Default for Decomposition {
    fn default() -> Self {
        Self::RowBands { num_bands: None }
    }
}

/// Split a range of rows into at most `num_bands` bands
///
/// All bands but the last one have the same height. The last band absorbs
/// the remainder of the division, and no band is ever empty unless `rows` is.
pub fn band_ranges(rows: Range<usize>, num_bands: NonZeroUsize) -> Vec<Range<usize>> {
    let height = rows.len();
    let band_height = (height / num_bands).max(FALLBACK_BAND_HEIGHT);
    let num_bands = usize::from(num_bands).min(height / band_height).max(1);
    (0..num_bands)
        .map(|band| {
            let start = rows.start + band * band_height;
            let end = if band == num_bands - 1 {
                rows.end
            } else {
                start + band_height
            };
            start..end
        })
        .collect()
}

/// Split a range into consecutive chunks of `len` elements
///
/// The last chunk is clipped to the end of the range.
pub fn tile_ranges(range: Range<usize>, len: NonZeroUsize) -> Vec<Range<usize>> {
    let end = range.end;
    range
        .step_by(len.into())
        .map(|start| start..(start + usize::from(len)).min(end))
        .collect()
}

/// Rectangular region of the mesh, in mesh coordinates
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Block {
    /// Rows covered by the block
    pub rows: Range<usize>,

    /// Columns covered by the block
    pub cols: Range<usize>,
}
//
impl Block {
    /// Number of cells in the block
    pub fn len(&self) -> usize {
        self.rows.len() * self.cols.len()
    }

    /// Truth that the block contains no cell
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Region that must be read in order to update this block
    ///
    /// This is the block grown by the stencil margin on every side.
    pub fn with_halo(&self) -> [Range<usize>; 2] {
        let offset = stencil_offset();
        let ranges = [&self.rows, &self.cols];
        array2(|i| ranges[i].start - offset[i]..ranges[i].end + offset[i])
    }
}

/// Set of blocks that exactly covers a rectangular region of the mesh
///
/// Blocks are the cartesian product of a list of row ranges and a list of
/// column ranges, each list being made of consecutive ranges.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Partition {
    /// Row ranges, from top to bottom
    row_ranges: Vec<Range<usize>>,

    /// Column ranges, from left to right
    col_ranges: Vec<Range<usize>>,
}
//
impl Partition {
    /// Build a partition from consecutive row and column ranges
    pub fn new(row_ranges: Vec<Range<usize>>, col_ranges: Vec<Range<usize>>) -> Self {
        debug_assert!(row_ranges.windows(2).all(|w| w[0].end == w[1].start));
        debug_assert!(col_ranges.windows(2).all(|w| w[0].end == w[1].start));
        Self {
            row_ranges,
            col_ranges,
        }
    }

    /// Row ranges, from top to bottom
    pub fn row_ranges(&self) -> &[Range<usize>] {
        &self.row_ranges
    }

    /// Column ranges, from left to right
    pub fn col_ranges(&self) -> &[Range<usize>] {
        &self.col_ranges
    }

    /// Number of blocks
    pub fn num_blocks(&self) -> usize {
        self.row_ranges.len() * self.col_ranges.len()
    }

    /// Blocks in row-major order
    pub fn blocks(&self) -> impl Iterator<Item = Block> + '_ {
        self.row_ranges.iter().flat_map(move |rows| {
            self.col_ranges.iter().map(move |cols| Block {
                rows: rows.clone(),
                cols: cols.clone(),
            })
        })
    }

    /// Split a mutable view of the partitioned region into one view per block
    ///
    /// Sub-views are emitted in the same order as [`Partition::blocks()`].
    pub fn split_mut<'a>(
        &self,
        region: ArrayViewMut2<'a, Precision>,
    ) -> Vec<ArrayViewMut2<'a, Precision>> {
        self.split_views(region, |view, axis, idx| view.split_at(axis, idx))
    }

    /// Split a read-only view of the partitioned region into one view per block
    ///
    /// Sub-views are emitted in the same order as [`Partition::blocks()`].
    pub fn split<'a>(&self, region: ArrayView2<'a, Precision>) -> Vec<ArrayView2<'a, Precision>> {
        self.split_views(region, |view, axis, idx| view.split_at(axis, idx))
    }

    /// Split a view along row ranges, then along column ranges
    fn split_views<View>(
        &self,
        region: View,
        split_at: impl Fn(View, Axis, usize) -> (View, View),
    ) -> Vec<View> {
        split_along(region, Axis(0), &self.row_ranges, &split_at)
            .into_iter()
            .flat_map(|band| split_along(band, Axis(1), &self.col_ranges, &split_at))
            .collect()
    }
}

/// Split a view into consecutive chunks along some axis, one per range
///
/// The last chunk takes whatever remains of the view.
fn split_along<View>(
    view: View,
    axis: Axis,
    ranges: &[Range<usize>],
    split_at: &impl Fn(View, Axis, usize) -> (View, View),
) -> Vec<View> {
    let mut chunks = Vec::with_capacity(ranges.len());
    let mut remainder = Some(view);
    for (idx, range) in ranges.iter().enumerate() {
        let Some(rest) = remainder.take() else {
            break;
        };
        if idx == ranges.len() - 1 {
            chunks.push(rest);
        } else {
            let (chunk, rest) = split_at(rest, axis, range.len());
            chunks.push(chunk);
            remainder = Some(rest);
        }
    }
    chunks
}
