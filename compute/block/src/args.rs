//! Command-line arguments

use crate::decomposition::{Decomposition, DEFAULT_TILE_SHAPE};
use clap::{Args, ValueEnum};
use std::num::NonZeroUsize;

/// Kind of domain decomposition
#[derive(Copy, Clone, Debug, Default, Eq, Hash, PartialEq, ValueEnum)]
pub enum DecompositionKind {
    /// Bands of rows spanning the full mesh width
    #[default]
    Bands,

    /// Fixed-size rectangular tiles
    Tiles,
}

/// CLI parameters for the block-wise implementation
#[derive(Args, Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub struct BlockArgs<ExecutorArgs: Args, BackendArgs: Args> {
    /// Domain decomposition policy
    ///
    /// The mesh interior is split into blocks which are then processed
    /// independently. Row bands minimize the number of blocks, tiles keep
    /// each block small enough to fit in cache.
    #[arg(long, env, value_enum, default_value_t)]
    pub decomposition: DecompositionKind,

    /// Number of row bands
    ///
    /// By default, there is one band per worker thread.
    #[arg(long, env)]
    pub num_bands: Option<NonZeroUsize>,

    /// Width of a tile in cells
    #[arg(long, env, default_value_t = DEFAULT_TILE_SHAPE[1])]
    pub tile_width: NonZeroUsize,

    /// Height of a tile in cells
    #[arg(long, env, default_value_t = DEFAULT_TILE_SHAPE[0])]
    pub tile_height: NonZeroUsize,

    /// Expose executor arguments too
    #[command(flatten)]
    pub executor: ExecutorArgs,

    /// Expose backend arguments too
    #[command(flatten)]
    pub backend: BackendArgs,
}
//
impl<ExecutorArgs: Args, BackendArgs: Args> BlockArgs<ExecutorArgs, BackendArgs> {
    /// Decomposition policy selected by these arguments
    pub fn decomposition(&self) -> Decomposition {
        match self.decomposition {
            DecompositionKind::Bands => Decomposition::RowBands {
                num_bands: self.num_bands,
            },
            DecompositionKind::Tiles => Decomposition::Tiles {
                shape: [self.tile_height, self.tile_width],
            },
        }
    }
}
