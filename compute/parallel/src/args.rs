//! CLI arguments

use clap::Args;
use std::num::NonZeroUsize;

/// CLI parameters for the thread pool executor
#[derive(Args, Copy, Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct ThreadPoolArgs {
    /// Number of processing threads
    ///
    /// By default, there is one thread per hardware thread.
    #[arg(short = 'j', long, env)]
    pub num_threads: Option<NonZeroUsize>,
}
