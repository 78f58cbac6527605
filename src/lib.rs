//! Window Cache
//!
//! Context windowing and randomized epoch caching for segment-structured
//! training data (speech utterances split into frames of feature vectors or
//! per-frame labels).
//!
//! # Overview
//!
//! Numeric trainers want fixed-width inputs in statistically uniform random
//! order; corpora arrive as variable-length segments that must be windowed
//! without ever mixing frames across a segment boundary, and rarely fit in
//! memory. This library provides the two stream transforms that bridge the
//! gap, plus the O(1)-memory sequence generators behind them:
//!
//! - **SequentialWindow**: strict in-order windowing, one output segment per
//!   input segment - for validation and held-out passes.
//! - **RandomizedEpochCache**: packs whole segments into a fixed-capacity
//!   buffer and serves each fill's presentations in seeded, no-replacement
//!   random order, with a reproducibly different permutation every epoch.
//! - **SequenceGenerator**: sequential, random-no-replace (LFSR), and
//!   random-with-replace (seeded LCG) index generators.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                         window-cache                           │
//! ├────────────────────────────────────────────────────────────────┤
//! │  source/      - FrameSource trait (the store interface)        │
//! │  config/      - window geometry, buffer budget, seeds          │
//! │  seqgen/      - O(1)-memory draw-order generators              │
//! │  seq_window/  - in-order windowing (validation passes)         │
//! │  cache/       - randomized epoch cache (training passes)       │
//! └────────────────────────────────────────────────────────────────┘
//!
//! segment store ──► SequentialWindow ────┐
//!       (FrameSource)                    ├──► training loop
//! segment store ──► RandomizedEpochCache ┘    (also FrameSource)
//! ```
//!
//! Both transforms implement [`FrameSource`] themselves and are generic over
//! the element type, so one implementation covers `f32` feature streams and
//! `u32` label streams alike, and windows can be stacked or handed to a
//! consumer behind a single trait.
//!
//! # Example
//!
//! ```ignore
//! use window_cache::prelude::*;
//!
//! let config = CacheConfig::new(WindowSpec::new(9).with_margins(4, 4), 500_000)
//!     .with_seed(7042);
//! let mut cache = RandomizedEpochCache::new(source, config)?;
//!
//! while cache.next_seg()?.is_some() {
//!     loop {
//!         let n = cache.read(bunch, &mut batch)?;
//!         trainer.present(&batch[..n * cache.width()]);
//!         if n < bunch { break; }
//!     }
//! }
//! cache.rewind()?; // next epoch, new permutation
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod prelude;
pub mod seq_window;
pub mod seqgen;
pub mod source;

// Re-exports - Core components
pub use cache::RandomizedEpochCache;
pub use seq_window::SequentialWindow;

// Re-exports - Configuration
pub use config::{CacheConfig, Order, OversizePolicy, SeqWindowConfig, WindowSpec};

// Re-exports - Sources
pub use source::{FrameSource, MemorySource};

// Re-exports - Sequence generation
pub use seqgen::{RandomNoReplace, RandomWithReplace, SequenceGenerator, Sequential};

// Re-exports - Error handling
pub use error::{CacheError, Result};
