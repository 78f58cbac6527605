//! Prelude module for convenient imports.
//!
//! Re-exports the types and traits needed for typical use of the library.
//!
//! # Usage
//!
//! ```ignore
//! use window_cache::prelude::*;
//!
//! let config = CacheConfig::new(WindowSpec::new(9).with_margins(4, 4), 500_000);
//! let mut cache = RandomizedEpochCache::new(source, config)?;
//! ```

// ============================================================================
// Core components
// ============================================================================

pub use crate::cache::RandomizedEpochCache;
pub use crate::seq_window::SequentialWindow;

// ============================================================================
// Configuration
// ============================================================================

pub use crate::config::{CacheConfig, Order, OversizePolicy, SeqWindowConfig, WindowSpec};

// ============================================================================
// Sources
// ============================================================================

pub use crate::source::{FrameSource, MemorySource};

// ============================================================================
// Sequence generation
// ============================================================================

pub use crate::seqgen::{RandomNoReplace, RandomWithReplace, SequenceGenerator, Sequential};

// ============================================================================
// Error handling
// ============================================================================

pub use crate::error::{CacheError, Result};
