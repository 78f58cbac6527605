//! Configuration for the windowing components.
//!
//! Configs are plain serde-annotated structs so experiment setups can be
//! version-controlled and reloaded exactly. Each struct validates itself
//! with `validate()`; the components call it at construction and refuse to
//! start from an inconsistent setup.
//!
//! # Example
//!
//! ```ignore
//! use window_cache::config::{CacheConfig, WindowSpec};
//!
//! let config = CacheConfig::new(WindowSpec::new(9).with_margins(4, 4), 500_000)
//!     .with_seed(7042);
//! config.save_toml("experiment_window.toml")?;
//! ```

use std::fs;
use std::path::Path;

/// Window geometry: how many consecutive raw frames are stacked into one
/// presentation, and how many frames at each segment edge are discarded.
///
/// A segment must contain at least `top_margin + win_len + bot_margin`
/// frames to yield any presentation; shorter segments are skipped. The
/// margins allow several synchronized windows of different sizes over the
/// same data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct WindowSpec {
    /// Number of consecutive frames stacked into one output frame.
    pub win_len: usize,

    /// Frames discarded at the start of every segment.
    pub top_margin: usize,

    /// Frames discarded at the end of every segment.
    pub bot_margin: usize,
}

impl WindowSpec {
    /// A window of `win_len` frames with no margins.
    pub fn new(win_len: usize) -> Self {
        Self {
            win_len,
            top_margin: 0,
            bot_margin: 0,
        }
    }

    /// Set both margins.
    pub fn with_margins(mut self, top: usize, bot: usize) -> Self {
        self.top_margin = top;
        self.bot_margin = bot;
        self
    }

    /// The minimum segment length that yields one presentation.
    #[inline]
    pub fn min_seg_frames(&self) -> usize {
        self.top_margin + self.win_len + self.bot_margin
    }

    /// Frames of a segment that can never start a presentation.
    ///
    /// A segment of `len` frames yields `len - lost_frames()` presentations
    /// (zero if negative).
    #[inline]
    pub fn lost_frames(&self) -> usize {
        self.min_seg_frames() - 1
    }

    /// Presentations yielded by a segment of `len` frames.
    #[inline]
    pub fn usable_frames(&self, len: usize) -> usize {
        len.saturating_sub(self.lost_frames())
    }

    /// Validate the geometry.
    pub fn validate(&self) -> Result<(), String> {
        if self.win_len == 0 {
            return Err("win_len must be > 0".to_string());
        }
        Ok(())
    }
}

/// Presentation ordering within one cache fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Order {
    /// Seeded random order, every presentation exactly once per fill.
    #[default]
    RandomNoReplace,

    /// Original data order; used for comparison and debugging passes.
    Sequential,
}

/// What to do with an input segment longer than the cache buffer.
///
/// The original tool silently clamped such segments after very large
/// broadcast-news utterances made the hard error impractical; whether that
/// was intent or a sizing bug is not resolvable, so both behaviors are
/// offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OversizePolicy {
    /// Log a warning and discard the tail beyond the buffer capacity.
    #[default]
    WarnTruncate,

    /// Fail construction with `CacheError::SegmentTooLong`.
    FailFast,
}

/// Configuration for [`SequentialWindow`].
///
/// [`SequentialWindow`]: crate::seq_window::SequentialWindow
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SeqWindowConfig {
    /// Window geometry.
    pub window: WindowSpec,

    /// Frames requested from the source per refill read. `None` uses the
    /// smallest workable size, `window.min_seg_frames()`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bunch_frames: Option<usize>,
}

impl SeqWindowConfig {
    /// Create a config with the default bunch size.
    pub fn new(window: WindowSpec) -> Self {
        Self {
            window,
            bunch_frames: None,
        }
    }

    /// Set the I/O bunch size in frames.
    pub fn with_bunch_frames(mut self, bunch: usize) -> Self {
        self.bunch_frames = Some(bunch);
        self
    }

    /// Resolved bunch size.
    #[inline]
    pub fn effective_bunch(&self) -> usize {
        self.bunch_frames.unwrap_or(self.window.min_seg_frames())
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        self.window.validate()?;
        if self.effective_bunch() < self.window.min_seg_frames() {
            return Err(format!(
                "bunch_frames ({}) must be >= window span ({})",
                self.effective_bunch(),
                self.window.min_seg_frames()
            ));
        }
        Ok(())
    }
}

/// Configuration for [`RandomizedEpochCache`].
///
/// [`RandomizedEpochCache`]: crate::cache::RandomizedEpochCache
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CacheConfig {
    /// Window geometry.
    pub window: WindowSpec,

    /// Capacity of the randomization buffer in raw frames. This bounds the
    /// cache's memory use at `buf_frames * width` elements regardless of
    /// how many segments the input has.
    pub buf_frames: usize,

    /// Base seed. Each fill reseeds its generator from the base seed, the
    /// output segment number, and the epoch, so runs are reproducible while
    /// every epoch gets a different permutation.
    pub seed: u32,

    /// Presentation ordering per fill.
    #[serde(default)]
    pub order: Order,

    /// Handling of segments longer than `buf_frames`.
    #[serde(default)]
    pub oversize: OversizePolicy,
}

impl CacheConfig {
    /// Create a config with seed 0, random no-replace order, and
    /// warn-and-truncate oversize handling.
    pub fn new(window: WindowSpec, buf_frames: usize) -> Self {
        Self {
            window,
            buf_frames,
            seed: 0,
            order: Order::default(),
            oversize: OversizePolicy::default(),
        }
    }

    /// Set the base seed.
    pub fn with_seed(mut self, seed: u32) -> Self {
        self.seed = seed;
        self
    }

    /// Set the presentation ordering.
    pub fn with_order(mut self, order: Order) -> Self {
        self.order = order;
        self
    }

    /// Set the oversize-segment policy.
    pub fn with_oversize(mut self, policy: OversizePolicy) -> Self {
        self.oversize = policy;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        self.window.validate()?;
        if self.buf_frames < self.window.min_seg_frames() {
            return Err(format!(
                "buf_frames ({}) cannot hold one window plus margins ({})",
                self.buf_frames,
                self.window.min_seg_frames()
            ));
        }
        Ok(())
    }

    /// Save the configuration to a TOML file.
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let toml_string = toml::to_string_pretty(self)?;
        fs::write(path, toml_string)?;
        Ok(())
    }

    /// Load a configuration from a TOML file.
    pub fn load_toml<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(path)?;
        let config: CacheConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save the configuration to a JSON file.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let json_string = serde_json::to_string_pretty(self)?;
        fs::write(path, json_string)?;
        Ok(())
    }

    /// Load a configuration from a JSON file.
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(path)?;
        let config: CacheConfig = serde_json::from_str(&contents)?;
        Ok(config)
    }
}
