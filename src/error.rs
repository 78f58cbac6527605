//! Error types for windowing and caching operations.
//!
//! All fatal conditions are surfaced synchronously from the call that
//! discovered them (construction, `next_seg`, or `read`). Recoverable data
//! anomalies - an oversize segment that gets truncated, a segment too short
//! to yield any window - are logged and absorbed by the components instead
//! of appearing here.

use std::fmt;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, CacheError>;

/// Error type for windowing and epoch-cache operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Construction-time configuration error (bad window geometry, buffer
    /// too small for the margins, source without length metadata, ...).
    InvalidConfig(String),

    /// A sequence generator was asked to cover an empty range.
    EmptyRange,

    /// An input segment is longer than the cache buffer and the cache was
    /// configured with [`OversizePolicy::FailFast`].
    ///
    /// [`OversizePolicy::FailFast`]: crate::config::OversizePolicy::FailFast
    SegmentTooLong {
        /// Input segment number
        seg: usize,
        /// Frames in the segment
        frames: usize,
        /// Capacity of the cache buffer in frames
        buf_frames: usize,
    },

    /// The whole input yields zero presentations - nothing to train on.
    NoUsableFrames,

    /// `read` was called before the first `next_seg`, or after `rewind`
    /// without a fresh `next_seg`.
    NoActiveSegment,

    /// The requested capability is not provided by this component.
    Unsupported(&'static str),

    /// Failure propagated from the underlying frame source.
    Source(String),
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig(msg) => write!(f, "invalid configuration: {}", msg),
            Self::EmptyRange => write!(f, "sequence generator range must be non-empty"),
            Self::SegmentTooLong {
                seg,
                frames,
                buf_frames,
            } => {
                write!(
                    f,
                    "segment {} contains {} frames, more than the {}-frame cache buffer",
                    seg, frames, buf_frames
                )
            }
            Self::NoUsableFrames => {
                write!(f, "input contains no usable frames - nothing to present")
            }
            Self::NoActiveSegment => {
                write!(f, "read attempted before advancing to the first segment")
            }
            Self::Unsupported(op) => write!(f, "operation not supported by this stream: {}", op),
            Self::Source(msg) => write!(f, "frame source failure: {}", msg),
        }
    }
}

impl std::error::Error for CacheError {}
