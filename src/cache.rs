//! Randomized epoch cache.
//!
//! [`RandomizedEpochCache`] is the training-side counterpart of
//! [`SequentialWindow`]: it greedily packs whole input segments into a
//! fixed-capacity frame buffer (an "output segment"), windows every packed
//! segment in place, and serves the resulting presentations in seeded
//! no-replacement random order. Each `rewind` starts a new epoch with a
//! reproducibly different permutation.
//!
//! # Architecture
//!
//! ```text
//! input segments ──► greedy packing index (construction, length metadata only)
//!                     out_seg_index[k] = first input segment of fill k
//!                                 │
//! next_seg() ──► seek + bulk read │ one fill into the frame buffer
//!                shared buffer [ seg a │ seg b │ seg c │ ... ]  ≤ buf_frames
//!                back-references [ every usable window start, per segment ]
//!                                 │
//! read(n) ──► LFSR generator picks back-references, windows copied out
//! ```
//!
//! # Memory guarantees
//!
//! The frame buffer holds exactly `buf_frames * width` elements and the
//! back-reference table at most `buf_frames` entries, both allocated once
//! at construction and reused for every fill and epoch. Input size never
//! changes the footprint; what does not fit a fill goes into the next one.
//!
//! # Reported segment counts
//!
//! `num_segs` counts **output** segments - buffer fills - not input
//! segments. A fill is the natural unit of progress for a consumer (one
//! seek plus one bulk read), but the number differs from the input segment
//! count whenever packing merges segments, so interfaces built on top must
//! not assume the two agree.
//!
//! [`SequentialWindow`]: crate::seq_window::SequentialWindow

use crate::config::{CacheConfig, Order, OversizePolicy};
use crate::error::{CacheError, Result};
use crate::seqgen::{RandomNoReplace, SequenceGenerator, Sequential};
use crate::source::FrameSource;

/// Epoch-to-epoch reseeding step; any fixed large constant works, this one
/// is kept for sequence compatibility with the original tool.
const EPOCH_SEED_STEP: u32 = 12345;

/// A capacity-bounded cache serving windowed presentations in randomized,
/// no-replacement order.
///
/// Requires a random-access source: segment count and per-segment frame
/// counts must be known at construction, and `set_pos` must work.
///
/// Not thread-safe; the frame buffer, back-reference table, and generator
/// state are mutated in place on every call. Run parallel trainers with one
/// cache and one source handle each.
pub struct RandomizedEpochCache<S: FrameSource> {
    src: S,
    win_len: usize,
    top_margin: usize,
    lost_frames: usize,
    in_width: usize,
    out_width: usize,
    buf_frames: usize,
    seed: u32,
    order: Order,

    /// Output segment k covers input segments
    /// `out_seg_index[k]..out_seg_index[k+1]`.
    out_seg_index: Vec<usize>,
    /// Usable presentations per output segment.
    out_seg_usable: Vec<usize>,
    /// Total presentations in one epoch.
    out_n_frames: usize,

    /// Shared raw-frame buffer, `buf_frames * in_width` elements.
    buf: Vec<S::Elem>,
    /// Back-references: frame offset into `buf` of each presentation start
    /// in the current fill.
    frame_index: Vec<usize>,
    /// Presentations available in the current fill.
    usable: usize,
    /// Presentations already drawn from the current fill.
    out_frameno: usize,
    /// Current output segment; `None` = before the first fill.
    out_segno: Option<usize>,
    epoch: u32,
    seqgen: Option<Box<dyn SequenceGenerator>>,
}

impl<S: FrameSource> std::fmt::Debug for RandomizedEpochCache<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RandomizedEpochCache")
            .field("win_len", &self.win_len)
            .field("top_margin", &self.top_margin)
            .field("lost_frames", &self.lost_frames)
            .field("in_width", &self.in_width)
            .field("out_width", &self.out_width)
            .field("buf_frames", &self.buf_frames)
            .field("seed", &self.seed)
            .field("order", &self.order)
            .field("out_n_frames", &self.out_n_frames)
            .field("usable", &self.usable)
            .field("out_frameno", &self.out_frameno)
            .field("out_segno", &self.out_segno)
            .field("epoch", &self.epoch)
            .finish_non_exhaustive()
    }
}

impl<S: FrameSource> RandomizedEpochCache<S> {
    /// Build a cache over `src` with the geometry and budget in `config`.
    ///
    /// Walks the source's length metadata once (no frame reads) to lay out
    /// the packing index. Fails fast on a source without length metadata,
    /// a buffer that cannot hold a single window span, an oversize segment
    /// under [`OversizePolicy::FailFast`], or input with no usable frames
    /// at all.
    pub fn new(src: S, config: CacheConfig) -> Result<Self> {
        config.validate().map_err(CacheError::InvalidConfig)?;
        let in_width = src.width();
        if in_width == 0 {
            return Err(CacheError::InvalidConfig(
                "source frame width must be non-zero".to_string(),
            ));
        }
        let n_segs = src.num_segs().ok_or_else(|| {
            CacheError::InvalidConfig(
                "randomized cache requires a source with a known segment count".to_string(),
            )
        })?;

        let w = config.window;
        let buf_frames = config.buf_frames;
        let lost_frames = w.lost_frames();

        // Greedy packing walk over the length metadata: start a new output
        // segment whenever the next input segment would overflow the buffer.
        let mut out_seg_index = vec![0usize];
        let mut out_seg_usable = Vec::new();
        let mut fill_frames = 0usize;
        let mut fill_usable = 0usize;
        let mut total_usable = 0usize;
        let mut min_fill = buf_frames;
        let mut max_fill = 0usize;
        for seg in 0..n_segs {
            let mut len = src.num_frames(Some(seg)).ok_or_else(|| {
                CacheError::InvalidConfig(format!(
                    "randomized cache requires a known length for segment {}",
                    seg
                ))
            })?;
            if len <= lost_frames {
                log::warn!(
                    "segment {} has only {} frames - no windows will be produced from it",
                    seg,
                    len
                );
            }
            if len > buf_frames {
                match config.oversize {
                    OversizePolicy::WarnTruncate => {
                        log::warn!(
                            "segment {} contains {} frames, more than the {}-frame \
                             randomization buffer - tail portion will be discarded",
                            seg,
                            len,
                            buf_frames
                        );
                        len = buf_frames;
                    }
                    OversizePolicy::FailFast => {
                        return Err(CacheError::SegmentTooLong {
                            seg,
                            frames: len,
                            buf_frames,
                        });
                    }
                }
            }
            let usable = w.usable_frames(len);
            if fill_frames + len > buf_frames {
                // This segment pushes us on to a new output segment.
                min_fill = min_fill.min(fill_frames);
                max_fill = max_fill.max(fill_frames);
                out_seg_index.push(seg);
                out_seg_usable.push(fill_usable);
                fill_frames = len;
                fill_usable = usable;
            } else {
                fill_frames += len;
                fill_usable += usable;
            }
            total_usable += usable;
        }
        if total_usable == 0 {
            return Err(CacheError::NoUsableFrames);
        }
        // total_usable > 0 implies the trailing fill is non-empty.
        min_fill = min_fill.min(fill_frames);
        max_fill = max_fill.max(fill_frames);
        out_seg_index.push(n_segs);
        out_seg_usable.push(fill_usable);

        let buf_elems = buf_frames.checked_mul(in_width).ok_or_else(|| {
            CacheError::InvalidConfig(format!(
                "frame cache of {} frames x {} values does not fit in memory",
                buf_frames, in_width
            ))
        })?;
        log::debug!(
            "created a randomized cache with {} output segments of between {} and {} frames ({} max), {} presentations per epoch",
            out_seg_usable.len(),
            min_fill,
            max_fill,
            buf_frames,
            total_usable
        );
        Ok(Self {
            src,
            win_len: w.win_len,
            top_margin: w.top_margin,
            lost_frames,
            in_width,
            out_width: w.win_len * in_width,
            buf_frames,
            seed: config.seed,
            order: config.order,
            out_seg_index,
            out_seg_usable,
            out_n_frames: total_usable,
            buf: vec![S::Elem::default(); buf_elems],
            frame_index: Vec::with_capacity(buf_frames),
            usable: 0,
            out_frameno: 0,
            out_segno: None,
            epoch: 0,
            seqgen: None,
        })
    }

    /// Elements per presentation (`win_len * source width`).
    #[inline]
    pub fn width(&self) -> usize {
        self.out_width
    }

    /// Number of **output** segments (buffer fills) per epoch.
    ///
    /// This is deliberately not the input segment count; see the module
    /// docs. It is stable across epochs and useful for progress reporting.
    #[inline]
    pub fn num_segs(&self) -> usize {
        self.out_seg_usable.len()
    }

    /// Presentations in output segment `seg`, or in the whole epoch for
    /// `None`. Out-of-range `seg` returns `None`.
    pub fn num_frames(&self, seg: Option<usize>) -> Option<usize> {
        match seg {
            None => Some(self.out_n_frames),
            Some(s) => self.out_seg_usable.get(s).copied(),
        }
    }

    /// Completed rewinds, starting at 0.
    #[inline]
    pub fn epoch(&self) -> u32 {
        self.epoch
    }

    /// Fill the buffer with the next output segment and build its draw
    /// order. Returns `Ok(None)` at the end of the epoch.
    pub fn next_seg(&mut self) -> Result<Option<usize>> {
        let next = match self.out_segno {
            None => 0,
            Some(s) => s + 1,
        };
        if next >= self.num_segs() {
            return Ok(None);
        }
        self.out_segno = Some(next);
        let first = self.out_seg_index[next];
        let end = self.out_seg_index[next + 1];
        self.src.set_pos(first, 0)?;

        // Read every input segment of this fill into the shared buffer,
        // capped by the remaining capacity, and record a back-reference for
        // each usable window start. A window never spans two input
        // segments: back-references stay within the frames read for one
        // segment, margins excluded.
        self.frame_index.clear();
        let w = self.in_width;
        let mut write = 0usize;
        for _seg in first..end {
            let mut count = 0usize;
            loop {
                let cap = self.buf_frames - write - count;
                if cap == 0 {
                    break;
                }
                let n = self
                    .src
                    .read(cap, &mut self.buf[(write + count) * w..(write + count + cap) * w])?;
                if n == 0 {
                    break;
                }
                count += n;
            }
            self.src.next_seg()?; // past any truncated tail, on to the next segment
            if count > self.lost_frames {
                let base = write + self.top_margin;
                for i in 0..count - self.lost_frames {
                    self.frame_index.push(base + i);
                }
            }
            write += count;
        }
        self.usable = self.frame_index.len();
        self.out_frameno = 0;
        self.seqgen = if self.usable == 0 {
            log::warn!(
                "output segment {} (input segments {}..{}) has no usable frames",
                next,
                first,
                end
            );
            None
        } else {
            let fill_seed = self
                .seed
                .wrapping_add(next as u32)
                .wrapping_add(EPOCH_SEED_STEP.wrapping_mul(self.epoch));
            Some(match self.order {
                Order::RandomNoReplace => {
                    Box::new(RandomNoReplace::new(self.usable as u32, fill_seed)?)
                        as Box<dyn SequenceGenerator>
                }
                Order::Sequential => Box::new(Sequential::new(self.usable as u32)?),
            })
        };
        log::debug!(
            "filled output segment {} from input segments {}..{}: {} usable of {} raw frames",
            next,
            first,
            end,
            self.usable,
            write
        );
        Ok(Some(next))
    }

    /// Read up to `count` presentations into `out`, densely packed.
    ///
    /// Returns fewer than `count` once every presentation of the current
    /// fill has been served exactly once; call [`next_seg`](Self::next_seg)
    /// to continue with the next fill.
    pub fn read(&mut self, count: usize, out: &mut [S::Elem]) -> Result<usize> {
        let stride = self.out_width;
        self.read_strided(count, out, stride)
    }

    /// Read up to `count` presentations, placing consecutive presentations
    /// `stride` elements apart in `out`.
    pub fn read_strided(
        &mut self,
        count: usize,
        out: &mut [S::Elem],
        stride: usize,
    ) -> Result<usize> {
        if self.out_segno.is_none() {
            return Err(CacheError::NoActiveSegment);
        }
        let mut n = 0;
        while self.out_frameno < self.usable && n < count {
            let Some(gen) = self.seqgen.as_mut() else {
                break;
            };
            let idx = gen.next() as usize;
            let start = self.frame_index[idx] * self.in_width;
            out[n * stride..n * stride + self.out_width]
                .copy_from_slice(&self.buf[start..start + self.out_width]);
            self.out_frameno += 1;
            n += 1;
        }
        Ok(n)
    }

    /// Start a new epoch: reset to before the first output segment and
    /// advance the permutation seed.
    ///
    /// The packing index is reused as-is; no length metadata is re-read.
    /// The same epoch number always replays the same presentation order.
    pub fn rewind(&mut self) -> Result<()> {
        self.epoch += 1;
        self.out_segno = None;
        self.out_frameno = 0;
        self.usable = 0;
        self.seqgen = None;
        log::debug!("rewound cache for epoch {}", self.epoch);
        Ok(())
    }

    /// Consume the cache and return the underlying source.
    pub fn into_inner(self) -> S {
        self.src
    }
}

impl<S: FrameSource> FrameSource for RandomizedEpochCache<S> {
    type Elem = S::Elem;

    fn width(&self) -> usize {
        self.out_width
    }

    fn num_segs(&self) -> Option<usize> {
        Some(RandomizedEpochCache::num_segs(self))
    }

    fn num_frames(&self, seg: Option<usize>) -> Option<usize> {
        RandomizedEpochCache::num_frames(self, seg)
    }

    fn next_seg(&mut self) -> Result<Option<usize>> {
        RandomizedEpochCache::next_seg(self)
    }

    fn read(&mut self, max_frames: usize, out: &mut [Self::Elem]) -> Result<usize> {
        RandomizedEpochCache::read(self, max_frames, out)
    }

    // set_pos keeps the Unsupported default: output segments are an
    // internal construct with no stable external addressing.

    fn rewind(&mut self) -> Result<()> {
        RandomizedEpochCache::rewind(self)
    }
}
