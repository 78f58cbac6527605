//! The frame-source abstraction and an in-memory implementation.
//!
//! A [`FrameSource`] is a segment-structured stream of fixed-width frames:
//! an utterance's feature vectors (`f32`) or its per-frame labels (`u32`).
//! The windowing components consume a source through this trait and also
//! implement it themselves, so windows can be stacked or handed straight to
//! a training loop behind one interface.
//!
//! Capabilities are graded: every source can be scanned segment by segment,
//! but segment counts, per-segment lengths, seeking, and rewinding are
//! optional. Components that need a capability probe for it and fail their
//! own construction if it is missing, rather than failing later mid-read.

use crate::error::{CacheError, Result};

/// A segment-structured stream of fixed-width frames.
///
/// `Elem` is the per-value element type; a frame is `width()` consecutive
/// elements, and a read of `n` frames fills `n * width()` elements.
pub trait FrameSource {
    /// Per-value element type (`f32` for features, `u32` for labels).
    type Elem: Copy + Default;

    /// Number of elements in one frame.
    fn width(&self) -> usize;

    /// Total number of segments, if known.
    fn num_segs(&self) -> Option<usize> {
        None
    }

    /// Number of frames in segment `seg`, or in the whole stream for
    /// `None`. Returns `None` when unknown (streaming sources) or when
    /// `seg` is out of range.
    fn num_frames(&self, seg: Option<usize>) -> Option<usize> {
        let _ = seg;
        None
    }

    /// Advance to the next segment. Returns `Ok(None)` at end of stream.
    fn next_seg(&mut self) -> Result<Option<usize>>;

    /// Read up to `max_frames` frames of the current segment into `out`,
    /// returning the number of frames actually read. Zero signals the end
    /// of the current segment. `out` must hold at least
    /// `max_frames * width()` elements.
    fn read(&mut self, max_frames: usize, out: &mut [Self::Elem]) -> Result<usize>;

    /// Position the read cursor at `frame` within segment `seg`.
    fn set_pos(&mut self, seg: usize, frame: usize) -> Result<()> {
        let _ = (seg, frame);
        Err(CacheError::Unsupported("set_pos"))
    }

    /// Reset to before the first segment.
    fn rewind(&mut self) -> Result<()> {
        Err(CacheError::Unsupported("rewind"))
    }
}

/// A fully random-access [`FrameSource`] over data held in memory.
///
/// Each segment is a flat `Vec` of `len * width` elements. Useful for
/// consumers that already hold their corpus in RAM, and as the ground-truth
/// source in tests.
#[derive(Debug, Clone)]
pub struct MemorySource<T> {
    width: usize,
    segs: Vec<Vec<T>>,
    /// Read cursor as (segment, frame); `None` = before the first segment.
    pos: Option<(usize, usize)>,
}

impl<T: Copy + Default> MemorySource<T> {
    /// Create a source over `segs`, each a flat buffer of `width`-element
    /// frames.
    pub fn new(width: usize, segs: Vec<Vec<T>>) -> Result<Self> {
        if width == 0 {
            return Err(CacheError::InvalidConfig(
                "frame width must be non-zero".to_string(),
            ));
        }
        for (i, seg) in segs.iter().enumerate() {
            if seg.len() % width != 0 {
                return Err(CacheError::InvalidConfig(format!(
                    "segment {} holds {} elements, not a multiple of width {}",
                    i,
                    seg.len(),
                    width
                )));
            }
        }
        Ok(Self {
            width,
            segs,
            pos: None,
        })
    }

    /// Build a source from per-segment frame counts, synthesizing element
    /// values with `f(seg, frame, elem)`. Handy for constructing tagged
    /// test data where every element identifies its origin.
    pub fn from_fn(
        width: usize,
        seg_lens: &[usize],
        mut f: impl FnMut(usize, usize, usize) -> T,
    ) -> Result<Self> {
        let segs = seg_lens
            .iter()
            .enumerate()
            .map(|(s, &len)| {
                let mut seg = Vec::with_capacity(len * width);
                for frame in 0..len {
                    for elem in 0..width {
                        seg.push(f(s, frame, elem));
                    }
                }
                seg
            })
            .collect();
        Self::new(width, segs)
    }
}

impl<T: Copy + Default> FrameSource for MemorySource<T> {
    type Elem = T;

    fn width(&self) -> usize {
        self.width
    }

    fn num_segs(&self) -> Option<usize> {
        Some(self.segs.len())
    }

    fn num_frames(&self, seg: Option<usize>) -> Option<usize> {
        match seg {
            None => Some(self.segs.iter().map(|s| s.len() / self.width).sum()),
            Some(s) => self.segs.get(s).map(|seg| seg.len() / self.width),
        }
    }

    fn next_seg(&mut self) -> Result<Option<usize>> {
        let next = match self.pos {
            None => 0,
            Some((seg, _)) => seg + 1,
        };
        if next >= self.segs.len() {
            return Ok(None);
        }
        self.pos = Some((next, 0));
        Ok(Some(next))
    }

    fn read(&mut self, max_frames: usize, out: &mut [T]) -> Result<usize> {
        let (seg, frame) = self.pos.ok_or(CacheError::NoActiveSegment)?;
        let Some(data) = self.segs.get(seg) else {
            return Ok(0);
        };
        let avail = data.len() / self.width - frame;
        let n = max_frames.min(avail);
        let start = frame * self.width;
        out[..n * self.width].copy_from_slice(&data[start..start + n * self.width]);
        self.pos = Some((seg, frame + n));
        Ok(n)
    }

    fn set_pos(&mut self, seg: usize, frame: usize) -> Result<()> {
        let frames = self
            .segs
            .get(seg)
            .map(|s| s.len() / self.width)
            .ok_or_else(|| CacheError::Source(format!("seek to nonexistent segment {}", seg)))?;
        if frame > frames {
            return Err(CacheError::Source(format!(
                "seek to frame {} past end of segment {} ({} frames)",
                frame, seg, frames
            )));
        }
        self.pos = Some((seg, frame));
        Ok(())
    }

    fn rewind(&mut self) -> Result<()> {
        self.pos = None;
        Ok(())
    }
}
