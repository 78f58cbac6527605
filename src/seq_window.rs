//! Strictly sequential context windowing.
//!
//! [`SequentialWindow`] transforms a segment-structured frame source into
//! windowed presentations in data order: one output segment per input
//! segment, each presentation the concatenation of `win_len` consecutive raw
//! frames. It buffers only one I/O bunch plus one window span, so it suits
//! validation and held-out passes where randomization is unwanted and the
//! input may be too large (or too unknown) to index up front.
//!
//! Segment lengths do not have to be known in advance: the window discovers
//! the end of each segment when a refill read returns zero frames. The cost
//! of that generality is the loss of random access - `num_segs`,
//! `num_frames`, and `set_pos` all report unknown/unsupported here, and
//! callers that need them must ask the underlying source.
//!
//! # Example
//!
//! ```ignore
//! let mut win = SequentialWindow::new(source, SeqWindowConfig::new(
//!     WindowSpec::new(9).with_margins(4, 4),
//! ))?;
//! while win.next_seg()?.is_some() {
//!     loop {
//!         let n = win.read(bunch, &mut out)?;
//!         // feed n windows to the model
//!         if n < bunch { break; }
//!     }
//! }
//! ```

use crate::config::SeqWindowConfig;
use crate::error::{CacheError, Result};
use crate::source::FrameSource;

/// A windowing transform that scans its source strictly in order.
///
/// Memory use is fixed at construction: one sliding buffer of
/// `bunch_frames + win_len + bot_margin - 1` frames.
///
/// Not thread-safe; every instance owns its buffer and source cursor.
pub struct SequentialWindow<S: FrameSource> {
    src: S,
    win_len: usize,
    top_margin: usize,
    bot_margin: usize,
    in_width: usize,
    out_width: usize,
    bunch_frames: usize,

    /// Sliding buffer of raw frames.
    buf: Vec<S::Elem>,
    /// Frames currently valid in `buf`.
    buf_lines: usize,
    /// Frame the next window starts at.
    cur_line: usize,
    /// Current segment number; `None` = before the first segment.
    segno: Option<usize>,
}

impl<S: FrameSource> SequentialWindow<S> {
    /// Wrap `src` with the window geometry in `config`.
    pub fn new(src: S, config: SeqWindowConfig) -> Result<Self> {
        config.validate().map_err(CacheError::InvalidConfig)?;
        let in_width = src.width();
        if in_width == 0 {
            return Err(CacheError::InvalidConfig(
                "source frame width must be non-zero".to_string(),
            ));
        }
        let w = config.window;
        let bunch_frames = config.effective_bunch();
        // Room for one bunch plus the partial window carried across refills.
        let max_buf_lines = bunch_frames + w.win_len + w.bot_margin - 1;
        log::debug!(
            "sequential window: {}x{} values, top margin {} frames, bottom margin {} frames, buffer {} frames",
            w.win_len,
            in_width,
            w.top_margin,
            w.bot_margin,
            max_buf_lines
        );
        Ok(Self {
            src,
            win_len: w.win_len,
            top_margin: w.top_margin,
            bot_margin: w.bot_margin,
            in_width,
            out_width: w.win_len * in_width,
            bunch_frames,
            buf: vec![S::Elem::default(); max_buf_lines * in_width],
            buf_lines: 0,
            cur_line: 0,
            segno: None,
        })
    }

    /// Elements per windowed output frame (`win_len * source width`).
    #[inline]
    pub fn width(&self) -> usize {
        self.out_width
    }

    /// Advance to the next input segment and prime the sliding buffer.
    ///
    /// Returns `Ok(None)` at the end of the source. Must be called before
    /// the first `read` and again after every segment is exhausted.
    pub fn next_seg(&mut self) -> Result<Option<usize>> {
        let Some(id) = self.src.next_seg()? else {
            return Ok(None);
        };
        self.buf_lines = self
            .src
            .read(self.bunch_frames, &mut self.buf[..self.bunch_frames * self.in_width])?;
        self.cur_line = self.top_margin;
        self.segno = Some(self.segno.map_or(0, |s| s + 1));
        if self.buf_lines < self.top_margin + self.win_len + self.bot_margin {
            log::debug!(
                "segment {}: primed only {} frames, below the {}-frame window span - may yield no windows",
                id,
                self.buf_lines,
                self.top_margin + self.win_len + self.bot_margin
            );
        } else {
            log::debug!("moved on to segment {}", id);
        }
        Ok(Some(id))
    }

    /// Read up to `count` windowed frames into `out`, densely packed.
    ///
    /// Returns fewer than `count` when the current segment runs out of
    /// windowable frames; call [`next_seg`](Self::next_seg) to continue.
    pub fn read(&mut self, count: usize, out: &mut [S::Elem]) -> Result<usize> {
        let stride = self.out_width;
        self.read_strided(count, out, stride)
    }

    /// Read up to `count` windowed frames, placing consecutive windows
    /// `stride` elements apart in `out`.
    ///
    /// A stride larger than the output width lets several synchronized
    /// windows interleave into one bunch matrix.
    pub fn read_strided(
        &mut self,
        count: usize,
        out: &mut [S::Elem],
        stride: usize,
    ) -> Result<usize> {
        if self.segno.is_none() {
            return Err(CacheError::NoActiveSegment);
        }
        let w = self.in_width;
        let mut frame = 0;
        while frame < count {
            // Refill whenever fewer than win_len + bot_margin frames remain
            // ahead of the cursor: move the unconsumed tail to the front and
            // read another bunch behind it.
            while self.cur_line + self.win_len + self.bot_margin > self.buf_lines {
                let avail = self.buf_lines.saturating_sub(self.cur_line);
                self.buf
                    .copy_within(self.cur_line * w..(self.cur_line + avail) * w, 0);
                self.cur_line = 0;
                self.buf_lines = avail;
                let refill = self.src.read(
                    self.bunch_frames,
                    &mut self.buf[avail * w..(avail + self.bunch_frames) * w],
                )?;
                if refill == 0 {
                    log::debug!(
                        "segment exhausted after {} of {} requested windows",
                        frame,
                        count
                    );
                    return Ok(frame);
                }
                self.buf_lines = avail + refill;
            }
            let start = self.cur_line * w;
            let dst = frame * stride;
            out[dst..dst + self.out_width]
                .copy_from_slice(&self.buf[start..start + self.out_width]);
            self.cur_line += 1;
            frame += 1;
        }
        Ok(frame)
    }

    /// Rewind to before the first segment.
    ///
    /// Only valid when the underlying source supports restart; the caller
    /// must invoke [`next_seg`](Self::next_seg) again before reading.
    pub fn rewind(&mut self) -> Result<()> {
        self.src.rewind()?;
        self.segno = None;
        self.buf_lines = 0;
        self.cur_line = 0;
        Ok(())
    }

    /// Consume the window and return the underlying source.
    pub fn into_inner(self) -> S {
        self.src
    }
}

impl<S: FrameSource> FrameSource for SequentialWindow<S> {
    type Elem = S::Elem;

    fn width(&self) -> usize {
        self.out_width
    }

    // num_segs, num_frames, and set_pos keep the trait defaults: a purely
    // sequential transform cannot answer them, and callers must query the
    // underlying source instead.

    fn next_seg(&mut self) -> Result<Option<usize>> {
        SequentialWindow::next_seg(self)
    }

    fn read(&mut self, max_frames: usize, out: &mut [Self::Elem]) -> Result<usize> {
        SequentialWindow::read(self, max_frames, out)
    }

    fn rewind(&mut self) -> Result<()> {
        SequentialWindow::rewind(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WindowSpec;
    use crate::source::MemorySource;

    fn tagged_source(seg_lens: &[usize], width: usize) -> MemorySource<u32> {
        // Element value encodes (segment, frame, element) for provenance
        // checks on every emitted window.
        MemorySource::from_fn(width, seg_lens, |s, f, e| {
            (s * 10_000 + f * 10 + e) as u32
        })
        .unwrap()
    }

    #[test]
    fn test_basic_windowing() {
        let src = tagged_source(&[6], 1);
        let spec = WindowSpec::new(3).with_margins(1, 1);
        let mut win = SequentialWindow::new(src, SeqWindowConfig::new(spec)).unwrap();
        assert_eq!(win.width(), 3);

        assert_eq!(win.next_seg().unwrap(), Some(0));
        let mut out = vec![0u32; 3 * 4];
        // 6 frames, 4 lost to margins and window span: 2 windows.
        let n = win.read(4, &mut out).unwrap();
        assert_eq!(n, 2);
        // First window starts at the top margin (frame 1).
        assert_eq!(&out[..3], &[10, 20, 30]);
        assert_eq!(&out[3..6], &[20, 30, 40]);
        assert_eq!(win.next_seg().unwrap(), None);
    }

    #[test]
    fn test_read_before_first_segment_fails() {
        let src = tagged_source(&[6], 1);
        let spec = WindowSpec::new(3).with_margins(1, 1);
        let mut win = SequentialWindow::new(src, SeqWindowConfig::new(spec)).unwrap();
        let mut out = vec![0u32; 3];
        assert_eq!(
            win.read(1, &mut out).unwrap_err(),
            CacheError::NoActiveSegment
        );
    }

    #[test]
    fn test_short_segment_yields_no_windows() {
        let src = tagged_source(&[4, 6], 1);
        let spec = WindowSpec::new(3).with_margins(1, 1);
        let mut win = SequentialWindow::new(src, SeqWindowConfig::new(spec)).unwrap();

        assert_eq!(win.next_seg().unwrap(), Some(0));
        let mut out = vec![0u32; 3 * 4];
        assert_eq!(win.read(4, &mut out).unwrap(), 0);

        // The next segment is unaffected.
        assert_eq!(win.next_seg().unwrap(), Some(1));
        assert_eq!(win.read(4, &mut out).unwrap(), 2);
    }

    #[test]
    fn test_small_bunch_compaction() {
        // Bunch equal to the window span forces a compact-and-refill on
        // nearly every window.
        let src = tagged_source(&[40], 2);
        let spec = WindowSpec::new(5).with_margins(2, 2);
        let mut win = SequentialWindow::new(src, SeqWindowConfig::new(spec)).unwrap();

        win.next_seg().unwrap();
        let usable = 40 - spec.lost_frames();
        let mut out = vec![0u32; usable * win.width()];
        let mut total = 0;
        loop {
            let n = win
                .read(3, &mut out[total * 10..(total + 3).min(usable) * 10])
                .unwrap();
            total += n;
            if n < 3 {
                break;
            }
        }
        assert_eq!(total, usable);
        // Window k covers frames k+2 .. k+7; spot-check provenance of both
        // elements of the first frame of the last window.
        let last = &out[(usable - 1) * 10..];
        assert_eq!(last[0], ((usable - 1 + 2) * 10) as u32);
        assert_eq!(last[1], ((usable - 1 + 2) * 10 + 1) as u32);
    }

    #[test]
    fn test_rewind_replays_identically() {
        let src = tagged_source(&[8, 7], 1);
        let spec = WindowSpec::new(3).with_margins(1, 1);
        let mut win = SequentialWindow::new(src, SeqWindowConfig::new(spec)).unwrap();

        let mut first = Vec::new();
        while win.next_seg().unwrap().is_some() {
            let mut out = vec![0u32; 3 * 16];
            let n = win.read(16, &mut out).unwrap();
            first.extend_from_slice(&out[..n * 3]);
        }

        win.rewind().unwrap();
        let mut second = Vec::new();
        while win.next_seg().unwrap().is_some() {
            let mut out = vec![0u32; 3 * 16];
            let n = win.read(16, &mut out).unwrap();
            second.extend_from_slice(&out[..n * 3]);
        }
        assert_eq!(first, second);
    }

    #[test]
    fn test_strided_read_leaves_gaps_untouched() {
        let src = tagged_source(&[7], 1);
        let spec = WindowSpec::new(3).with_margins(1, 1);
        let mut win = SequentialWindow::new(src, SeqWindowConfig::new(spec)).unwrap();
        win.next_seg().unwrap();

        let stride = 5; // two sentinel elements between windows
        let mut out = vec![u32::MAX; 3 * stride];
        let n = win.read_strided(3, &mut out, stride).unwrap();
        assert_eq!(n, 3);
        for k in 0..3 {
            assert_eq!(
                &out[k * stride..k * stride + 3],
                &[
                    ((k + 1) * 10) as u32,
                    ((k + 2) * 10) as u32,
                    ((k + 3) * 10) as u32
                ]
            );
            assert_eq!(&out[k * stride + 3..(k + 1) * stride], &[u32::MAX; 2]);
        }
    }

    #[test]
    fn test_capability_probes() {
        let src = tagged_source(&[6], 1);
        let spec = WindowSpec::new(3).with_margins(1, 1);
        let mut win = SequentialWindow::new(src, SeqWindowConfig::new(spec)).unwrap();
        assert_eq!(FrameSource::num_segs(&win), None);
        assert_eq!(FrameSource::num_frames(&win, None), None);
        assert_eq!(
            win.set_pos(0, 0).unwrap_err(),
            CacheError::Unsupported("set_pos")
        );
    }
}
