//! Behavioral tests for the streaming sequential window.
//!
//! A naive reference implementation computes every expected window up
//! front; the streaming component must reproduce it regardless of bunch
//! size or how the caller chops its reads.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use window_cache::{MemorySource, SeqWindowConfig, SequentialWindow, WindowSpec};

/// All windows of one segment, computed the obvious way.
fn reference_windows<T: Copy>(frames: &[T], width: usize, spec: WindowSpec) -> Vec<Vec<T>> {
    let len = frames.len() / width;
    let mut out = Vec::new();
    let mut start = spec.top_margin;
    while start + spec.win_len + spec.bot_margin <= len {
        out.push(frames[start * width..(start + spec.win_len) * width].to_vec());
        start += 1;
    }
    out
}

fn tagged_source(width: usize, seg_lens: &[usize]) -> MemorySource<u32> {
    let _ = env_logger::builder().is_test(true).try_init();
    MemorySource::from_fn(width, seg_lens, |s, f, e| (s * 10_000 + f * 10 + e) as u32).unwrap()
}

/// Drive the window over all segments with rng-sized reads and compare
/// against the reference, segment by segment.
fn check_against_reference(
    width: usize,
    seg_lens: &[usize],
    config: SeqWindowConfig,
    rng: &mut StdRng,
) {
    let src = tagged_source(width, seg_lens);
    let spec = config.window;
    let expected: Vec<Vec<Vec<u32>>> = (0..seg_lens.len())
        .map(|s| {
            let frames: Vec<u32> = (0..seg_lens[s] * width)
                .map(|i| (s * 10_000 + (i / width) * 10 + i % width) as u32)
                .collect();
            reference_windows(&frames, width, spec)
        })
        .collect();

    let mut win = SequentialWindow::new(src, config).unwrap();
    let ow = win.width();
    assert_eq!(ow, width * spec.win_len);

    let mut seg = 0;
    while let Some(s) = win.next_seg().unwrap() {
        assert_eq!(s, seg);
        let mut got = Vec::new();
        loop {
            let chunk = rng.gen_range(1..=6);
            let mut out = vec![0u32; chunk * ow];
            let n = win.read(chunk, &mut out).unwrap();
            for w in out[..n * ow].chunks(ow) {
                got.push(w.to_vec());
            }
            if n < chunk {
                break;
            }
        }
        assert_eq!(got, expected[seg], "segment {} window stream", seg);
        seg += 1;
    }
    assert_eq!(seg, seg_lens.len());
}

#[test]
fn test_matches_reference_windows() {
    let mut rng = StdRng::seed_from_u64(21);
    let spec = WindowSpec::new(4).with_margins(2, 1);
    check_against_reference(2, &[15, 9, 7, 30], SeqWindowConfig::new(spec), &mut rng);
}

#[test]
fn test_matches_reference_with_tiny_bunch() {
    // A bunch equal to the window span forces a compaction on almost
    // every read; the output must not change.
    let mut rng = StdRng::seed_from_u64(22);
    let spec = WindowSpec::new(5).with_margins(1, 2);
    let config = SeqWindowConfig::new(spec).with_bunch_frames(spec.min_seg_frames());
    check_against_reference(1, &[25, 8, 40, 12], config, &mut rng);
}

#[test]
fn test_short_segments_yield_nothing() {
    let spec = WindowSpec::new(3).with_margins(1, 1);
    let mut win =
        SequentialWindow::new(tagged_source(1, &[2, 5, 4]), SeqWindowConfig::new(spec)).unwrap();

    assert_eq!(win.next_seg().unwrap(), Some(0));
    let mut out = vec![0u32; 3 * 4];
    assert_eq!(win.read(4, &mut out).unwrap(), 0);

    // The next segment is long enough for exactly one window.
    assert_eq!(win.next_seg().unwrap(), Some(1));
    assert_eq!(win.read(4, &mut out).unwrap(), 1);
    assert_eq!(&out[..3], &[10_010, 10_020, 10_030]);

    assert_eq!(win.next_seg().unwrap(), Some(2));
    assert_eq!(win.read(4, &mut out).unwrap(), 0);
    assert_eq!(win.next_seg().unwrap(), None);
}

#[test]
fn test_rewind_replays_identically() {
    let spec = WindowSpec::new(3).with_margins(0, 0);
    let mut win =
        SequentialWindow::new(tagged_source(1, &[8, 6]), SeqWindowConfig::new(spec)).unwrap();

    let drain = |w: &mut SequentialWindow<MemorySource<u32>>| {
        let mut all = Vec::new();
        while w.next_seg().unwrap().is_some() {
            let mut out = vec![0u32; 3 * 10];
            let n = w.read(10, &mut out).unwrap();
            all.extend_from_slice(&out[..n * 3]);
        }
        all
    };

    let first = drain(&mut win);
    assert_eq!(first.len(), (6 + 4) * 3);
    win.rewind().unwrap();
    assert_eq!(drain(&mut win), first);
}

#[test]
fn test_float_features() {
    let src =
        MemorySource::from_fn(2, &[6], |_, f, e| f as f32 + e as f32 / 10.0).unwrap();
    let spec = WindowSpec::new(2).with_margins(1, 1);
    let mut win = SequentialWindow::new(src, SeqWindowConfig::new(spec)).unwrap();

    win.next_seg().unwrap();
    let mut out = vec![0.0f32; 4 * 4];
    let n = win.read(4, &mut out).unwrap();
    assert_eq!(n, 3);
    assert_eq!(&out[..4], &[1.0, 1.1, 2.0, 2.1]);
    assert_eq!(&out[4..8], &[2.0, 2.1, 3.0, 3.1]);
}

#[test]
fn test_strided_reads_leave_gaps_untouched() {
    let spec = WindowSpec::new(2).with_margins(0, 0);
    let mut win =
        SequentialWindow::new(tagged_source(1, &[5]), SeqWindowConfig::new(spec)).unwrap();
    win.next_seg().unwrap();

    let stride = 3;
    let mut out = vec![u32::MAX; 4 * stride];
    let n = win.read_strided(4, &mut out, stride).unwrap();
    assert_eq!(n, 4);
    for k in 0..n {
        assert_ne!(out[k * stride], u32::MAX);
        assert_ne!(out[k * stride + 1], u32::MAX);
        assert_eq!(out[k * stride + 2], u32::MAX, "gap at window {} clobbered", k);
    }
}
