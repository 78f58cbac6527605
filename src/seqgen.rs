//! Index sequence generators.
//!
//! Sequence generators return numbers in `[0, max)` and are used to pick the
//! order in which presentations are drawn from a filled cache buffer. They
//! hold O(1) state - no permutation array is ever materialized - so the cache
//! can randomize fills of millions of frames without extra memory. The
//! generators have no notion of exhaustion: they cycle forever, and the
//! caller counts how many values it has consumed.
//!
//! Three orderings are provided:
//!
//! - [`Sequential`] - `0, 1, ..., max-1, 0, 1, ...`
//! - [`RandomNoReplace`] - every value in `[0, max)` exactly once per cycle,
//!   via a maximal-length linear feedback shift register
//! - [`RandomWithReplace`] - independent draws from a seeded 48-bit LCG,
//!   repeats allowed

use crate::error::{CacheError, Result};

/// A generator of index sequences over a fixed range.
pub trait SequenceGenerator {
    /// Return the next value in the sequence.
    fn next(&mut self) -> u32;
}

// ============================================================================
// Sequential
// ============================================================================

/// Deterministic sequential order, wrapping at `max`.
#[derive(Debug, Clone)]
pub struct Sequential {
    /// One more than the largest value produced.
    maximum: u32,
    /// The next value to return.
    nextval: u32,
}

impl Sequential {
    /// Create a generator covering `0..max`.
    ///
    /// Fails with [`CacheError::EmptyRange`] if `max` is zero.
    pub fn new(max: u32) -> Result<Self> {
        if max == 0 {
            return Err(CacheError::EmptyRange);
        }
        Ok(Self {
            maximum: max,
            nextval: 0,
        })
    }
}

impl SequenceGenerator for Sequential {
    fn next(&mut self) -> u32 {
        let ret = self.nextval;
        self.nextval += 1;
        if self.nextval >= self.maximum {
            self.nextval = 0;
        }
        ret
    }
}

// ============================================================================
// RandomNoReplace
// ============================================================================

// Tap constants for maximal-length Galois LFSRs, indexed by register width.
// A register of width w cycles through all values in [1, 2^w) before
// repeating. Classic table; see Graphics Gems I, "A Digital Dissolve
// Effect", p. 224.
const XOR_TABLE: [u32; 32] = [
    0x1, 0x1, 0x3, 0x6, 0xc, //
    0x14, 0x30, 0x60, 0xb8, 0x110, //
    0x240, 0x500, 0xca0, 0x1b00, 0x3500, //
    0x6000, 0xb400, 0x12000, 0x20400, 0x72000, //
    0x90000, 0x140000, 0x300000, 0x420000, 0xd80000, //
    0x1200000, 0x3880000, 0x7200000, 0x9000000, 0x14000000, //
    0x32800000, 0x48000000,
];

/// Log base 2 of `val`, rounded up to the nearest integer.
#[inline]
fn log2_ceil(val: u32) -> u32 {
    if val <= 1 {
        0
    } else {
        32 - (val - 1).leading_zeros()
    }
}

/// Randomized order covering every value in `[0, max)` exactly once per
/// cycle, with O(1) state.
///
/// Implemented as a maximal-length LFSR sized to the next power of two at
/// least `max + 1`; register values above `max` are drawn and discarded.
/// After `max` calls the full set `{0, ..., max-1}` has been produced and
/// the same cycle repeats in the same order. The seed selects the starting
/// point within the cycle - any seed value (zero included) is mapped into
/// the register's valid range.
#[derive(Debug, Clone)]
pub struct RandomNoReplace {
    /// One more than the next value we will return.
    nextval: u32,
    /// The number of distinct values produced per cycle.
    max: u32,
    /// Feedback taps for the register width covering `max + 1`.
    xor_val: u32,
    /// Cycle length of the underlying register, bounding discard retries.
    period: u64,
}

impl RandomNoReplace {
    /// Create a generator covering `0..max`, seeded with `seed`.
    ///
    /// `max` must be in `1..=0x7fff_ffff`.
    pub fn new(max: u32, seed: u32) -> Result<Self> {
        if max == 0 {
            return Err(CacheError::EmptyRange);
        }
        if max > 0x7fff_ffff {
            return Err(CacheError::InvalidConfig(format!(
                "no-replace range {} exceeds the register table",
                max
            )));
        }
        let width = log2_ceil(max + 1);
        Ok(Self {
            nextval: seed % max + 1,
            max,
            xor_val: XOR_TABLE[width as usize],
            period: (1u64 << width) - 1,
        })
    }
}

impl SequenceGenerator for RandomNoReplace {
    fn next(&mut self) -> u32 {
        let curval = self.nextval;
        let mut retries = 0u64;
        loop {
            self.nextval = if self.nextval & 1 != 0 {
                (self.nextval >> 1) ^ self.xor_val
            } else {
                self.nextval >> 1
            };
            if self.nextval >= 1 && self.nextval <= self.max {
                break;
            }
            // A maximal-length register revisits [1, max] well within one
            // period; the cap keeps a corrupt state from spinning forever.
            retries += 1;
            if retries >= self.period {
                self.nextval = 1;
                break;
            }
        }
        curval - 1
    }
}

// ============================================================================
// RandomWithReplace
// ============================================================================

/// Randomized order with replacement, from a seeded 48-bit LCG.
///
/// The underlying generator steps the same recurrence as `nrand48(3)`, so a
/// given seed reproduces the exact historical draw sequence. The first value
/// returned is `seed % max`, which makes single-draw behavior a
/// deterministic function of the seed - convenient for tests.
#[derive(Debug, Clone)]
pub struct RandomWithReplace {
    /// The range of values produced.
    maximum: u32,
    /// The raw value the next call will reduce modulo `maximum`.
    val: u32,
    /// 48-bit LCG state.
    state: u64,
}

impl RandomWithReplace {
    const LCG_MUL: u64 = 0x5DEE_CE66D;
    const LCG_ADD: u64 = 0xB;
    const LCG_MASK: u64 = (1 << 48) - 1;

    /// Create a generator drawing from `0..max`, seeded with `seed`.
    ///
    /// `max` must be in `1..0x7fff_ffff` (the LCG yields 31-bit values).
    pub fn new(max: u32, seed: u32) -> Result<Self> {
        if max == 0 {
            return Err(CacheError::EmptyRange);
        }
        if max >= 0x7fff_ffff {
            return Err(CacheError::InvalidConfig(format!(
                "with-replace range {} exceeds the generator's 31-bit output",
                max
            )));
        }
        Ok(Self {
            maximum: max,
            val: seed,
            state: ((seed as u64) << 16) | 0x330e,
        })
    }
}

impl SequenceGenerator for RandomWithReplace {
    fn next(&mut self) -> u32 {
        let ret = self.val % self.maximum;
        self.state = self
            .state
            .wrapping_mul(Self::LCG_MUL)
            .wrapping_add(Self::LCG_ADD)
            & Self::LCG_MASK;
        self.val = (self.state >> 17) as u32;
        ret
    }
}
