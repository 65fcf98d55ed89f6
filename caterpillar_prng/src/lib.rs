// Seedable pseudo-random number generator for the caterpillar cage.
//
// xoshiro256++ (Blackman & Vigna, 2019) with SplitMix64 seed expansion. The
// generator is small and dependency-free so that a seed recorded in a test
// reproduces the exact same leaf selection on every platform.
//
// The only consumer today is the route planner in `caterpillar_sim`, which
// draws one `range_usize_inclusive` per Fisher–Yates swap through `shuffle`.
// Production code seeds from OS entropy (see `RoutePlanner::from_entropy`);
// tests seed with a constant.
//
// **Critical constraint: determinism.** For a given seed, every method must
// return the same sequence regardless of platform or optimization level. No
// floating point in the core generator.

use serde::{Deserialize, Serialize};

/// Xoshiro256++ generator.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameRng {
    s: [u64; 4],
}

impl GameRng {
    /// Create a generator from a `u64` seed, expanded to 256 bits with
    /// SplitMix64.
    pub fn new(seed: u64) -> Self {
        let mut sm = seed;
        Self {
            s: [
                splitmix64(&mut sm),
                splitmix64(&mut sm),
                splitmix64(&mut sm),
                splitmix64(&mut sm),
            ],
        }
    }

    pub fn next_u64(&mut self) -> u64 {
        let result = (self.s[0].wrapping_add(self.s[3]))
            .rotate_left(23)
            .wrapping_add(self.s[0]);

        let t = self.s[1] << 17;

        self.s[2] ^= self.s[0];
        self.s[3] ^= self.s[1];
        self.s[1] ^= self.s[2];
        self.s[0] ^= self.s[3];

        self.s[2] ^= t;
        self.s[3] = self.s[3].rotate_left(45);

        result
    }

    /// Uniform integer in `[low, high)`, rejection-sampled so small ranges
    /// carry no modulo bias.
    ///
    /// Panics if `low >= high`.
    pub fn range_u64(&mut self, low: u64, high: u64) -> u64 {
        assert!(low < high, "range_u64: low must be less than high");
        let span = high - low;
        if span.is_power_of_two() {
            return low + (self.next_u64() & (span - 1));
        }
        let threshold = span.wrapping_neg() % span;
        loop {
            let r = self.next_u64();
            if r >= threshold {
                return low + (r % span);
            }
        }
    }

    /// Uniform `usize` in `[low, high]`, both ends inclusive.
    ///
    /// Panics if `low > high`.
    pub fn range_usize_inclusive(&mut self, low: usize, high: usize) -> usize {
        assert!(low <= high, "range_usize_inclusive: low must be <= high");
        self.range_u64(low as u64, high as u64 + 1) as usize
    }

    /// Unbiased in-place Fisher–Yates shuffle.
    ///
    /// Walks from the last index down to 1 and swaps each slot with a
    /// uniformly chosen index in `[0, i]`. Exactly `len - 1` draws are made,
    /// so two generators with the same seed produce the same permutation of
    /// equal-length slices.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.range_usize_inclusive(0, i);
            items.swap(i, j);
        }
    }
}

/// SplitMix64 step, used only to expand the seed.
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}
