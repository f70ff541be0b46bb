//! Seeded stream of random strings used to drive accuracy experiments.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Characters random strings are drawn from
pub const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-";
/// Shortest generated string
pub const MIN_LEN: usize = 1;
/// Longest generated string
pub const MAX_LEN: usize = 30;

/// Reproducible sequence of random strings.
///
/// Strings may repeat, so the number of distinct values in a prefix is at most
/// its length.
pub struct RandomStream {
    rng: StdRng,
    data: Vec<String>,
}

impl RandomStream {
    pub fn new(seed: u64, size: usize) -> Self {
        let mut stream = Self {
            rng: StdRng::seed_from_u64(seed),
            data: Vec::new(),
        };
        stream.regenerate(size);
        stream
    }

    /// Replace stream contents with `size` new strings, continuing the same RNG
    pub fn regenerate(&mut self, size: usize) {
        self.data.clear();
        self.data.reserve(size);
        for _ in 0..size {
            let value = self.random_string();
            self.data.push(value);
        }
    }

    fn random_string(&mut self) -> String {
        let len = self.rng.gen_range(MIN_LEN..=MAX_LEN);
        (0..len)
            .map(|_| char::from(ALPHABET[self.rng.gen_range(0..ALPHABET.len())]))
            .collect()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// First `count` strings, clamped to stream length
    pub fn prefix(&self, count: usize) -> &[String] {
        &self.data[..count.min(self.data.len())]
    }

    /// Prefix length covering `percent` of the stream, `percent` capped at 100
    pub fn prefix_size_by_percent(&self, percent: usize) -> usize {
        self.data.len() * percent.min(100) / 100
    }

    /// Prefix lengths at `0, step, 2 * step, ...` percent, always ending with the
    /// full stream length and without consecutive duplicates.
    pub fn prefix_sizes_by_step_percent(&self, step: usize) -> Vec<usize> {
        if step == 0 {
            return Vec::new();
        }

        let mut sizes: Vec<usize> = (0..=100)
            .step_by(step)
            .map(|percent| self.prefix_size_by_percent(percent))
            .collect();
        if sizes.last() != Some(&self.data.len()) {
            sizes.push(self.data.len());
        }
        sizes.dedup();
        sizes
    }
}
