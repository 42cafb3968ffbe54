//! Unbiased draws in `[0, r)` from a raw 32-bit stream
//!
//! Plain `v % r` favours small results whenever `r` does not divide 2^32.
//! Raw values at or above `limit = 2^32 - (2^32 mod r)` are discarded, so
//! every accepted value maps onto `[0, r)` with exactly equal mass.

use super::entropy::{EntropySource, FallbackChain, OsEntropy, RemoteEntropy, SeededEntropy};
use crate::config::RandomConfig;
use crate::errors::RandomError;
use crate::games::pocket::{Pocket, POCKET_COUNT};
use std::collections::VecDeque;
use std::time::Duration;

const RAW_SPAN: u64 = 1 << 32;

/// First raw value rejected for `range`
pub fn rejection_limit(range: u32) -> u64 {
    RAW_SPAN - RAW_SPAN % range as u64
}

/// Owned random source. There is no process-wide default: every consumer is
/// handed its own instance (or a shared handle to one).
pub struct FairRandomSource {
    entropy: Box<dyn EntropySource>,
    buffer: VecDeque<u32>,
    consumed: u64,
    rejected: u64,
}

impl FairRandomSource {
    pub fn new(entropy: impl EntropySource + 'static) -> Self {
        Self::from_boxed(Box::new(entropy))
    }

    pub fn from_boxed(entropy: Box<dyn EntropySource>) -> Self {
        Self {
            entropy,
            buffer: VecDeque::new(),
            consumed: 0,
            rejected: 0,
        }
    }

    /// In-process source: OS generator with the seeded generator behind it
    pub fn local() -> Self {
        let block = RandomConfig::default().block_size;
        Self::new(FallbackChain::new(vec![
            Box::new(OsEntropy::new(block)),
            Box::new(SeededEntropy::from_clock(block)),
        ]))
    }

    /// Deterministic source for simulations and tests
    pub fn seeded(seed: u64) -> Self {
        Self::new(SeededEntropy::new(seed, RandomConfig::default().block_size))
    }

    /// Remote service first (when configured), then the local chain unless
    /// `local_fallback` is off
    pub fn from_config(config: &RandomConfig) -> Self {
        let mut sources: Vec<Box<dyn EntropySource>> = Vec::new();

        if let Some(url) = &config.remote_url {
            sources.push(Box::new(RemoteEntropy::new(
                url.clone(),
                config.block_size,
                Duration::from_millis(config.request_timeout_ms),
            )));
        }

        if config.remote_url.is_none() || config.local_fallback {
            sources.push(Box::new(OsEntropy::new(config.block_size)));
            let seeded = match config.fallback_seed {
                Some(seed) => SeededEntropy::new(seed, config.block_size),
                None => SeededEntropy::from_clock(config.block_size),
            };
            sources.push(Box::new(seeded));
        }

        Self::new(FallbackChain::new(sources))
    }

    /// Uniform value in `[0, range)`
    pub fn draw(&mut self, range: u32) -> Result<u32, RandomError> {
        if range == 0 {
            return Err(RandomError::InvalidRange(range));
        }
        let limit = rejection_limit(range);

        loop {
            let raw = self.next_raw()?;
            if (raw as u64) < limit {
                return Ok(raw % range);
            }
            self.rejected += 1;
        }
    }

    /// `count` independent values in `[0, range)`, each passing the
    /// rejection test on its own
    pub fn draw_batch(&mut self, count: usize, range: u32) -> Result<Vec<u32>, RandomError> {
        if range == 0 {
            return Err(RandomError::InvalidRange(range));
        }
        (0..count).map(|_| self.draw(range)).collect()
    }

    /// Draw a wheel pocket
    pub fn spin(&mut self) -> Result<Pocket, RandomError> {
        // draw(37) < 37, always fits
        self.draw(POCKET_COUNT).map(|n| n as Pocket)
    }

    /// `count` raw values straight from the stream, without range reduction.
    /// Served to remote consumers, which apply the rejection test themselves.
    pub fn raw_batch(&mut self, count: usize) -> Result<Vec<u32>, RandomError> {
        (0..count).map(|_| self.next_raw()).collect()
    }

    /// Raw values pulled from the stream so far
    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    /// Raw values discarded by the rejection test so far
    pub fn rejected(&self) -> u64 {
        self.rejected
    }

    fn next_raw(&mut self) -> Result<u32, RandomError> {
        if self.buffer.is_empty() {
            self.entropy.refill(&mut self.buffer)?;
        }
        let raw = self.buffer.pop_front().ok_or_else(|| {
            RandomError::SourceUnavailable(format!("{} source returned no values", self.entropy.name()))
        })?;
        self.consumed += 1;
        Ok(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::entropy::tests::ScriptedEntropy;

    #[test]
    fn test_rejection_limit() {
        assert_eq!(rejection_limit(37), 4_294_967_289);
        assert_eq!(rejection_limit(1), RAW_SPAN);
        assert_eq!(rejection_limit(8), RAW_SPAN);
    }

    #[test]
    fn test_values_at_or_above_limit_are_discarded() {
        let limit = rejection_limit(37) as u32;
        let mut source = FairRandomSource::new(ScriptedEntropy::new(
            vec![u32::MAX, 5, limit, 40, limit - 1],
            2,
        ));

        assert_eq!(source.draw(37).unwrap(), 5);
        assert_eq!(source.draw(37).unwrap(), 3);
        assert_eq!(source.draw(37).unwrap(), (limit - 1) % 37);
        assert_eq!(source.rejected(), 2);
        assert_eq!(source.consumed(), 5);
    }

    #[test]
    fn test_batch_applies_rejection_per_value() {
        let limit = rejection_limit(37) as u32;
        let mut source = FairRandomSource::new(ScriptedEntropy::new(
            vec![1, limit, 2, limit + 3, 3],
            10,
        ));

        assert_eq!(source.draw_batch(3, 37).unwrap(), vec![1, 2, 3]);
        assert_eq!(source.rejected(), 2);
    }

    #[test]
    fn test_exhaustion_is_an_error_not_a_biased_value() {
        let limit = rejection_limit(37) as u32;
        let mut source = FairRandomSource::new(ScriptedEntropy::new(vec![limit, limit + 1], 2));
        assert!(matches!(source.draw(37), Err(RandomError::SourceUnavailable(_))));
    }

    #[test]
    fn test_raw_batch_passes_values_through() {
        let mut source = FairRandomSource::new(ScriptedEntropy::new(vec![u32::MAX, 0, 7], 1));
        assert_eq!(source.raw_batch(3).unwrap(), vec![u32::MAX, 0, 7]);
        assert_eq!(source.rejected(), 0);
        assert!(source.raw_batch(1).is_err());
    }

    #[test]
    fn test_zero_range_rejected() {
        let mut source = FairRandomSource::seeded(1);
        assert_eq!(source.draw(0), Err(RandomError::InvalidRange(0)));
        assert_eq!(source.draw_batch(4, 0), Err(RandomError::InvalidRange(0)));
    }

    #[test]
    fn test_draws_stay_in_range() {
        let mut source = FairRandomSource::seeded(99);
        for range in [1u32, 2, 3, 36, 37, 1000, u32::MAX] {
            for value in source.draw_batch(500, range).unwrap() {
                assert!(value < range);
            }
        }
    }

    #[test]
    fn test_pocket_distribution_is_uniform() {
        const SPINS: usize = 370_000;
        let mut source = FairRandomSource::seeded(2024);
        let mut counts = [0usize; 37];
        for _ in 0..SPINS {
            counts[source.spin().unwrap() as usize] += 1;
        }

        let expected = (SPINS / 37) as f64;
        for (pocket, &count) in counts.iter().enumerate() {
            let deviation = (count as f64 - expected).abs() / expected;
            assert!(deviation < 0.05, "pocket {} drawn {} times", pocket, count);
        }
    }

    #[test]
    fn test_local_source_draws() {
        let mut source = FairRandomSource::local();
        let pocket = source.spin().unwrap();
        assert!(pocket <= 36);
    }

    #[test]
    fn test_config_without_fallback_reports_unavailable_remote() {
        let config = RandomConfig {
            remote_url: Some("http://127.0.0.1:9".to_string()),
            local_fallback: false,
            request_timeout_ms: 200,
            ..RandomConfig::default()
        };
        let mut source = FairRandomSource::from_config(&config);
        assert!(matches!(source.spin(), Err(RandomError::SourceUnavailable(_))));
    }

    #[test]
    fn test_config_with_fallback_survives_remote_failure() {
        let config = RandomConfig {
            remote_url: Some("http://127.0.0.1:9".to_string()),
            local_fallback: true,
            request_timeout_ms: 200,
            ..RandomConfig::default()
        };
        let mut source = FairRandomSource::from_config(&config);
        assert!(source.spin().unwrap() <= 36);
    }
}
