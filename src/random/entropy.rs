//! Raw uniform 32-bit streams
//!
//! An [`EntropySource`] only produces raw values; bias removal happens once,
//! in [`super::FairRandomSource`]. Sources may block (the remote one performs
//! HTTP calls), so callers on an async runtime drive them from
//! `spawn_blocking`.

use crate::errors::RandomError;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

/// Producer of raw, uniformly distributed 32-bit values
pub trait EntropySource: Send {
    fn name(&self) -> &str;

    /// Append at least one fresh raw value to `out`
    fn refill(&mut self, out: &mut VecDeque<u32>) -> Result<(), RandomError>;
}

fn words_from_bytes(bytes: &[u8], out: &mut VecDeque<u32>) {
    out.extend(
        bytes
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]])),
    );
}

/// Operating system CSPRNG
pub struct OsEntropy {
    block_size: usize,
}

impl OsEntropy {
    pub fn new(block_size: usize) -> Self {
        Self {
            block_size: block_size.max(1),
        }
    }
}

impl EntropySource for OsEntropy {
    fn name(&self) -> &str {
        "os"
    }

    fn refill(&mut self, out: &mut VecDeque<u32>) -> Result<(), RandomError> {
        let mut bytes = vec![0u8; self.block_size * 4];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| RandomError::SourceUnavailable(format!("os generator: {}", e)))?;
        words_from_bytes(&bytes, out);
        Ok(())
    }
}

/// Seeded ChaCha20 stream: the pseudorandom fallback, and the deterministic
/// source used by simulations and tests
pub struct SeededEntropy {
    rng: ChaCha20Rng,
    block_size: usize,
}

impl SeededEntropy {
    pub fn new(seed: u64, block_size: usize) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
            block_size: block_size.max(1),
        }
    }

    /// Seeded from the wall clock
    pub fn from_clock(block_size: usize) -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or_default();
        Self::new(nanos, block_size)
    }
}

impl EntropySource for SeededEntropy {
    fn name(&self) -> &str {
        "seeded"
    }

    fn refill(&mut self, out: &mut VecDeque<u32>) -> Result<(), RandomError> {
        out.extend((0..self.block_size).map(|_| self.rng.next_u32()));
        Ok(())
    }
}

/// Query accepted by the RNG service endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RngQuery {
    #[serde(default)]
    pub nums: Option<usize>,
}

/// Reply of the RNG service endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RngReply {
    pub rngs: Vec<u32>,
}

/// Client of a remote RNG service (`GET {base_url}/rng?nums=N`)
pub struct RemoteEntropy {
    base_url: String,
    block_size: usize,
    timeout: Duration,
    // built on first use so it is never created on an async worker thread
    client: Option<reqwest::blocking::Client>,
}

impl RemoteEntropy {
    pub fn new(base_url: impl Into<String>, block_size: usize, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            block_size: block_size.max(1),
            timeout,
            client: None,
        }
    }

    fn client(&mut self) -> Result<&reqwest::blocking::Client, RandomError> {
        if self.client.is_none() {
            let client = reqwest::blocking::Client::builder()
                .timeout(self.timeout)
                .build()
                .map_err(|e| RandomError::Remote(e.to_string()))?;
            self.client = Some(client);
        }
        self.client
            .as_ref()
            .ok_or_else(|| RandomError::Remote("client not initialised".to_string()))
    }
}

impl EntropySource for RemoteEntropy {
    fn name(&self) -> &str {
        "remote"
    }

    fn refill(&mut self, out: &mut VecDeque<u32>) -> Result<(), RandomError> {
        let url = format!("{}/rng", self.base_url);
        let nums = self.block_size.to_string();
        let reply: RngReply = self
            .client()?
            .get(&url)
            .query(&[("nums", nums.as_str())])
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.json())
            .map_err(|e| RandomError::Remote(e.to_string()))?;

        if reply.rngs.is_empty() {
            return Err(RandomError::Remote(format!("{} returned no values", url)));
        }
        debug!("fetched {} raw values from {}", reply.rngs.len(), url);
        out.extend(reply.rngs);
        Ok(())
    }
}

/// Ordered chain of sources; the next one is consulted only when the current
/// one fails. Exhausting the chain is a reported failure.
pub struct FallbackChain {
    sources: Vec<Box<dyn EntropySource>>,
}

impl FallbackChain {
    pub fn new(sources: Vec<Box<dyn EntropySource>>) -> Self {
        Self { sources }
    }
}

impl EntropySource for FallbackChain {
    fn name(&self) -> &str {
        "chain"
    }

    fn refill(&mut self, out: &mut VecDeque<u32>) -> Result<(), RandomError> {
        let mut failures = Vec::new();
        for source in self.sources.iter_mut() {
            let before = out.len();
            match source.refill(out) {
                Ok(()) if out.len() > before => return Ok(()),
                Ok(()) => failures.push(format!("{}: produced no values", source.name())),
                Err(e) => {
                    warn!("random source '{}' failed, trying next: {}", source.name(), e);
                    failures.push(format!("{}: {}", source.name(), e));
                }
            }
        }

        if failures.is_empty() {
            return Err(RandomError::SourceUnavailable("no random sources configured".to_string()));
        }
        Err(RandomError::SourceUnavailable(failures.join("; ")))
    }
}
