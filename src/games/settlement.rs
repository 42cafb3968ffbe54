//! Settlement services
//!
//! A settlement service draws the pocket for a round and settles every wager
//! against it. The round loop only depends on the [`SettlementService`] trait,
//! so settlement can run in-process or behind an HTTP hop.

use crate::errors::{BetError, RandomError, SettlementError};
use crate::games::pocket::{Pocket, MAX_POCKET};
use crate::games::types::{SettlementRequest, SettlementResponse};
use crate::random::FairRandomSource;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;

/// Resolves a round's wagers
#[async_trait]
pub trait SettlementService: Send + Sync {
    /// Draw a pocket and settle every wager in the request
    async fn settle(&self, request: SettlementRequest) -> Result<SettlementResponse, SettlementError>;

    /// Short label for logs
    fn name(&self) -> &'static str;
}

/// In-process settlement backed by an owned random source
pub struct LocalSettlementService {
    source: Arc<Mutex<FairRandomSource>>,
    allow_override: bool,
}

impl LocalSettlementService {
    pub fn new(source: FairRandomSource) -> Self {
        Self {
            source: Arc::new(Mutex::new(source)),
            allow_override: false,
        }
    }

    /// Accept `override_pocket` in requests (test deployments only)
    pub fn allow_override(mut self, allow: bool) -> Self {
        self.allow_override = allow;
        self
    }

    async fn spin(&self) -> Result<Pocket, SettlementError> {
        let source = self.source.clone();
        // entropy sources may block on I/O
        let pocket = tokio::task::spawn_blocking(move || {
            let mut source = source
                .lock()
                .map_err(|_| RandomError::SourceUnavailable("random source lock poisoned".to_string()))?;
            source.spin()
        })
        .await
        .map_err(|e| SettlementError::Transport(format!("spin task failed: {}", e)))??;

        Ok(pocket)
    }
}

#[async_trait]
impl SettlementService for LocalSettlementService {
    async fn settle(&self, request: SettlementRequest) -> Result<SettlementResponse, SettlementError> {
        let pocket = match request.override_pocket {
            Some(_) if !self.allow_override => return Err(SettlementError::OverrideNotPermitted),
            Some(forced) if forced > MAX_POCKET => {
                return Err(BetError::NumberOutOfRange(forced as i64).into());
            }
            Some(forced) => forced,
            None => self.spin().await?,
        };

        debug!(round = request.round, pocket, wagers = request.wagers.len(), "round settled");
        Ok(SettlementResponse::resolve(request.round, pocket, &request.wagers))
    }

    fn name(&self) -> &'static str {
        "local"
    }
}

/// Client of a settlement service running in another process (`POST {url}/settle`)
pub struct RemoteSettlementClient {
    endpoint: String,
    client: reqwest::Client,
}

impl RemoteSettlementClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SettlementError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SettlementError::Transport(e.to_string()))?;

        Ok(Self {
            endpoint: format!("{}/settle", base_url.trim_end_matches('/')),
            client,
        })
    }
}

#[async_trait]
impl SettlementService for RemoteSettlementClient {
    async fn settle(&self, request: SettlementRequest) -> Result<SettlementResponse, SettlementError> {
        let round = request.round;
        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| SettlementError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SettlementError::Transport(format!("{}: {}", status, body)));
        }

        let settled: SettlementResponse = response
            .json()
            .await
            .map_err(|e| SettlementError::Transport(format!("invalid settlement reply: {}", e)))?;

        if settled.round != round {
            return Err(SettlementError::Transport(format!(
                "reply for round {} while settling round {}",
                settled.round, round
            )));
        }
        Ok(settled)
    }

    fn name(&self) -> &'static str {
        "remote"
    }
}
