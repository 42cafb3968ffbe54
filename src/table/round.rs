//! Round orchestration
//!
//! One long-lived task cycles the table through Open, Pause and Result. In
//! manual mode (both windows zero) the table stays Open until a client sends
//! a spin, then goes straight to Result and reopens immediately afterwards.
//!
//! Round state lives behind a single mutex that is only held to append,
//! snapshot or reset; it is never held while waiting on settlement.

use crate::config::TableConfig;
use crate::errors::{RoundError, RouletteResult, SettlementError};
use crate::games::pocket::Pocket;
use crate::games::settlement::SettlementService;
use crate::games::types::{BetPayload, SettlementRequest, Wager};
use crate::table::broadcast::BroadcastHub;
use crate::table::events::{OutcomeView, Phase, TableEvent};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

struct RoundState {
    round: u64,
    phase: Phase,
    wagers: Vec<Wager>,
    last_pocket: Option<Pocket>,
}

/// Point-in-time view of the table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundSnapshot {
    pub round: u64,
    pub phase: Phase,
    pub wager_count: usize,
    pub manual: bool,
    pub last_pocket: Option<Pocket>,
    pub connected_clients: usize,
}

pub struct RoundManager {
    config: TableConfig,
    hub: Arc<BroadcastHub>,
    settlement: Arc<dyn SettlementService>,
    override_pocket: Option<Pocket>,
    state: Mutex<RoundState>,
    resolve: Notify,
}

impl RoundManager {
    pub fn new(config: TableConfig, hub: Arc<BroadcastHub>, settlement: Arc<dyn SettlementService>) -> Self {
        Self {
            config,
            hub,
            settlement,
            override_pocket: None,
            // closed until the loop opens round 1
            state: Mutex::new(RoundState {
                round: 1,
                phase: Phase::Pause,
                wagers: Vec::new(),
                last_pocket: None,
            }),
            resolve: Notify::new(),
        }
    }

    /// Force every round to this pocket (test deployments only; the
    /// settlement service must also allow it)
    pub fn with_override_pocket(mut self, pocket: Option<Pocket>) -> Self {
        self.override_pocket = pocket;
        self
    }

    pub fn hub(&self) -> &Arc<BroadcastHub> {
        &self.hub
    }

    pub fn is_manual(&self) -> bool {
        self.config.is_manual()
    }

    /// Start the phase loop
    pub fn spawn(self: &Arc<Self>) -> JoinHandle<()> {
        let manager = self.clone();
        tokio::spawn(async move { manager.run().await })
    }

    async fn run(&self) {
        info!(
            "🎡 Round loop started ({} mode, settlement: {})",
            if self.is_manual() { "manual" } else { "timed" },
            self.settlement.name()
        );

        loop {
            self.open_phase().await;

            if self.is_manual() {
                self.resolve.notified().await;
            } else {
                tokio::time::sleep(self.config.open_window()).await;
                self.pause_phase().await;
                tokio::time::sleep(self.config.pause_window()).await;
            }

            self.result_phase().await;
        }
    }

    async fn open_phase(&self) {
        let mut state = self.state.lock().await;
        state.wagers.clear();
        state.phase = Phase::Open;
        debug!(round = state.round, "bet window open");

        self.hub
            .broadcast(&TableEvent::State {
                phase: Phase::Open,
                round: state.round,
                duration_ms: self.config.open_window_ms,
            })
            .await;
    }

    async fn pause_phase(&self) {
        let mut state = self.state.lock().await;
        state.phase = Phase::Pause;
        debug!(round = state.round, wagers = state.wagers.len(), "bet window closed");

        self.hub
            .broadcast(&TableEvent::State {
                phase: Phase::Pause,
                round: state.round,
                duration_ms: self.config.pause_window_ms,
            })
            .await;
    }

    async fn result_phase(&self) {
        let (round, wagers) = {
            let mut state = self.state.lock().await;
            state.phase = Phase::Result;
            self.hub
                .broadcast(&TableEvent::State {
                    phase: Phase::Result,
                    round: state.round,
                    duration_ms: 0,
                })
                .await;
            (state.round, state.wagers.clone())
        };

        let wager_count = wagers.len();
        let request = SettlementRequest::new(round, wagers).with_override(self.override_pocket);
        let settled = match tokio::time::timeout(self.config.settlement_timeout(), self.settlement.settle(request)).await
        {
            Ok(result) => result,
            Err(_) => Err(SettlementError::Timeout {
                timeout_ms: self.config.settlement_timeout_ms,
            }),
        };

        let mut state = self.state.lock().await;
        match settled {
            Ok(response) => {
                info!(
                    "🎯 Round {} settled: pocket {}, {} wagers, staked {}, paid {}",
                    round, response.pocket, wager_count, response.total_staked, response.total_payout
                );
                state.last_pocket = Some(response.pocket);
                self.hub
                    .broadcast(&TableEvent::RoundResult {
                        round,
                        pocket: response.pocket,
                        outcomes: response.outcomes.iter().map(OutcomeView::from).collect(),
                        total_payout: response.total_payout,
                    })
                    .await;
            }
            Err(e) => {
                error!("❌ Round {} failed to settle: {}", round, e);
                self.hub
                    .broadcast(&TableEvent::Error {
                        round,
                        message: e.to_string(),
                    })
                    .await;
            }
        }

        // failed rounds are not retried
        state.round += 1;
    }

    /// Accept a wager from `client` for the current round and echo it to
    /// every client
    pub async fn submit_wager(&self, client: &str, payload: BetPayload) -> RouletteResult<u64> {
        let wager = payload.into_wager(client, self.config.max_stake)?;

        let mut state = self.state.lock().await;
        if state.phase != Phase::Open {
            return Err(RoundError::WindowClosed { round: state.round }.into());
        }

        let round = state.round;
        let echo = TableEvent::Bet {
            client: client.to_string(),
            numbers: wager.numbers().to_vec(),
            amount: wager.amount,
            bet_type: wager.bet_type(),
            round,
        };
        info!(client, round, bet_type = %wager.bet_type(), amount = wager.amount, "bet received");
        state.wagers.push(wager);

        // echoed under the lock so echoes keep submission order
        self.hub.broadcast(&echo).await;
        Ok(round)
    }

    /// Resolve the current round now (manual mode only)
    pub async fn trigger_resolve(&self) -> Result<u64, RoundError> {
        let mut state = self.state.lock().await;
        if !self.is_manual() {
            return Err(RoundError::ManualResolveDisabled { round: state.round });
        }
        if state.phase != Phase::Open {
            return Err(RoundError::WindowClosed { round: state.round });
        }

        // closes the window so a second spin cannot queue another round
        state.phase = Phase::Result;
        self.resolve.notify_one();
        info!("🎲 Manual resolve requested for round {}", state.round);
        Ok(state.round)
    }

    /// Tell one client its command was refused
    pub async fn reject(&self, client: &str, message: impl Into<String>) {
        let round = self.state.lock().await.round;
        let event = TableEvent::Rejected {
            message: message.into(),
            round,
        };
        if let Err(e) = self.hub.send_to(client, &event).await {
            warn!("Could not deliver rejection to {}: {}", client, e);
        }
    }

    pub async fn snapshot(&self) -> RoundSnapshot {
        let (round, phase, wager_count, last_pocket) = {
            let state = self.state.lock().await;
            (state.round, state.phase, state.wagers.len(), state.last_pocket)
        };

        RoundSnapshot {
            round,
            phase,
            wager_count,
            manual: self.is_manual(),
            last_pocket,
            connected_clients: self.hub.client_count().await,
        }
    }
}
