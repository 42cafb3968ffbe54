//! Wire types of the client event and command streams

use crate::games::bet_engine::BetType;
use crate::games::pocket::Pocket;
use crate::games::types::{BetPayload, Outcome};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Round phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Accepting wagers
    Open,
    /// Wagers frozen
    Pause,
    /// Settling and publishing the outcome
    Result,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Open => write!(f, "open"),
            Phase::Pause => write!(f, "pause"),
            Phase::Result => write!(f, "result"),
        }
    }
}

/// Settled wager as published to spectators
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeView {
    pub client: String,
    pub numbers: Vec<Pocket>,
    pub amount: u64,
    pub bet_type: BetType,
    pub won: bool,
    pub payout: u64,
}

impl From<&Outcome> for OutcomeView {
    fn from(outcome: &Outcome) -> Self {
        Self {
            client: outcome.wager.submitter.clone(),
            numbers: outcome.wager.numbers().to_vec(),
            amount: outcome.wager.amount,
            bet_type: outcome.bet_type,
            won: outcome.won,
            payout: outcome.payout,
        }
    }
}

/// Events pushed to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TableEvent {
    /// Phase change; `duration_ms` is zero for an unbounded phase
    #[serde(rename = "state")]
    State { phase: Phase, round: u64, duration_ms: u64 },

    /// Accepted wager echo
    #[serde(rename = "bet")]
    Bet {
        client: String,
        numbers: Vec<Pocket>,
        amount: u64,
        bet_type: BetType,
        round: u64,
    },

    #[serde(rename = "result")]
    RoundResult {
        round: u64,
        pocket: Pocket,
        outcomes: Vec<OutcomeView>,
        total_payout: u64,
    },

    /// Round failed to settle
    #[serde(rename = "error")]
    Error { round: u64, message: String },

    /// Private: a command from this client was refused
    #[serde(rename = "rejected")]
    Rejected { message: String, round: u64 },

    /// Private: sent once on connect
    #[serde(rename = "welcome")]
    Welcome { client: String, round: u64, phase: Phase },
}

impl TableEvent {
    /// JSON text frame, shared by every recipient
    pub fn encode(&self) -> Result<Arc<str>, serde_json::Error> {
        serde_json::to_string(self).map(Arc::from)
    }
}

/// Commands accepted from clients
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ClientCommand {
    /// `{"spin": ...}`: resolve the round now (manual mode); wins over `bets`
    Spin { spin: serde_json::Value },
    /// `{"bets": [{"numbers": [..], "amount": n}, ..]}`
    PlaceBets { bets: Vec<BetPayload> },
}

impl ClientCommand {
    pub fn parse(text: &str) -> Result<Self, String> {
        let command: ClientCommand =
            serde_json::from_str(text).map_err(|_| "unrecognised command".to_string())?;

        match &command {
            ClientCommand::PlaceBets { bets } if bets.is_empty() => Err("no bets in command".to_string()),
            _ => Ok(command),
        }
    }
}
