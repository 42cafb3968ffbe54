use crate::errors::BetError;
use crate::games::bet_engine::{BetType, ClassifiedBet, MAX_BET_NUMBERS};
use crate::games::pocket::Pocket;
use serde::{Deserialize, Serialize};

/// A bet as submitted by a client, before validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BetPayload {
    pub numbers: Vec<i64>,
    pub amount: i64,
}

impl BetPayload {
    pub fn new(numbers: Vec<i64>, amount: i64) -> Self {
        Self { numbers, amount }
    }

    /// Validate at the boundary and bind the wager to its submitter
    pub fn into_wager(self, submitter: &str, max_stake: u64) -> Result<Wager, BetError> {
        if self.numbers.is_empty() {
            return Err(BetError::Empty);
        }
        if self.numbers.len() > MAX_BET_NUMBERS {
            return Err(BetError::TooManyNumbers {
                count: self.numbers.len(),
                max: MAX_BET_NUMBERS,
            });
        }
        if self.amount <= 0 {
            return Err(BetError::NonPositiveAmount(self.amount));
        }
        let amount = self.amount as u64;
        if amount > max_stake {
            return Err(BetError::StakeLimit { amount, max: max_stake });
        }

        Ok(Wager {
            bet: ClassifiedBet::new(&self.numbers)?,
            amount,
            submitter: submitter.to_string(),
        })
    }
}

/// An accepted wager. Immutable once it has entered a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wager {
    pub bet: ClassifiedBet,
    pub amount: u64,
    pub submitter: String,
}

impl Wager {
    pub fn numbers(&self) -> &[Pocket] {
        self.bet.numbers()
    }

    pub fn bet_type(&self) -> BetType {
        self.bet.bet_type()
    }

    /// Judge the wager against the drawn pocket
    pub fn settle(&self, drawn: Pocket) -> Outcome {
        let (won, payout) = self.bet.settle(self.amount, drawn);
        Outcome {
            wager: self.clone(),
            bet_type: self.bet_type(),
            won,
            payout,
        }
    }
}

/// Settlement of one wager
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub wager: Wager,
    pub bet_type: BetType,
    pub won: bool,
    pub payout: u64,
}

/// Wagers of one round handed to the settlement service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementRequest {
    pub round: u64,
    pub wagers: Vec<Wager>,
    /// Test-only forced pocket; refused unless the service allows it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_pocket: Option<Pocket>,
}

impl SettlementRequest {
    pub fn new(round: u64, wagers: Vec<Wager>) -> Self {
        Self {
            round,
            wagers,
            override_pocket: None,
        }
    }

    pub fn with_override(mut self, pocket: Option<Pocket>) -> Self {
        self.override_pocket = pocket;
        self
    }
}

/// Drawn pocket and per-wager outcomes of a resolved round
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementResponse {
    pub round: u64,
    pub pocket: Pocket,
    pub outcomes: Vec<Outcome>,
    pub total_staked: u64,
    pub total_payout: u64,
}

impl SettlementResponse {
    /// Settle every wager against `pocket`
    pub fn resolve(round: u64, pocket: Pocket, wagers: &[Wager]) -> Self {
        let outcomes: Vec<Outcome> = wagers.iter().map(|w| w.settle(pocket)).collect();
        let total_staked = wagers.iter().map(|w| w.amount).fold(0u64, u64::saturating_add);
        let total_payout = outcomes.iter().map(|o| o.payout).fold(0u64, u64::saturating_add);

        Self {
            round,
            pocket,
            outcomes,
            total_staked,
            total_payout,
        }
    }
}
