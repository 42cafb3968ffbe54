pub mod bet_engine;
pub mod pocket;
pub mod rtp;
pub mod settlement;
pub mod types;

pub use bet_engine::{classify, payout, BetType, ClassifiedBet};
pub use settlement::{LocalSettlementService, RemoteSettlementClient, SettlementService};
pub use types::*;
