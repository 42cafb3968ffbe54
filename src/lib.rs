//! Roulette Table - live, round-based single-zero roulette
//!
//! Players wager during a timed bet window, a pocket is drawn from an
//! unbiased random source, every wager is settled against the eleven
//! standard bet categories, and results are fanned out to all connected
//! clients over WebSocket.

pub mod api;
pub mod config;
pub mod errors;
pub mod games;
pub mod random;
pub mod table;

pub use config::{ConfigLoader, RouletteConfig};
pub use errors::{RouletteError, RouletteResult};
pub use games::{BetType, ClassifiedBet};
pub use random::FairRandomSource;
pub use table::{BroadcastHub, RoundManager, TableEvent};
