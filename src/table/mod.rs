//! Live table: round loop, client fan-out and wire events

pub mod broadcast;
pub mod events;
pub mod round;

pub use broadcast::{BroadcastHub, BroadcastReport, ClientConnection};
pub use events::{ClientCommand, Phase, TableEvent};
pub use round::{RoundManager, RoundSnapshot};
