//! Error types for the roulette table
//!
//! Every subsystem owns a small error enum; `RouletteError` wraps them so
//! binaries and the HTTP layer can propagate any of them with `?`.

use thiserror::Error;

/// Root error type for all table operations
#[derive(Debug, Error)]
pub enum RouletteError {
    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Wager validation and classification errors
    #[error("Bet error: {0}")]
    Bet(#[from] BetError),

    /// Round phase errors
    #[error("Round error: {0}")]
    Round(#[from] RoundError),

    /// Random source errors
    #[error("Random source error: {0}")]
    Random(#[from] RandomError),

    /// Settlement call errors
    #[error("Settlement error: {0}")]
    Settlement(#[from] SettlementError),

    /// Client registry errors
    #[error("Broadcast error: {0}")]
    Hub(#[from] HubError),

    /// Socket / listener errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration and validation errors
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Missing required field: {0}")]
    MissingRequired(String),

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("Failed to save configuration: {0}")]
    SaveFailed(String),
}

/// A wager that cannot enter a round
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BetError {
    #[error("empty bet numbers")]
    Empty,

    #[error("invalid number {0}, must be between 0 and 36")]
    NumberOutOfRange(i64),

    #[error("too many numbers: {count} (max {max})")]
    TooManyNumbers { count: usize, max: usize },

    #[error("invalid bet combination")]
    InvalidCombination,

    #[error("bet amount must be positive, got {0}")]
    NonPositiveAmount(i64),

    #[error("bet amount {amount} exceeds table limit {max}")]
    StakeLimit { amount: u64, max: u64 },
}

/// Round phase errors, delivered privately to the offending client
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoundError {
    #[error("bet window is closed for round {round}")]
    WindowClosed { round: u64 },

    #[error("round {round} resolves on its timer, spin is disabled")]
    ManualResolveDisabled { round: u64 },
}

/// Random source failures; never replaced by a biased draw
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RandomError {
    #[error("random source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("invalid draw range {0}, must be at least 1")]
    InvalidRange(u32),

    #[error("remote random service failed: {0}")]
    Remote(String),
}

/// Settlement failures are round-scoped: the round is recorded as failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettlementError {
    #[error("settlement timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("settlement transport error: {0}")]
    Transport(String),

    #[error("spin failed: {0}")]
    Random(#[from] RandomError),

    #[error("invalid bet in settlement request: {0}")]
    InvalidBet(#[from] BetError),

    #[error("override pocket is not permitted on this settlement service")]
    OverrideNotPermitted,
}

/// RTP harness failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RtpError {
    #[error("canonical {bet_type} selection rejected: {source}")]
    CanonicalBet { bet_type: String, source: BetError },

    #[error("spin failed: {0}")]
    Random(#[from] RandomError),
}

/// Client registry errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HubError {
    #[error("client {0} is already registered")]
    DuplicateClient(String),

    #[error("client {0} is not draining its queue")]
    SlowConsumer(String),

    #[error("client {0} is not connected")]
    UnknownClient(String),
}

// Convenience type alias for Results
pub type RouletteResult<T> = Result<T, RouletteError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as StdError;

    #[test]
    fn test_error_display() {
        let config_error = ConfigurationError::MissingRequired("table.open_window_ms".to_string());
        let error = RouletteError::Configuration(config_error);

        assert!(error.to_string().contains("Configuration error"));
        assert!(error.to_string().contains("table.open_window_ms"));
    }

    #[test]
    fn test_bet_error_details() {
        let err = BetError::NumberOutOfRange(37);
        assert!(err.to_string().contains("invalid number 37"));

        let err = BetError::StakeLimit { amount: 500, max: 100 };
        assert!(err.to_string().contains("500"));
        assert!(err.to_string().contains("100"));
    }

    #[test]
    fn test_error_conversion() {
        let error: RouletteError = RoundError::WindowClosed { round: 4 }.into();

        match error {
            RouletteError::Round(RoundError::WindowClosed { round }) => assert_eq!(round, 4),
            _ => panic!("Expected round error"),
        }
    }

    #[test]
    fn test_settlement_wraps_random_source() {
        let err: SettlementError = RandomError::SourceUnavailable("all sources failed".into()).into();
        assert!(err.to_string().contains("all sources failed"));

        let root: RouletteError = err.into();
        assert!(root.source().is_some());
    }
}
