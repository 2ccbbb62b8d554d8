use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod board;
pub mod config;
pub mod hash;
pub mod logging;
pub mod metrics;
pub mod money;
pub mod payout;
pub mod ranking;
pub mod rules;
pub mod settlement;
pub mod squares;
pub mod tier;

pub use board::{Board, BoardConfig};
pub use config::EngineConfig;
pub use money::{Bps, Cents};
pub use payout::{HouseEconomics, PayoutBreakdown, PayoutCalculator};
pub use ranking::{BoardScore, BoardSnapshot, FeedTier, RankingEngine};
pub use rules::{RakeModel, RuleCatalog, RuleSet};
pub use settlement::{
    BoardSettlement, Period, QuarterSettlement, ScoreEvent, SettlementDesk, SettlementOutcome,
};
pub use squares::{SharedSquareGrid, Square, SquareOwnership};
pub use tier::{BoardClass, TierClassifier};

/// 32-byte SHA-256 digest used for settlement receipts and grid commitments.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct Hash32(pub [u8; 32]);

impl Hash32 {
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl std::fmt::Display for Hash32 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Stable identifier of a board (assigned by the board service).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BoardId(pub String);

impl BoardId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BoardId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a square owner (wallet address or account id).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Source of VIP account flags (owned by the accounts service).
pub trait VipDirectory {
    /// Postconditions:
    /// - For fixed directory contents, returns the same answer on every call.
    fn is_vip(&self, player: &PlayerId) -> bool;
}

/// Directory in which nobody is a VIP.
pub struct NoVips;

impl VipDirectory for NoVips {
    fn is_vip(&self, _player: &PlayerId) -> bool {
        false
    }
}

impl VipDirectory for std::collections::BTreeSet<PlayerId> {
    fn is_vip(&self, player: &PlayerId) -> bool {
        self.contains(player)
    }
}

/// Unified error type for gridpool core operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GridpoolError {
    /// Invalid price, squares sold, rule catalog or engine configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Board is below its class minimum fill; guaranteed payouts must not be computed.
    #[error("Fill threshold not met for {class:?}: {squares_sold} sold, {min_required} required")]
    FillThreshold {
        class: BoardClass,
        squares_sold: u8,
        min_required: u8,
    },

    /// Per-winner redistribution share is below the configured minimum.
    #[error("Redistribution too small: {per_winner} per winner is below minimum {minimum}")]
    RedistributionTooSmall { per_winner: Cents, minimum: Cents },

    /// A period was resolved out of order or more than once.
    #[error("Sequencing error: expected {expected}, got {got}")]
    Sequencing { expected: String, got: Period },

    /// Checked arithmetic failed.
    #[error("Arithmetic overflow: {0}")]
    Overflow(String),

    /// A per-board lock was poisoned by a panicking writer.
    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),
}

pub type Result<T> = std::result::Result<T, GridpoolError>;

/// Number of squares on every board (10x10 grid).
pub const GRID_SQUARES: usize = 100;

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn vip_directory_from_set() {
        let mut vips = BTreeSet::new();
        vips.insert(PlayerId::new("alice"));
        assert!(vips.is_vip(&PlayerId::new("alice")));
        assert!(!vips.is_vip(&PlayerId::new("bob")));
        assert!(!NoVips.is_vip(&PlayerId::new("alice")));
    }

    #[test]
    fn errors_render_context() {
        let err = GridpoolError::FillThreshold {
            class: BoardClass::HousePremium,
            squares_sold: 90,
            min_required: 97,
        };
        let msg = err.to_string();
        assert!(msg.contains("90 sold"));
        assert!(msg.contains("97 required"));
    }
}
