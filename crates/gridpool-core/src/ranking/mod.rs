//! Discovery ranking engine.
//!
//! `total = w_boost * boost + w_fill * fill_rate + w_rep * reputation + w_urg * urgency`
//! over board snapshots, sorted descending (board id ascending on ties) and bucketed into
//! capacity-limited feed tiers. Ranking is read-only and deterministic: the same snapshots
//! and the same `now_ms` always produce the same feed.

pub mod boost;
pub mod filter;
pub mod personalize;
pub mod score;
pub mod tiers;

pub use boost::{boost_roi, BoostAnalytics, BoostDuration, BoostEffectiveness, BoostRoi};
pub use filter::FeedFilter;
pub use personalize::{personalize, UserPreferences};

use crate::money::Cents;
use crate::{BoardId, GridpoolError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::debug;

/// Organizer (CBL) tier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CblTier {
    FirstStream,
    DriveMaker,
    Franchise,
}

/// Read-only view of a board for ranking.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoardSnapshot {
    pub board_id: BoardId,
    pub boost_amount_lamports: u64,
    /// Unix ms; `None` when the board was never boosted.
    pub boost_expires_at_ms: Option<i64>,
    pub boost_duration_days: u32,
    /// Percent in `[0, 100]`.
    pub fill_rate: f64,
    pub reputation_points: u32,
    pub cbl_tier: CblTier,
    pub hours_until_kickoff: f64,
    pub is_rivalry: bool,
    pub is_primetime: bool,
    pub is_vip_only: bool,
    pub entry_fee: Cents,
    pub home_team: String,
    pub away_team: String,
    pub tags: Vec<String>,
}

impl BoardSnapshot {
    pub fn is_boosted(&self, now_ms: i64) -> bool {
        self.boost_expires_at_ms.is_some_and(|t| t > now_ms)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub boost: f64,
    pub fill_rate: f64,
    pub reputation: f64,
    pub urgency: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedTier {
    Featured,
    Promoted,
    Standard,
}

impl FeedTier {
    /// Highest to lowest.
    pub const ORDER: [FeedTier; 3] = [FeedTier::Featured, FeedTier::Promoted, FeedTier::Standard];

    pub fn level(self) -> usize {
        match self {
            FeedTier::Featured => 0,
            FeedTier::Promoted => 1,
            FeedTier::Standard => 2,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoardScore {
    pub board: BoardSnapshot,
    pub breakdown: ScoreBreakdown,
    pub total: f64,
    pub tier: FeedTier,
    /// 1-based position in the feed; 0 before bucketing.
    pub rank: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub boost: f64,
    pub fill_rate: f64,
    pub reputation: f64,
    pub urgency: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            boost: 0.4,
            fill_rate: 0.3,
            reputation: 0.2,
            urgency: 0.1,
        }
    }
}

impl ScoreWeights {
    fn as_array(&self) -> [f64; 4] {
        [self.boost, self.fill_rate, self.reputation, self.urgency]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TierSlots {
    pub min_score: f64,
    pub max_slots: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RankingConfig {
    pub weights: ScoreWeights,
    pub featured: TierSlots,
    pub promoted: TierSlots,
    pub standard_max_slots: usize,
    pub boost_reference_max_lamports: u64,
    pub boost_decay_floor: f64,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            weights: ScoreWeights::default(),
            featured: TierSlots {
                min_score: 0.8,
                max_slots: 5,
            },
            promoted: TierSlots {
                min_score: 0.5,
                max_slots: 10,
            },
            standard_max_slots: 100,
            boost_reference_max_lamports: boost::reference_max_lamports(),
            boost_decay_floor: 0.3,
        }
    }
}

impl RankingConfig {
    pub fn validate(&self) -> Result<()> {
        let w = self.weights.as_array();
        if w.iter().any(|x| !x.is_finite() || *x < 0.0) {
            return Err(GridpoolError::Configuration(
                "ranking weights must be finite and non-negative".into(),
            ));
        }
        let sum: f64 = w.iter().sum();
        if (sum - 1.0).abs() > 1e-9 {
            return Err(GridpoolError::Configuration(format!(
                "ranking weights must sum to 1.0, got {sum}"
            )));
        }
        let unit = |x: f64| x.is_finite() && (0.0..=1.0).contains(&x);
        if !unit(self.featured.min_score)
            || !unit(self.promoted.min_score)
            || self.featured.min_score < self.promoted.min_score
        {
            return Err(GridpoolError::Configuration(
                "tier thresholds must satisfy 0 <= promoted <= featured <= 1".into(),
            ));
        }
        if !unit(self.boost_decay_floor) {
            return Err(GridpoolError::Configuration(
                "boost_decay_floor must be in [0, 1]".into(),
            ));
        }
        if self.boost_reference_max_lamports == 0 {
            return Err(GridpoolError::Configuration(
                "boost_reference_max_lamports must be > 0".into(),
            ));
        }
        Ok(())
    }
}

/// Descending by total, then board id ascending.
pub(crate) fn sort_by_total(scores: &mut [BoardScore]) {
    scores.sort_by(|a, b| match b.total.total_cmp(&a.total) {
        Ordering::Equal => a.board.board_id.cmp(&b.board.board_id),
        other => other,
    });
}

#[derive(Clone, Debug)]
pub struct RankingEngine {
    config: RankingConfig,
}

impl RankingEngine {
    pub fn new(config: RankingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &RankingConfig {
        &self.config
    }

    /// Unranked score of a single snapshot (`rank == 0`, qualifying tier).
    pub fn score(&self, snapshot: &BoardSnapshot, now_ms: i64) -> BoardScore {
        let breakdown = score::breakdown(snapshot, now_ms, &self.config);
        let w = &self.config.weights;
        let total = breakdown.boost * w.boost
            + breakdown.fill_rate * w.fill_rate
            + breakdown.reputation * w.reputation
            + breakdown.urgency * w.urgency;
        BoardScore {
            board: snapshot.clone(),
            breakdown,
            total,
            tier: tiers::qualifying_tier(total, &self.config),
            rank: 0,
        }
    }

    /// Scores, sorts and buckets `snapshots` into the discovery feed.
    pub fn rank(&self, snapshots: &[BoardSnapshot], now_ms: i64) -> Vec<BoardScore> {
        let mut scored: Vec<BoardScore> = snapshots.iter().map(|s| self.score(s, now_ms)).collect();
        sort_by_total(&mut scored);
        let feed = tiers::bucket(scored, &self.config);
        debug!(
            boards = snapshots.len(),
            feed = feed.len(),
            dropped = snapshots.len() - feed.len(),
            "ranked discovery feed"
        );
        feed
    }

    /// Filters, then ranks.
    pub fn rank_filtered(
        &self,
        snapshots: &[BoardSnapshot],
        filter: &FeedFilter,
        now_ms: i64,
    ) -> Vec<BoardScore> {
        self.rank(&filter.apply(snapshots, now_ms), now_ms)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn snapshot(id: &str) -> BoardSnapshot {
        BoardSnapshot {
            board_id: BoardId::new(id),
            boost_amount_lamports: 0,
            boost_expires_at_ms: None,
            boost_duration_days: 0,
            fill_rate: 0.0,
            reputation_points: 0,
            cbl_tier: CblTier::FirstStream,
            hours_until_kickoff: 200.0,
            is_rivalry: false,
            is_primetime: false,
            is_vip_only: false,
            entry_fee: Cents::dollars(10),
            home_team: String::new(),
            away_team: String::new(),
            tags: Vec::new(),
        }
    }

    #[test]
    fn weights_must_sum_to_one() {
        let mut cfg = RankingConfig::default();
        assert!(cfg.validate().is_ok());
        cfg.weights.boost = 0.5;
        assert!(RankingEngine::new(cfg).is_err());
    }

    #[test]
    fn ties_break_by_board_id() {
        let engine = RankingEngine::new(RankingConfig::default()).unwrap();
        let feed = engine.rank(&[snapshot("b"), snapshot("a"), snapshot("c")], 0);
        let ids: Vec<_> = feed.iter().map(|s| s.board.board_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(feed[2].rank, 3);
    }

    #[test]
    fn fill_rate_drives_order() {
        let engine = RankingEngine::new(RankingConfig::default()).unwrap();
        let mut full = snapshot("full");
        full.fill_rate = 100.0;
        let feed = engine.rank(&[snapshot("empty"), full], 0);
        assert_eq!(feed[0].board.board_id.as_str(), "full");
        // 0.3 * 1.0 + 0.1 * 0.1
        assert!((feed[0].total - 0.31).abs() < 1e-12);
        assert_eq!(feed[0].tier, FeedTier::Standard);
    }
}
