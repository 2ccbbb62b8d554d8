//! Capacity-limited feed tiers.

use super::{BoardScore, FeedTier, RankingConfig};

/// Qualifying tier for a total score.
pub fn qualifying_tier(total: f64, config: &RankingConfig) -> FeedTier {
    if total >= config.featured.min_score {
        FeedTier::Featured
    } else if total >= config.promoted.min_score {
        FeedTier::Promoted
    } else {
        FeedTier::Standard
    }
}

/// Buckets boards already sorted by score.
///
/// A board whose tier is full cascades to the next lower tier with room; only the standard
/// tier drops boards. Ranks are reassigned as 1-based positions in the returned feed.
pub fn bucket(sorted: Vec<BoardScore>, config: &RankingConfig) -> Vec<BoardScore> {
    let caps = [
        config.featured.max_slots,
        config.promoted.max_slots,
        config.standard_max_slots,
    ];
    let mut used = [0usize; 3];
    let capacity = caps.iter().fold(0usize, |acc, c| acc.saturating_add(*c));
    let mut feed = Vec::with_capacity(sorted.len().min(capacity));

    for mut entry in sorted {
        let start = entry.tier.level();
        let slot = (start..FeedTier::ORDER.len()).find(|&lvl| used[lvl] < caps[lvl]);
        let Some(lvl) = slot else {
            continue;
        };
        used[lvl] += 1;
        entry.tier = FeedTier::ORDER[lvl];
        entry.rank = feed.len() as u32 + 1;
        feed.push(entry);
    }
    feed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranking::tests::snapshot;
    use crate::ranking::ScoreBreakdown;

    fn scored(id: &str, total: f64, cfg: &RankingConfig) -> BoardScore {
        BoardScore {
            board: snapshot(id),
            breakdown: ScoreBreakdown::default(),
            total,
            tier: qualifying_tier(total, cfg),
            rank: 0,
        }
    }

    #[test]
    fn thresholds_are_inclusive() {
        let cfg = RankingConfig::default();
        assert_eq!(qualifying_tier(0.8, &cfg), FeedTier::Featured);
        assert_eq!(qualifying_tier(0.79, &cfg), FeedTier::Promoted);
        assert_eq!(qualifying_tier(0.5, &cfg), FeedTier::Promoted);
        assert_eq!(qualifying_tier(0.49, &cfg), FeedTier::Standard);
    }

    #[test]
    fn overflow_cascades_and_standard_drops() {
        let mut cfg = RankingConfig::default();
        cfg.featured.max_slots = 1;
        cfg.promoted.max_slots = 1;
        cfg.standard_max_slots = 1;
        let boards = vec![
            scored("a", 0.95, &cfg),
            scored("b", 0.90, &cfg),
            scored("c", 0.85, &cfg),
            scored("d", 0.60, &cfg),
        ];
        let feed = bucket(boards, &cfg);
        let view: Vec<_> = feed
            .iter()
            .map(|s| (s.board.board_id.as_str(), s.tier, s.rank))
            .collect();
        assert_eq!(
            view,
            vec![
                ("a", FeedTier::Featured, 1),
                ("b", FeedTier::Promoted, 2),
                ("c", FeedTier::Standard, 3),
            ]
        );
    }
}
