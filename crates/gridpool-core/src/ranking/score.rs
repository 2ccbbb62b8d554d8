//! Per-board discovery score.
//!
//! Every term is normalized to `[0, 1]`:
//!
//! - boost: `min(paid / reference_max, 1) * decay`, `decay = clamp(remaining / lifetime, 0.3, 1)`
//! - fill rate: `fill_rate / 100`
//! - reputation: `min(points / 1000, 1) * cbl tier bonus`
//! - urgency: step function of hours to kickoff, then modifiers
//!
//! Modifier order is fixed: rivalry and primetime first, then the low-fill boost. Each
//! multiplication is clamped to 1.0 before the next.

use super::{BoardSnapshot, CblTier, RankingConfig, ScoreBreakdown};

const MS_PER_DAY: f64 = 86_400_000.0;
const REPUTATION_SCALE: f64 = 1_000.0;

const RIVALRY_URGENCY: f64 = 1.2;
const RIVALRY_REPUTATION: f64 = 1.1;
const PRIMETIME_URGENCY: f64 = 1.15;
const LOW_FILL_URGENCY: f64 = 1.3;
const LOW_FILL_THRESHOLD: f64 = 50.0;
const LOW_FILL_WINDOW_HOURS: f64 = 72.0;

fn clamp_unit(x: f64) -> f64 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, 1.0)
    }
}

/// Boost term at `now_ms`. Inactive boosts (no expiry, or expired) score 0.
pub fn boost_score(snapshot: &BoardSnapshot, now_ms: i64, config: &RankingConfig) -> f64 {
    let Some(expires_at) = snapshot.boost_expires_at_ms else {
        return 0.0;
    };
    if expires_at <= now_ms || config.boost_reference_max_lamports == 0 {
        return 0.0;
    }
    let normalized =
        (snapshot.boost_amount_lamports as f64 / config.boost_reference_max_lamports as f64).min(1.0);
    let lifetime_ms = snapshot.boost_duration_days as f64 * MS_PER_DAY;
    let remaining_ms = (expires_at - now_ms) as f64;
    let decay = if lifetime_ms <= 0.0 {
        1.0
    } else {
        (remaining_ms / lifetime_ms).clamp(config.boost_decay_floor, 1.0)
    };
    clamp_unit(normalized * decay)
}

pub fn fill_rate_score(snapshot: &BoardSnapshot) -> f64 {
    clamp_unit(snapshot.fill_rate / 100.0)
}

pub fn base_reputation(snapshot: &BoardSnapshot) -> f64 {
    let base = (snapshot.reputation_points as f64 / REPUTATION_SCALE).min(1.0);
    clamp_unit(base * snapshot.cbl_tier.reputation_multiplier())
}

/// Step function; 0 once kickoff has passed.
pub fn base_urgency(hours_until_kickoff: f64) -> f64 {
    match hours_until_kickoff {
        h if h.is_nan() || h <= 0.0 => 0.0,
        h if h <= 24.0 => 0.9,
        h if h <= 48.0 => 0.7,
        h if h <= 72.0 => 0.5,
        h if h <= 168.0 => 0.3,
        _ => 0.1,
    }
}

/// Full breakdown for one snapshot.
pub fn breakdown(snapshot: &BoardSnapshot, now_ms: i64, config: &RankingConfig) -> ScoreBreakdown {
    let mut reputation = base_reputation(snapshot);
    let mut urgency = base_urgency(snapshot.hours_until_kickoff);

    if snapshot.is_rivalry {
        urgency = clamp_unit(urgency * RIVALRY_URGENCY);
        reputation = clamp_unit(reputation * RIVALRY_REPUTATION);
    }
    if snapshot.is_primetime {
        urgency = clamp_unit(urgency * PRIMETIME_URGENCY);
    }
    if snapshot.fill_rate < LOW_FILL_THRESHOLD
        && snapshot.hours_until_kickoff > 0.0
        && snapshot.hours_until_kickoff < LOW_FILL_WINDOW_HOURS
    {
        urgency = clamp_unit(urgency * LOW_FILL_URGENCY);
    }

    ScoreBreakdown {
        boost: boost_score(snapshot, now_ms, config),
        fill_rate: fill_rate_score(snapshot),
        reputation,
        urgency,
    }
}

impl CblTier {
    pub fn reputation_multiplier(self) -> f64 {
        match self {
            CblTier::Franchise => 1.2,
            CblTier::DriveMaker => 1.1,
            CblTier::FirstStream => 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranking::tests::snapshot;

    const NOW: i64 = 1_700_000_000_000;

    #[test]
    fn urgency_steps() {
        assert_eq!(base_urgency(-1.0), 0.0);
        assert_eq!(base_urgency(0.0), 0.0);
        assert_eq!(base_urgency(24.0), 0.9);
        assert_eq!(base_urgency(24.5), 0.7);
        assert_eq!(base_urgency(72.0), 0.5);
        assert_eq!(base_urgency(100.0), 0.3);
        assert_eq!(base_urgency(169.0), 0.1);
    }

    #[test]
    fn boost_inactive_without_future_expiry() {
        let cfg = RankingConfig::default();
        let mut s = snapshot("a");
        s.boost_amount_lamports = 250_000_000;
        assert_eq!(boost_score(&s, NOW, &cfg), 0.0);
        s.boost_expires_at_ms = Some(NOW);
        assert_eq!(boost_score(&s, NOW, &cfg), 0.0);
    }

    #[test]
    fn boost_decays_to_floor() {
        let cfg = RankingConfig::default();
        let mut s = snapshot("a");
        s.boost_amount_lamports = 500_000_000;
        s.boost_duration_days = 7;
        s.boost_expires_at_ms = Some(NOW + 3_600_000);
        assert!((boost_score(&s, NOW, &cfg) - 0.3).abs() < 1e-12);
        s.boost_expires_at_ms = Some(NOW + 7 * 86_400_000);
        assert!((boost_score(&s, NOW, &cfg) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn modifiers_clamp_in_order() {
        let cfg = RankingConfig::default();
        let mut s = snapshot("a");
        s.hours_until_kickoff = 12.0;
        s.fill_rate = 10.0;
        s.is_rivalry = true;
        s.is_primetime = true;
        // 0.9 * 1.2 -> 1.0 (clamped), * 1.15 -> 1.0, * 1.3 -> 1.0
        assert_eq!(breakdown(&s, NOW, &cfg).urgency, 1.0);

        s.is_rivalry = false;
        s.is_primetime = false;
        s.hours_until_kickoff = 60.0;
        // 0.5 * 1.3
        assert!((breakdown(&s, NOW, &cfg).urgency - 0.65).abs() < 1e-12);
    }

    #[test]
    fn reputation_tier_bonus_caps_at_one() {
        let mut s = snapshot("a");
        s.reputation_points = 900;
        s.cbl_tier = CblTier::Franchise;
        assert_eq!(base_reputation(&s), 1.0);
        s.cbl_tier = CblTier::DriveMaker;
        assert!((base_reputation(&s) - 0.99).abs() < 1e-12);
        s.reputation_points = 5_000;
        s.cbl_tier = CblTier::FirstStream;
        assert_eq!(base_reputation(&s), 1.0);
    }
}
