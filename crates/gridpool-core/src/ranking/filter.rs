//! Snapshot filters applied before ranking.

use super::{BoardSnapshot, CblTier};
use crate::money::Cents;
use serde::{Deserialize, Serialize};

/// All set criteria must match. Empty lists and `None` mean "no constraint".
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedFilter {
    pub min_entry_fee: Option<Cents>,
    pub max_entry_fee: Option<Cents>,
    /// Board matches when either team is listed.
    pub teams: Vec<String>,
    pub hide_full: bool,
    pub vip_only: Option<bool>,
    pub boosted_only: bool,
    pub cbl_tiers: Vec<CblTier>,
    /// Board matches when it carries any listed tag.
    pub tags: Vec<String>,
}

impl FeedFilter {
    pub fn matches(&self, board: &BoardSnapshot, now_ms: i64) -> bool {
        if self.min_entry_fee.is_some_and(|min| board.entry_fee < min) {
            return false;
        }
        if self.max_entry_fee.is_some_and(|max| board.entry_fee > max) {
            return false;
        }
        if !self.teams.is_empty()
            && !self
                .teams
                .iter()
                .any(|t| *t == board.home_team || *t == board.away_team)
        {
            return false;
        }
        if self.hide_full && board.fill_rate >= 100.0 {
            return false;
        }
        if self.vip_only.is_some_and(|v| v != board.is_vip_only) {
            return false;
        }
        if self.boosted_only && !board.is_boosted(now_ms) {
            return false;
        }
        if !self.cbl_tiers.is_empty() && !self.cbl_tiers.contains(&board.cbl_tier) {
            return false;
        }
        if !self.tags.is_empty() && !self.tags.iter().any(|t| board.tags.contains(t)) {
            return false;
        }
        true
    }

    pub fn apply(&self, boards: &[BoardSnapshot], now_ms: i64) -> Vec<BoardSnapshot> {
        boards
            .iter()
            .filter(|b| self.matches(b, now_ms))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranking::tests::snapshot;

    #[test]
    fn empty_filter_matches_everything() {
        assert!(FeedFilter::default().matches(&snapshot("a"), 0));
    }

    #[test]
    fn criteria_combine() {
        let mut a = snapshot("a");
        a.home_team = "KC".into();
        a.entry_fee = Cents::dollars(10);
        a.tags = vec!["rivalry".into()];
        let mut full = a.clone();
        full.fill_rate = 100.0;

        let f = FeedFilter {
            min_entry_fee: Some(Cents::dollars(5)),
            max_entry_fee: Some(Cents::dollars(10)),
            teams: vec!["KC".into()],
            hide_full: true,
            tags: vec!["rivalry".into(), "playoffs".into()],
            ..Default::default()
        };
        assert!(f.matches(&a, 0));
        assert!(!f.matches(&full, 0));

        let tiers = FeedFilter {
            cbl_tiers: vec![CblTier::Franchise],
            ..Default::default()
        };
        assert!(!tiers.matches(&a, 0));
    }

    #[test]
    fn boosted_only_uses_now() {
        let mut a = snapshot("a");
        a.boost_expires_at_ms = Some(1_000);
        let f = FeedFilter {
            boosted_only: true,
            ..Default::default()
        };
        assert!(f.matches(&a, 999));
        assert!(!f.matches(&a, 1_000));
        assert_eq!(f.apply(&[a.clone(), snapshot("b")], 0).len(), 1);
    }
}
