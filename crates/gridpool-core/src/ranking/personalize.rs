//! Per-user re-scoring of a ranked feed.

use super::{sort_by_total, BoardScore};
use crate::money::Cents;
use serde::{Deserialize, Serialize};

const FAVORITE_TEAM_BONUS: f64 = 0.15;
const FEE_MATCH_BONUS: f64 = 0.1;
const VIP_MATCH_BONUS: f64 = 0.05;
/// Entry fee counts as "near" the user's average within this relative distance.
const FEE_MATCH_TOLERANCE: f64 = 0.3;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UserPreferences {
    pub favorite_teams: Vec<String>,
    /// Zero means no history; the fee bonus is skipped.
    pub average_entry_fee: Cents,
    pub is_vip: bool,
}

/// Bonus fraction for one board: up to `0.15 + 0.1 + 0.05`.
pub fn personal_bonus(entry: &BoardScore, prefs: &UserPreferences) -> f64 {
    let board = &entry.board;
    let mut bonus = 0.0;
    if prefs
        .favorite_teams
        .iter()
        .any(|t| *t == board.home_team || *t == board.away_team)
    {
        bonus += FAVORITE_TEAM_BONUS;
    }
    if !prefs.average_entry_fee.is_zero() {
        let avg = prefs.average_entry_fee.get() as f64;
        let distance = (board.entry_fee.get() as f64 - avg).abs() / avg;
        if distance < FEE_MATCH_TOLERANCE {
            bonus += FEE_MATCH_BONUS;
        }
    }
    if prefs.is_vip && board.is_vip_only {
        bonus += VIP_MATCH_BONUS;
    }
    bonus
}

/// `total * (1 + bonus)`, clamped to 1.0, then re-sorted and re-ranked. Tiers are kept.
pub fn personalize(feed: &[BoardScore], prefs: &UserPreferences) -> Vec<BoardScore> {
    let mut out: Vec<BoardScore> = feed
        .iter()
        .map(|entry| {
            let mut e = entry.clone();
            e.total = (entry.total * (1.0 + personal_bonus(entry, prefs))).min(1.0);
            e
        })
        .collect();
    sort_by_total(&mut out);
    for (i, e) in out.iter_mut().enumerate() {
        e.rank = i as u32 + 1;
    }
    out
}
