//! Boost pricing and boost performance rating.

use crate::{GridpoolError, Result};
use serde::{Deserialize, Serialize};

pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// Purchasable boost lengths.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoostDuration {
    OneDay,
    ThreeDays,
    SevenDays,
}

impl BoostDuration {
    pub const ALL: [BoostDuration; 3] = [
        BoostDuration::OneDay,
        BoostDuration::ThreeDays,
        BoostDuration::SevenDays,
    ];

    pub fn from_days(days: u32) -> Result<Self> {
        match days {
            1 => Ok(BoostDuration::OneDay),
            3 => Ok(BoostDuration::ThreeDays),
            7 => Ok(BoostDuration::SevenDays),
            other => Err(GridpoolError::Configuration(format!(
                "unsupported boost duration: {other} days"
            ))),
        }
    }

    pub fn days(self) -> u32 {
        match self {
            BoostDuration::OneDay => 1,
            BoostDuration::ThreeDays => 3,
            BoostDuration::SevenDays => 7,
        }
    }

    /// 0.05 / 0.12 / 0.25 SOL.
    pub fn price_lamports(self) -> u64 {
        match self {
            BoostDuration::OneDay => 50_000_000,
            BoostDuration::ThreeDays => 120_000_000,
            BoostDuration::SevenDays => 250_000_000,
        }
    }

    pub fn duration_ms(self) -> i64 {
        self.days() as i64 * 86_400_000
    }
}

/// Normalization ceiling of the boost score: the largest purchasable boost.
pub fn reference_max_lamports() -> u64 {
    BoostDuration::SevenDays.price_lamports()
}

/// Observed results of one boost.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoostAnalytics {
    pub boost_cost_lamports: u64,
    pub revenue_lamports: u64,
    pub fill_rate_before: f64,
    pub fill_rate_after: f64,
    pub players_gained: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoostEffectiveness {
    Poor,
    Fair,
    Good,
    Excellent,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoostRoi {
    /// `(revenue - cost) / cost * 100`.
    pub roi_pct: f64,
    /// `None` when no players were gained.
    pub cost_per_player_lamports: Option<f64>,
    pub fill_rate_increase: f64,
    pub effectiveness: BoostEffectiveness,
}

/// Rates a finished boost. A free boost has no meaningful ROI and is rejected.
pub fn boost_roi(a: &BoostAnalytics) -> Result<BoostRoi> {
    if a.boost_cost_lamports == 0 {
        return Err(GridpoolError::Configuration(
            "boost cost must be > 0 to compute ROI".into(),
        ));
    }
    let cost = a.boost_cost_lamports as f64;
    let roi_pct = (a.revenue_lamports as f64 - cost) / cost * 100.0;
    let fill_rate_increase = a.fill_rate_after - a.fill_rate_before;
    let cost_per_player_lamports = (a.players_gained > 0).then(|| cost / a.players_gained as f64);

    let effectiveness = if roi_pct >= 200.0 && fill_rate_increase >= 30.0 {
        BoostEffectiveness::Excellent
    } else if roi_pct >= 100.0 && fill_rate_increase >= 20.0 {
        BoostEffectiveness::Good
    } else if roi_pct >= 50.0 && fill_rate_increase >= 10.0 {
        BoostEffectiveness::Fair
    } else {
        BoostEffectiveness::Poor
    };

    Ok(BoostRoi {
        roi_pct,
        cost_per_player_lamports,
        fill_rate_increase,
        effectiveness,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pricing_table() {
        assert_eq!(BoostDuration::from_days(3).unwrap().price_lamports(), 120_000_000);
        assert!(BoostDuration::from_days(2).is_err());
        assert_eq!(reference_max_lamports(), LAMPORTS_PER_SOL / 4);
        assert_eq!(BoostDuration::SevenDays.duration_ms(), 604_800_000);
    }

    #[test]
    fn roi_ratings() {
        let base = BoostAnalytics {
            boost_cost_lamports: 100,
            revenue_lamports: 300,
            fill_rate_before: 40.0,
            fill_rate_after: 70.0,
            players_gained: 4,
        };
        let r = boost_roi(&base).unwrap();
        assert_eq!(r.roi_pct, 200.0);
        assert_eq!(r.effectiveness, BoostEffectiveness::Excellent);
        assert_eq!(r.cost_per_player_lamports, Some(25.0));

        let weak_fill = BoostAnalytics {
            fill_rate_after: 55.0,
            ..base.clone()
        };
        assert_eq!(boost_roi(&weak_fill).unwrap().effectiveness, BoostEffectiveness::Fair);

        let nobody = BoostAnalytics {
            players_gained: 0,
            revenue_lamports: 0,
            ..base.clone()
        };
        let r = boost_roi(&nobody).unwrap();
        assert_eq!(r.cost_per_player_lamports, None);
        assert_eq!(r.effectiveness, BoostEffectiveness::Poor);

        let free = BoostAnalytics {
            boost_cost_lamports: 0,
            ..base
        };
        assert!(boost_roi(&free).is_err());
    }
}
