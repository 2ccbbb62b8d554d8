//! Dead-square redistribution on community boards.
//!
//! A redistribution splits a base amount into a platform fee, an organizer fee, and an even
//! share for every member of the winner population. Per-winner shares are floored; the
//! leftover cents go to the platform, so
//! `platform_fee + organizer_fee + per_winner * n + remainder == base` always holds.

use crate::money::{Bps, Cents};
use crate::{GridpoolError, PlayerId, Result};
use serde::{Deserialize, Serialize};

/// Fee schedule and minimum share for redistributions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedistributionPolicy {
    pub min_per_winner: Cents,
    pub platform_fee: Bps,
    pub organizer_fee: Bps,
}

impl Default for RedistributionPolicy {
    fn default() -> Self {
        Self {
            min_per_winner: Cents::dollars(1),
            platform_fee: Bps::from_percent(10),
            organizer_fee: Bps::from_percent(5),
        }
    }
}

impl RedistributionPolicy {
    pub fn validate(&self) -> Result<()> {
        self.platform_fee
            .checked_add(self.organizer_fee)
            .map(|_| ())
            .map_err(|_| {
                GridpoolError::Configuration("redistribution fees exceed 100%".into())
            })
    }
}

/// Result of one executed redistribution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedistributionOutcome {
    pub base: Cents,
    pub platform_fee: Cents,
    pub organizer_fee: Cents,
    /// `base - platform_fee - organizer_fee`.
    pub net: Cents,
    pub winners: Vec<PlayerId>,
    pub per_winner: Cents,
    /// Leftover cents from flooring, paid to the platform. Always `< winners.len()`.
    pub remainder: Cents,
    /// Part of the period pool not used as the base; flows into the next period.
    pub carried_forward: Cents,
}

impl RedistributionOutcome {
    /// Platform fee plus rounding remainder.
    pub fn platform_total(&self) -> Cents {
        Cents::new(self.platform_fee.get() + self.remainder.get())
    }
}

/// Splits `base` among `winners`.
///
/// Fails with `RedistributionTooSmall` when `winners` is empty or the floored per-winner
/// share is below `policy.min_per_winner`. Callers treat that as "carry forward", not as an
/// abort.
pub fn redistribute(
    base: Cents,
    winners: &[PlayerId],
    policy: &RedistributionPolicy,
) -> Result<RedistributionOutcome> {
    let platform_fee = base.floor_bps(policy.platform_fee)?;
    let organizer_fee = base.floor_bps(policy.organizer_fee)?;
    let net = base.checked_sub(platform_fee)?.checked_sub(organizer_fee)?;

    if winners.is_empty() {
        return Err(GridpoolError::RedistributionTooSmall {
            per_winner: Cents::ZERO,
            minimum: policy.min_per_winner,
        });
    }
    let (per_winner, remainder) = net.split_even(winners.len() as u64)?;
    if per_winner < policy.min_per_winner {
        return Err(GridpoolError::RedistributionTooSmall {
            per_winner,
            minimum: policy.min_per_winner,
        });
    }

    Ok(RedistributionOutcome {
        base,
        platform_fee,
        organizer_fee,
        net,
        winners: winners.to_vec(),
        per_winner,
        remainder,
        carried_forward: Cents::ZERO,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn players(n: usize) -> Vec<PlayerId> {
        (0..n).map(|i| PlayerId::new(format!("p{i}"))).collect()
    }

    #[test]
    fn splits_face_value_among_prior_winners() {
        // $50 square, 3 winners: platform $5, organizer $2.50, net $42.50.
        let out = redistribute(Cents::dollars(50), &players(3), &RedistributionPolicy::default())
            .unwrap();
        assert_eq!(out.platform_fee, Cents::new(500));
        assert_eq!(out.organizer_fee, Cents::new(250));
        assert_eq!(out.net, Cents::new(4_250));
        assert_eq!(out.per_winner, Cents::new(1_416));
        assert_eq!(out.remainder, Cents::new(2));
        assert_eq!(out.platform_total(), Cents::new(502));
    }

    #[test]
    fn empty_population_is_too_small() {
        let err = redistribute(Cents::dollars(50), &[], &RedistributionPolicy::default())
            .unwrap_err();
        assert!(matches!(err, GridpoolError::RedistributionTooSmall { .. }));
    }

    #[test]
    fn below_minimum_is_rejected_not_zero_distributed() {
        // $1 base, 85 cents net, 1 winner: below the $1 minimum.
        let err = redistribute(Cents::dollars(1), &players(1), &RedistributionPolicy::default())
            .unwrap_err();
        assert_eq!(
            err,
            GridpoolError::RedistributionTooSmall {
                per_winner: Cents::new(85),
                minimum: Cents::dollars(1),
            }
        );
    }

    #[test]
    fn fees_over_100_percent_rejected() {
        let policy = RedistributionPolicy {
            platform_fee: Bps::from_percent(90),
            organizer_fee: Bps::from_percent(20),
            ..RedistributionPolicy::default()
        };
        assert!(policy.validate().is_err());
    }

    proptest! {
        #[test]
        fn redistribution_conserves(base in 0u64..100_000_000u64, n in 1usize..40usize) {
            let policy = RedistributionPolicy { min_per_winner: Cents::ZERO, ..Default::default() };
            let out = redistribute(Cents::new(base), &players(n), &policy).unwrap();
            prop_assert_eq!(out.per_winner.get() * n as u64 + out.remainder.get(), out.net.get());
            prop_assert!(out.remainder.get() < n as u64);
            prop_assert_eq!(
                out.platform_fee.get() + out.organizer_fee.get() + out.net.get(),
                base
            );
        }
    }
}
