//! Community-board resolution.
//!
//! Nobody guarantees a community period. The period pool is the scheduled amount plus any
//! carry-in. An owned winning square takes the whole pool. A dead square redistributes to
//! the owners who already won an earlier period on the board:
//!
//! - non-final period: the base is the square's face value (capped at the pool) and the
//!   rest of the pool carries forward
//! - final period: the base is the whole pool, since nothing can carry forward
//!
//! When no redistribution is possible the base carries forward, or on the final period is
//! reported unclaimed. Money never disappears.

use super::redistribution::{redistribute, RedistributionPolicy};
use super::{CarryReason, CommunityOutcome, Payment};
use crate::money::Cents;
use crate::squares::Square;
use crate::{GridpoolError, PlayerId, Result};

pub(crate) struct CommunityContext<'a> {
    pub price_per_square: Cents,
    pub policy: &'a RedistributionPolicy,
    pub prior_winners: &'a [PlayerId],
    pub is_final: bool,
}

pub(crate) struct CommunityResolution {
    pub outcome: CommunityOutcome,
    pub winners: Vec<Payment>,
    pub player_winnings: Cents,
    pub carried_out: Cents,
    pub dead_square_hit: bool,
}

pub(crate) fn resolve(
    square: &Square,
    period_payout: Cents,
    carried_in: Cents,
    ctx: &CommunityContext<'_>,
) -> Result<CommunityResolution> {
    let pool = period_payout.checked_add(carried_in)?;

    if let Square::OwnedBy(winner) = square {
        return Ok(CommunityResolution {
            winners: vec![Payment {
                player: winner.clone(),
                amount: pool,
                vip_bonus: Cents::ZERO,
            }],
            outcome: CommunityOutcome::OwnerWon {
                winner: winner.clone(),
                payout: pool,
            },
            player_winnings: pool,
            carried_out: Cents::ZERO,
            dead_square_hit: false,
        });
    }

    // Unsold, or HouseBackfilled (which a community grid never produces).
    let base = if ctx.is_final {
        pool
    } else {
        ctx.price_per_square.min(pool)
    };
    let rest = pool.checked_sub(base)?;

    match redistribute(base, ctx.prior_winners, ctx.policy) {
        Ok(mut out) => {
            out.carried_forward = rest;
            let winners = out
                .winners
                .iter()
                .map(|p| Payment {
                    player: p.clone(),
                    amount: out.per_winner,
                    vip_bonus: Cents::ZERO,
                })
                .collect();
            let player_winnings = out.per_winner.checked_mul(out.winners.len() as u64)?;
            Ok(CommunityResolution {
                outcome: CommunityOutcome::Redistributed(out),
                winners,
                player_winnings,
                carried_out: rest,
                dead_square_hit: true,
            })
        }
        Err(GridpoolError::RedistributionTooSmall { .. }) => {
            let reason = if ctx.prior_winners.is_empty() {
                CarryReason::NoEligibleWinners
            } else {
                CarryReason::BelowMinimumShare
            };
            let outcome = if ctx.is_final {
                CommunityOutcome::Unclaimed {
                    amount: pool,
                    reason,
                }
            } else {
                CommunityOutcome::CarriedForward {
                    amount: pool,
                    reason,
                }
            };
            Ok(CommunityResolution {
                outcome,
                winners: Vec::new(),
                player_winnings: Cents::ZERO,
                carried_out: if ctx.is_final { Cents::ZERO } else { pool },
                dead_square_hit: true,
            })
        }
        Err(e) => Err(e),
    }
}
