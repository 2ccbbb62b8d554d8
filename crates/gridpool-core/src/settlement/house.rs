//! House-board resolution.
//!
//! The house guarantees every period. An owned winning square collects the full amount; an
//! unsold (or already backfilled) winning square means the house keeps the amount, and every
//! other still-unsold square is backfilled to the house so it can never win later.

use super::{HouseOutcome, Payment};
use crate::money::{Bps, Cents};
use crate::squares::{SharedSquareGrid, Square};
use crate::{Result, VipDirectory};

pub(crate) struct HouseResolution {
    pub outcome: HouseOutcome,
    pub winners: Vec<Payment>,
    pub house_winnings: Cents,
    pub player_winnings: Cents,
    pub backfilled: Vec<u8>,
    pub dead_square_hit: bool,
}

/// Resolves one period and applies the backfill.
///
/// All fallible arithmetic and the VIP lookup happen before the write lock is taken; under the
/// lock the only mutation is the backfill itself, so readers observe all of it or none of it.
/// A VIP winner's payment carries the bonus on top of the period payout.
pub(crate) fn resolve(
    grid: &SharedSquareGrid,
    index: u8,
    payout: Cents,
    vip_bonus_pct: Bps,
    vips: &dyn VipDirectory,
) -> Result<HouseResolution> {
    let vip_bonus = payout.floor_bps(vip_bonus_pct)?;
    let with_bonus = payout.checked_add(vip_bonus)?;
    // Owned squares never change hands, so the owner seen here is the owner under the lock.
    let vip_owner = match grid.square(index)? {
        Square::OwnedBy(owner) if vips.is_vip(&owner) => Some(owner),
        _ => None,
    };

    grid.write(|g| -> Result<HouseResolution> {
        let square = g.get(index)?.clone();
        Ok(match square {
            Square::OwnedBy(winner) => {
                let bonus = if vip_owner.as_ref() == Some(&winner) {
                    vip_bonus
                } else {
                    Cents::ZERO
                };
                let total = if bonus.is_zero() { payout } else { with_bonus };
                HouseResolution {
                    winners: vec![Payment {
                        player: winner.clone(),
                        amount: total,
                        vip_bonus: bonus,
                    }],
                    outcome: HouseOutcome::PlayerWon {
                        winner,
                        payout,
                        vip_bonus: bonus,
                    },
                    house_winnings: Cents::ZERO,
                    player_winnings: total,
                    backfilled: Vec::new(),
                    dead_square_hit: false,
                }
            }
            Square::Unsold | Square::HouseBackfilled => HouseResolution {
                outcome: HouseOutcome::HouseWon {
                    payout,
                    vip_bonus_retained: vip_bonus,
                },
                winners: Vec::new(),
                house_winnings: payout,
                player_winnings: Cents::ZERO,
                backfilled: g.backfill_unsold_except(index),
                dead_square_hit: true,
            },
        })
    })?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::squares::SquareOwnership;
    use crate::PlayerId;
    use std::collections::BTreeSet;

    fn grid_with(sold: u8) -> SharedSquareGrid {
        SharedSquareGrid::new(
            SquareOwnership::from_owners((0..sold).map(|i| (i, PlayerId::new(format!("p{i}")))))
                .unwrap(),
        )
    }

    #[test]
    fn owned_square_pays_owner_and_vip_bonus() {
        let grid = grid_with(100);
        let vips: BTreeSet<PlayerId> = [PlayerId::new("p37")].into_iter().collect();
        let r = resolve(&grid, 37, Cents::dollars(4_140), Bps::new(500).unwrap(), &vips).unwrap();
        assert_eq!(r.player_winnings, Cents::dollars(4_347));
        assert_eq!(
            r.winners,
            vec![Payment {
                player: PlayerId::new("p37"),
                amount: Cents::dollars(4_347),
                vip_bonus: Cents::dollars(207),
            }]
        );
        assert_eq!(
            r.outcome,
            HouseOutcome::PlayerWon {
                winner: PlayerId::new("p37"),
                payout: Cents::dollars(4_140),
                vip_bonus: Cents::dollars(207),
            }
        );
        assert!(r.backfilled.is_empty());
    }

    /// Directory that inspects the grid itself; it must never be consulted under the write lock.
    struct GridAwareVips(SharedSquareGrid);

    impl VipDirectory for GridAwareVips {
        fn is_vip(&self, player: &PlayerId) -> bool {
            self.0.read(|g| g.sold_count()).is_ok() && player.as_str() == "p37"
        }
    }

    #[test]
    fn vip_lookup_runs_outside_the_grid_lock() {
        let grid = grid_with(100);
        let vips = GridAwareVips(grid.clone());
        let r = resolve(&grid, 37, Cents::dollars(1_000), Bps::new(500).unwrap(), &vips).unwrap();
        assert_eq!(r.winners[0].vip_bonus, Cents::dollars(50));
        assert_eq!(r.player_winnings, Cents::dollars(1_050));

        let plain = resolve(&grid, 38, Cents::dollars(1_000), Bps::new(500).unwrap(), &vips).unwrap();
        assert_eq!(plain.winners[0].vip_bonus, Cents::ZERO);
        assert_eq!(plain.player_winnings, Cents::dollars(1_000));
    }

    #[test]
    fn dead_square_backfills_every_other_unsold() {
        let grid = grid_with(97);
        let r = resolve(
            &grid,
            99,
            Cents::dollars(4_140),
            Bps::new(500).unwrap(),
            &crate::NoVips,
        )
        .unwrap();
        assert_eq!(r.house_winnings, Cents::dollars(4_140));
        assert_eq!(r.player_winnings, Cents::ZERO);
        assert_eq!(r.backfilled, vec![97, 98]);
        assert!(grid.is_backfilled(97).unwrap());
        assert!(!grid.is_backfilled(99).unwrap());

        // The same dead square again: house wins, nothing left to backfill.
        let again = resolve(&grid, 99, Cents::dollars(100), Bps::ZERO, &crate::NoVips).unwrap();
        assert!(again.dead_square_hit);
        assert!(again.backfilled.is_empty());

        // A backfilled square is also a house win; the last unsold square goes with it.
        let third = resolve(&grid, 98, Cents::dollars(100), Bps::ZERO, &crate::NoVips).unwrap();
        assert!(third.dead_square_hit);
        assert_eq!(third.backfilled, vec![99]);
        assert!(grid.read(|g| g.unsold_indices().is_empty()).unwrap());
    }
}
