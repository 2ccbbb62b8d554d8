//! Payout calculator: funds raised + rule set -> per-quarter payout pools.
//!
//! Invariants (checked in tests):
//! - `organizer_share + platform_share == total_rake`
//! - `sum(quarter_payouts) == player_pool` exactly, remainder in Q4
//! - house quarter payouts never depend on actual fill

use crate::board::Board;
use crate::money::{split_by_weights, Bps, Cents};
use crate::rules::{RakeModel, RuleCatalog, RuleSet, QUARTERS};
use crate::tier::{BoardClass, TierClassifier};
use crate::{GridpoolError, Result, GRID_SQUARES};
use serde::{Deserialize, Serialize};

/// House-side accounting on actual revenue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HouseEconomics {
    pub total_revenue: Cents,
    pub house_take: Cents,
    pub vip_bonus_pool: Cents,
    /// `house_take - vip_bonus_pool`.
    pub net_margin: Cents,
    /// `100 * price * (1 - rake)`: what the house owes players across all quarters.
    pub guaranteed_pool: Cents,
}

/// Split of a board's funds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutBreakdown {
    pub class: BoardClass,
    pub funds_raised: Cents,
    pub total_rake: Cents,
    pub organizer_share: Cents,
    pub platform_share: Cents,
    /// Earmarked VIP bonus (house: on revenue; community VIP-only: out of the platform share).
    pub vip_bonus_pool: Cents,
    pub platform_net: Cents,
    pub player_pool: Cents,
    pub quarter_payouts: [Cents; QUARTERS],
    pub house: Option<HouseEconomics>,
}

impl PayoutBreakdown {
    pub fn quarter_total(&self) -> Cents {
        Cents::new(self.quarter_payouts.iter().map(|c| c.get()).sum())
    }
}

/// Stateless calculator bound to the catalog's quarter splits.
#[derive(Clone, Copy, Debug)]
pub struct PayoutCalculator {
    splits: [Bps; QUARTERS],
    overtime_final_share: Bps,
}

impl PayoutCalculator {
    pub fn new(catalog: &RuleCatalog) -> Self {
        Self {
            splits: catalog.quarter_split_percentages(),
            overtime_final_share: catalog.overtime_final_share(),
        }
    }

    pub fn from_classifier(classifier: &TierClassifier) -> Self {
        Self::new(classifier.catalog())
    }

    /// Dispatches on the board class.
    pub fn calculate(&self, board: &Board) -> Result<PayoutBreakdown> {
        if board.is_house() {
            self.house_breakdown(board)
        } else {
            self.community_breakdown(board)
        }
    }

    /// Guaranteed per-quarter table for a house board priced at `price`.
    pub fn house_payout_table(&self, price: Cents, rule_set: &RuleSet) -> Result<[Cents; QUARTERS]> {
        let pool = guaranteed_pool(price, rule_set)?;
        split_by_weights(pool, &self.splits)
    }

    /// Accounting on actual revenue.
    ///
    /// Preconditions (enforced):
    /// - house board
    /// - at or above class minimum fill (else `FillThreshold`)
    pub fn house_economics(&self, board: &Board) -> Result<HouseEconomics> {
        let rs = board.rule_set();
        let RakeModel::House { rake } = rs.rake() else {
            return Err(GridpoolError::Configuration(format!(
                "house economics requested for {} board",
                board.class()
            )));
        };
        require_price(board.price_per_square())?;
        if board.squares_sold() < rs.min_fill_percentage() {
            return Err(GridpoolError::FillThreshold {
                class: board.class(),
                squares_sold: board.squares_sold(),
                min_required: rs.min_fill_percentage(),
            });
        }
        let total_revenue = board.funds_raised();
        let house_take = total_revenue.floor_bps(rake)?;
        let vip_bonus_pool = total_revenue.floor_bps(rs.vip_bonus())?;
        let net_margin = house_take.checked_sub(vip_bonus_pool)?;
        Ok(HouseEconomics {
            total_revenue,
            house_take,
            vip_bonus_pool,
            net_margin,
            guaranteed_pool: guaranteed_pool(board.price_per_square(), rs)?,
        })
    }

    fn house_breakdown(&self, board: &Board) -> Result<PayoutBreakdown> {
        let econ = self.house_economics(board)?;
        let quarter_payouts = self.house_payout_table(board.price_per_square(), board.rule_set())?;
        Ok(PayoutBreakdown {
            class: board.class(),
            funds_raised: econ.total_revenue,
            total_rake: econ.house_take,
            organizer_share: Cents::ZERO,
            platform_share: econ.house_take,
            vip_bonus_pool: econ.vip_bonus_pool,
            platform_net: econ.net_margin,
            player_pool: econ.guaranteed_pool,
            quarter_payouts,
            house: Some(econ),
        })
    }

    fn community_breakdown(&self, board: &Board) -> Result<PayoutBreakdown> {
        let rs = board.rule_set();
        let RakeModel::Community { organizer, .. } = rs.rake() else {
            return Err(GridpoolError::Configuration(format!(
                "community breakdown requested for {} board",
                board.class()
            )));
        };
        require_price(board.price_per_square())?;
        let funds = board.funds_raised();
        let total_rake = funds.floor_bps(rs.total_rake())?;
        let organizer_share = funds.floor_bps(organizer)?;
        let platform_share = total_rake.checked_sub(organizer_share)?;
        let vip_bonus_pool = funds.floor_bps(rs.vip_bonus())?;
        let platform_net = platform_share.checked_sub(vip_bonus_pool)?;
        let player_pool = funds.checked_sub(total_rake)?;
        let quarter_payouts = split_by_weights(player_pool, &self.splits)?;
        Ok(PayoutBreakdown {
            class: board.class(),
            funds_raised: funds,
            total_rake,
            organizer_share,
            platform_share,
            vip_bonus_pool,
            platform_net,
            player_pool,
            quarter_payouts,
            house: None,
        })
    }

    /// Splits the Q4 amount of an overtime game: `(end_of_regulation, final_overtime)`.
    /// The final event takes the rounding remainder.
    pub fn overtime_split(&self, q4: Cents) -> Result<(Cents, Cents)> {
        let regulation_share = Bps::MAX.checked_sub(self.overtime_final_share)?;
        let regulation = q4.floor_bps(regulation_share)?;
        let final_ot = q4.checked_sub(regulation)?;
        Ok((regulation, final_ot))
    }
}

fn require_price(price: Cents) -> Result<()> {
    if price.is_zero() {
        return Err(GridpoolError::Configuration(
            "price_per_square must be > 0".into(),
        ));
    }
    Ok(())
}

fn guaranteed_pool(price: Cents, rule_set: &RuleSet) -> Result<Cents> {
    require_price(price)?;
    let full = price.checked_mul(GRID_SQUARES as u64)?;
    let rake = full.floor_bps(rule_set.total_rake())?;
    full.checked_sub(rake)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::BoardConfig;
    use proptest::prelude::*;

    fn setup() -> (TierClassifier, PayoutCalculator) {
        let classifier = TierClassifier::new(RuleCatalog::standard()).unwrap();
        let calc = PayoutCalculator::from_classifier(&classifier);
        (classifier, calc)
    }

    fn board(c: &TierClassifier, price: u64, house: bool, vip_only: bool, sold: u8) -> Board {
        let cfg = BoardConfig {
            price_per_square: Cents::new(price),
            is_house_board: house,
            vip_only,
            squares_sold: sold,
        };
        Board::new("b", &cfg, c).unwrap()
    }

    #[test]
    fn premium_house_table() {
        let (c, calc) = setup();
        let b = board(&c, 10_000, true, false, 98);
        let out = calc.calculate(&b).unwrap();
        assert_eq!(out.player_pool, Cents::dollars(9_200));
        assert_eq!(
            out.quarter_payouts,
            [
                Cents::dollars(1_380),
                Cents::dollars(2_300),
                Cents::dollars(1_380),
                Cents::dollars(4_140),
            ]
        );
        let econ = out.house.unwrap();
        assert_eq!(econ.total_revenue, Cents::dollars(9_800));
        assert_eq!(econ.house_take, Cents::dollars(784));
        assert_eq!(econ.vip_bonus_pool, Cents::dollars(490));
        assert_eq!(econ.net_margin, Cents::dollars(294));
    }

    #[test]
    fn house_table_ignores_fill() {
        let (c, calc) = setup();
        let full = calc.calculate(&board(&c, 2_000, true, false, 100)).unwrap();
        let partial = calc.calculate(&board(&c, 2_000, true, false, 95)).unwrap();
        assert_eq!(full.quarter_payouts, partial.quarter_payouts);
    }

    #[test]
    fn house_below_min_fill_is_refused() {
        let (c, calc) = setup();
        let err = calc.calculate(&board(&c, 10_000, true, false, 96)).unwrap_err();
        assert_eq!(
            err,
            GridpoolError::FillThreshold {
                class: BoardClass::HousePremium,
                squares_sold: 96,
                min_required: 97,
            }
        );
    }

    #[test]
    fn community_vip_only_reports_earmarked_bonus() {
        let (c, calc) = setup();
        let out = calc.calculate(&board(&c, 5_000, false, true, 100)).unwrap();
        // funds $5,000; rake 10% = $500 = organizer $250 + platform $250.
        assert_eq!(out.total_rake, Cents::dollars(500));
        assert_eq!(out.organizer_share, Cents::dollars(250));
        assert_eq!(out.platform_share, Cents::dollars(250));
        assert_eq!(out.vip_bonus_pool, Cents::dollars(150));
        assert_eq!(out.platform_net, Cents::dollars(100));
        assert_eq!(out.player_pool, Cents::dollars(4_500));
        assert!(out.house.is_none());
    }

    #[test]
    fn overtime_split_gives_remainder_to_final_event() {
        let (_, calc) = setup();
        assert_eq!(
            calc.overtime_split(Cents::dollars(4_140)).unwrap(),
            (Cents::dollars(2_070), Cents::dollars(2_070))
        );
        assert_eq!(
            calc.overtime_split(Cents::new(101)).unwrap(),
            (Cents::new(50), Cents::new(51))
        );
    }

    proptest! {
        #[test]
        fn community_quarters_sum_to_player_pool(
            price in 1u64..1_000_000u64,
            sold in 1u8..=100u8,
            vip_only in any::<bool>(),
        ) {
            let (c, calc) = setup();
            let b = board(&c, price, false, vip_only, sold);
            let out = calc.calculate(&b).unwrap();
            prop_assert_eq!(out.quarter_total(), out.player_pool);
            prop_assert_eq!(
                out.organizer_share.get() + out.platform_share.get(),
                out.total_rake.get()
            );
            prop_assert_eq!(out.player_pool.get() + out.total_rake.get(), out.funds_raised.get());
        }

        #[test]
        fn overtime_split_conserves(q4 in 0u64..1_000_000_000u64) {
            let (_, calc) = setup();
            let (reg, ot) = calc.overtime_split(Cents::new(q4)).unwrap();
            prop_assert_eq!(reg.get() + ot.get(), q4);
            prop_assert!(ot >= reg);
        }
    }
}
