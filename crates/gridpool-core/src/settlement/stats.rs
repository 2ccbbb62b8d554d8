//! House-board reporting: realized win statistics and per-quarter risk scenarios.

use super::{Period, QuarterSettlement};
use crate::money::{mul_div_floor_u64, Bps, Cents, BPS_U64};
use crate::payout::PayoutCalculator;
use crate::rules::RuleSet;
use crate::{GridpoolError, Result, GRID_SQUARES};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HouseBoardStats {
    pub total_periods: u64,
    /// Periods where the winning square was dead.
    pub house_wins: u64,
    pub house_win_rate: Bps,
    /// Period payouts plus any VIP bonuses credited to winners.
    pub total_paid_to_players: Cents,
    pub total_house_winnings: Cents,
    /// `total_house_winnings - total_paid_to_players`; negative when the house paid out more.
    pub net_house_position: i128,
}

/// Aggregates settled periods. An empty slice yields all-zero stats.
pub fn house_board_stats(results: &[QuarterSettlement]) -> Result<HouseBoardStats> {
    let total_periods = results.len() as u64;
    let house_wins = results.iter().filter(|r| r.dead_square_hit).count() as u64;
    let mut paid = Cents::ZERO;
    let mut won = Cents::ZERO;
    for r in results {
        paid = paid.checked_add(r.player_winnings)?;
        won = won.checked_add(r.house_winnings)?;
    }
    let house_win_rate = if total_periods == 0 {
        Bps::ZERO
    } else {
        let bps = mul_div_floor_u64(house_wins, BPS_U64, total_periods)?;
        Bps::new(u16::try_from(bps).map_err(|_| GridpoolError::Overflow("win rate".into()))?)?
    };
    Ok(HouseBoardStats {
        total_periods,
        house_wins,
        house_win_rate,
        total_paid_to_players: paid,
        total_house_winnings: won,
        net_house_position: won.get() as i128 - paid.get() as i128,
    })
}

/// What the house stands to pay or keep in one quarter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HouseRiskScenario {
    pub period: Period,
    pub quarter_payout: Cents,
    /// Paid out if the winning square is owned.
    pub house_risk: Cents,
    /// Kept if the winning square is dead.
    pub house_potential_win: Cents,
    /// `dead_squares / 100`, assuming uniformly distributed digits.
    pub house_win_probability: Bps,
}

/// One scenario per regulation quarter for a house board priced at `price`.
pub fn simulate_house_scenarios(
    calculator: &PayoutCalculator,
    price: Cents,
    rule_set: &RuleSet,
    dead_squares: u8,
) -> Result<Vec<HouseRiskScenario>> {
    if dead_squares as usize > GRID_SQUARES {
        return Err(GridpoolError::Configuration(format!(
            "dead_squares out of range: {dead_squares}"
        )));
    }
    let table = calculator.house_payout_table(price, rule_set)?;
    let probability = Bps::new(dead_squares as u16 * 100)?;
    Ok(Period::REGULATION
        .iter()
        .zip(table)
        .map(|(&period, payout)| HouseRiskScenario {
            period,
            quarter_payout: payout,
            house_risk: payout,
            house_potential_win: payout,
            house_win_probability: probability,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RuleCatalog;
    use crate::tier::BoardClass;

    #[test]
    fn empty_results_are_zero() {
        let s = house_board_stats(&[]).unwrap();
        assert_eq!(s, HouseBoardStats::default());
    }

    #[test]
    fn premium_scenarios() {
        let catalog = RuleCatalog::standard();
        let calc = PayoutCalculator::new(&catalog);
        let rs = catalog.rule_set(BoardClass::HousePremium);
        let out = simulate_house_scenarios(&calc, Cents::dollars(100), rs, 3).unwrap();
        assert_eq!(out.len(), 4);
        assert_eq!(out[3].period, Period::Q4);
        assert_eq!(out[3].house_risk, Cents::dollars(4_140));
        assert_eq!(out[0].house_win_probability.get(), 300);
        assert!(simulate_house_scenarios(&calc, Cents::dollars(100), rs, 101).is_err());
    }
}
