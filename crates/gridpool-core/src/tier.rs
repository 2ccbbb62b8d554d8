//! Tier classification: price + access flag -> [`BoardClass`].
//!
//! Classification is one total function evaluated once at board creation. Everything
//! downstream matches on the tag instead of re-deriving price thresholds.

use crate::board::{Board, BoardConfig};
use crate::money::{Bps, Cents};
use crate::rules::{RuleCatalog, RuleSet, QUARTERS};
use crate::{GridpoolError, PlayerId, Result, VipDirectory, GRID_SQUARES};
use serde::{Deserialize, Serialize};

/// Economic model of a board.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoardClass {
    HouseStandard,
    HousePremium,
    CommunityNonPremium,
    CommunityPremiumMixed,
    CommunityPremiumVipOnly,
}

impl BoardClass {
    pub const ALL: [BoardClass; 5] = [
        BoardClass::HouseStandard,
        BoardClass::HousePremium,
        BoardClass::CommunityNonPremium,
        BoardClass::CommunityPremiumMixed,
        BoardClass::CommunityPremiumVipOnly,
    ];

    pub fn is_house(self) -> bool {
        matches!(self, BoardClass::HouseStandard | BoardClass::HousePremium)
    }

    /// Whether only VIP accounts may buy squares.
    pub fn is_vip_gated(self) -> bool {
        matches!(
            self,
            BoardClass::HousePremium | BoardClass::CommunityPremiumVipOnly
        )
    }

    pub fn is_premium(self) -> bool {
        !matches!(
            self,
            BoardClass::HouseStandard | BoardClass::CommunityNonPremium
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BoardClass::HouseStandard => "house_standard",
            BoardClass::HousePremium => "house_premium",
            BoardClass::CommunityNonPremium => "community_non_premium",
            BoardClass::CommunityPremiumMixed => "community_premium_mixed",
            BoardClass::CommunityPremiumVipOnly => "community_premium_vip_only",
        }
    }
}

impl std::fmt::Display for BoardClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Selects rule sets and VIP gating from an injected, validated [`RuleCatalog`].
#[derive(Clone, Debug)]
pub struct TierClassifier {
    catalog: RuleCatalog,
}

impl TierClassifier {
    /// Validates the catalog once; a classifier never holds an invalid catalog.
    pub fn new(catalog: RuleCatalog) -> Result<Self> {
        catalog.validate()?;
        Ok(Self { catalog })
    }

    pub fn catalog(&self) -> &RuleCatalog {
        &self.catalog
    }

    /// `>= house_premium_min_price` is premium (inclusive).
    pub fn classify_house_board(&self, price: Cents) -> BoardClass {
        if price >= self.catalog.house_premium_min_price() {
            BoardClass::HousePremium
        } else {
            BoardClass::HouseStandard
        }
    }

    /// `>= community_premium_min_price` is premium (inclusive); the access flag only
    /// matters for premium community boards.
    pub fn classify_community_board(&self, price: Cents, vip_only: bool) -> BoardClass {
        if price < self.catalog.community_premium_min_price() {
            BoardClass::CommunityNonPremium
        } else if vip_only {
            BoardClass::CommunityPremiumVipOnly
        } else {
            BoardClass::CommunityPremiumMixed
        }
    }

    /// Total classification of a board configuration.
    ///
    /// Preconditions (enforced):
    /// - `price_per_square > 0`
    /// - `squares_sold <= 100`
    pub fn classify(&self, config: &BoardConfig) -> Result<BoardClass> {
        validate_config(config)?;
        Ok(if config.is_house_board {
            self.classify_house_board(config.price_per_square)
        } else {
            self.classify_community_board(config.price_per_square, config.vip_only)
        })
    }

    pub fn rule_set(&self, class: BoardClass) -> &RuleSet {
        self.catalog.rule_set(class)
    }

    pub fn quarter_split_percentages(&self) -> [Bps; QUARTERS] {
        self.catalog.quarter_split_percentages()
    }

    pub fn max_dead_squares(&self, class: BoardClass) -> u8 {
        self.rule_set(class).max_dead_squares()
    }

    /// Pure predicate: is the board at or above its class minimum fill?
    pub fn validate_fill(&self, board: &Board) -> bool {
        board.squares_sold() >= self.rule_set(board.class()).min_fill_percentage()
    }

    /// Like [`validate_fill`](Self::validate_fill) but returns the typed error used by the
    /// guaranteed payout path.
    pub fn require_fill(&self, board: &Board) -> Result<()> {
        if self.validate_fill(board) {
            Ok(())
        } else {
            Err(GridpoolError::FillThreshold {
                class: board.class(),
                squares_sold: board.squares_sold(),
                min_required: self.rule_set(board.class()).min_fill_percentage(),
            })
        }
    }

    /// Whether `player` may buy squares on a board of `class`.
    pub fn can_join(&self, class: BoardClass, player: &PlayerId, vips: &dyn VipDirectory) -> bool {
        !class.is_vip_gated() || vips.is_vip(player)
    }
}

pub(crate) fn validate_config(config: &BoardConfig) -> Result<()> {
    if config.price_per_square.is_zero() {
        return Err(GridpoolError::Configuration(
            "price_per_square must be > 0".into(),
        ));
    }
    if config.squares_sold as usize > GRID_SQUARES {
        return Err(GridpoolError::Configuration(format!(
            "squares_sold out of range: {} > {GRID_SQUARES}",
            config.squares_sold
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn classifier() -> TierClassifier {
        TierClassifier::new(RuleCatalog::standard()).unwrap()
    }

    fn config(price: u64, house: bool, vip_only: bool) -> BoardConfig {
        BoardConfig {
            price_per_square: Cents::new(price),
            is_house_board: house,
            vip_only,
            squares_sold: 100,
        }
    }

    #[test]
    fn house_threshold_is_inclusive() {
        let c = classifier();
        assert_eq!(c.classify_house_board(Cents::new(10_000)), BoardClass::HousePremium);
        assert_eq!(c.classify_house_board(Cents::new(9_999)), BoardClass::HouseStandard);
    }

    #[test]
    fn community_classes() {
        let c = classifier();
        assert_eq!(
            c.classify_community_board(Cents::new(4_999), true),
            BoardClass::CommunityNonPremium
        );
        assert_eq!(
            c.classify_community_board(Cents::new(5_000), false),
            BoardClass::CommunityPremiumMixed
        );
        assert_eq!(
            c.classify_community_board(Cents::new(5_000), true),
            BoardClass::CommunityPremiumVipOnly
        );
    }

    #[test]
    fn classify_rejects_invalid_config() {
        let c = classifier();
        assert!(matches!(
            c.classify(&config(0, true, false)),
            Err(GridpoolError::Configuration(_))
        ));
        let mut oversold = config(100, false, false);
        oversold.squares_sold = 101;
        assert!(matches!(
            c.classify(&oversold),
            Err(GridpoolError::Configuration(_))
        ));
    }

    #[test]
    fn classify_dispatches_on_house_flag() {
        let c = classifier();
        assert_eq!(
            c.classify(&config(10_000, true, false)).unwrap(),
            BoardClass::HousePremium
        );
        assert_eq!(
            c.classify(&config(10_000, false, false)).unwrap(),
            BoardClass::CommunityPremiumMixed
        );
    }

    #[test]
    fn vip_gating() {
        let c = classifier();
        let vips: BTreeSet<PlayerId> = [PlayerId::new("vip")].into_iter().collect();
        let vip = PlayerId::new("vip");
        let regular = PlayerId::new("regular");
        assert!(c.can_join(BoardClass::HousePremium, &vip, &vips));
        assert!(!c.can_join(BoardClass::HousePremium, &regular, &vips));
        assert!(c.can_join(BoardClass::HouseStandard, &regular, &vips));
        assert!(!c.can_join(BoardClass::CommunityPremiumVipOnly, &regular, &vips));
        assert!(c.can_join(BoardClass::CommunityPremiumMixed, &regular, &vips));
    }

    #[test]
    fn alternate_catalog_moves_threshold() {
        let catalog = RuleCatalog::standard()
            .with_thresholds(Cents::dollars(200), Cents::dollars(50))
            .unwrap();
        let c = TierClassifier::new(catalog).unwrap();
        assert_eq!(c.classify_house_board(Cents::dollars(100)), BoardClass::HouseStandard);
        assert_eq!(c.classify_house_board(Cents::dollars(200)), BoardClass::HousePremium);
    }

    #[test]
    fn fill_predicate_uses_class_minimum() {
        let c = classifier();
        let mut cfg = config(10_000, true, false);
        cfg.squares_sold = 97;
        let board = Board::new("b1", &cfg, &c).unwrap();
        assert!(c.validate_fill(&board));
        assert!(c.require_fill(&board).is_ok());

        cfg.squares_sold = 96;
        let board = Board::new("b2", &cfg, &c).unwrap();
        assert!(!c.validate_fill(&board));
        assert_eq!(
            c.require_fill(&board),
            Err(GridpoolError::FillThreshold {
                class: BoardClass::HousePremium,
                squares_sold: 96,
                min_required: 97,
            })
        );
    }
}
