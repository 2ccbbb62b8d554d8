//! Board model: validated configuration plus the class and rule set chosen at creation.

use crate::money::Cents;
use crate::rules::RuleSet;
use crate::tier::{validate_config, BoardClass, TierClassifier};
use crate::{BoardId, Result, GRID_SQUARES};
use serde::{Deserialize, Serialize};

/// Board parameters supplied by the board service at creation / lock time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardConfig {
    pub price_per_square: Cents,
    pub is_house_board: bool,
    pub vip_only: bool,
    pub squares_sold: u8,
}

impl BoardConfig {
    pub fn validate(&self) -> Result<()> {
        validate_config(self)
    }
}

/// A classified board. Class and rule set never change after construction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    id: BoardId,
    class: BoardClass,
    price_per_square: Cents,
    squares_sold: u8,
    funds_raised: Cents,
    rule_set: RuleSet,
    vip_only: bool,
}

impl Board {
    pub fn new(id: impl Into<String>, config: &BoardConfig, classifier: &TierClassifier) -> Result<Board> {
        let class = classifier.classify(config)?;
        let funds_raised = config
            .price_per_square
            .checked_mul(config.squares_sold as u64)?;
        Ok(Board {
            id: BoardId::new(id),
            class,
            price_per_square: config.price_per_square,
            squares_sold: config.squares_sold,
            funds_raised,
            rule_set: *classifier.rule_set(class),
            // House premium is VIP-gated regardless of the requested flag; house standard
            // is always open.
            vip_only: class.is_vip_gated(),
        })
    }

    pub fn id(&self) -> &BoardId {
        &self.id
    }

    pub fn class(&self) -> BoardClass {
        self.class
    }

    pub fn price_per_square(&self) -> Cents {
        self.price_per_square
    }

    pub fn squares_sold(&self) -> u8 {
        self.squares_sold
    }

    pub fn dead_squares(&self) -> u8 {
        (GRID_SQUARES as u8).saturating_sub(self.squares_sold)
    }

    /// `squares_sold * price_per_square`.
    pub fn funds_raised(&self) -> Cents {
        self.funds_raised
    }

    pub fn rule_set(&self) -> &RuleSet {
        &self.rule_set
    }

    pub fn vip_only(&self) -> bool {
        self.vip_only
    }

    pub fn is_house(&self) -> bool {
        self.class.is_house()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RuleCatalog;

    #[test]
    fn board_derives_funds_and_gating() {
        let classifier = TierClassifier::new(RuleCatalog::standard()).unwrap();
        let cfg = BoardConfig {
            price_per_square: Cents::dollars(100),
            is_house_board: true,
            vip_only: false,
            squares_sold: 98,
        };
        let board = Board::new("house-1", &cfg, &classifier).unwrap();
        assert_eq!(board.class(), BoardClass::HousePremium);
        assert!(board.vip_only());
        assert_eq!(board.funds_raised(), Cents::dollars(9_800));
        assert_eq!(board.dead_squares(), 2);
        assert_eq!(board.rule_set().min_fill_percentage(), 97);
        assert_eq!(board.id().as_str(), "house-1");
    }

    #[test]
    fn house_standard_ignores_vip_flag() {
        let classifier = TierClassifier::new(RuleCatalog::standard()).unwrap();
        let cfg = BoardConfig {
            price_per_square: Cents::dollars(25),
            is_house_board: true,
            vip_only: true,
            squares_sold: 100,
        };
        let board = Board::new("house-2", &cfg, &classifier).unwrap();
        assert_eq!(board.class(), BoardClass::HouseStandard);
        assert!(!board.vip_only());
    }

    #[test]
    fn config_round_trips_as_json() {
        let cfg = BoardConfig {
            price_per_square: Cents::new(2_500),
            is_house_board: false,
            vip_only: false,
            squares_sold: 60,
        };
        let json = serde_json::to_string(&cfg).unwrap();
        assert!(json.contains("\"price_per_square\":2500"));
        let back: BoardConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cfg);
    }
}
