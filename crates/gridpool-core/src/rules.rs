//! Rule catalog: immutable economic parameters per board class.
//!
//! The catalog is a value, not ambient state. It is validated once at construction and
//! injected into the [`TierClassifier`](crate::tier::TierClassifier); every downstream
//! component reads parameters through the classifier's catalog, so alternate catalogs can
//! be exercised in tests without mutating anything global.

use crate::money::{Bps, Cents, BPS_U64};
use crate::tier::BoardClass;
use crate::{GridpoolError, Result, GRID_SQUARES};
use serde::{Deserialize, Serialize};

/// Number of regular quarters in a game.
pub const QUARTERS: usize = 4;

/// How the rake is taken and who keeps it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RakeModel {
    /// Single house rake; the house funds the guaranteed payouts.
    House { rake: Bps },
    /// Community rake split between the organizer (CBL) and the platform.
    Community {
        organizer: Bps,
        /// Platform share of the funds. A community VIP bonus is earmarked out of this
        /// share, so the players never fund it and the total rake stays
        /// `organizer + platform`. On VIP-only premium boards that is
        /// 5% organizer + 2% platform net + 3% VIP bonus.
        platform: Bps,
    },
}

impl RakeModel {
    /// Total rake. For community boards this is `organizer + platform` by construction.
    pub fn total(&self) -> Bps {
        match *self {
            RakeModel::House { rake } => rake,
            // Validated at RuleSet construction: the sum never exceeds 10_000.
            RakeModel::Community {
                organizer,
                platform,
            } => organizer.checked_add(platform).unwrap_or(Bps::MAX),
        }
    }
}

/// Immutable parameters for one board class.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSet {
    min_fill_percentage: u8,
    rake: RakeModel,
    vip_bonus: Bps,
    guarantees_full_payouts: bool,
}

impl RuleSet {
    /// Creates a validated rule set.
    ///
    /// Preconditions (enforced):
    /// - `min_fill_percentage <= 100`
    /// - community: `organizer + platform <= 100%`
    /// - house: `vip_bonus <= rake` (net margin cannot be negative)
    /// - community: `vip_bonus <= platform` (the bonus is earmarked from the platform share)
    /// - only house rake models may guarantee payouts
    pub fn new(
        min_fill_percentage: u8,
        rake: RakeModel,
        vip_bonus: Bps,
        guarantees_full_payouts: bool,
    ) -> Result<RuleSet> {
        if min_fill_percentage as usize > GRID_SQUARES {
            return Err(GridpoolError::Configuration(format!(
                "min_fill_percentage out of range: {min_fill_percentage}"
            )));
        }
        match rake {
            RakeModel::House { rake } => {
                if vip_bonus > rake {
                    return Err(GridpoolError::Configuration(format!(
                        "house vip_bonus {vip_bonus} exceeds rake {rake}"
                    )));
                }
            }
            RakeModel::Community {
                organizer,
                platform,
            } => {
                organizer.checked_add(platform).map_err(|_| {
                    GridpoolError::Configuration(
                        "organizer + platform rake exceeds 100%".into(),
                    )
                })?;
                if vip_bonus > platform {
                    return Err(GridpoolError::Configuration(format!(
                        "community vip_bonus {vip_bonus} exceeds platform share {platform}"
                    )));
                }
                if guarantees_full_payouts {
                    return Err(GridpoolError::Configuration(
                        "community boards cannot guarantee payouts".into(),
                    ));
                }
            }
        }
        Ok(RuleSet {
            min_fill_percentage,
            rake,
            vip_bonus,
            guarantees_full_payouts,
        })
    }

    pub fn min_fill_percentage(&self) -> u8 {
        self.min_fill_percentage
    }

    /// Squares that may stay unsold without violating the fill minimum.
    pub fn max_dead_squares(&self) -> u8 {
        (GRID_SQUARES as u8).saturating_sub(self.min_fill_percentage)
    }

    pub fn rake(&self) -> RakeModel {
        self.rake
    }

    pub fn total_rake(&self) -> Bps {
        self.rake.total()
    }

    pub fn vip_bonus(&self) -> Bps {
        self.vip_bonus
    }

    pub fn guarantees_full_payouts(&self) -> bool {
        self.guarantees_full_payouts
    }

    /// House margin after VIP bonuses: `rake - vip_bonus`; for community rule sets, the
    /// platform share net of the earmarked VIP bonus.
    pub fn net_margin(&self) -> Bps {
        let gross = match self.rake {
            RakeModel::House { rake } => rake,
            RakeModel::Community { platform, .. } => platform,
        };
        // Validated at construction: vip_bonus <= gross.
        gross.checked_sub(self.vip_bonus).unwrap_or(Bps::ZERO)
    }
}

/// The complete, validated rule catalog.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleCatalog {
    house_premium_min_price: Cents,
    community_premium_min_price: Cents,
    house_standard: RuleSet,
    house_premium: RuleSet,
    community_non_premium: RuleSet,
    community_premium_mixed: RuleSet,
    community_premium_vip_only: RuleSet,
    quarter_splits: [Bps; QUARTERS],
    overtime_final_share: Bps,
}

impl RuleCatalog {
    /// The production catalog.
    ///
    /// | class | min fill | rake | VIP bonus |
    /// |---|---|---|---|
    /// | house standard (< $100) | 95% | 5% | 5% |
    /// | house premium (>= $100, VIP-only) | 97% | 8% | 5% |
    /// | community (< $50) | 95% | 3% organizer + 2% platform | 0 |
    /// | community premium, open (>= $50) | 95% | 5% + 3% | 0 |
    /// | community premium, VIP-only (>= $50) | 95% | 5% + 5% (3% earmarked VIP bonus) | 3% |
    pub fn standard() -> RuleCatalog {
        let pct = Bps::from_percent;
        RuleCatalog {
            house_premium_min_price: Cents::dollars(100),
            community_premium_min_price: Cents::dollars(50),
            house_standard: RuleSet {
                min_fill_percentage: 95,
                rake: RakeModel::House { rake: pct(5) },
                vip_bonus: pct(5),
                guarantees_full_payouts: true,
            },
            house_premium: RuleSet {
                min_fill_percentage: 97,
                rake: RakeModel::House { rake: pct(8) },
                vip_bonus: pct(5),
                guarantees_full_payouts: true,
            },
            community_non_premium: RuleSet {
                min_fill_percentage: 95,
                rake: RakeModel::Community {
                    organizer: pct(3),
                    platform: pct(2),
                },
                vip_bonus: Bps::ZERO,
                guarantees_full_payouts: false,
            },
            community_premium_mixed: RuleSet {
                min_fill_percentage: 95,
                rake: RakeModel::Community {
                    organizer: pct(5),
                    platform: pct(3),
                },
                vip_bonus: Bps::ZERO,
                guarantees_full_payouts: false,
            },
            community_premium_vip_only: RuleSet {
                min_fill_percentage: 95,
                rake: RakeModel::Community {
                    organizer: pct(5),
                    platform: pct(5),
                },
                vip_bonus: pct(3),
                guarantees_full_payouts: false,
            },
            quarter_splits: [pct(15), pct(25), pct(15), pct(45)],
            overtime_final_share: pct(50),
        }
    }

    /// Validates the whole catalog (used after deserialization and by builders).
    pub fn validate(&self) -> Result<()> {
        if self.house_premium_min_price.is_zero() || self.community_premium_min_price.is_zero()
        {
            return Err(GridpoolError::Configuration(
                "premium price thresholds must be > 0".into(),
            ));
        }
        let split_total: u64 = self.quarter_splits.iter().map(|b| b.as_u64()).sum();
        if split_total != BPS_U64 {
            return Err(GridpoolError::Configuration(format!(
                "quarter splits must sum to 100%, got {split_total} bps"
            )));
        }
        for class in BoardClass::ALL {
            let rs = self.rule_set(class);
            // Re-run constructor validation: deserialized rule sets bypass `RuleSet::new`.
            RuleSet::new(
                rs.min_fill_percentage,
                rs.rake,
                rs.vip_bonus,
                rs.guarantees_full_payouts,
            )?;
            let house_model = matches!(rs.rake, RakeModel::House { .. });
            if house_model != class.is_house() {
                return Err(GridpoolError::Configuration(format!(
                    "rake model does not match board class {class:?}"
                )));
            }
        }
        Ok(())
    }

    /// Replaces the rule set for one class, returning a new validated catalog.
    pub fn with_rule_set(mut self, class: BoardClass, rule_set: RuleSet) -> Result<RuleCatalog> {
        match class {
            BoardClass::HouseStandard => self.house_standard = rule_set,
            BoardClass::HousePremium => self.house_premium = rule_set,
            BoardClass::CommunityNonPremium => self.community_non_premium = rule_set,
            BoardClass::CommunityPremiumMixed => self.community_premium_mixed = rule_set,
            BoardClass::CommunityPremiumVipOnly => self.community_premium_vip_only = rule_set,
        }
        self.validate()?;
        Ok(self)
    }

    /// Replaces the premium price thresholds, returning a new validated catalog.
    pub fn with_thresholds(
        mut self,
        house_premium_min_price: Cents,
        community_premium_min_price: Cents,
    ) -> Result<RuleCatalog> {
        self.house_premium_min_price = house_premium_min_price;
        self.community_premium_min_price = community_premium_min_price;
        self.validate()?;
        Ok(self)
    }

    pub fn rule_set(&self, class: BoardClass) -> &RuleSet {
        match class {
            BoardClass::HouseStandard => &self.house_standard,
            BoardClass::HousePremium => &self.house_premium,
            BoardClass::CommunityNonPremium => &self.community_non_premium,
            BoardClass::CommunityPremiumMixed => &self.community_premium_mixed,
            BoardClass::CommunityPremiumVipOnly => &self.community_premium_vip_only,
        }
    }

    /// Inclusive: a house board priced at exactly this amount is premium.
    pub fn house_premium_min_price(&self) -> Cents {
        self.house_premium_min_price
    }

    /// Inclusive: a community board priced at exactly this amount is premium.
    pub fn community_premium_min_price(&self) -> Cents {
        self.community_premium_min_price
    }

    /// Q1..Q4 share of the player pool (sums to 100%).
    pub fn quarter_split_percentages(&self) -> [Bps; QUARTERS] {
        self.quarter_splits
    }

    /// Share of the Q4 amount paid at the final overtime event when a game goes to OT.
    pub fn overtime_final_share(&self) -> Bps {
        self.overtime_final_share
    }
}

impl Default for RuleCatalog {
    fn default() -> Self {
        Self::standard()
    }
}
