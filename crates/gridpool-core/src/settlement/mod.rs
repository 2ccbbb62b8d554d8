//! Dead-square resolver: per-period settlement state machines.
//!
//! One [`BoardSettlement`] per board. Periods settle exactly once, strictly in
//! `Q1 -> Q2 -> Q3 -> Q4 -> OT` order; OT is only expected when the Q4 event was flagged
//! `is_overtime`. Every call validates and computes first and commits last, so a rejected
//! event leaves the board state untouched.
//!
//! House boards and community boards share sequencing and record keeping; the per-model
//! decisions live in [`house`] and [`community`].

pub mod community;
pub mod desk;
pub mod house;
pub mod redistribution;
pub mod stats;

pub use desk::SettlementDesk;
pub use redistribution::{redistribute, RedistributionOutcome, RedistributionPolicy};

use crate::board::Board;
use crate::hash::{hash_grid, settlement_receipt};
use crate::metrics::{SettlementMetrics, StageTimer};
use crate::money::Cents;
use crate::payout::{PayoutBreakdown, PayoutCalculator};
use crate::squares::{winning_index, SharedSquareGrid};
use crate::tier::TierClassifier;
use crate::{BoardId, GridpoolError, PlayerId, Result, VipDirectory};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Scoring period of a game.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Period {
    Q1,
    Q2,
    Q3,
    Q4,
    #[serde(rename = "OT")]
    Overtime,
}

impl Period {
    pub const REGULATION: [Period; 4] = [Period::Q1, Period::Q2, Period::Q3, Period::Q4];

    /// Stable tag used in receipts.
    pub fn tag(self) -> u8 {
        match self {
            Period::Q1 => 1,
            Period::Q2 => 2,
            Period::Q3 => 3,
            Period::Q4 => 4,
            Period::Overtime => 5,
        }
    }

    /// Index into the quarter payout table. Overtime draws from the Q4 slot.
    pub fn quarter_index(self) -> usize {
        match self {
            Period::Q1 => 0,
            Period::Q2 => 1,
            Period::Q3 => 2,
            Period::Q4 | Period::Overtime => 3,
        }
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Period::Q1 => "Q1",
            Period::Q2 => "Q2",
            Period::Q3 => "Q3",
            Period::Q4 => "Q4",
            Period::Overtime => "OT",
        })
    }
}

/// Score at the end of a period.
///
/// `is_overtime` on the Q4 event announces that the game continues into overtime; on the OT
/// event it must be `true`; on Q1..Q3 it must be `false`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreEvent {
    pub period: Period,
    pub is_overtime: bool,
    pub home_score: u32,
    pub away_score: u32,
}

impl ScoreEvent {
    pub fn new(period: Period, home_score: u32, away_score: u32) -> Self {
        Self {
            period,
            is_overtime: period == Period::Overtime,
            home_score,
            away_score,
        }
    }

    /// Q4 event of a game that goes to overtime.
    pub fn q4_to_overtime(home_score: u32, away_score: u32) -> Self {
        Self {
            period: Period::Q4,
            is_overtime: true,
            home_score,
            away_score,
        }
    }

    pub fn winning_index(&self) -> u8 {
        winning_index(self.home_score, self.away_score)
    }
}

/// One paid recipient of a period.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub player: PlayerId,
    /// Total credited to the player, `vip_bonus` included.
    pub amount: Cents,
    /// House VIP bonus inside `amount`; zero on community boards.
    #[serde(default)]
    pub vip_bonus: Cents,
}

/// House-board decision for one period. The house either pays the full amount or nothing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HouseOutcome {
    PlayerWon {
        winner: PlayerId,
        payout: Cents,
        /// Paid on top of `payout` when the winner is a VIP.
        vip_bonus: Cents,
    },
    HouseWon {
        payout: Cents,
        vip_bonus_retained: Cents,
    },
}

/// Why a community pool was not paid this period.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CarryReason {
    /// Nobody has won an earlier period on this board yet.
    NoEligibleWinners,
    /// Per-winner share would fall below the configured minimum.
    BelowMinimumShare,
}

/// Community-board decision for one period.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CommunityOutcome {
    OwnerWon { winner: PlayerId, payout: Cents },
    Redistributed(RedistributionOutcome),
    CarriedForward { amount: Cents, reason: CarryReason },
    /// Final period pool that could not be paid; the caller handles refunds.
    Unclaimed { amount: Cents, reason: CarryReason },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "model", content = "outcome", rename_all = "snake_case")]
pub enum SettlementOutcome {
    House(HouseOutcome),
    Community(CommunityOutcome),
}

/// Immutable record of one settled period.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuarterSettlement {
    pub board_id: BoardId,
    pub period: Period,
    pub is_overtime: bool,
    pub home_score: u32,
    pub away_score: u32,
    pub winning_index: u8,
    pub dead_square_hit: bool,
    /// Scheduled amount for this period (before carry-in).
    pub period_payout: Cents,
    pub carried_in: Cents,
    pub winners: Vec<Payment>,
    pub house_winnings: Cents,
    pub player_winnings: Cents,
    pub backfilled_squares: Vec<u8>,
    /// Amount flowing into the next period's pool.
    pub carried_out: Cents,
    pub outcome: SettlementOutcome,
    /// Hex commitment to the grid as it stood once this period settled.
    pub grid_commitment: String,
    /// Hex SHA-256 receipt id over the canonical record.
    pub receipt_id: String,
}

/// Where a board is in its period sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettlementState {
    Expecting(Period),
    Complete,
}

impl SettlementState {
    fn describe(self) -> String {
        match self {
            SettlementState::Expecting(p) => p.to_string(),
            SettlementState::Complete => "no further periods (board complete)".into(),
        }
    }
}

/// Sequential settlement of a single board.
pub struct BoardSettlement {
    board: Board,
    breakdown: PayoutBreakdown,
    calculator: PayoutCalculator,
    policy: RedistributionPolicy,
    grid: SharedSquareGrid,
    state: SettlementState,
    goes_to_overtime: bool,
    carry: Cents,
    prior_winners: Vec<PlayerId>,
    history: Vec<QuarterSettlement>,
    metrics: Option<Arc<SettlementMetrics>>,
}

impl std::fmt::Debug for BoardSettlement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoardSettlement")
            .field("board", &self.board.id())
            .field("class", &self.board.class())
            .field("state", &self.state)
            .field("carry", &self.carry)
            .field("settled", &self.history.len())
            .finish()
    }
}

impl BoardSettlement {
    /// Locks in the payout breakdown for `board`.
    ///
    /// Fails with `FillThreshold` for a house board below its class minimum: a guaranteed
    /// board that does not fill is never settled. Fails with `Configuration` when the grid's
    /// owned squares disagree with the board's reported sales.
    pub fn new(
        board: Board,
        grid: SharedSquareGrid,
        classifier: &TierClassifier,
        policy: RedistributionPolicy,
    ) -> Result<Self> {
        policy.validate()?;
        let calculator = PayoutCalculator::from_classifier(classifier);
        let breakdown = calculator.calculate(&board)?;
        let owned = grid.read(|g| g.sold_count())?;
        if owned != usize::from(board.squares_sold()) {
            return Err(GridpoolError::Configuration(format!(
                "board {} reports {} squares sold but its grid has {owned} owners",
                board.id(),
                board.squares_sold()
            )));
        }
        Ok(Self {
            board,
            breakdown,
            calculator,
            policy,
            grid,
            state: SettlementState::Expecting(Period::Q1),
            goes_to_overtime: false,
            carry: Cents::ZERO,
            prior_winners: Vec::new(),
            history: Vec::new(),
            metrics: None,
        })
    }

    pub fn with_metrics(mut self, metrics: Arc<SettlementMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn breakdown(&self) -> &PayoutBreakdown {
        &self.breakdown
    }

    pub fn grid(&self) -> &SharedSquareGrid {
        &self.grid
    }

    pub fn state(&self) -> SettlementState {
        self.state
    }

    pub fn expected_period(&self) -> Option<Period> {
        match self.state {
            SettlementState::Expecting(p) => Some(p),
            SettlementState::Complete => None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.state == SettlementState::Complete
    }

    pub fn history(&self) -> &[QuarterSettlement] {
        &self.history
    }

    /// Community pool waiting to be added to the next period.
    pub fn pending_carry(&self) -> Cents {
        self.carry
    }

    /// Distinct owners who won a period outright, in order of first win.
    pub fn prior_winners(&self) -> &[PlayerId] {
        &self.prior_winners
    }

    /// Scheduled amount of `period`, applying the overtime split to the Q4 slot.
    pub fn scheduled_payout(&self, period: Period, goes_to_overtime: bool) -> Result<Cents> {
        let slot = self.breakdown.quarter_payouts[period.quarter_index()];
        match period {
            Period::Q4 if goes_to_overtime => Ok(self.calculator.overtime_split(slot)?.0),
            Period::Overtime => Ok(self.calculator.overtime_split(slot)?.1),
            _ => Ok(slot),
        }
    }

    fn check_sequence(&self, event: &ScoreEvent) -> Result<()> {
        let expected = match self.state {
            SettlementState::Expecting(p) => p,
            SettlementState::Complete => {
                return Err(GridpoolError::Sequencing {
                    expected: self.state.describe(),
                    got: event.period,
                })
            }
        };
        if event.period != expected {
            return Err(GridpoolError::Sequencing {
                expected: self.state.describe(),
                got: event.period,
            });
        }
        let flag_ok = match event.period {
            Period::Q1 | Period::Q2 | Period::Q3 => !event.is_overtime,
            Period::Q4 => true,
            Period::Overtime => event.is_overtime,
        };
        if !flag_ok {
            return Err(GridpoolError::Configuration(format!(
                "is_overtime={} is not valid for {}",
                event.is_overtime, event.period
            )));
        }
        Ok(())
    }

    fn next_state(&self, event: &ScoreEvent) -> SettlementState {
        match event.period {
            Period::Q1 => SettlementState::Expecting(Period::Q2),
            Period::Q2 => SettlementState::Expecting(Period::Q3),
            Period::Q3 => SettlementState::Expecting(Period::Q4),
            Period::Q4 if event.is_overtime => SettlementState::Expecting(Period::Overtime),
            Period::Q4 | Period::Overtime => SettlementState::Complete,
        }
    }

    /// Settles the next period.
    ///
    /// Errors:
    /// - `Sequencing` if `event.period` is not the expected period (including replays)
    /// - `Configuration` if the overtime flag is inconsistent with the period
    /// - `LockPoisoned` if the grid lock was poisoned
    ///
    /// On error the board state and the grid are unchanged.
    pub fn settle(&mut self, event: &ScoreEvent, vips: &dyn VipDirectory) -> Result<QuarterSettlement> {
        if let Err(e) = self.check_sequence(event) {
            if let Some(m) = &self.metrics {
                m.sequencing_rejections.inc();
            }
            warn!(
                board = %self.board.id(),
                period = %event.period,
                expected = %self.state.describe(),
                "rejected out-of-order score event"
            );
            return Err(e);
        }
        let metrics = self.metrics.clone();
        let _timer = metrics
            .as_deref()
            .map(|m| StageTimer::start(&m.settle_latency));

        let goes_to_overtime = self.goes_to_overtime || (event.period == Period::Q4 && event.is_overtime);
        let period_payout = self.scheduled_payout(event.period, goes_to_overtime)?;
        let index = event.winning_index();

        let mut record = if self.board.is_house() {
            let vip_bonus = self.board.rule_set().vip_bonus();
            let r = house::resolve(&self.grid, index, period_payout, vip_bonus, vips)?;
            QuarterSettlement {
                board_id: self.board.id().clone(),
                period: event.period,
                is_overtime: event.is_overtime,
                home_score: event.home_score,
                away_score: event.away_score,
                winning_index: index,
                dead_square_hit: r.dead_square_hit,
                period_payout,
                carried_in: Cents::ZERO,
                winners: r.winners,
                house_winnings: r.house_winnings,
                player_winnings: r.player_winnings,
                backfilled_squares: r.backfilled,
                carried_out: Cents::ZERO,
                outcome: SettlementOutcome::House(r.outcome),
                grid_commitment: String::new(),
                receipt_id: String::new(),
            }
        } else {
            let square = self.grid.square(index)?;
            let is_final = matches!(self.next_state(event), SettlementState::Complete);
            let r = community::resolve(
                &square,
                period_payout,
                self.carry,
                &community::CommunityContext {
                    price_per_square: self.board.price_per_square(),
                    policy: &self.policy,
                    prior_winners: &self.prior_winners,
                    is_final,
                },
            )?;
            QuarterSettlement {
                board_id: self.board.id().clone(),
                period: event.period,
                is_overtime: event.is_overtime,
                home_score: event.home_score,
                away_score: event.away_score,
                winning_index: index,
                dead_square_hit: r.dead_square_hit,
                period_payout,
                carried_in: self.carry,
                winners: r.winners,
                house_winnings: Cents::ZERO,
                player_winnings: r.player_winnings,
                backfilled_squares: Vec::new(),
                carried_out: r.carried_out,
                outcome: SettlementOutcome::Community(r.outcome),
                grid_commitment: String::new(),
                receipt_id: String::new(),
            }
        };
        record.grid_commitment = self.grid.read(hash_grid)?.to_hex();
        record.receipt_id = settlement_receipt(&record).to_hex();

        // Commit.
        self.commit(event, &record);
        Ok(record)
    }

    fn commit(&mut self, event: &ScoreEvent, record: &QuarterSettlement) {
        if event.period == Period::Q4 && event.is_overtime {
            self.goes_to_overtime = true;
        }
        self.carry = record.carried_out;
        if let SettlementOutcome::Community(CommunityOutcome::OwnerWon { winner, .. }) =
            &record.outcome
        {
            if !self.prior_winners.contains(winner) {
                self.prior_winners.push(winner.clone());
            }
        }
        self.state = self.next_state(event);
        self.record_metrics(record);

        info!(
            board = %record.board_id,
            class = %self.board.class(),
            period = %record.period,
            winning_index = record.winning_index,
            dead_square = record.dead_square_hit,
            house_winnings = record.house_winnings.get(),
            player_winnings = record.player_winnings.get(),
            backfilled = record.backfilled_squares.len(),
            carried_out = record.carried_out.get(),
            receipt = %record.receipt_id,
            "period settled"
        );
        self.history.push(record.clone());
    }

    fn record_metrics(&self, record: &QuarterSettlement) {
        let Some(m) = &self.metrics else {
            return;
        };
        m.record_period(self.board.class());
        if record.dead_square_hit {
            m.dead_squares_hit.inc();
        }
        m.squares_backfilled
            .inc_by(record.backfilled_squares.len() as u64);
        match &record.outcome {
            SettlementOutcome::Community(CommunityOutcome::Redistributed(_)) => {
                m.redistributions_executed.inc()
            }
            SettlementOutcome::Community(CommunityOutcome::CarriedForward { reason, .. }) => {
                debug!(board = %record.board_id, period = %record.period, ?reason, "pool carried forward");
                m.carry_forwards.inc()
            }
            SettlementOutcome::Community(CommunityOutcome::Unclaimed { .. }) => {
                m.unclaimed_pools.inc()
            }
            _ => {}
        }
    }
}
