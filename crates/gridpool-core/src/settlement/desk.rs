//! Settlement desk: registry of open boards with one lock per board.
//!
//! Periods of one board settle sequentially under that board's write lock. Distinct boards
//! share nothing, so a batch of score events is grouped by board and the groups settle in
//! parallel on the rayon pool.

use super::{BoardSettlement, Period, QuarterSettlement, RedistributionPolicy, ScoreEvent};
use crate::board::Board;
use crate::config::EngineConfig;
use crate::metrics::SettlementMetrics;
use crate::squares::SharedSquareGrid;
use crate::tier::TierClassifier;
use crate::{BoardId, GridpoolError, Result, VipDirectory};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

type BoardSlot = Arc<RwLock<BoardSettlement>>;

pub struct SettlementDesk {
    classifier: TierClassifier,
    policy: RedistributionPolicy,
    boards: RwLock<BTreeMap<BoardId, BoardSlot>>,
    metrics: Arc<SettlementMetrics>,
}

impl SettlementDesk {
    pub fn new(classifier: TierClassifier, policy: RedistributionPolicy) -> Result<Self> {
        policy.validate()?;
        Ok(Self {
            classifier,
            policy,
            boards: RwLock::new(BTreeMap::new()),
            metrics: Arc::new(SettlementMetrics::new()),
        })
    }

    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        config.validate()?;
        Self::new(
            TierClassifier::new(config.rules.clone())?,
            config.redistribution.policy(),
        )
    }

    pub fn classifier(&self) -> &TierClassifier {
        &self.classifier
    }

    pub fn metrics(&self) -> &Arc<SettlementMetrics> {
        &self.metrics
    }

    /// Registers a locked board. Fails on duplicate ids and on house boards below their
    /// minimum fill.
    pub fn open_board(&self, board: Board, grid: SharedSquareGrid) -> Result<()> {
        let id = board.id().clone();
        let settlement = BoardSettlement::new(board, grid, &self.classifier, self.policy)?
            .with_metrics(self.metrics.clone());
        let mut boards = self
            .boards
            .write()
            .map_err(|_| GridpoolError::LockPoisoned("board registry".into()))?;
        if boards.contains_key(&id) {
            return Err(GridpoolError::Configuration(format!(
                "board {id} is already open"
            )));
        }
        boards.insert(id.clone(), Arc::new(RwLock::new(settlement)));
        self.metrics.boards_registered.set(boards.len() as u64);
        info!(board = %id, "board opened for settlement");
        Ok(())
    }

    /// Removes a board and returns its settlement history.
    pub fn close_board(&self, id: &BoardId) -> Result<Vec<QuarterSettlement>> {
        let slot = {
            let mut boards = self
                .boards
                .write()
                .map_err(|_| GridpoolError::LockPoisoned("board registry".into()))?;
            let slot = boards.remove(id).ok_or_else(|| unknown(id))?;
            self.metrics.boards_registered.set(boards.len() as u64);
            slot
        };
        let guard = slot
            .read()
            .map_err(|_| GridpoolError::LockPoisoned(format!("board {id}")))?;
        Ok(guard.history().to_vec())
    }

    pub fn board_ids(&self) -> Result<Vec<BoardId>> {
        let boards = self
            .boards
            .read()
            .map_err(|_| GridpoolError::LockPoisoned("board registry".into()))?;
        Ok(boards.keys().cloned().collect())
    }

    fn slot(&self, id: &BoardId) -> Result<BoardSlot> {
        let boards = self
            .boards
            .read()
            .map_err(|_| GridpoolError::LockPoisoned("board registry".into()))?;
        boards.get(id).cloned().ok_or_else(|| unknown(id))
    }

    /// Settles one event under the board's write lock.
    pub fn settle(
        &self,
        id: &BoardId,
        event: &ScoreEvent,
        vips: &dyn VipDirectory,
    ) -> Result<QuarterSettlement> {
        let slot = self.slot(id)?;
        let mut guard = slot
            .write()
            .map_err(|_| GridpoolError::LockPoisoned(format!("board {id}")))?;
        guard.settle(event, vips)
    }

    /// Settles a batch: events are grouped by board (keeping their relative order), boards
    /// run in parallel, each board's events run in order. A rejected event does not stop
    /// the remaining events of its board.
    pub fn settle_batch(
        &self,
        events: &[(BoardId, ScoreEvent)],
        vips: &(dyn VipDirectory + Sync),
    ) -> BTreeMap<BoardId, Vec<Result<QuarterSettlement>>> {
        let mut grouped: BTreeMap<BoardId, Vec<&ScoreEvent>> = BTreeMap::new();
        for (id, ev) in events {
            grouped.entry(id.clone()).or_default().push(ev);
        }
        debug!(boards = grouped.len(), events = events.len(), "settling batch");

        grouped
            .into_par_iter()
            .map(|(id, evs)| {
                let results: Vec<Result<QuarterSettlement>> = match self.slot(&id) {
                    Ok(slot) => match slot.write() {
                        Ok(mut guard) => evs.iter().map(|ev| guard.settle(ev, vips)).collect(),
                        Err(_) => evs
                            .iter()
                            .map(|_| Err(GridpoolError::LockPoisoned(format!("board {id}"))))
                            .collect(),
                    },
                    Err(e) => evs.iter().map(|_| Err(e.clone())).collect(),
                };
                (id, results)
            })
            .collect()
    }

    pub fn history(&self, id: &BoardId) -> Result<Vec<QuarterSettlement>> {
        let slot = self.slot(id)?;
        let guard = slot
            .read()
            .map_err(|_| GridpoolError::LockPoisoned(format!("board {id}")))?;
        Ok(guard.history().to_vec())
    }

    pub fn expected_period(&self, id: &BoardId) -> Result<Option<Period>> {
        let slot = self.slot(id)?;
        let guard = slot
            .read()
            .map_err(|_| GridpoolError::LockPoisoned(format!("board {id}")))?;
        Ok(guard.expected_period())
    }
}

fn unknown(id: &BoardId) -> GridpoolError {
    GridpoolError::Configuration(format!("unknown board {id}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::BoardConfig;
    use crate::money::Cents;
    use crate::rules::RuleCatalog;
    use crate::squares::SquareOwnership;
    use crate::{NoVips, PlayerId};

    fn desk() -> SettlementDesk {
        SettlementDesk::new(
            TierClassifier::new(RuleCatalog::standard()).unwrap(),
            RedistributionPolicy::default(),
        )
        .unwrap()
    }

    fn open(desk: &SettlementDesk, id: &str, house: bool, sold: u8) {
        let cfg = BoardConfig {
            price_per_square: Cents::dollars(20),
            is_house_board: house,
            vip_only: false,
            squares_sold: sold,
        };
        let board = Board::new(id, &cfg, desk.classifier()).unwrap();
        let grid = SquareOwnership::from_owners(
            (0..sold).map(|i| (i, PlayerId::new(format!("{id}-p{i}")))),
        )
        .unwrap();
        desk.open_board(board, SharedSquareGrid::new(grid)).unwrap();
    }

    #[test]
    fn duplicate_and_unknown_boards() {
        let d = desk();
        open(&d, "a", true, 100);
        let cfg = BoardConfig {
            price_per_square: Cents::dollars(20),
            is_house_board: true,
            vip_only: false,
            squares_sold: 100,
        };
        let again = Board::new("a", &cfg, d.classifier()).unwrap();
        let full = SquareOwnership::from_owners((0..100).map(|i| (i, PlayerId::new("x")))).unwrap();
        let err = d.open_board(again, SharedSquareGrid::new(full)).unwrap_err();
        assert!(err.to_string().contains("already open"), "{err}");
        assert!(d
            .settle(&BoardId::new("nope"), &ScoreEvent::new(Period::Q1, 0, 0), &NoVips)
            .is_err());
    }

    #[test]
    fn batch_settles_boards_independently() {
        let d = desk();
        open(&d, "a", true, 100);
        open(&d, "b", false, 100);
        open(&d, "c", false, 60);

        let mut events = Vec::new();
        for id in ["a", "b", "c"] {
            for p in Period::REGULATION {
                events.push((BoardId::new(id), ScoreEvent::new(p, 14, 10)));
            }
        }
        // Replay on "a" fails without affecting the others.
        events.push((BoardId::new("a"), ScoreEvent::new(Period::Q1, 0, 0)));

        let out = d.settle_batch(&events, &NoVips);
        assert_eq!(out.len(), 3);
        assert!(out[&BoardId::new("b")].iter().all(|r| r.is_ok()));
        assert!(out[&BoardId::new("c")].iter().all(|r| r.is_ok()));
        let a = &out[&BoardId::new("a")];
        assert_eq!(a.len(), 5);
        assert!(a[..4].iter().all(|r| r.is_ok()));
        assert!(matches!(a[4], Err(GridpoolError::Sequencing { .. })));

        assert_eq!(d.expected_period(&BoardId::new("b")).unwrap(), None);
        assert_eq!(d.metrics().snapshot().periods_settled, 12);
        assert_eq!(d.metrics().snapshot().sequencing_rejections, 1);
    }

    #[test]
    fn close_returns_history() {
        let d = desk();
        open(&d, "a", true, 100);
        d.settle(&BoardId::new("a"), &ScoreEvent::new(Period::Q1, 3, 7), &NoVips)
            .unwrap();
        let history = d.close_board(&BoardId::new("a")).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].winning_index, 37);
        assert!(d.board_ids().unwrap().is_empty());
    }
}
