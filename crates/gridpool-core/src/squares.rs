//! Square grid: 100 cells, winning index, and the per-board shared grid.

use crate::{GridpoolError, PlayerId, Result, GRID_SQUARES};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::{Arc, RwLock};

/// One cell of the 10x10 grid.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "state", content = "owner", rename_all = "snake_case")]
pub enum Square {
    Unsold,
    OwnedBy(PlayerId),
    /// Reassigned to the house after a dead-square house win. Never reverts, never wins.
    HouseBackfilled,
}

impl Square {
    pub fn owner(&self) -> Option<&PlayerId> {
        match self {
            Square::OwnedBy(p) => Some(p),
            Square::Unsold | Square::HouseBackfilled => None,
        }
    }

    pub fn is_unsold(&self) -> bool {
        matches!(self, Square::Unsold)
    }
}

/// `(home mod 10) * 10 + (away mod 10)`; always in `[0, 99]`.
pub fn winning_index(home_score: u32, away_score: u32) -> u8 {
    ((home_score % 10) * 10 + away_score % 10) as u8
}

/// `(home_digit, away_digit)` of a square index.
pub fn digits(index: u8) -> (u8, u8) {
    (index / 10, index % 10)
}

/// Snapshot of all 100 cells.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Square>", into = "Vec<Square>")]
pub struct SquareOwnership {
    cells: Vec<Square>,
}

impl SquareOwnership {
    /// A grid with every square unsold.
    pub fn unsold() -> Self {
        Self {
            cells: vec![Square::Unsold; GRID_SQUARES],
        }
    }

    /// Builds a grid from `(index, owner)` pairs; every other square is unsold.
    pub fn from_owners<I>(owners: I) -> Result<Self>
    where
        I: IntoIterator<Item = (u8, PlayerId)>,
    {
        let mut grid = Self::unsold();
        for (index, owner) in owners {
            grid.assign(index, owner)?;
        }
        Ok(grid)
    }

    pub fn get(&self, index: u8) -> Result<&Square> {
        self.cells
            .get(index as usize)
            .ok_or_else(|| GridpoolError::Configuration(format!("square index out of range: {index}")))
    }

    /// Records a sale. Only `Unsold` squares can be assigned.
    pub fn assign(&mut self, index: u8, owner: PlayerId) -> Result<()> {
        let cell = self
            .cells
            .get_mut(index as usize)
            .ok_or_else(|| GridpoolError::Configuration(format!("square index out of range: {index}")))?;
        match cell {
            Square::Unsold => {
                *cell = Square::OwnedBy(owner);
                Ok(())
            }
            Square::OwnedBy(existing) => Err(GridpoolError::Configuration(format!(
                "square {index} already owned by {existing}"
            ))),
            Square::HouseBackfilled => Err(GridpoolError::Configuration(format!(
                "square {index} is house backfilled"
            ))),
        }
    }

    pub fn sold_count(&self) -> usize {
        self.cells.iter().filter(|c| c.owner().is_some()).count()
    }

    pub fn unsold_indices(&self) -> Vec<u8> {
        self.indices_where(Square::is_unsold)
    }

    pub fn backfilled_indices(&self) -> Vec<u8> {
        self.indices_where(|c| matches!(c, Square::HouseBackfilled))
    }

    /// Distinct owners on the grid.
    pub fn owners(&self) -> BTreeSet<PlayerId> {
        self.cells.iter().filter_map(|c| c.owner().cloned()).collect()
    }

    /// Transitions every `Unsold` square except `except` to `HouseBackfilled` and returns the
    /// transitioned indices in ascending order.
    pub(crate) fn backfill_unsold_except(&mut self, except: u8) -> Vec<u8> {
        let mut out = Vec::new();
        for (idx, cell) in self.cells.iter_mut().enumerate() {
            if idx != except as usize && cell.is_unsold() {
                *cell = Square::HouseBackfilled;
                out.push(idx as u8);
            }
        }
        out
    }

    pub fn cells(&self) -> &[Square] {
        &self.cells
    }

    fn indices_where(&self, pred: impl Fn(&Square) -> bool) -> Vec<u8> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, c)| pred(c))
            .map(|(i, _)| i as u8)
            .collect()
    }
}

impl Default for SquareOwnership {
    fn default() -> Self {
        Self::unsold()
    }
}

impl TryFrom<Vec<Square>> for SquareOwnership {
    type Error = GridpoolError;

    fn try_from(cells: Vec<Square>) -> std::result::Result<Self, Self::Error> {
        if cells.len() != GRID_SQUARES {
            return Err(GridpoolError::Configuration(format!(
                "square grid must have {GRID_SQUARES} cells, got {}",
                cells.len()
            )));
        }
        Ok(Self { cells })
    }
}

impl From<SquareOwnership> for Vec<Square> {
    fn from(value: SquareOwnership) -> Self {
        value.cells
    }
}

/// Per-board grid shared between the settling writer and concurrent readers.
///
/// The writer holds the write lock across the whole backfill, so a reader sees either no
/// backfilled squares from that period or all of them.
#[derive(Clone, Debug, Default)]
pub struct SharedSquareGrid {
    inner: Arc<RwLock<SquareOwnership>>,
}

impl SharedSquareGrid {
    pub fn new(ownership: SquareOwnership) -> Self {
        Self {
            inner: Arc::new(RwLock::new(ownership)),
        }
    }

    /// Runs `f` under the read lock.
    pub fn read<T>(&self, f: impl FnOnce(&SquareOwnership) -> T) -> Result<T> {
        let guard = self
            .inner
            .read()
            .map_err(|_| GridpoolError::LockPoisoned("square grid".into()))?;
        Ok(f(&guard))
    }

    /// Runs `f` under the write lock.
    pub(crate) fn write<T>(&self, f: impl FnOnce(&mut SquareOwnership) -> T) -> Result<T> {
        let mut guard = self
            .inner
            .write()
            .map_err(|_| GridpoolError::LockPoisoned("square grid".into()))?;
        Ok(f(&mut guard))
    }

    pub fn snapshot(&self) -> Result<SquareOwnership> {
        self.read(|g| g.clone())
    }

    pub fn square(&self, index: u8) -> Result<Square> {
        self.read(|g| g.get(index).cloned())?
    }

    pub fn is_backfilled(&self, index: u8) -> Result<bool> {
        Ok(matches!(self.square(index)?, Square::HouseBackfilled))
    }

    /// Records a sale before the board locks.
    pub fn assign(&self, index: u8, owner: PlayerId) -> Result<()> {
        self.write(|g| g.assign(index, owner))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn winning_index_uses_last_digits() {
        assert_eq!(winning_index(23, 17), 37);
        assert_eq!(winning_index(0, 0), 0);
        assert_eq!(winning_index(109, 99), 99);
        assert_eq!(digits(37), (3, 7));
    }

    #[test]
    fn assign_only_unsold() {
        let mut grid = SquareOwnership::unsold();
        grid.assign(5, PlayerId::new("a")).unwrap();
        assert!(grid.assign(5, PlayerId::new("b")).is_err());
        assert!(grid.assign(100, PlayerId::new("b")).is_err());
        assert_eq!(grid.sold_count(), 1);
    }

    #[test]
    fn backfill_skips_winning_square_and_is_monotonic() {
        let mut grid =
            SquareOwnership::from_owners((0..97u8).map(|i| (i, PlayerId::new(format!("p{i}")))))
                .unwrap();
        assert_eq!(grid.unsold_indices(), vec![97, 98, 99]);
        let filled = grid.backfill_unsold_except(98);
        assert_eq!(filled, vec![97, 99]);
        assert_eq!(grid.get(98).unwrap(), &Square::Unsold);
        assert!(grid.assign(97, PlayerId::new("late")).is_err());
        assert_eq!(grid.backfilled_indices(), vec![97, 99]);
    }

    #[test]
    fn grid_requires_100_cells() {
        let short: std::result::Result<SquareOwnership, _> =
            SquareOwnership::try_from(vec![Square::Unsold; 99]);
        assert!(short.is_err());
        let json = serde_json::to_string(&SquareOwnership::unsold()).unwrap();
        let back: SquareOwnership = serde_json::from_str(&json).unwrap();
        assert_eq!(back.unsold_indices().len(), GRID_SQUARES);
    }

    #[test]
    fn shared_grid_readers_see_writes() {
        let grid = SharedSquareGrid::new(SquareOwnership::unsold());
        let reader = grid.clone();
        grid.assign(1, PlayerId::new("a")).unwrap();
        let filled = grid.write(|g| g.backfill_unsold_except(0)).unwrap();
        assert_eq!(filled.len(), 98);
        assert!(reader.is_backfilled(2).unwrap());
        assert!(!reader.is_backfilled(1).unwrap());
        assert!(!reader.is_backfilled(0).unwrap());
    }
}
