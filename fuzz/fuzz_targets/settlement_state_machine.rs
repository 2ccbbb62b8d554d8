#![no_main]

use gridpool_core::settlement::{CommunityOutcome, RedistributionPolicy, SettlementState};
use gridpool_core::{
    Board, BoardConfig, BoardSettlement, Cents, GridpoolError, Period, PlayerId, RuleCatalog,
    ScoreEvent, SettlementOutcome, SharedSquareGrid, Square, SquareOwnership, TierClassifier,
};
use libfuzzer_sys::fuzz_target;
use std::collections::BTreeSet;

const PERIODS: [Period; 5] = [
    Period::Q1,
    Period::Q2,
    Period::Q3,
    Period::Q4,
    Period::Overtime,
];

fn take(data: &mut &[u8]) -> Option<u8> {
    let (first, rest) = data.split_first()?;
    *data = rest;
    Some(*first)
}

fuzz_target!(|data: &[u8]| {
    let mut input = data;
    let Some(kind) = take(&mut input) else {
        return;
    };
    let Some(price_byte) = take(&mut input) else {
        return;
    };
    let Some(unsold_count) = take(&mut input) else {
        return;
    };

    let is_house = kind & 1 == 1;
    let vip_only = kind & 2 == 2;
    let price = Cents::new(100 + u64::from(price_byte) * 1_000);

    // A few unsold squares, each drawn from the input.
    let mut unsold = BTreeSet::new();
    for _ in 0..(unsold_count % 6) {
        if let Some(i) = take(&mut input) {
            unsold.insert(i % 100);
        }
    }
    let grid = match SquareOwnership::from_owners(
        (0..100u8)
            .filter(|i| !unsold.contains(i))
            .map(|i| (i, PlayerId::new(format!("p{}", i % 7)))),
    ) {
        Ok(g) => g,
        Err(_) => return,
    };

    let classifier = match TierClassifier::new(RuleCatalog::standard()) {
        Ok(c) => c,
        Err(_) => return,
    };
    let config = BoardConfig {
        price_per_square: price,
        is_house_board: is_house,
        vip_only,
        squares_sold: grid.sold_count() as u8,
    };
    let board = match Board::new("fuzz", &config, &classifier) {
        Ok(b) => b,
        Err(_) => return,
    };
    let mut settlement = match BoardSettlement::new(
        board,
        SharedSquareGrid::new(grid),
        &classifier,
        RedistributionPolicy::default(),
    ) {
        Ok(s) => s,
        Err(GridpoolError::FillThreshold { .. }) => return,
        Err(e) => panic!("unexpected open failure: {e}"),
    };
    let pool = settlement.breakdown().player_pool.get();
    let vips: BTreeSet<PlayerId> = [PlayerId::new("p0")].into_iter().collect();

    let mut accounted = 0u64;
    while let (Some(p), Some(h), Some(a)) = (take(&mut input), take(&mut input), take(&mut input)) {
        let period = PERIODS[usize::from(p % 5)];
        let event = ScoreEvent {
            period,
            is_overtime: p & 0x80 == 0x80,
            home_score: u32::from(h),
            away_score: u32::from(a),
        };

        let state_before = settlement.state();
        let grid_before = settlement.grid().snapshot().expect("grid lock");
        let settled_before = settlement.history().len();

        match settlement.settle(&event, &vips) {
            Ok(record) => {
                assert_eq!(state_before, SettlementState::Expecting(period));
                assert_eq!(record.winning_index, event.winning_index());
                assert_eq!(settlement.history().len(), settled_before + 1);

                let winners: u64 = record.winners.iter().map(|w| w.amount.get()).sum();
                assert_eq!(winners, record.player_winnings.get());

                // Backfill only ever turns unsold squares into house squares.
                for &i in &record.backfilled_squares {
                    assert_eq!(grid_before.get(i).expect("index"), &Square::Unsold);
                    assert!(settlement.grid().is_backfilled(i).expect("grid lock"));
                }

                // VIP bonuses come out of the house rake, not the player pool.
                let bonuses: u64 = record.winners.iter().map(|w| w.vip_bonus.get()).sum();
                assert!(bonuses == 0 || is_house);
                accounted += record.player_winnings.get() - bonuses + record.house_winnings.get();
                match &record.outcome {
                    SettlementOutcome::Community(CommunityOutcome::Redistributed(out)) => {
                        accounted += out.platform_total().get() + out.organizer_fee.get();
                    }
                    SettlementOutcome::Community(CommunityOutcome::Unclaimed { amount, .. }) => {
                        accounted += amount.get();
                    }
                    _ => {}
                }
            }
            Err(_) => {
                // Rejected events never mutate the board.
                assert_eq!(settlement.state(), state_before);
                assert_eq!(settlement.history().len(), settled_before);
                assert_eq!(settlement.grid().snapshot().expect("grid lock"), grid_before);
            }
        }
    }

    if settlement.is_complete() {
        assert_eq!(settlement.pending_carry(), Cents::ZERO);
        assert_eq!(accounted, pool);
    }
});
