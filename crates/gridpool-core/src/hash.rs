use crate::settlement::{
    CarryReason, CommunityOutcome, HouseOutcome, QuarterSettlement, SettlementOutcome,
};
use crate::squares::SquareOwnership;
use crate::{Hash32, PlayerId, Square};
use rayon::prelude::*;
use sha2::{Digest, Sha256};

/// Compute a domain-separated SHA-256 hash: `H(domain || data)`.
pub fn sha256_domain(domain: &[u8], data: &[u8]) -> Hash32 {
    let mut hasher = Sha256::new();
    hasher.update(domain);
    hasher.update(data);
    let result = hasher.finalize();
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&result);
    Hash32(bytes)
}

// =============================================================================
// Domain separation (v1)
// =============================================================================

/// Domain separation tag for quarter settlement receipts.
pub const QUARTER_SETTLEMENT_DOMAIN_V1: &[u8] = b"GRIDPOOL_QUARTER_SETTLEMENT_V1";

/// Domain separation tag for square grid snapshots.
pub const GRID_SNAPSHOT_DOMAIN_V1: &[u8] = b"GRIDPOOL_GRID_SNAPSHOT_V1";

fn put_str(buf: &mut Vec<u8>, s: &str) {
    buf.extend_from_slice(&(s.len() as u32).to_le_bytes());
    buf.extend_from_slice(s.as_bytes());
}

fn put_player(buf: &mut Vec<u8>, p: &PlayerId) {
    put_str(buf, p.as_str());
}

fn put_u64(buf: &mut Vec<u8>, v: u64) {
    buf.extend_from_slice(&v.to_le_bytes());
}

/// Build the canonical preimage bytes for a settlement receipt.
///
/// Layout (little-endian, strings length-prefixed with `u32`):
/// - board id, period tag (`u8`), overtime flag (`u8`), home and away score (`u32`)
/// - winning index (`u8`), dead-square flag (`u8`)
/// - period payout, carried in, house winnings, player winnings, carried out (`u64` cents)
/// - `u32` winner count, then `(player, u64 amount, u64 vip bonus)` per winner, in order
/// - `u32` backfill count, then one `u8` per backfilled index
/// - outcome tag (`u8`) followed by the outcome's own amounts
/// - grid commitment (hex string)
///
/// `receipt_id` itself is not part of the preimage.
pub fn settlement_preimage(s: &QuarterSettlement) -> Vec<u8> {
    let mut buf = Vec::with_capacity(192);
    put_str(&mut buf, s.board_id.as_str());
    buf.push(s.period.tag());
    buf.push(u8::from(s.is_overtime));
    buf.extend_from_slice(&s.home_score.to_le_bytes());
    buf.extend_from_slice(&s.away_score.to_le_bytes());
    buf.push(s.winning_index);
    buf.push(u8::from(s.dead_square_hit));
    put_u64(&mut buf, s.period_payout.get());
    put_u64(&mut buf, s.carried_in.get());
    put_u64(&mut buf, s.house_winnings.get());
    put_u64(&mut buf, s.player_winnings.get());
    put_u64(&mut buf, s.carried_out.get());

    buf.extend_from_slice(&(s.winners.len() as u32).to_le_bytes());
    for w in &s.winners {
        put_player(&mut buf, &w.player);
        put_u64(&mut buf, w.amount.get());
        put_u64(&mut buf, w.vip_bonus.get());
    }

    buf.extend_from_slice(&(s.backfilled_squares.len() as u32).to_le_bytes());
    buf.extend_from_slice(&s.backfilled_squares);

    buf.push(outcome_tag(&s.outcome));
    put_outcome(&mut buf, &s.outcome);
    put_str(&mut buf, &s.grid_commitment);
    buf
}

fn outcome_tag(outcome: &SettlementOutcome) -> u8 {
    match outcome {
        SettlementOutcome::House(HouseOutcome::PlayerWon { .. }) => 0x01,
        SettlementOutcome::House(HouseOutcome::HouseWon { .. }) => 0x02,
        SettlementOutcome::Community(CommunityOutcome::OwnerWon { .. }) => 0x11,
        SettlementOutcome::Community(CommunityOutcome::Redistributed(_)) => 0x12,
        SettlementOutcome::Community(CommunityOutcome::CarriedForward { .. }) => 0x13,
        SettlementOutcome::Community(CommunityOutcome::Unclaimed { .. }) => 0x14,
    }
}

fn carry_reason_tag(reason: CarryReason) -> u8 {
    match reason {
        CarryReason::NoEligibleWinners => 0x01,
        CarryReason::BelowMinimumShare => 0x02,
    }
}

/// Amounts carried by the outcome itself.
///
/// - house player win: winner, payout, VIP bonus
/// - house win: payout, retained VIP bonus
/// - community owner win: winner, payout
/// - redistribution: base, platform fee, organizer fee, net, per-winner share, remainder,
///   carried forward, then `u32` winner count and each winner
/// - carried forward / unclaimed: amount, reason tag (`u8`)
fn put_outcome(buf: &mut Vec<u8>, outcome: &SettlementOutcome) {
    match outcome {
        SettlementOutcome::House(HouseOutcome::PlayerWon {
            winner,
            payout,
            vip_bonus,
        }) => {
            put_player(buf, winner);
            put_u64(buf, payout.get());
            put_u64(buf, vip_bonus.get());
        }
        SettlementOutcome::House(HouseOutcome::HouseWon {
            payout,
            vip_bonus_retained,
        }) => {
            put_u64(buf, payout.get());
            put_u64(buf, vip_bonus_retained.get());
        }
        SettlementOutcome::Community(CommunityOutcome::OwnerWon { winner, payout }) => {
            put_player(buf, winner);
            put_u64(buf, payout.get());
        }
        SettlementOutcome::Community(CommunityOutcome::Redistributed(out)) => {
            for amount in [
                out.base,
                out.platform_fee,
                out.organizer_fee,
                out.net,
                out.per_winner,
                out.remainder,
                out.carried_forward,
            ] {
                put_u64(buf, amount.get());
            }
            buf.extend_from_slice(&(out.winners.len() as u32).to_le_bytes());
            for p in &out.winners {
                put_player(buf, p);
            }
        }
        SettlementOutcome::Community(
            CommunityOutcome::CarriedForward { amount, reason }
            | CommunityOutcome::Unclaimed { amount, reason },
        ) => {
            put_u64(buf, amount.get());
            buf.push(carry_reason_tag(*reason));
        }
    }
}

/// Deterministic receipt id the disbursement service uses to de-duplicate payouts.
pub fn settlement_receipt(s: &QuarterSettlement) -> Hash32 {
    sha256_domain(QUARTER_SETTLEMENT_DOMAIN_V1, &settlement_preimage(s))
}

/// Commitment to a full grid: one tag byte per cell, owners length-prefixed.
///
/// Settlement records carry the commitment of the grid as it stood after the period settled.
pub fn hash_grid(grid: &SquareOwnership) -> Hash32 {
    let mut buf = Vec::with_capacity(grid.cells().len() * 2);
    for cell in grid.cells() {
        match cell {
            Square::Unsold => buf.push(0x00),
            Square::OwnedBy(p) => {
                buf.push(0x01);
                put_player(&mut buf, p);
            }
            Square::HouseBackfilled => buf.push(0x02),
        }
    }
    sha256_domain(GRID_SNAPSHOT_DOMAIN_V1, &buf)
}

/// Receipts for a batch of settlements, computed in parallel.
pub fn settlement_receipts_parallel(settlements: &[QuarterSettlement]) -> Vec<Hash32> {
    settlements.par_iter().map(settlement_receipt).collect()
}
