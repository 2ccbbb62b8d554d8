//! Settlement metrics.
//!
//! Lock-free counters updated by the settlement state machines and the desk:
//!
//! - **Counters**: periods settled, dead squares, backfills, redistributions
//! - **Gauges**: boards currently registered on a desk
//! - **Histograms**: per-period settlement latency
//!
//! ```rust,ignore
//! use gridpool_core::metrics::SettlementMetrics;
//!
//! let metrics = SettlementMetrics::new();
//! metrics.periods_settled.inc();
//! let snapshot = metrics.snapshot();
//! ```

use crate::tier::BoardClass;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::Instant;

/// Monotonic counter.
#[derive(Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    pub fn new() -> Self {
        Self {
            value: AtomicU64::new(0),
        }
    }

    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_by(&self, n: u64) {
        self.value.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

#[derive(Default)]
pub struct Gauge {
    value: AtomicU64,
}

impl Gauge {
    pub fn new() -> Self {
        Self {
            value: AtomicU64::new(0),
        }
    }

    pub fn set(&self, v: u64) {
        self.value.store(v, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Fixed-bucket histogram over microseconds.
pub struct LatencyHistogram {
    buckets: Vec<AtomicU64>,
    bounds_us: Vec<u64>,
    sum_us: AtomicU64,
    count: AtomicU64,
}

impl LatencyHistogram {
    pub fn new() -> Self {
        let bounds_us = vec![10, 50, 100, 500, 1_000, 5_000, 10_000, 50_000];
        let buckets = (0..=bounds_us.len()).map(|_| AtomicU64::new(0)).collect();
        Self {
            buckets,
            bounds_us,
            sum_us: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    pub fn observe_us(&self, value_us: u64) {
        let idx = self
            .bounds_us
            .iter()
            .position(|b| value_us <= *b)
            .unwrap_or(self.bounds_us.len());
        if let Some(bucket) = self.buckets.get(idx) {
            bucket.fetch_add(1, Ordering::Relaxed);
        }
        self.sum_us.fetch_add(value_us, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn mean_us(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            0.0
        } else {
            self.sum_us.load(Ordering::Relaxed) as f64 / count as f64
        }
    }
}

impl Default for LatencyHistogram {
    fn default() -> Self {
        Self::new()
    }
}

/// Counters shared by every board settled through one engine instance.
#[derive(Default)]
pub struct SettlementMetrics {
    pub periods_settled: Counter,
    pub dead_squares_hit: Counter,
    pub squares_backfilled: Counter,
    pub redistributions_executed: Counter,
    pub carry_forwards: Counter,
    pub unclaimed_pools: Counter,
    pub sequencing_rejections: Counter,

    pub boards_registered: Gauge,

    pub settle_latency: LatencyHistogram,

    per_class: RwLock<BTreeMap<BoardClass, u64>>,
}

/// Point-in-time copy of [`SettlementMetrics`] for export.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub periods_settled: u64,
    pub dead_squares_hit: u64,
    pub squares_backfilled: u64,
    pub redistributions_executed: u64,
    pub carry_forwards: u64,
    pub unclaimed_pools: u64,
    pub sequencing_rejections: u64,
    pub boards_registered: u64,
    pub periods_by_class: BTreeMap<BoardClass, u64>,
}

impl SettlementMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_period(&self, class: BoardClass) {
        self.periods_settled.inc();
        if let Ok(mut map) = self.per_class.write() {
            *map.entry(class).or_insert(0) += 1;
        }
    }

    pub fn periods_for(&self, class: BoardClass) -> u64 {
        self.per_class
            .read()
            .map(|m| m.get(&class).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            periods_settled: self.periods_settled.get(),
            dead_squares_hit: self.dead_squares_hit.get(),
            squares_backfilled: self.squares_backfilled.get(),
            redistributions_executed: self.redistributions_executed.get(),
            carry_forwards: self.carry_forwards.get(),
            unclaimed_pools: self.unclaimed_pools.get(),
            sequencing_rejections: self.sequencing_rejections.get(),
            boards_registered: self.boards_registered.get(),
            periods_by_class: self
                .per_class
                .read()
                .map(|m| m.clone())
                .unwrap_or_default(),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "counters": {
                "periods_settled": self.periods_settled.get(),
                "dead_squares_hit": self.dead_squares_hit.get(),
                "squares_backfilled": self.squares_backfilled.get(),
                "redistributions_executed": self.redistributions_executed.get(),
                "carry_forwards": self.carry_forwards.get(),
                "unclaimed_pools": self.unclaimed_pools.get(),
                "sequencing_rejections": self.sequencing_rejections.get(),
            },
            "gauges": {
                "boards_registered": self.boards_registered.get(),
            },
            "latencies_us": {
                "settle_mean": self.settle_latency.mean_us(),
            },
        })
    }
}

/// Records elapsed time into a histogram on drop.
pub struct StageTimer<'a> {
    histogram: &'a LatencyHistogram,
    start: Instant,
}

impl<'a> StageTimer<'a> {
    pub fn start(histogram: &'a LatencyHistogram) -> Self {
        Self {
            histogram,
            start: Instant::now(),
        }
    }
}

impl Drop for StageTimer<'_> {
    fn drop(&mut self) {
        let us = u64::try_from(self.start.elapsed().as_micros()).unwrap_or(u64::MAX);
        self.histogram.observe_us(us);
    }
}
