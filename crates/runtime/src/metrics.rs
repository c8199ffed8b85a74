use std::collections::{BTreeMap, VecDeque};

/// Deterministic metrics aggregation for one render loop.
///
/// Sorted maps keep snapshots in a stable order for logs and state reports.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Metrics {
    counters: BTreeMap<&'static str, u64>,
    gauges: BTreeMap<&'static str, i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub counters: Vec<(&'static str, u64)>,
    pub gauges: Vec<(&'static str, i64)>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.counters.clear();
        self.gauges.clear();
    }

    pub fn counter(&self, name: &str) -> u64 {
        self.counters.get(name).copied().unwrap_or(0)
    }

    pub fn inc_counter(&mut self, name: &'static str, by: u64) {
        *self.counters.entry(name).or_insert(0) += by;
    }

    pub fn gauge(&self, name: &str) -> Option<i64> {
        self.gauges.get(name).copied()
    }

    pub fn set_gauge(&mut self, name: &'static str, value: i64) {
        self.gauges.insert(name, value);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            counters: self.counters.iter().map(|(k, v)| (*k, *v)).collect(),
            gauges: self.gauges.iter().map(|(k, v)| (*k, *v)).collect(),
        }
    }
}

/// Rolling frames-per-second estimate over the last `window` frame deltas.
#[derive(Debug, Clone)]
pub struct FpsMeter {
    window: usize,
    samples: VecDeque<f64>,
    sum_s: f64,
}

impl FpsMeter {
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            samples: VecDeque::with_capacity(window),
            sum_s: 0.0,
        }
    }

    pub fn record(&mut self, dt_s: f64) {
        if !dt_s.is_finite() || dt_s <= 0.0 {
            return;
        }
        self.samples.push_back(dt_s);
        self.sum_s += dt_s;
        if self.samples.len() > self.window {
            if let Some(old) = self.samples.pop_front() {
                self.sum_s -= old;
            }
        }
    }

    /// Zero until at least one positive delta was recorded.
    pub fn fps(&self) -> f64 {
        if self.samples.is_empty() || self.sum_s <= 0.0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sum_s
    }

    pub fn reset(&mut self) {
        self.samples.clear();
        self.sum_s = 0.0;
    }
}

impl Default for FpsMeter {
    fn default() -> Self {
        Self::new(60)
    }
}
