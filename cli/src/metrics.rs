//! Latency aggregation for `bench`.

use std::time::Duration;

use serde::Serialize;

/// Aggregated latency metrics in milliseconds.
#[derive(Clone, Debug, Default, Serialize)]
pub struct LatencyMetrics {
    pub count: usize,
    pub min_ms: f64,
    pub max_ms: f64,
    pub avg_ms: f64,
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
    /// Sequential throughput implied by the summed durations.
    pub ops_per_sec: f64,
}

impl LatencyMetrics {
    /// Build metrics from per-request durations. Empty input gives all zeros.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_durations(samples: &[Duration]) -> Self {
        let mut sorted = samples.to_vec();
        sorted.sort_unstable();
        let (Some(&fastest), Some(&slowest)) = (sorted.first(), sorted.last()) else {
            return Self::default();
        };

        let count = sorted.len();
        let total: Duration = sorted.iter().sum();
        Self {
            count,
            min_ms: as_ms(fastest),
            max_ms: as_ms(slowest),
            avg_ms: as_ms(total) / count as f64,
            p50_ms: as_ms(nearest_rank(&sorted, 50)),
            p95_ms: as_ms(nearest_rank(&sorted, 95)),
            p99_ms: as_ms(nearest_rank(&sorted, 99)),
            ops_per_sec: count as f64 / total.as_secs_f64().max(1e-9),
        }
    }

    /// One-line human summary, prefixed with `label`.
    #[must_use]
    pub fn summary_line(&self, label: &str) -> String {
        format!(
            "{label:<10} n={} min={:.2}ms avg={:.2}ms p50={:.2}ms p95={:.2}ms p99={:.2}ms max={:.2}ms ({:.1} ops/s)",
            self.count, self.min_ms, self.avg_ms, self.p50_ms, self.p95_ms, self.p99_ms, self.max_ms, self.ops_per_sec
        )
    }
}

fn as_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1_000.0
}

/// Sample at `percent` of the way through `sorted`, rank rounded half up.
fn nearest_rank(sorted: &[Duration], percent: usize) -> Duration {
    let last = sorted.len().saturating_sub(1);
    let index = (last * percent + 50) / 100;
    sorted.get(index.min(last)).copied().unwrap_or_default()
}

#[cfg(test)]
#[path = "metrics_test.rs"]
mod tests;
