use super::*;

fn millis(values: &[u64]) -> Vec<Duration> {
    values.iter().copied().map(Duration::from_millis).collect()
}

#[test]
fn empty_input_is_all_zero() {
    let m = LatencyMetrics::from_durations(&[]);
    assert_eq!(m.count, 0);
    assert!(m.max_ms.abs() < f64::EPSILON);
    assert!(m.ops_per_sec.abs() < f64::EPSILON);
}

#[test]
fn single_sample_fills_every_stat() {
    let m = LatencyMetrics::from_durations(&millis(&[8]));
    assert_eq!(m.count, 1);
    for value in [m.min_ms, m.max_ms, m.avg_ms, m.p50_ms, m.p95_ms, m.p99_ms] {
        assert!((value - 8.0).abs() < 1e-9);
    }
    assert!((m.ops_per_sec - 125.0).abs() < 1e-6);
}

#[test]
fn unsorted_input_is_ordered_before_percentiles() {
    let m = LatencyMetrics::from_durations(&millis(&[40, 10, 30, 20, 50]));
    assert!((m.min_ms - 10.0).abs() < 1e-9);
    assert!((m.max_ms - 50.0).abs() < 1e-9);
    assert!((m.avg_ms - 30.0).abs() < 1e-9);
    assert!((m.p50_ms - 30.0).abs() < 1e-9);
    assert!((m.p95_ms - 50.0).abs() < 1e-9);
}

#[test]
fn p99_of_hundred_samples() {
    let values: Vec<u64> = (1..=100).collect();
    let m = LatencyMetrics::from_durations(&millis(&values));
    assert!((m.p50_ms - 51.0).abs() < 1e-9);
    assert!((m.p99_ms - 99.0).abs() < 1e-9);
}

#[test]
fn summary_line_names_the_operation() {
    let line = LatencyMetrics::from_durations(&millis(&[5, 15])).summary_line("ping");
    assert!(line.starts_with("ping"));
    assert!(line.contains("n=2"));
    assert!(line.contains("avg=10.00ms"));
}

#[test]
fn rank_rounds_half_up() {
    let sorted = millis(&[10, 20, 30]);
    assert_eq!(nearest_rank(&sorted, 25), Duration::from_millis(20));
    assert_eq!(nearest_rank(&sorted, 24), Duration::from_millis(10));
    assert_eq!(nearest_rank(&[], 50), Duration::ZERO);
}
