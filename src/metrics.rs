use lazy_static::lazy_static;
use prometheus::{
    Counter, CounterVec, Encoder, Gauge, Histogram, HistogramOpts, Opts, Registry, TextEncoder,
};
use std::time::Duration;

/// Metric name prefix for all shared playlists metrics
const PREFIX: &str = "shared_playlists";

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // Run lifecycle
    pub static ref RUNS_STARTED_TOTAL: Counter = Counter::new(
        format!("{PREFIX}_runs_started_total"),
        "Total number of aggregation runs started"
    ).expect("Failed to create runs_started_total metric");

    pub static ref RUNS_FINISHED_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_runs_finished_total"), "Aggregation runs by outcome"),
        &["outcome"]
    ).expect("Failed to create runs_finished_total metric");

    pub static ref RUN_DURATION_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            format!("{PREFIX}_run_duration_seconds"),
            "Aggregation run duration in seconds"
        )
        .buckets(vec![0.1, 1.0, 5.0, 30.0, 60.0, 300.0, 600.0, 1200.0])
    ).expect("Failed to create run_duration_seconds metric");

    // Fetching
    pub static ref MEMBER_FETCH_FAILURES_TOTAL: Counter = Counter::new(
        format!("{PREFIX}_member_fetch_failures_total"),
        "Total member library fetches that failed"
    ).expect("Failed to create member_fetch_failures_total metric");

    // Output
    pub static ref SHARED_TRACKS: Gauge = Gauge::new(
        format!("{PREFIX}_shared_tracks"),
        "Number of shared tracks found by the last successful run"
    ).expect("Failed to create shared_tracks metric");
}

/// Initialize all metrics and register them with the Prometheus registry
pub fn init_metrics() {
    // Register all metrics - ignore errors if already registered (for tests)
    let _ = REGISTRY.register(Box::new(RUNS_STARTED_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(RUNS_FINISHED_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(RUN_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(MEMBER_FETCH_FAILURES_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(SHARED_TRACKS.clone()));

    tracing::info!("Metrics system initialized successfully");
}

pub fn record_run_started() {
    RUNS_STARTED_TOTAL.inc();
}

/// Record the terminal outcome of a run ("success", "failed", "expired", "panic")
pub fn record_run_finished(outcome: &str, duration: Duration) {
    RUNS_FINISHED_TOTAL.with_label_values(&[outcome]).inc();
    RUN_DURATION_SECONDS.observe(duration.as_secs_f64());
}

pub fn record_member_fetch_failure() {
    MEMBER_FETCH_FAILURES_TOTAL.inc();
}

pub fn set_shared_tracks(count: usize) {
    SHARED_TRACKS.set(count as f64);
}

/// Render all registered metrics in the Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_initialization() {
        init_metrics();

        let metric_families = REGISTRY.gather();
        assert!(!metric_families.is_empty(), "Metrics should be registered");
    }

    #[test]
    fn test_record_run_finished() {
        init_metrics();

        record_run_started();
        record_run_finished("success", Duration::from_millis(250));

        let metrics = REGISTRY.gather();
        let finished = metrics
            .iter()
            .find(|m| m.get_name() == "shared_playlists_runs_finished_total");
        assert!(finished.is_some(), "Run outcome metrics should exist");
    }

    #[test]
    fn test_encode_metrics() {
        init_metrics();

        record_member_fetch_failure();
        set_shared_tracks(12);

        let text = encode_metrics();
        assert!(text.contains("shared_playlists_member_fetch_failures_total"));
        assert!(text.contains("shared_playlists_shared_tracks"));
    }
}
