//! Metrics recording implementation using Prometheus.

use prometheus::{
    register_counter_vec_with_registry, register_histogram_vec_with_registry, CounterVec,
    Encoder, HistogramVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

/// Trait for recording application metrics.
pub trait MetricsRecorder: Clone + Send + Sync + 'static {
    /// Records the outcome of one gate evaluation.
    fn record_gate_decision(&self, route_class: &str, decision: &str);

    /// Records a single token verification and its result label.
    fn record_token_verification(&self, slot: &str, result: &str);

    /// Records how long a token verification took.
    fn record_verification_duration(&self, slot: &str, duration_secs: f64);

    /// Records a forwarded request to the upstream page server.
    fn record_upstream_request(&self, result: &str);
}

/// Prometheus metrics collector.
#[derive(Clone)]
pub struct Metrics {
    registry: Arc<Registry>,

    gate_decisions_total: CounterVec,

    // Token metrics
    token_verifications_total: CounterVec,
    token_verification_duration_seconds: HistogramVec,

    upstream_requests_total: CounterVec,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    /// Creates a new metrics instance with its own Prometheus registry.
    pub fn new() -> Self {
        let registry = Arc::new(Registry::new());

        let gate_decisions_total = register_counter_vec_with_registry!(
            Opts::new("gate_decisions_total", "Total session gate decisions"),
            &["route_class", "decision"],
            registry.clone()
        )
        .expect("Failed to register gate_decisions_total");

        let token_verifications_total = register_counter_vec_with_registry!(
            Opts::new(
                "token_verifications_total",
                "Total session token verifications per cookie slot"
            ),
            &["slot", "result"],
            registry.clone()
        )
        .expect("Failed to register token_verifications_total");

        let token_verification_duration_seconds = register_histogram_vec_with_registry!(
            "token_verification_duration_seconds",
            "Session token verification duration in seconds",
            &["slot"],
            vec![0.00001, 0.00005, 0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05],
            registry.clone()
        )
        .expect("Failed to register token_verification_duration_seconds");

        let upstream_requests_total = register_counter_vec_with_registry!(
            Opts::new(
                "upstream_requests_total",
                "Total requests forwarded to the upstream page server"
            ),
            &["result"],
            registry.clone()
        )
        .expect("Failed to register upstream_requests_total");

        Metrics {
            registry,
            gate_decisions_total,
            token_verifications_total,
            token_verification_duration_seconds,
            upstream_requests_total,
        }
    }

    /// Renders all metrics in Prometheus text format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

impl MetricsRecorder for Metrics {
    fn record_gate_decision(&self, route_class: &str, decision: &str) {
        self.gate_decisions_total
            .with_label_values(&[route_class, decision])
            .inc();
    }

    fn record_token_verification(&self, slot: &str, result: &str) {
        self.token_verifications_total
            .with_label_values(&[slot, result])
            .inc();
    }

    fn record_verification_duration(&self, slot: &str, duration_secs: f64) {
        self.token_verification_duration_seconds
            .with_label_values(&[slot])
            .observe(duration_secs);
    }

    fn record_upstream_request(&self, result: &str) {
        self.upstream_requests_total
            .with_label_values(&[result])
            .inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_recorded_series() {
        let metrics = Metrics::new();
        metrics.record_gate_decision("protected", "redirect_login");
        metrics.record_token_verification("access", "expired");
        metrics.record_verification_duration("access", 0.0002);

        let text = metrics.render().expect("metrics should render");
        assert!(text.contains(
            "gate_decisions_total{decision=\"redirect_login\",route_class=\"protected\"} 1"
        ));
        assert!(text.contains("token_verifications_total{result=\"expired\",slot=\"access\"} 1"));
        assert!(text.contains("token_verification_duration_seconds_count{slot=\"access\"} 1"));
    }

    #[test]
    fn registries_are_independent() {
        let first = Metrics::new();
        let second = Metrics::new();
        first.record_upstream_request("ok");

        let text = second.render().expect("metrics should render");
        assert!(!text.contains("upstream_requests_total{"));
    }
}
