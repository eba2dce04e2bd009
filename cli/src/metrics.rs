//! # Prometheus Metrics
//!
//! Per-run counters for the scenario runner. Printed in the Prometheus text
//! exposition format when `run --metrics` is given.
//!
//! All metrics are registered in a dedicated [`prometheus::Registry`] so they
//! do not collide with any default global registry consumers.

use anyhow::{Context, Result};
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

/// Holds all Prometheus metric handles for one scenario run.
pub struct RunMetrics {
    /// Prometheus registry that owns all metrics below.
    registry: Registry,
    /// Steps executed, by operation and outcome (`ok` / `error`).
    pub steps_total: IntCounterVec,
    /// Steps whose outcome differed from the declared expectation.
    pub expectation_mismatches_total: IntCounter,
    /// Events appended to the log over the run.
    pub events_emitted_total: IntCounter,
    /// Wall-clock time per step, in seconds.
    pub step_latency_seconds: Histogram,
}

impl RunMetrics {
    /// Creates and registers all metrics.
    pub fn new() -> Result<Self> {
        let registry = Registry::new_custom(Some("custody".into()), None)
            .context("failed to create prometheus registry")?;

        let steps_total = IntCounterVec::new(
            Opts::new("scenario_steps_total", "Scenario steps executed"),
            &["op", "outcome"],
        )?;
        registry.register(Box::new(steps_total.clone()))?;

        let expectation_mismatches_total = IntCounter::new(
            "scenario_expectation_mismatches_total",
            "Steps whose outcome differed from their expectation",
        )?;
        registry.register(Box::new(expectation_mismatches_total.clone()))?;

        let events_emitted_total = IntCounter::new(
            "events_emitted_total",
            "Events appended to the runtime log",
        )?;
        registry.register(Box::new(events_emitted_total.clone()))?;

        let step_latency_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "scenario_step_latency_seconds",
                "Wall-clock time spent executing one scenario step",
            )
            .buckets(vec![
                0.00001, 0.00005, 0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1,
            ]),
        )?;
        registry.register(Box::new(step_latency_seconds.clone()))?;

        Ok(Self {
            registry,
            steps_total,
            expectation_mismatches_total,
            events_emitted_total,
            step_latency_seconds,
        })
    }

    /// Records one finished step.
    pub fn observe_step(&self, op: &str, ok: bool, matched: bool, seconds: f64) {
        let outcome = if ok { "ok" } else { "error" };
        self.steps_total.with_label_values(&[op, outcome]).inc();
        if !matched {
            self.expectation_mismatches_total.inc();
        }
        self.step_latency_seconds.observe(seconds);
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).context("prometheus output is not valid utf-8")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoded_output_carries_prefix_and_labels() {
        let metrics = RunMetrics::new().unwrap();
        metrics.observe_step("deposit", true, true, 0.0002);
        metrics.observe_step("withdraw", false, false, 0.0001);
        metrics.events_emitted_total.inc_by(3);

        let text = metrics.encode().unwrap();
        assert!(text.contains("custody_scenario_steps_total{op=\"deposit\",outcome=\"ok\"} 1"));
        assert!(text.contains("custody_scenario_expectation_mismatches_total 1"));
        assert!(text.contains("custody_events_emitted_total 3"));
        assert!(text.contains("custody_scenario_step_latency_seconds_count 2"));
    }
}
