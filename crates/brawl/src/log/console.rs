//! Console logging backend.

use super::MetricLogger;
use std::collections::HashMap;

/// Logger that prints metrics via tracing.
pub struct ConsoleLogger;

impl Default for ConsoleLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleLogger {
    pub fn new() -> Self {
        Self
    }
}

/// One line per call, keys sorted so episodes line up when scanning logs.
pub(crate) fn format_metrics(metrics: &HashMap<String, f64>, step: u64) -> String {
    let mut sorted: Vec<_> = metrics.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let body = sorted
        .iter()
        .map(|(key, value)| format!("{}={:.4}", key, value))
        .collect::<Vec<_>>()
        .join(", ");
    format!("Step {}: {}", step, body)
}

impl MetricLogger for ConsoleLogger {
    fn log_scalar(&self, name: &str, value: f64, step: u64) {
        tracing::info!("Step {}: {} = {:.4}", step, name, value);
    }

    fn log_metrics(&self, metrics: &HashMap<String, f64>, step: u64) {
        tracing::info!("{}", format_metrics(metrics, step));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_metrics_sorted() {
        let metrics = HashMap::from([
            ("exchanged_hitpower".to_string(), 3.0),
            ("cumulated_reward_2".to_string(), -1.5),
            ("cumulated_reward_1".to_string(), 1.5),
        ]);
        assert_eq!(
            format_metrics(&metrics, 7),
            "Step 7: cumulated_reward_1=1.5000, cumulated_reward_2=-1.5000, exchanged_hitpower=3.0000"
        );
    }
}
