//! Formatting helpers for run summaries.

use std::time::{Duration, Instant};

const SUFFIXES: [(u64, &str); 3] = [(1_000_000_000, "B"), (1_000_000, "M"), (1_000, "K")];

/// Abbreviate large counts, e.g. `12_345` as `12.3K`
pub fn abbreviate(num: u64) -> String {
    SUFFIXES
        .iter()
        .find(|(scale, _)| num >= *scale)
        .map(|(scale, suffix)| format!("{:.1}{}", num as f64 / *scale as f64, suffix))
        .unwrap_or_else(|| num.to_string())
}

/// Whole seconds as `1h 2m 3s`, dropping leading zero units
pub fn format_duration(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };
    let (h, m, s) = (total / 3600, (total / 60) % 60, total % 60);
    match (h, m) {
        (0, 0) => format!("{}s", s),
        (0, _) => format!("{}m {}s", m, s),
        _ => format!("{}h {}m {}s", h, m, s),
    }
}

/// Steps per second, zero when no time has elapsed
pub fn throughput(steps: u64, seconds: f64) -> f64 {
    if seconds > 0.0 {
        steps as f64 / seconds
    } else {
        0.0
    }
}

/// Counts environment steps against wall-clock time
#[derive(Clone, Debug)]
pub struct StepTimer {
    start: Instant,
    steps: u64,
}

impl Default for StepTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl StepTimer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            steps: 0,
        }
    }

    pub fn tick(&mut self) {
        self.steps += 1;
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn steps_per_second(&self) -> f64 {
        throughput(self.steps, self.elapsed().as_secs_f64())
    }

    /// `"12.3K steps in 1m 4s (192 steps/s)"`
    pub fn summary(&self) -> String {
        let secs = self.elapsed().as_secs_f64();
        format!(
            "{} steps in {} ({:.0} steps/s)",
            abbreviate(self.steps),
            format_duration(secs),
            throughput(self.steps, secs)
        )
    }
}
