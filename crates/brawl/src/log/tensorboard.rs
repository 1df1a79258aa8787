//! TensorBoard event-file backend.

use super::MetricLogger;
use crate::Result;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use tensorboard_rs::summary_writer::SummaryWriter;

/// Writes scalars under `<prefix>/<name>` tags.
///
/// Events are flushed once per `log_metrics` call (one call per episode in
/// evaluation runs) and on `close`.
pub struct TensorBoardLogger {
    writer: Mutex<SummaryWriter>,
    prefix: String,
}

impl TensorBoardLogger {
    /// Create the log directory if needed and open a writer in it
    pub fn new(log_dir: impl AsRef<Path>) -> Result<Self> {
        Self::with_prefix(log_dir, "brawl")
    }

    pub fn with_prefix(log_dir: impl AsRef<Path>, prefix: &str) -> Result<Self> {
        std::fs::create_dir_all(log_dir.as_ref())?;
        Ok(Self {
            writer: Mutex::new(SummaryWriter::new(log_dir.as_ref())),
            prefix: prefix.trim_end_matches('/').to_string(),
        })
    }

    fn tag(&self, name: &str) -> String {
        if self.prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", self.prefix, name)
        }
    }
}

impl MetricLogger for TensorBoardLogger {
    fn log_scalar(&self, name: &str, value: f64, step: u64) {
        let tag = self.tag(name);
        if let Ok(mut writer) = self.writer.lock() {
            writer.add_scalar(&tag, value as f32, step as usize);
        }
    }

    fn log_metrics(&self, metrics: &HashMap<String, f64>, step: u64) {
        let tagged: Vec<(String, f32)> = metrics
            .iter()
            .map(|(name, value)| (self.tag(name), *value as f32))
            .collect();
        if let Ok(mut writer) = self.writer.lock() {
            for (tag, value) in &tagged {
                writer.add_scalar(tag, *value, step as usize);
            }
            let _ = writer.flush();
        }
    }

    fn close(&self) {
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writer.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_are_prefixed() {
        let dir = tempfile::tempdir().unwrap();
        let logger = TensorBoardLogger::with_prefix(dir.path().join("run"), "eval/").unwrap();
        assert_eq!(logger.tag("exchanged_hitpower"), "eval/exchanged_hitpower");

        assert!(dir.path().join("run").is_dir());

        let bare = TensorBoardLogger::with_prefix(dir.path(), "").unwrap();
        assert_eq!(bare.tag("x"), "x");
    }
}
