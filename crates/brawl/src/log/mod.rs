//! Episode metric sinks.
//!
//! Evaluation runs report one metric map per finished episode. Backends
//! implement `MetricLogger`; `CompositeLogger` fans a report out to several.
//! The TensorBoard backend is behind the `tensorboard` feature.

mod console;
mod logger;
#[cfg(feature = "tensorboard")]
mod tensorboard;

pub use console::ConsoleLogger;
pub use logger::{CompositeLogger, MetricLogger, NoOpLogger};
#[cfg(feature = "tensorboard")]
pub use tensorboard::TensorBoardLogger;
