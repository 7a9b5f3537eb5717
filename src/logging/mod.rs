//! Structured logging and the anomaly alert file.

mod alerts;
mod format;

pub use alerts::{AlertLogger, AnomalyAlert};
pub use format::StructuredLogger;
