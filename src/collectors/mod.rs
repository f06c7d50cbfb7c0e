/// Collection façade over configured targets
pub mod collector;

/// Subprocess capture with a deadline
pub mod runner;

/// Warn-once de-duplication keyed by target identity
pub mod warn_once;

pub use collector::{Collector, CycleReport, Sink, Target, TextSource};
pub use runner::SystemRunner;
pub use warn_once::WarnOnce;
