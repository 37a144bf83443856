pub mod cycle;
pub mod discovery;
pub mod scheduler;

pub use cycle::{CycleReport, Synchronizer};
pub use scheduler::{FetchScheduler, SchedulerStatus};
