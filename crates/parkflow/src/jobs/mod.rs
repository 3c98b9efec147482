//! CSV import jobs.
//!
//! A job tracks one uploaded CSV from staging through conversion. Jobs live
//! in an in-memory [`JobRegistry`]; the [`ImportRunner`] drives them and
//! reports conversion progress back into the registry.

mod record;
mod registry;
mod runner;

pub use record::{ImportJob, JobStatus};
pub use registry::{JobRegistry, LIST_LIMIT};
pub use runner::ImportRunner;
