//! Job state: records, statuses and the TTL store.

mod record;
mod store;

pub use record::{AnalysisData, Dimensions, JobRecord, JobStatus, JobUpdate};
pub use store::JobStore;
