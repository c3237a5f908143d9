//! Worker-pool task queues.

mod queue;

pub use queue::{Queues, TaskQueue};
