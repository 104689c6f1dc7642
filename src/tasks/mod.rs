//! Tasks awaiting allocation and the queue that owns them.

pub mod queue;
pub mod task;

pub use queue::TaskQueue;
pub use task::{Task, TaskSnapshot, TaskSubmission};
