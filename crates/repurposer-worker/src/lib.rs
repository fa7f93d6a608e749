//! Render task queue and worker pool.
//!
//! Deliberately narrow: this crate knows how to claim, retry, and reap render
//! tasks, and how to call whatever [`hook::RenderTaskHook`] is wired in. It
//! has no concept of a render engine, a file store, or a generated-content
//! row — those live in `repurposer-pipeline`, which implements the hook.

pub mod hook;
pub mod queue;
pub mod repository;

pub use hook::{empty_hook_weak, RenderTaskHook};
pub use queue::{TaskQueue, TaskQueueConfig, MAX_RETRY_BACKOFF_SECS, RENDER_TASK_NOTIFY_CHANNEL};
pub use repository::{RenderTaskRepository, RenderTaskRow, RenderTaskStatus};
