//! Render task dispatch hook.
//!
//! The pipeline crate implements this trait for its render worker hook; the
//! worker holds a weak reference and calls `handle_render_task` when it
//! claims a task, so this crate never depends on the business-logic crate
//! above it.

use async_trait::async_trait;
use repurposer_core::models::{RenderTaskOutcome, RenderTaskRequest};
use std::sync::{Arc, Weak};

#[async_trait]
pub trait RenderTaskHook: Send + Sync {
    async fn handle_render_task(
        self: Arc<Self>,
        request: &RenderTaskRequest,
    ) -> anyhow::Result<RenderTaskOutcome>;
}

/// Placeholder hook used before the real pipeline context exists (e.g. during
/// init). Dispatch always errors.
struct NoopHook;

#[async_trait]
impl RenderTaskHook for NoopHook {
    async fn handle_render_task(
        self: Arc<Self>,
        _request: &RenderTaskRequest,
    ) -> anyhow::Result<RenderTaskOutcome> {
        Err(anyhow::anyhow!("NoopHook: no render task hook available"))
    }
}

/// Returns a weak reference to a no-op hook. Use as a placeholder when
/// building a `TaskQueue` before the real hook exists.
pub fn empty_hook_weak() -> Weak<dyn RenderTaskHook> {
    let n: Arc<dyn RenderTaskHook> = Arc::new(NoopHook);
    Arc::downgrade(&n)
}
