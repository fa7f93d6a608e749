//! Application state, joined into handler extractors via `FromRef` — narrowed
//! to the handful of pipeline components the six exposed operations actually
//! call.

use repurposer_pipeline::{Dispatcher, EventStream, PostReconciler, RunTracker};
use repurposer_core::PipelineConfig;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Dispatcher,
    pub runs: RunTracker,
    pub reconciler: PostReconciler,
    pub events: EventStream,
    pub config: PipelineConfig,
}

impl axum::extract::FromRef<Arc<AppState>> for Dispatcher {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.dispatcher.clone()
    }
}

impl axum::extract::FromRef<Arc<AppState>> for RunTracker {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.runs.clone()
    }
}

impl axum::extract::FromRef<Arc<AppState>> for PostReconciler {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.reconciler.clone()
    }
}

impl axum::extract::FromRef<Arc<AppState>> for EventStream {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.events.clone()
    }
}
