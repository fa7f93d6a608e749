//! Content Generation & Post-Sync Pipeline.
//!
//! Nine collaborating components: a Lock Registry and Run Tracker guarding
//! single-flight generation per `(account, content_type)`, a Selection
//! Planner and Dispatcher driving one generation attempt, a Render Worker
//! Hook completing async video tasks, a Recovery scheduler repairing crash-
//! induced drift, a Sync Status Tracker and Post Reconciler doing the
//! fingerprint-matching post-sync pass, and an Event Stream fanning out
//! run/sync updates to subscribers.

pub mod dispatcher;
pub mod event_stream;
pub mod fingerprint_cache;
pub mod lock_registry;
pub mod post_reconciler;
pub mod recovery;
pub mod render_hook;
pub mod run_tracker;
pub mod selection_planner;
pub mod sync_status_tracker;

pub use dispatcher::{Dispatcher, GenerateContentRequest};
pub use event_stream::EventStream;
pub use fingerprint_cache::FingerprintCache;
pub use lock_registry::LockRegistry;
pub use post_reconciler::PostReconciler;
pub use recovery::RecoveryScheduler;
pub use render_hook::RenderWorkerHook;
pub use run_tracker::RunTracker;
pub use selection_planner::SelectionPlanner;
pub use sync_status_tracker::SyncStatusTracker;
