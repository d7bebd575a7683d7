//! Notification requests and fan-out.
//!
//! `NotificationDispatcher` resolves targets from the subscription registry,
//! sends through one `PushTransport` with bounded concurrency, and purges
//! subscriptions the push service reports as permanently gone.

mod dispatcher;
mod types;

pub use dispatcher::{
    DispatchError, DispatcherStats, DispatcherStatsSnapshot, NotificationDispatcher,
    DEFAULT_MAX_CONCURRENT_SENDS,
};
pub use types::{
    DispatchOutcome, DispatchResult, DispatchSummary, NotificationRequest,
    NotificationRequestBuilder, TargetSelector, TARGET_ALL,
};
