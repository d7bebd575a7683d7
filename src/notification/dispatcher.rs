use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::stream::{FuturesUnordered, StreamExt};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::metrics::{DispatchMetrics, RegistryMetrics};
use crate::registry::{truncate_key, RegistryError, SubscriptionRecord, SubscriptionStore};
use crate::transport::{DeliveryReport, PushTransport};

use super::{DispatchOutcome, DispatchResult, DispatchSummary, NotificationRequest, TargetSelector};

/// Default bound on concurrent sends within one dispatch
pub const DEFAULT_MAX_CONCURRENT_SENDS: usize = 50;

/// Dispatch failures that abort the whole call
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("{0}")]
    InvalidRequest(String),

    /// A broadcast found an empty registry; nothing was attempted
    #[error("No subscribers to notify")]
    NoSubscribers,

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Statistics for the notification dispatcher
#[derive(Debug, Default)]
pub struct DispatcherStats {
    /// Dispatch calls that reached at least one target
    pub total_dispatches: AtomicU64,
    /// Dispatch calls rejected for having no targets
    pub empty_dispatches: AtomicU64,
    /// Successful per-target deliveries
    pub total_delivered: AtomicU64,
    /// Failed per-target deliveries
    pub total_failed: AtomicU64,
    /// Records purged after permanent failures
    pub total_removed: AtomicU64,
    /// Records pruned because they expired
    pub total_expired: AtomicU64,
}

impl DispatcherStats {
    pub fn snapshot(&self) -> DispatcherStatsSnapshot {
        DispatcherStatsSnapshot {
            total_dispatches: self.total_dispatches.load(Ordering::Relaxed),
            empty_dispatches: self.empty_dispatches.load(Ordering::Relaxed),
            total_delivered: self.total_delivered.load(Ordering::Relaxed),
            total_failed: self.total_failed.load(Ordering::Relaxed),
            total_removed: self.total_removed.load(Ordering::Relaxed),
            total_expired: self.total_expired.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of dispatcher statistics
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatcherStatsSnapshot {
    pub total_dispatches: u64,
    pub empty_dispatches: u64,
    pub total_delivered: u64,
    pub total_failed: u64,
    pub total_removed: u64,
    pub total_expired: u64,
}

/// Fans notifications out to registered subscriptions through one transport
pub struct NotificationDispatcher {
    store: Arc<dyn SubscriptionStore>,
    transport: Arc<dyn PushTransport>,
    max_concurrent_sends: usize,
    stats: DispatcherStats,
}

impl NotificationDispatcher {
    pub fn new(store: Arc<dyn SubscriptionStore>, transport: Arc<dyn PushTransport>) -> Self {
        Self::with_concurrency(store, transport, DEFAULT_MAX_CONCURRENT_SENDS)
    }

    pub fn with_concurrency(
        store: Arc<dyn SubscriptionStore>,
        transport: Arc<dyn PushTransport>,
        max_concurrent_sends: usize,
    ) -> Self {
        Self {
            store,
            transport,
            max_concurrent_sends: max_concurrent_sends.max(1),
            stats: DispatcherStats::default(),
        }
    }

    /// Get dispatcher statistics
    pub fn stats(&self) -> DispatcherStatsSnapshot {
        self.stats.snapshot()
    }

    pub fn transport_name(&self) -> &'static str {
        self.transport.name()
    }

    /// Deliver `request` to the selected subscriptions.
    ///
    /// Per-target failures are reported in the outcome and never abort the
    /// batch. Targets reported permanently gone are removed from the registry.
    #[tracing::instrument(
        name = "dispatcher.dispatch",
        skip(self, request),
        fields(target_kind = target.as_label(), transport = self.transport.name())
    )]
    pub async fn dispatch(
        &self,
        request: &NotificationRequest,
        target: &TargetSelector,
    ) -> Result<DispatchOutcome, DispatchError> {
        request.validate().map_err(DispatchError::InvalidRequest)?;

        let notification_id = Uuid::new_v4();
        let (targets, expired) = self.resolve_targets(target).await?;

        if expired > 0 {
            self.stats.total_expired.fetch_add(expired as u64, Ordering::Relaxed);
            RegistryMetrics::record_expired(expired);
        }

        if targets.is_empty() {
            if let TargetSelector::Key(key) = target {
                // Unknown specific keys are idempotent no-ops, like remove
                self.stats.total_dispatches.fetch_add(1, Ordering::Relaxed);
                DispatchMetrics::record_single();
                tracing::info!(
                    subscription = %truncate_key(key),
                    expired = expired,
                    "Target subscription not registered, nothing sent"
                );
                return Ok(DispatchOutcome {
                    notification_id,
                    summary: DispatchSummary::default(),
                    results: Vec::new(),
                    expired,
                    target_not_found: true,
                });
            }

            self.stats.empty_dispatches.fetch_add(1, Ordering::Relaxed);
            DispatchMetrics::record_no_targets();
            tracing::info!(target_kind = target.as_label(), expired = expired, "No subscribers to notify");
            return Err(DispatchError::NoSubscribers);
        }

        match target {
            TargetSelector::All => DispatchMetrics::record_broadcast(),
            TargetSelector::Key(_) => DispatchMetrics::record_single(),
        }

        let reports = self.send_to_targets(&targets, request).await;

        let mut removed = 0;
        let mut results = Vec::with_capacity(reports.len());
        for (record, report) in targets.iter().zip(reports) {
            let key = record.key();
            if report.permanent {
                match self.store.remove(key).await {
                    Ok(true) => {
                        removed += 1;
                        RegistryMetrics::record_purged();
                        tracing::info!(
                            subscription = %truncate_key(key),
                            status = ?report.status_code,
                            "Removed subscription reported gone by push service"
                        );
                    }
                    Ok(false) => {}
                    Err(e) => {
                        RegistryMetrics::record_error("remove");
                        tracing::warn!(
                            subscription = %truncate_key(key),
                            error = %e,
                            "Failed to remove invalid subscription"
                        );
                    }
                }
            }
            results.push(report.into_result(key));
        }

        let summary = DispatchSummary::from_results(&results, removed);

        self.stats.total_dispatches.fetch_add(1, Ordering::Relaxed);
        self.stats.total_delivered.fetch_add(summary.successful as u64, Ordering::Relaxed);
        self.stats.total_failed.fetch_add(summary.failed as u64, Ordering::Relaxed);
        self.stats.total_removed.fetch_add(removed as u64, Ordering::Relaxed);

        tracing::info!(
            notification_id = %notification_id,
            total = summary.total,
            successful = summary.successful,
            failed = summary.failed,
            removed = removed,
            "Dispatch complete"
        );

        Ok(DispatchOutcome {
            notification_id,
            summary,
            results,
            expired,
            target_not_found: false,
        })
    }

    /// Snapshot the addressed records, pruning expired ones from the registry.
    async fn resolve_targets(
        &self,
        target: &TargetSelector,
    ) -> Result<(Vec<SubscriptionRecord>, usize), RegistryError> {
        let candidates = match target {
            TargetSelector::All => self.store.list().await?,
            TargetSelector::Key(key) => self.store.get(key).await?.into_iter().collect(),
        };

        let now = Utc::now();
        let mut targets = Vec::with_capacity(candidates.len());
        let mut expired = 0;

        for record in candidates {
            if record.is_expired(now) {
                expired += 1;
                if let Err(e) = self.store.remove(record.key()).await {
                    RegistryMetrics::record_error("remove");
                    tracing::warn!(
                        subscription = %truncate_key(record.key()),
                        error = %e,
                        "Failed to prune expired subscription"
                    );
                }
            } else {
                targets.push(record);
            }
        }

        Ok((targets, expired))
    }

    /// Send to every target with bounded parallelism.
    /// Reports come back in the order of `targets`.
    async fn send_to_targets(
        &self,
        targets: &[SubscriptionRecord],
        request: &NotificationRequest,
    ) -> Vec<DeliveryReport> {
        let transport_name = self.transport.name();
        let mut reports: Vec<Option<DeliveryReport>> = vec![None; targets.len()];
        let mut futures = FuturesUnordered::new();
        let mut pending = 0;

        for (index, record) in targets.iter().enumerate() {
            let transport = self.transport.clone();
            futures.push(async move {
                let started = Instant::now();
                let report = transport.send(record, request).await;
                (index, report, started.elapsed().as_secs_f64())
            });
            pending += 1;

            // Drain completed sends when we hit the concurrency limit
            while pending >= self.max_concurrent_sends {
                match futures.next().await {
                    Some((index, report, seconds)) => {
                        pending -= 1;
                        DispatchMetrics::record_send(transport_name, report.success, report.permanent, seconds);
                        reports[index] = Some(report);
                    }
                    None => break,
                }
            }
        }

        while let Some((index, report, seconds)) = futures.next().await {
            DispatchMetrics::record_send(transport_name, report.success, report.permanent, seconds);
            reports[index] = Some(report);
        }

        reports
            .into_iter()
            .map(|report| {
                report.unwrap_or_else(|| DeliveryReport::transient(None, "send did not complete"))
            })
            .collect()
    }
}

impl DeliveryReport {
    fn into_result(self, key: &str) -> DispatchResult {
        DispatchResult {
            target: truncate_key(key),
            success: self.success,
            status_code: self.status_code,
            error: self.error,
            permanent: self.permanent,
        }
    }
}
