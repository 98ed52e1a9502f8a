//! Applying several proposals with per-item failure isolation.

use intent_hosting::HostingClient;
use serde::Serialize;
use tracing::{info, warn};

use super::orchestrator::{ApplyResult, SyncOrchestrator};
use crate::domain::ErrorClass;
use crate::proposal::{IntentUpdate, UpdateAction};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchMode {
    /// Record each failure and keep going
    #[default]
    ContinueOnError,
    StopOnFirstError,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchItemStatus {
    Applied { result: ApplyResult },
    Failed { class: ErrorClass, error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchItem {
    pub node_path: String,
    pub action: UpdateAction,
    #[serde(flatten)]
    pub status: BatchItemStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub items: Vec<BatchItem>,
    /// Proposals left untouched after a stop-on-first-error failure
    pub not_attempted: usize,
}

impl BatchReport {
    pub fn applied(&self) -> usize {
        self.items
            .iter()
            .filter(|i| matches!(i.status, BatchItemStatus::Applied { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.items.len() - self.applied()
    }
}

impl<C: HostingClient> SyncOrchestrator<C> {
    /// Validate and apply each update in order.
    pub async fn apply_batch(&self, updates: &[IntentUpdate], mode: BatchMode) -> BatchReport {
        let mut report = BatchReport::default();

        for (index, update) in updates.iter().enumerate() {
            let result = match update.validate() {
                Ok(()) => self.apply_update(update).await,
                Err(err) => Err(err),
            };
            let status = match result {
                Ok(result) => BatchItemStatus::Applied { result },
                Err(err) => {
                    warn!(node = %update.node_path, action = %update.action, error = %err, "proposal failed");
                    BatchItemStatus::Failed {
                        class: err.class(),
                        error: err.to_string(),
                    }
                }
            };
            let failed = matches!(status, BatchItemStatus::Failed { .. });
            report.items.push(BatchItem {
                node_path: update.node_path.clone(),
                action: update.action,
                status,
            });
            if failed && mode == BatchMode::StopOnFirstError {
                report.not_attempted = updates.len() - index - 1;
                break;
            }
        }

        info!(
            applied = report.applied(),
            failed = report.failed(),
            not_attempted = report.not_attempted,
            "batch finished"
        );
        report
    }
}
