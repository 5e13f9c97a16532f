use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

/// Progress of a run, as seen by an observer.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BroadcastEvent {
    ConfigResolved {
        dry_run: bool,
        recipients_file: String,
        document: String,
        filename: String,
        template: Option<String>,
        delay_secs: f64,
    },
    RecipientSkipped {
        line: u64,
        raw: String,
    },
    RecipientsLoaded {
        accepted: usize,
        skipped: usize,
    },
    AssetReady {
        asset_id: String,
        filename: String,
        sha256: String,
        size_bytes: u64,
        dry_run: bool,
    },
    SendSucceeded {
        recipient: String,
        template_message_id: Option<String>,
        document_message_id: String,
    },
    SendFailed {
        recipient: String,
        error: String,
    },
    RunInterrupted {
        completed: usize,
        total: usize,
    },
    FailuresExported {
        path: String,
        rows: usize,
    },
    ExportFailed {
        path: String,
        error: String,
    },
    RunSummarized {
        attempted: usize,
        succeeded: usize,
        failed: usize,
        elapsed_secs: f64,
        dry_run: bool,
    },
}

impl BroadcastEvent {
    pub fn name(&self) -> &'static str {
        match self {
            BroadcastEvent::ConfigResolved { .. } => "config_resolved",
            BroadcastEvent::RecipientSkipped { .. } => "recipient_skipped",
            BroadcastEvent::RecipientsLoaded { .. } => "recipients_loaded",
            BroadcastEvent::AssetReady { .. } => "asset_ready",
            BroadcastEvent::SendSucceeded { .. } => "send_succeeded",
            BroadcastEvent::SendFailed { .. } => "send_failed",
            BroadcastEvent::RunInterrupted { .. } => "run_interrupted",
            BroadcastEvent::FailuresExported { .. } => "failures_exported",
            BroadcastEvent::ExportFailed { .. } => "export_failed",
            BroadcastEvent::RunSummarized { .. } => "run_summarized",
        }
    }
}

pub trait BroadcastObserver: Send + Sync {
    fn on_event(&self, run_id: Uuid, event: &BroadcastEvent);
}

/// Turns events into log lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl BroadcastObserver for TracingObserver {
    fn on_event(&self, run_id: Uuid, event: &BroadcastEvent) {
        match event {
            BroadcastEvent::ConfigResolved {
                dry_run,
                recipients_file,
                document,
                filename,
                template,
                delay_secs,
            } => tracing::info!(
                %run_id,
                dry_run,
                recipients_file = %recipients_file,
                document = %document,
                filename = %filename,
                template = template.as_deref().unwrap_or("-"),
                delay_secs,
                "configuration resolved"
            ),
            BroadcastEvent::RecipientSkipped { line, raw } => {
                tracing::warn!(%run_id, line, raw = %raw, "SKIP invalid number")
            }
            BroadcastEvent::RecipientsLoaded { accepted, skipped } => {
                tracing::info!(%run_id, accepted, skipped, "recipients loaded")
            }
            BroadcastEvent::AssetReady {
                asset_id,
                filename,
                sha256,
                size_bytes,
                dry_run,
            } => {
                if *dry_run {
                    tracing::info!(%run_id, filename = %filename, sha256 = %sha256, size_bytes, "[dry-run] upload skipped, media_id={asset_id}")
                } else {
                    tracing::info!(%run_id, media_id = %asset_id, filename = %filename, sha256 = %sha256, size_bytes, "document uploaded")
                }
            }
            BroadcastEvent::SendSucceeded {
                recipient,
                template_message_id,
                document_message_id,
            } => tracing::info!(
                %run_id,
                recipient = %recipient,
                template_id = template_message_id.as_deref().unwrap_or("-"),
                message_id = %document_message_id,
                "document sent"
            ),
            BroadcastEvent::SendFailed { recipient, error } => {
                tracing::error!(%run_id, recipient = %recipient, error = %error, "FAILED")
            }
            BroadcastEvent::RunInterrupted { completed, total } => {
                tracing::warn!(%run_id, completed, total, "run interrupted")
            }
            BroadcastEvent::FailuresExported { path, rows } => {
                tracing::info!(%run_id, path = %path, rows, "failed numbers exported")
            }
            BroadcastEvent::ExportFailed { path, error } => {
                tracing::error!(%run_id, path = %path, error = %error, "could not export failed numbers")
            }
            BroadcastEvent::RunSummarized {
                attempted,
                succeeded,
                failed,
                elapsed_secs,
                dry_run,
            } => tracing::info!(
                %run_id,
                attempted,
                succeeded,
                failed,
                elapsed_secs,
                dry_run,
                "run finished"
            ),
        }
    }
}

/// Forwards every event to each inner observer in order.
#[derive(Clone, Default)]
pub struct FanoutObserver {
    observers: Vec<Arc<dyn BroadcastObserver>>,
}

impl FanoutObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, observer: Arc<dyn BroadcastObserver>) -> Self {
        self.observers.push(observer);
        self
    }
}

impl BroadcastObserver for FanoutObserver {
    fn on_event(&self, run_id: Uuid, event: &BroadcastEvent) {
        for observer in &self.observers {
            observer.on_event(run_id, event);
        }
    }
}
