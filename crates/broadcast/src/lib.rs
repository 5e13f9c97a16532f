//! Sequential document broadcast.
//!
//! A run loads recipients, makes the document available once (upload, or a
//! placeholder under dry-run) and then walks the recipients in file order,
//! pausing between them. A failed send is recorded against its recipient
//! and the loop moves on; only configuration, recipient loading, the upload
//! and an operator interrupt end a run early.

pub mod audit;
pub mod events;
pub mod export;

use access_point::{mock::DryRunClient, DeliveryError, Document, MessagingClient};
use chrono::Utc;
use config::{ConfigurationError, EffectiveConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use uuid::Uuid;
use wabc_core::{
    load_recipients, DeliveryOutcome, Recipient, RecipientLoadError, RunSummary, UploadedAsset,
};

pub use audit::JsonlAuditObserver;
pub use events::{BroadcastEvent, BroadcastObserver, FanoutObserver, TracingObserver};

pub const EXIT_INTERRUPTED: u8 = 130;

#[derive(Debug, thiserror::Error)]
pub enum BroadcastError {
    #[error(transparent)]
    Config(#[from] ConfigurationError),
    #[error(transparent)]
    RecipientLoad(#[from] RecipientLoadError),
    #[error("no valid numbers found in {} (first column, no headers)", .path.display())]
    NoRecipients { path: PathBuf },
    #[error("asset upload failed: {0}")]
    AssetUpload(#[source] DeliveryError),
    #[error("interrupted after {completed} of {total} recipients")]
    Interrupted { completed: usize, total: usize },
}

impl BroadcastError {
    pub fn exit_code(&self) -> u8 {
        match self {
            BroadcastError::Interrupted { .. } => EXIT_INTERRUPTED,
            _ => 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: Uuid,
    pub summary: RunSummary,
    pub outcomes: Vec<DeliveryOutcome>,
    /// Set when the failure report was written.
    pub export_path: Option<PathBuf>,
}

impl RunReport {
    pub fn exit_code(&self) -> u8 {
        if self.summary.failed == 0 {
            0
        } else {
            1
        }
    }
}

/// Operator interrupt shared between the signal handler and the run.
pub struct Interrupt {
    tx: watch::Sender<bool>,
}

impl Interrupt {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }
}

impl Default for Interrupt {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves once the interrupt fires. Never resolves if the sender is gone
/// without having fired.
async fn interrupted(rx: &mut watch::Receiver<bool>) {
    if rx.wait_for(|fired| *fired).await.is_err() {
        std::future::pending::<()>().await;
    }
}

pub struct Broadcaster {
    config: EffectiveConfig,
    client: Arc<dyn MessagingClient + 'static>,
    observer: Arc<dyn BroadcastObserver>,
    interrupt: watch::Receiver<bool>,
    run_id: Uuid,
}

impl Broadcaster {
    /// Under dry-run the given client is replaced by [`DryRunClient`], so no
    /// request leaves the process whatever the caller wired in.
    pub fn new(config: EffectiveConfig, client: Arc<dyn MessagingClient + 'static>) -> Self {
        let client: Arc<dyn MessagingClient + 'static> = if config.dry_run {
            DryRunClient::new()
        } else {
            client
        };
        Self {
            config,
            client,
            observer: Arc::new(TracingObserver),
            interrupt: watch::channel(false).1,
            run_id: Uuid::new_v4(),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn BroadcastObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_interrupt(mut self, interrupt: watch::Receiver<bool>) -> Self {
        self.interrupt = interrupt;
        self
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    fn emit(&self, event: BroadcastEvent) {
        self.observer.on_event(self.run_id, &event);
    }

    pub async fn run(&self) -> Result<RunReport, BroadcastError> {
        let cfg = &self.config;
        let started_at = Utc::now();
        self.emit(BroadcastEvent::ConfigResolved {
            dry_run: cfg.dry_run,
            recipients_file: cfg.csv_path.display().to_string(),
            document: cfg.pdf_path.display().to_string(),
            filename: cfg.filename.clone(),
            template: cfg.template.as_ref().map(ToString::to_string),
            delay_secs: cfg.delay.as_secs_f64(),
        });

        let list = load_recipients(&cfg.csv_path)?;
        for skipped in &list.skipped {
            self.emit(BroadcastEvent::RecipientSkipped {
                line: skipped.line,
                raw: skipped.raw.clone(),
            });
        }
        self.emit(BroadcastEvent::RecipientsLoaded {
            accepted: list.accepted.len(),
            skipped: list.skipped.len(),
        });
        if list.is_empty() {
            return Err(BroadcastError::NoRecipients {
                path: cfg.csv_path.clone(),
            });
        }

        let total = list.accepted.len();
        let mut interrupt = self.interrupt.clone();
        let asset = tokio::select! {
            biased;
            _ = interrupted(&mut interrupt) => return Err(self.interrupted(0, total)),
            asset = self.prepare_asset() => asset?,
        };
        let outcomes = self.broadcast(&list.accepted, &asset).await?;

        let summary = RunSummary::from_outcomes(&outcomes, started_at, Utc::now());
        let export_path = if summary.failed > 0 && !cfg.dry_run {
            self.export_failures(&outcomes)
        } else {
            None
        };
        self.emit(BroadcastEvent::RunSummarized {
            attempted: summary.attempted,
            succeeded: summary.succeeded,
            failed: summary.failed,
            elapsed_secs: summary.elapsed.as_secs_f64(),
            dry_run: cfg.dry_run,
        });

        Ok(RunReport {
            run_id: self.run_id,
            summary,
            outcomes,
            export_path,
        })
    }

    /// Uploads the document exactly once.
    async fn prepare_asset(&self) -> Result<UploadedAsset, BroadcastError> {
        let cfg = &self.config;
        let document = Document::load(&cfg.pdf_path, &cfg.mime_type)
            .await
            .map_err(BroadcastError::AssetUpload)?;

        let asset_id = self
            .client
            .upload_asset(&document)
            .await
            .map_err(BroadcastError::AssetUpload)?;

        let asset = document.into_asset(asset_id, &cfg.filename);
        self.emit(BroadcastEvent::AssetReady {
            asset_id: asset.asset_id.clone(),
            filename: asset.filename.clone(),
            sha256: asset.sha256.clone(),
            size_bytes: asset.size_bytes,
            dry_run: cfg.dry_run,
        });
        Ok(asset)
    }

    async fn broadcast(
        &self,
        recipients: &[Recipient],
        asset: &UploadedAsset,
    ) -> Result<Vec<DeliveryOutcome>, BroadcastError> {
        let total = recipients.len();
        let delay = self.config.delay;
        let mut interrupt = self.interrupt.clone();
        let mut outcomes = Vec::with_capacity(total);

        for (idx, recipient) in recipients.iter().enumerate() {
            if *interrupt.borrow() {
                return Err(self.interrupted(idx, total));
            }

            let outcome = tokio::select! {
                biased;
                _ = interrupted(&mut interrupt) => return Err(self.interrupted(idx, total)),
                outcome = self.deliver(recipient, asset) => outcome,
            };
            self.emit(match &outcome.status {
                wabc_core::OutcomeStatus::Delivered {
                    template_message_id,
                    document_message_id,
                } => BroadcastEvent::SendSucceeded {
                    recipient: recipient.to_string(),
                    template_message_id: template_message_id.clone(),
                    document_message_id: document_message_id.clone(),
                },
                wabc_core::OutcomeStatus::Failed { error } => BroadcastEvent::SendFailed {
                    recipient: recipient.to_string(),
                    error: error.clone(),
                },
            });
            outcomes.push(outcome);

            if idx + 1 < total && !delay.is_zero() {
                tokio::select! {
                    biased;
                    _ = interrupted(&mut interrupt) => return Err(self.interrupted(idx + 1, total)),
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }
        Ok(outcomes)
    }

    fn interrupted(&self, completed: usize, total: usize) -> BroadcastError {
        self.emit(BroadcastEvent::RunInterrupted { completed, total });
        BroadcastError::Interrupted { completed, total }
    }

    async fn deliver(&self, to: &Recipient, asset: &UploadedAsset) -> DeliveryOutcome {
        match self.send_all(to, asset).await {
            Ok((template_id, document_id)) => {
                DeliveryOutcome::delivered(to.clone(), template_id, document_id)
            }
            Err(e) => DeliveryOutcome::failed(to.clone(), e.to_string()),
        }
    }

    /// Template first when configured; its failure also skips the document.
    async fn send_all(
        &self,
        to: &Recipient,
        asset: &UploadedAsset,
    ) -> Result<(Option<String>, String), DeliveryError> {
        let template_id = match &self.config.template {
            Some(template) => Some(self.client.send_template(to, template).await?),
            None => None,
        };
        let document_id = self
            .client
            .send_document(to, asset, &self.config.caption)
            .await?;
        Ok((template_id, document_id))
    }

    fn export_failures(&self, outcomes: &[DeliveryOutcome]) -> Option<PathBuf> {
        let path = &self.config.failed_csv;
        match export::write_failures(path, outcomes) {
            Ok(rows) => {
                self.emit(BroadcastEvent::FailuresExported {
                    path: path.display().to_string(),
                    rows,
                });
                Some(path.clone())
            }
            Err(e) => {
                self.emit(BroadcastEvent::ExportFailed {
                    path: path.display().to_string(),
                    error: e.to_string(),
                });
                None
            }
        }
    }
}
