use super::{DeliveryError, Document, MessagingClient, DRY_RUN_MEDIA_ID};
use async_trait::async_trait;
use rand::{distributions::Alphanumeric, Rng};
use std::sync::Arc;
use wabc_core::{Recipient, TemplateRef, UploadedAsset};

/// Simulates the provider without any network I/O.
#[derive(Clone, Default)]
pub struct DryRunClient;

impl DryRunClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {})
    }

    fn fake_id() -> String {
        let id: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(16)
            .map(char::from)
            .collect();
        format!("dry-run.{id}")
    }
}

#[async_trait]
impl MessagingClient for DryRunClient {
    async fn upload_asset(&self, document: &Document) -> Result<String, DeliveryError> {
        tracing::info!(
            file = %document.file_name,
            mime = %document.mime_type,
            "[dry-run] would upload document"
        );
        Ok(DRY_RUN_MEDIA_ID.to_string())
    }

    async fn send_template(
        &self,
        to: &Recipient,
        template: &TemplateRef,
    ) -> Result<String, DeliveryError> {
        tracing::info!(recipient = %to, template = %template, "[dry-run] would send template");
        Ok(Self::fake_id())
    }

    async fn send_document(
        &self,
        to: &Recipient,
        asset: &UploadedAsset,
        caption: &str,
    ) -> Result<String, DeliveryError> {
        tracing::info!(
            recipient = %to,
            filename = %asset.filename,
            caption,
            media_id = %asset.asset_id,
            "[dry-run] would send document"
        );
        Ok(Self::fake_id())
    }
}
