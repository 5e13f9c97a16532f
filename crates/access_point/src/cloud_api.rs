use super::{
    payloads::{self, MessageRequest},
    DeliveryError, Document, MessagingClient, Operation,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use wabc_core::{Recipient, TemplateRef, UploadedAsset};

/// Uploads move a whole file; sends carry a small JSON body.
pub const UPLOAD_TIMEOUT: Duration = Duration::from_secs(60);
pub const SEND_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the WhatsApp Cloud API media and messages endpoints.
///
/// All calls go to `{api_base}/{graph_version}/{phone_number_id}` with a
/// bearer token.
#[derive(Clone)]
pub struct CloudApiClient {
    pub base_url: String,
    access_token: String,
    http_client: reqwest::Client,
    upload_timeout: Duration,
    send_timeout: Duration,
}

impl CloudApiClient {
    pub fn new(
        api_base: &str,
        graph_version: &str,
        phone_number_id: &str,
        access_token: String,
    ) -> Result<Arc<Self>> {
        Self::with_timeouts(
            api_base,
            graph_version,
            phone_number_id,
            access_token,
            UPLOAD_TIMEOUT,
            SEND_TIMEOUT,
        )
    }

    pub fn with_timeouts(
        api_base: &str,
        graph_version: &str,
        phone_number_id: &str,
        access_token: String,
        upload_timeout: Duration,
        send_timeout: Duration,
    ) -> Result<Arc<Self>> {
        let http_client = reqwest::Client::builder()
            .tcp_keepalive(Duration::from_secs(60))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Arc::new(Self {
            base_url: format!(
                "{}/{}/{}",
                api_base.trim_end_matches('/'),
                graph_version,
                phone_number_id
            ),
            access_token,
            http_client,
            upload_timeout,
            send_timeout,
        }))
    }

    async fn post_message(
        &self,
        operation: Operation,
        payload: &MessageRequest<'_>,
    ) -> Result<String, DeliveryError> {
        let url = format!("{}/messages", self.base_url);
        let resp = self
            .http_client
            .post(&url)
            .bearer_auth(&self.access_token)
            .timeout(self.send_timeout)
            .json(payload)
            .send()
            .await
            .map_err(|e| classify(operation, self.send_timeout, e))?;

        let body = read_body(operation, self.send_timeout, resp).await?;
        payloads::message_id(&body).ok_or(DeliveryError::MissingId { operation, body })
    }
}

/// Status >= 300 is a failure; the body is kept for diagnosis.
async fn read_body(
    operation: Operation,
    timeout: Duration,
    resp: reqwest::Response,
) -> Result<String, DeliveryError> {
    let status = resp.status();
    let body = resp
        .text()
        .await
        .map_err(|e| classify(operation, timeout, e))?;
    if status.as_u16() >= 300 {
        return Err(DeliveryError::Status {
            operation,
            status: status.as_u16(),
            body,
        });
    }
    Ok(body)
}

fn classify(operation: Operation, timeout: Duration, err: reqwest::Error) -> DeliveryError {
    if err.is_timeout() {
        DeliveryError::Timeout { operation, timeout }
    } else {
        DeliveryError::Transport {
            operation,
            message: err.to_string(),
        }
    }
}

#[async_trait]
impl MessagingClient for CloudApiClient {
    async fn upload_asset(&self, document: &Document) -> Result<String, DeliveryError> {
        let operation = Operation::Upload;
        let url = format!("{}/media", self.base_url);

        let file_part = reqwest::multipart::Part::bytes(document.bytes.clone())
            .file_name(document.file_name.clone())
            .mime_str(&document.mime_type)
            .map_err(|e| classify(operation, self.upload_timeout, e))?;
        let form = reqwest::multipart::Form::new()
            .text("messaging_product", payloads::MESSAGING_PRODUCT)
            .text("type", document.mime_type.clone())
            .part("file", file_part);

        let resp = self
            .http_client
            .post(&url)
            .bearer_auth(&self.access_token)
            .timeout(self.upload_timeout)
            .multipart(form)
            .send()
            .await
            .map_err(|e| classify(operation, self.upload_timeout, e))?;

        let body = read_body(operation, self.upload_timeout, resp).await?;
        let media_id =
            payloads::media_id(&body).ok_or(DeliveryError::MissingId { operation, body })?;

        tracing::info!(
            media_id = %media_id,
            file = %document.file_name,
            bytes = document.bytes.len(),
            "Document uploaded to Cloud API"
        );
        Ok(media_id)
    }

    async fn send_template(
        &self,
        to: &Recipient,
        template: &TemplateRef,
    ) -> Result<String, DeliveryError> {
        let payload = MessageRequest::template(to.as_str(), &template.name, &template.language);
        let id = self.post_message(Operation::SendTemplate, &payload).await?;
        tracing::debug!(recipient = %to, message_id = %id, template = %template, "template accepted");
        Ok(id)
    }

    async fn send_document(
        &self,
        to: &Recipient,
        asset: &UploadedAsset,
        caption: &str,
    ) -> Result<String, DeliveryError> {
        let payload =
            MessageRequest::document(to.as_str(), &asset.asset_id, &asset.filename, caption);
        let id = self.post_message(Operation::SendDocument, &payload).await?;
        tracing::debug!(recipient = %to, message_id = %id, "document accepted");
        Ok(id)
    }
}
