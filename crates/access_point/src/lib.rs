use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use wabc_core::parsing::compute_sha256_hex;
use wabc_core::{Recipient, TemplateRef, UploadedAsset};

pub mod cloud_api;
pub mod mock;
pub mod payloads;

/// Placeholder asset id used when nothing is uploaded.
pub const DRY_RUN_MEDIA_ID: &str = "DRY_RUN_MEDIA_ID";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Upload,
    SendTemplate,
    SendDocument,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Upload => "upload",
            Operation::SendTemplate => "template send",
            Operation::SendDocument => "document send",
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("{operation} failed: {status} {body}")]
    Status {
        operation: Operation,
        status: u16,
        body: String,
    },
    #[error("{operation} response missing id: {body}")]
    MissingId { operation: Operation, body: String },
    #[error("{operation} timed out after {}s", .timeout.as_secs_f64())]
    Timeout {
        operation: Operation,
        timeout: Duration,
    },
    #[error("{operation} transport error: {message}")]
    Transport { operation: Operation, message: String },
    #[error("cannot read document {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DeliveryError {
    pub fn status(&self) -> Option<u16> {
        match self {
            DeliveryError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Document bytes as read from disk, ready for upload.
#[derive(Debug, Clone)]
pub struct Document {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl Document {
    pub async fn load(path: &Path, mime_type: &str) -> Result<Self, DeliveryError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| DeliveryError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        Ok(Self {
            file_name,
            mime_type: mime_type.to_string(),
            bytes,
        })
    }

    pub fn sha256(&self) -> String {
        compute_sha256_hex(&self.bytes)
    }

    /// Pairs this document with the id the provider returned for it.
    pub fn into_asset(self, asset_id: String, display_name: &str) -> UploadedAsset {
        UploadedAsset {
            asset_id,
            sha256: self.sha256(),
            size_bytes: self.bytes.len() as u64,
            mime_type: self.mime_type,
            filename: display_name.to_string(),
        }
    }
}

/// Remote messaging provider. Each call is a single attempt with no retry.
#[async_trait]
pub trait MessagingClient: Send + Sync {
    async fn upload_asset(&self, document: &Document) -> Result<String, DeliveryError>;

    async fn send_template(
        &self,
        to: &Recipient,
        template: &TemplateRef,
    ) -> Result<String, DeliveryError>;

    async fn send_document(
        &self,
        to: &Recipient,
        asset: &UploadedAsset,
        caption: &str,
    ) -> Result<String, DeliveryError>;
}
