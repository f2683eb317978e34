//! Artifact storage for uploaded resumes and generated outputs, addressed by path.
//!
//! Paths are derived from the order id so that re-processing an order
//! overwrites its previous outputs instead of accumulating new ones.

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use bytes::Bytes;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

#[cfg(test)]
pub mod memory;

pub const MARKDOWN_CONTENT_TYPE: &str = "text/markdown";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Artifact not found: {0}")]
    NotFound(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn download(&self, path: &str) -> Result<Bytes, StorageError>;

    /// Writes `body` at `path`, replacing any existing object.
    async fn upload(&self, path: &str, body: Bytes, content_type: &str)
        -> Result<(), StorageError>;
}

/// Generated artifact kinds exposed for download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    Resume,
    CoverLetter,
}

impl OutputKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "resume" => Some(OutputKind::Resume),
            "cover-letter" => Some(OutputKind::CoverLetter),
            _ => None,
        }
    }

    pub fn path(self, order_id: Uuid) -> String {
        match self {
            OutputKind::Resume => format!("{order_id}/optimized-resume.md"),
            OutputKind::CoverLetter => format!("{order_id}/cover-letter.md"),
        }
    }

    pub fn file_name(self) -> &'static str {
        match self {
            OutputKind::Resume => "optimized-resume.md",
            OutputKind::CoverLetter => "cover-letter.md",
        }
    }
}

/// Storage path of an uploaded resume: `{order_id}/{sanitized file name}`.
pub fn original_resume_path(order_id: Uuid, file_name: &str) -> String {
    format!("{order_id}/{}", sanitize_file_name(file_name))
}

/// Keeps the final path segment and replaces anything outside `[A-Za-z0-9._-]`.
fn sanitize_file_name(file_name: &str) -> String {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(file_name)
        .trim();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "resume".to_string()
    } else {
        cleaned.to_string()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// S3 / MinIO backend
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct S3ArtifactStore {
    client: S3Client,
    bucket: String,
}

impl S3ArtifactStore {
    pub fn new(client: S3Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }
}

#[async_trait]
impl ArtifactStore for S3ArtifactStore {
    async fn download(&self, path: &str) -> Result<Bytes, StorageError> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
            .map_err(|e| {
                let missing = e
                    .as_service_error()
                    .map(|se| se.is_no_such_key())
                    .unwrap_or(false);
                if missing {
                    StorageError::NotFound(path.to_string())
                } else {
                    StorageError::Backend(format!("S3 download of {path} failed: {e}"))
                }
            })?;

        let body = output
            .body
            .collect()
            .await
            .map_err(|e| StorageError::Backend(format!("S3 body read of {path} failed: {e}")))?;

        Ok(body.into_bytes())
    }

    async fn upload(
        &self,
        path: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<(), StorageError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(path)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::Backend(format!("S3 upload of {path} failed: {e}")))?;

        info!("Uploaded artifact to s3://{}/{}", self.bucket, path);
        Ok(())
    }
}
