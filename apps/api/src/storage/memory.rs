//! In-memory `ArtifactStore` for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::Mutex;

use crate::storage::{ArtifactStore, StorageError};

#[derive(Default)]
pub struct MemoryArtifactStore {
    objects: Mutex<HashMap<String, (Bytes, String)>>,
    uploads: Mutex<Vec<String>>,
    /// Paths whose upload fails with a backend error.
    failing_uploads: Mutex<Vec<String>>,
    fail_all: AtomicBool,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put(&self, path: &str, body: impl Into<Bytes>) {
        self.objects
            .lock()
            .await
            .insert(path.to_string(), (body.into(), "application/octet-stream".to_string()));
    }

    pub async fn fail_uploads_to(&self, path: &str) {
        self.failing_uploads.lock().await.push(path.to_string());
    }

    pub fn fail_every_upload(&self) {
        self.fail_all.store(true, Ordering::SeqCst);
    }

    pub async fn text(&self, path: &str) -> Option<String> {
        self.objects
            .lock()
            .await
            .get(path)
            .map(|(body, _)| String::from_utf8_lossy(body).into_owned())
    }

    pub async fn contains(&self, path: &str) -> bool {
        self.objects.lock().await.contains_key(path)
    }

    pub async fn object_count(&self) -> usize {
        self.objects.lock().await.len()
    }

    /// Every successful upload path, in call order.
    pub async fn uploads(&self) -> Vec<String> {
        self.uploads.lock().await.clone()
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn download(&self, path: &str) -> Result<Bytes, StorageError> {
        self.objects
            .lock()
            .await
            .get(path)
            .map(|(body, _)| body.clone())
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }

    async fn upload(
        &self,
        path: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<(), StorageError> {
        if self.fail_all.load(Ordering::SeqCst)
            || self.failing_uploads.lock().await.iter().any(|p| p == path)
        {
            return Err(StorageError::Backend(format!("injected failure for {path}")));
        }
        self.objects
            .lock()
            .await
            .insert(path.to_string(), (body, content_type.to_string()));
        self.uploads.lock().await.push(path.to_string());
        Ok(())
    }
}
