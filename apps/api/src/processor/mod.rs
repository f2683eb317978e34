//! Order lifecycle processor: drives a paid order to `completed` or `failed`.
//!
//! Flow (strict sequence, each step commits before the next starts):
//!   load → fetch input → extract → generate → persist outputs → finalize
//!
//! `advance` runs the pipeline and propagates the first error. `process` runs
//! `advance` and converts any error into exactly one `processing -> failed`
//! transition. `process_claimed` is what queue workers call: it skips entries
//! whose order has already left `processing`. Nothing here retries.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::Utc;
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::StepTimeouts;
use crate::errors::ProcessingError;
use crate::extract::TextExtractor;
use crate::generation::{ContentGenerator, GenerationRequest};
use crate::models::order::{OrderChanges, OrderStatus};
use crate::orders::store::OrderStore;
use crate::storage::{ArtifactStore, OutputKind, MARKDOWN_CONTENT_TYPE};

/// Outcome of a pipeline run that produced both artifacts.
#[derive(Debug, Clone, Serialize)]
pub struct CompletedOrder {
    pub order_id: Uuid,
    pub optimized_resume_path: String,
    pub cover_letter_path: String,
    pub match_score: u8,
    /// `false` when the order had already left `processing`; the artifacts were
    /// still rewritten at the same paths.
    pub finalized: bool,
}

/// What a worker did with one queue entry.
#[derive(Debug)]
pub enum Dispatch {
    Completed(CompletedOrder),
    /// The pipeline failed and the order was moved to `failed`.
    Failed(ProcessingError),
    /// The order is unknown or no longer `processing`; the entry is stale.
    Skipped,
    /// The order could not be read. The entry must stay queued.
    StoreUnavailable(String),
}

pub struct OrderProcessor {
    orders: Arc<dyn OrderStore>,
    artifacts: Arc<dyn ArtifactStore>,
    extractor: Arc<dyn TextExtractor>,
    generator: Arc<dyn ContentGenerator>,
    timeouts: StepTimeouts,
}

impl OrderProcessor {
    pub fn new(
        orders: Arc<dyn OrderStore>,
        artifacts: Arc<dyn ArtifactStore>,
        extractor: Arc<dyn TextExtractor>,
        generator: Arc<dyn ContentGenerator>,
        timeouts: StepTimeouts,
    ) -> Self {
        Self {
            orders,
            artifacts,
            extractor,
            generator,
            timeouts,
        }
    }

    /// Runs the pipeline and, on failure, marks the order `failed`.
    pub async fn process(&self, order_id: Uuid) -> Result<CompletedOrder, ProcessingError> {
        match self.advance(order_id).await {
            Ok(completed) => Ok(completed),
            Err(e) => {
                error!(order_id = %order_id, code = e.code(), "Order processing failed: {e}");
                self.mark_failed(order_id).await;
                Err(e)
            }
        }
    }

    /// Runs `process` only if the order is still `processing`.
    ///
    /// Queue entries can be delivered again after a worker restart, so an order
    /// that already finished must not be re-run.
    pub async fn process_claimed(&self, order_id: Uuid) -> Dispatch {
        let order = match self.orders.get(order_id).await {
            Ok(Some(order)) => order,
            Ok(None) => {
                warn!(order_id = %order_id, "Queued order does not exist; skipping");
                return Dispatch::Skipped;
            }
            Err(e) => {
                error!(order_id = %order_id, "Could not load queued order: {e}");
                return Dispatch::StoreUnavailable(e.to_string());
            }
        };

        if order.status != OrderStatus::Processing {
            if order.status.is_terminal() {
                info!(order_id = %order_id, status = %order.status, "Order already finished; skipping");
            } else {
                warn!(order_id = %order_id, status = %order.status, "Order was never claimed; skipping");
            }
            return Dispatch::Skipped;
        }

        match self.process(order_id).await {
            Ok(completed) => Dispatch::Completed(completed),
            Err(e) => Dispatch::Failed(e),
        }
    }

    /// Moves `processing -> failed`. Touches no other field.
    /// Returns whether the transition applied.
    pub async fn mark_failed(&self, order_id: Uuid) -> bool {
        match self
            .orders
            .transition(
                order_id,
                OrderStatus::Processing,
                OrderStatus::Failed,
                OrderChanges::default(),
            )
            .await
        {
            Ok(true) => {
                info!(order_id = %order_id, "Order marked failed");
                true
            }
            Ok(false) => {
                warn!(order_id = %order_id, "Order was not processing; failure not recorded");
                false
            }
            Err(e) => {
                error!(order_id = %order_id, "Could not mark order failed: {e}");
                false
            }
        }
    }

    /// The side-effect pipeline. Expects the order to be `processing` but does
    /// not check it, so a re-run on a completed order rewrites the same artifacts.
    pub async fn advance(&self, order_id: Uuid) -> Result<CompletedOrder, ProcessingError> {
        // Step 1: Load
        let order = self
            .orders
            .get(order_id)
            .await
            .map_err(|e| ProcessingError::PersistFailed(format!("loading order {order_id}: {e}")))?
            .ok_or_else(|| ProcessingError::OrderNotFound(order_id.to_string()))?;

        // Step 2: Fetch input
        let resume_path = order.original_resume_url.as_deref().ok_or_else(|| {
            ProcessingError::ArtifactUnavailable(format!("order {order_id} has no uploaded resume"))
        })?;
        let document = with_timeout(
            self.timeouts.download,
            self.artifacts.download(resume_path),
        )
        .await
        .ok_or_else(|| {
            ProcessingError::ArtifactUnavailable(format!("download of {resume_path} timed out"))
        })?
        .map_err(|e| ProcessingError::ArtifactUnavailable(e.to_string()))?;
        info!(order_id = %order_id, bytes = document.len(), "Resume downloaded");

        // Step 3: Extract
        let resume_text = self.extract(document).await?;

        // Step 4: Generate
        let request = GenerationRequest {
            resume_text: &resume_text,
            job_description: &order.job_description,
        };
        let result = with_timeout(self.timeouts.generation, self.generator.generate(request))
            .await
            .ok_or_else(|| ProcessingError::GenerationFailed("generation timed out".to_string()))?
            .map_err(|e| ProcessingError::GenerationFailed(e.to_string()))?;
        info!(order_id = %order_id, match_score = result.match_score, "Content generated");

        // Step 5: Persist outputs
        let optimized_resume_path = OutputKind::Resume.path(order_id);
        let cover_letter_path = OutputKind::CoverLetter.path(order_id);
        self.upload(&optimized_resume_path, result.optimized_resume.clone())
            .await?;
        self.upload(&cover_letter_path, result.cover_letter.clone())
            .await?;

        // Step 6: Finalize
        let changes = OrderChanges {
            optimized_resume_url: Some(optimized_resume_path.clone()),
            cover_letter_url: Some(cover_letter_path.clone()),
            match_score: Some(i16::from(result.match_score)),
            key_changes: Some(result.key_changes.clone()),
            completed_at: Some(Utc::now()),
            ..OrderChanges::default()
        };
        let finalized = self
            .orders
            .transition(
                order_id,
                OrderStatus::Processing,
                OrderStatus::Completed,
                changes,
            )
            .await
            .map_err(|e| ProcessingError::PersistFailed(e.to_string()))?;

        if finalized {
            info!(order_id = %order_id, "Order completed");
        } else {
            warn!(
                order_id = %order_id,
                "Order was no longer processing; artifacts rewritten, record left unchanged"
            );
        }

        Ok(CompletedOrder {
            order_id,
            optimized_resume_path,
            cover_letter_path,
            match_score: result.match_score,
            finalized,
        })
    }

    /// Extraction can be CPU-heavy for PDFs, so it runs on the blocking pool.
    async fn extract(&self, document: Bytes) -> Result<String, ProcessingError> {
        let extractor = Arc::clone(&self.extractor);
        tokio::task::spawn_blocking(move || extractor.extract(&document))
            .await
            .map_err(|e| ProcessingError::ExtractionFailed(format!("extraction aborted: {e}")))?
            .map_err(|e| ProcessingError::ExtractionFailed(e.to_string()))
    }

    async fn upload(&self, path: &str, text: String) -> Result<(), ProcessingError> {
        with_timeout(
            self.timeouts.upload,
            self.artifacts
                .upload(path, Bytes::from(text), MARKDOWN_CONTENT_TYPE),
        )
        .await
        .ok_or_else(|| ProcessingError::PersistFailed(format!("upload of {path} timed out")))?
        .map_err(|e| ProcessingError::PersistFailed(e.to_string()))
    }
}

/// `None` when `future` did not finish within `limit`.
async fn with_timeout<F: Future>(limit: Duration, future: F) -> Option<F::Output> {
    tokio::time::timeout(limit, future).await.ok()
}
