//! Axum route handlers for the Orders API.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::order::{NewOrder, OrderChanges, OrderRow, OrderStatus, OrderSummary};
use crate::orders::validation::{validate_job_description, validate_resume_file};
use crate::state::AppState;
use crate::storage::{original_resume_path, OutputKind, StorageError};

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct UserIdQuery {
    pub user_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct OrderListResponse {
    pub orders: Vec<OrderRow>,
    pub summary: OrderSummary,
}

/// Parsed multipart body of `POST /api/v1/orders`.
#[derive(Debug)]
pub struct OrderForm {
    pub user_id: Uuid,
    pub job_description: String,
    pub file_name: String,
    pub resume: Bytes,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/orders
///
/// Multipart fields: `user_id`, `job_description`, `resume` (file).
/// Records a `pending` order and stores the uploaded resume; payment happens afterwards.
pub async fn handle_create_order(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<OrderRow>), AppError> {
    let form = read_order_form(multipart).await?;
    let order = create_order(&state, form).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /api/v1/orders?user_id=
pub async fn handle_list_orders(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<OrderListResponse>, AppError> {
    let orders = state.orders.list_for_user(params.user_id).await?;
    let summary = OrderSummary::from_orders(&orders);
    Ok(Json(OrderListResponse { orders, summary }))
}

/// GET /api/v1/orders/:id?user_id=
pub async fn handle_get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<OrderRow>, AppError> {
    Ok(Json(owned_order(&state, id, params.user_id).await?))
}

/// GET /api/v1/orders/:id/artifacts/:kind?user_id=
///
/// `kind` is `resume` or `cover-letter`. Only completed orders have artifacts.
pub async fn handle_download_artifact(
    State(state): State<AppState>,
    Path((id, kind)): Path<(Uuid, String)>,
    Query(params): Query<UserIdQuery>,
) -> Result<Response, AppError> {
    let kind = OutputKind::parse(&kind)
        .ok_or_else(|| AppError::NotFound(format!("Unknown artifact '{kind}'")))?;
    let order = owned_order(&state, id, params.user_id).await?;

    if order.status != OrderStatus::Completed {
        return Err(AppError::Conflict(format!(
            "Order {id} is {}; artifacts are available once it is completed",
            order.status
        )));
    }

    let path = match kind {
        OutputKind::Resume => order.optimized_resume_url,
        OutputKind::CoverLetter => order.cover_letter_url,
    }
    .ok_or_else(|| AppError::NotFound(format!("Order {id} has no {} artifact", kind.file_name())))?;

    let body = state.artifacts.download(&path).await.map_err(|e| match e {
        StorageError::NotFound(p) => AppError::NotFound(format!("Artifact {p} not found")),
        other => AppError::Storage(other.to_string()),
    })?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/markdown; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", kind.file_name()),
            ),
        ],
        body,
    )
        .into_response())
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

async fn owned_order(state: &AppState, id: Uuid, user_id: Uuid) -> Result<OrderRow, AppError> {
    state
        .orders
        .get(id)
        .await?
        .filter(|o| o.user_id == user_id)
        .ok_or_else(|| AppError::NotFound(format!("Order {id} not found")))
}

async fn read_order_form(mut multipart: Multipart) -> Result<OrderForm, AppError> {
    let bad_form = |e: axum::extract::multipart::MultipartError| {
        AppError::Validation(format!("Invalid multipart body: {e}"))
    };

    let mut user_id = None;
    let mut job_description = None;
    let mut resume = None;

    while let Some(field) = multipart.next_field().await.map_err(bad_form)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "user_id" => {
                let raw = field.text().await.map_err(bad_form)?;
                let id = Uuid::parse_str(raw.trim())
                    .map_err(|_| AppError::Validation("user_id must be a UUID".to_string()))?;
                user_id = Some(id);
            }
            "job_description" => {
                job_description = Some(field.text().await.map_err(bad_form)?);
            }
            "resume" => {
                let file_name = field.file_name().unwrap_or("resume").to_string();
                let bytes = field.bytes().await.map_err(bad_form)?;
                resume = Some((file_name, bytes));
            }
            _ => {}
        }
    }

    let missing = |name: &str| AppError::Validation(format!("{name} is required"));
    let (file_name, resume) = resume.ok_or_else(|| missing("resume"))?;
    Ok(OrderForm {
        user_id: user_id.ok_or_else(|| missing("user_id"))?,
        job_description: job_description.ok_or_else(|| missing("job_description"))?,
        file_name,
        resume,
    })
}

/// Validates the form, records the order, uploads the resume and links it.
pub async fn create_order(state: &AppState, form: OrderForm) -> Result<OrderRow, AppError> {
    let job_description = validate_job_description(&form.job_description)?;
    validate_resume_file(&form.file_name, form.resume.len())?;

    let order = state
        .orders
        .insert(NewOrder {
            user_id: form.user_id,
            amount: state.config.order_price_cents,
            job_description,
        })
        .await?;

    let path = original_resume_path(order.id, &form.file_name);
    let content_type = content_type_for(&form.file_name);
    if let Err(e) = state.artifacts.upload(&path, form.resume, content_type).await {
        // The order can never be paid for without its resume.
        let abandoned = state
            .orders
            .transition(
                order.id,
                OrderStatus::Pending,
                OrderStatus::Failed,
                OrderChanges::default(),
            )
            .await;
        if let Err(mark) = abandoned {
            error!(order_id = %order.id, "Could not fail order after upload error: {mark}");
        }
        return Err(AppError::Storage(e.to_string()));
    }

    state
        .orders
        .update(order.id, OrderChanges::with_original_resume(&path))
        .await?;
    info!(order_id = %order.id, %path, "Resume uploaded for order");

    state
        .orders
        .get(order.id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Order {} not found", order.id)))
}

fn content_type_for(file_name: &str) -> &'static str {
    let lower = file_name.to_ascii_lowercase();
    if lower.ends_with(".pdf") {
        "application/pdf"
    } else if lower.ends_with(".md") {
        "text/markdown"
    } else {
        "text/plain"
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::{Config, StepTimeouts};
    use crate::extract::DocumentExtractor;
    use crate::generation::client::CannedGenerator;
    use crate::orders::memory::MemoryOrderStore;
    use crate::orders::store::OrderStore;
    use crate::processor::OrderProcessor;
    use crate::queue::RecordingQueue;
    use crate::storage::memory::MemoryArtifactStore;

    const JOB: &str = "We are hiring a senior Rust engineer to build payment infrastructure at scale.";

    fn state() -> (AppState, Arc<MemoryOrderStore>, Arc<MemoryArtifactStore>) {
        let orders = Arc::new(MemoryOrderStore::new());
        let artifacts = Arc::new(MemoryArtifactStore::new());
        let processor = Arc::new(OrderProcessor::new(
            orders.clone(),
            artifacts.clone(),
            Arc::new(DocumentExtractor),
            Arc::new(CannedGenerator::new("{}")),
            StepTimeouts::default(),
        ));
        let state = AppState {
            orders: orders.clone(),
            artifacts: artifacts.clone(),
            queue: Arc::new(RecordingQueue::new()),
            processor,
            config: Config::for_tests("whsec_test"),
        };
        (state, orders, artifacts)
    }

    fn form(user_id: Uuid, file_name: &str) -> OrderForm {
        OrderForm {
            user_id,
            job_description: JOB.to_string(),
            file_name: file_name.to_string(),
            resume: Bytes::from_static(b"Experienced engineer..."),
        }
    }

    #[tokio::test]
    async fn test_create_order_records_pending_order_with_resume() {
        let (state, _, artifacts) = state();
        let user_id = Uuid::new_v4();

        let order = create_order(&state, form(user_id, "resume.txt")).await.unwrap();

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.amount, 4900);
        assert_eq!(order.user_id, user_id);
        assert!(order.payment_reference.is_none());
        let path = order.original_resume_url.unwrap();
        assert_eq!(path, format!("{}/resume.txt", order.id));
        assert_eq!(
            artifacts.text(&path).await.as_deref(),
            Some("Experienced engineer...")
        );
    }

    #[tokio::test]
    async fn test_failed_resume_upload_fails_the_order() {
        let (state, orders, artifacts) = state();
        artifacts.fail_every_upload();
        let user_id = Uuid::new_v4();

        let err = create_order(&state, form(user_id, "resume.txt"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Storage(_)));
        let stored = orders.list_for_user(user_id).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].status, OrderStatus::Failed);
        assert!(stored[0].original_resume_url.is_none());
    }

    #[tokio::test]
    async fn test_create_order_rejects_docx_before_writing() {
        let (state, orders, artifacts) = state();
        let user_id = Uuid::new_v4();

        let err = create_order(&state, form(user_id, "resume.docx"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert!(orders.list_for_user(user_id).await.unwrap().is_empty());
        assert_eq!(artifacts.object_count().await, 0);
    }

    #[tokio::test]
    async fn test_list_orders_includes_summary() {
        let (state, _, _) = state();
        let user_id = Uuid::new_v4();
        create_order(&state, form(user_id, "a.txt")).await.unwrap();
        create_order(&state, form(user_id, "b.txt")).await.unwrap();

        let Json(list) = handle_list_orders(State(state), Query(UserIdQuery { user_id }))
            .await
            .unwrap();

        assert_eq!(list.orders.len(), 2);
        assert_eq!(list.summary.pending, 2);
        assert_eq!(list.summary.total_spent, 9800);
    }

    #[tokio::test]
    async fn test_get_order_hides_other_users_orders() {
        let (state, _, _) = state();
        let order = create_order(&state, form(Uuid::new_v4(), "a.txt"))
            .await
            .unwrap();

        let err = handle_get_order(
            State(state),
            Path(order.id),
            Query(UserIdQuery {
                user_id: Uuid::new_v4(),
            }),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_artifacts_require_completed_order() {
        let (state, _, _) = state();
        let user_id = Uuid::new_v4();
        let order = create_order(&state, form(user_id, "a.txt")).await.unwrap();

        let err = handle_download_artifact(
            State(state),
            Path((order.id, "resume".to_string())),
            Query(UserIdQuery { user_id }),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_completed_order_serves_cover_letter() {
        let (state, orders, artifacts) = state();
        let user_id = Uuid::new_v4();
        let order = create_order(&state, form(user_id, "a.txt")).await.unwrap();
        let letter_path = OutputKind::CoverLetter.path(order.id);
        artifacts
            .put(&letter_path, b"Dear hiring team,".to_vec())
            .await;
        orders
            .transition(
                order.id,
                OrderStatus::Pending,
                OrderStatus::Processing,
                OrderChanges::with_payment_reference("pi_1"),
            )
            .await
            .unwrap();
        orders
            .transition(
                order.id,
                OrderStatus::Processing,
                OrderStatus::Completed,
                OrderChanges {
                    optimized_resume_url: Some(OutputKind::Resume.path(order.id)),
                    cover_letter_url: Some(letter_path),
                    completed_at: Some(chrono::Utc::now()),
                    ..OrderChanges::default()
                },
            )
            .await
            .unwrap();

        let response = handle_download_artifact(
            State(state),
            Path((order.id, "cover-letter".to_string())),
            Query(UserIdQuery { user_id }),
        )
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"Dear hiring team,");
    }
}
