//! Order persistence.
//!
//! `OrderStore` is the only way the rest of the service touches order rows.
//! Status never changes through `update`; it changes only through `transition`,
//! which is a single conditional statement: it applies iff the stored status is
//! still `expected`. That gives at-most-once `pending -> processing` claims
//! under duplicate webhook delivery.

use async_trait::async_trait;
use sqlx::postgres::PgArguments;
use sqlx::query::Query;
use sqlx::{PgPool, Postgres};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::order::{NewOrder, OrderChanges, OrderRow, OrderStatus};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Transition {from} -> {to} is not part of the order lifecycle")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Records a new order in `pending`.
    async fn insert(&self, order: NewOrder) -> Result<OrderRow, StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<OrderRow>, StoreError>;

    /// All orders of a user, newest first.
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<OrderRow>, StoreError>;

    /// Partial update of non-status fields. Returns `false` when no row matched.
    async fn update(&self, id: Uuid, changes: OrderChanges) -> Result<bool, StoreError>;

    /// Atomically moves `id` from `expected` to `next` and applies `changes`.
    ///
    /// Returns `false` when the order is absent or its status is no longer
    /// `expected`. Edges outside the lifecycle graph are rejected up front.
    async fn transition(
        &self,
        id: Uuid,
        expected: OrderStatus,
        next: OrderStatus,
        changes: OrderChanges,
    ) -> Result<bool, StoreError>;
}

pub(crate) fn check_edge(from: OrderStatus, to: OrderStatus) -> Result<(), StoreError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(StoreError::InvalidTransition { from, to })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// PostgreSQL backend
// ────────────────────────────────────────────────────────────────────────────

const UPDATE_SQL: &str = r#"
    UPDATE resume_orders SET
        original_resume_url  = COALESCE($2, original_resume_url),
        optimized_resume_url = COALESCE($3, optimized_resume_url),
        cover_letter_url     = COALESCE($4, cover_letter_url),
        payment_reference    = COALESCE($5, payment_reference),
        match_score          = COALESCE($6, match_score),
        key_changes          = COALESCE($7, key_changes),
        completed_at         = COALESCE($8, completed_at),
        updated_at           = now()
    WHERE id = $1
"#;

const TRANSITION_SQL: &str = r#"
    UPDATE resume_orders SET
        original_resume_url  = COALESCE($2, original_resume_url),
        optimized_resume_url = COALESCE($3, optimized_resume_url),
        cover_letter_url     = COALESCE($4, cover_letter_url),
        payment_reference    = COALESCE($5, payment_reference),
        match_score          = COALESCE($6, match_score),
        key_changes          = COALESCE($7, key_changes),
        completed_at         = COALESCE($8, completed_at),
        status               = $9,
        updated_at           = now()
    WHERE id = $1 AND status = $10
"#;

/// Binds `$1` (id) and `$2..=$8` (the partial fields) in column order.
fn bind_changes(
    query: Query<'_, Postgres, PgArguments>,
    id: Uuid,
    changes: OrderChanges,
) -> Query<'_, Postgres, PgArguments> {
    query
        .bind(id)
        .bind(changes.original_resume_url)
        .bind(changes.optimized_resume_url)
        .bind(changes.cover_letter_url)
        .bind(changes.payment_reference)
        .bind(changes.match_score)
        .bind(changes.key_changes)
        .bind(changes.completed_at)
}

#[derive(Clone)]
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn insert(&self, order: NewOrder) -> Result<OrderRow, StoreError> {
        let row = sqlx::query_as::<_, OrderRow>(
            r#"
            INSERT INTO resume_orders (id, user_id, status, amount, job_description)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(order.user_id)
        .bind(OrderStatus::Pending)
        .bind(order.amount)
        .bind(&order.job_description)
        .fetch_one(&self.pool)
        .await?;

        info!(order_id = %row.id, user_id = %row.user_id, "Order created");
        Ok(row)
    }

    async fn get(&self, id: Uuid) -> Result<Option<OrderRow>, StoreError> {
        Ok(
            sqlx::query_as::<_, OrderRow>("SELECT * FROM resume_orders WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<OrderRow>, StoreError> {
        Ok(sqlx::query_as::<_, OrderRow>(
            "SELECT * FROM resume_orders WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn update(&self, id: Uuid, changes: OrderChanges) -> Result<bool, StoreError> {
        let result = bind_changes(sqlx::query(UPDATE_SQL), id, changes)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn transition(
        &self,
        id: Uuid,
        expected: OrderStatus,
        next: OrderStatus,
        changes: OrderChanges,
    ) -> Result<bool, StoreError> {
        check_edge(expected, next)?;

        let result = bind_changes(sqlx::query(TRANSITION_SQL), id, changes)
            .bind(next)
            .bind(expected)
            .execute(&self.pool)
            .await?;

        let applied = result.rows_affected() == 1;
        debug!(order_id = %id, %expected, %next, applied, "Order transition");
        Ok(applied)
    }
}
