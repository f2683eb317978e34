use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Lifecycle of a resume order.
///
/// ```text
/// pending ──► processing ──► completed
///    │             │
///    └──► failed ◄─┘
/// ```
///
/// `completed` and `failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Completed => "completed",
            OrderStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Failed)
    }

    /// Whether the transition graph has an edge `self -> next`.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Pending, OrderStatus::Processing)
                | (OrderStatus::Pending, OrderStatus::Failed)
                | (OrderStatus::Processing, OrderStatus::Completed)
                | (OrderStatus::Processing, OrderStatus::Failed)
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OrderRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: OrderStatus,
    pub amount: i64,
    pub job_description: String,
    pub original_resume_url: Option<String>,
    pub optimized_resume_url: Option<String>,
    pub cover_letter_url: Option<String>,
    pub payment_reference: Option<String>,
    pub match_score: Option<i16>,
    pub key_changes: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Fields supplied when an order is first recorded. Orders always start `pending`.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: Uuid,
    pub amount: i64,
    pub job_description: String,
}

/// Partial update. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderChanges {
    pub original_resume_url: Option<String>,
    pub optimized_resume_url: Option<String>,
    pub cover_letter_url: Option<String>,
    pub payment_reference: Option<String>,
    pub match_score: Option<i16>,
    pub key_changes: Option<Vec<String>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl OrderChanges {
    pub fn with_payment_reference(reference: impl Into<String>) -> Self {
        Self {
            payment_reference: Some(reference.into()),
            ..Self::default()
        }
    }

    pub fn with_original_resume(path: impl Into<String>) -> Self {
        Self {
            original_resume_url: Some(path.into()),
            ..Self::default()
        }
    }

    /// Applies the set fields onto `order` and bumps `updated_at`.
    /// The SQL store does the same with `COALESCE`.
    #[cfg(test)]
    pub fn apply_to(&self, order: &mut OrderRow) {
        if let Some(v) = &self.original_resume_url {
            order.original_resume_url = Some(v.clone());
        }
        if let Some(v) = &self.optimized_resume_url {
            order.optimized_resume_url = Some(v.clone());
        }
        if let Some(v) = &self.cover_letter_url {
            order.cover_letter_url = Some(v.clone());
        }
        if let Some(v) = &self.payment_reference {
            order.payment_reference = Some(v.clone());
        }
        if let Some(v) = self.match_score {
            order.match_score = Some(v);
        }
        if let Some(v) = &self.key_changes {
            order.key_changes = v.clone();
        }
        if let Some(v) = self.completed_at {
            order.completed_at = Some(v);
        }
        order.updated_at = Utc::now();
    }
}

/// Per-user dashboard aggregate.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OrderSummary {
    pub total_orders: usize,
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
    pub total_spent: i64,
}

impl OrderSummary {
    pub fn from_orders(orders: &[OrderRow]) -> Self {
        orders.iter().fold(Self::default(), |mut acc, order| {
            acc.total_orders += 1;
            acc.total_spent += order.amount;
            match order.status {
                OrderStatus::Pending => acc.pending += 1,
                OrderStatus::Processing => acc.processing += 1,
                OrderStatus::Completed => acc.completed += 1,
                OrderStatus::Failed => acc.failed += 1,
            }
            acc
        })
    }
}
