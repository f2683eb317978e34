//! In-memory `OrderStore` used by handler and processor tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::models::order::{NewOrder, OrderChanges, OrderRow, OrderStatus};
use crate::orders::store::{check_edge, OrderStore, StoreError};

#[derive(Default)]
pub struct MemoryOrderStore {
    orders: Mutex<HashMap<Uuid, OrderRow>>,
    /// Every applied status change, in order: (id, from, to).
    transitions: Mutex<Vec<(Uuid, OrderStatus, OrderStatus)>>,
    /// When set, every trait call fails like a lost database connection.
    unavailable: AtomicBool,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a pending order with a caller-chosen id.
    pub async fn seed(&self, id: Uuid, amount: i64, job_description: &str) -> OrderRow {
        let now = Utc::now();
        let row = OrderRow {
            id,
            user_id: Uuid::new_v4(),
            status: OrderStatus::Pending,
            amount,
            job_description: job_description.to_string(),
            original_resume_url: None,
            optimized_resume_url: None,
            cover_letter_url: None,
            payment_reference: None,
            match_score: None,
            key_changes: vec![],
            created_at: now,
            updated_at: now,
            completed_at: None,
        };
        self.orders.lock().await.insert(id, row.clone());
        row
    }

    pub async fn snapshot(&self, id: Uuid) -> Option<OrderRow> {
        self.orders.lock().await.get(&id).cloned()
    }

    pub async fn transitions(&self) -> Vec<(Uuid, OrderStatus, OrderStatus)> {
        self.transitions.lock().await.clone()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn insert(&self, order: NewOrder) -> Result<OrderRow, StoreError> {
        self.check_available()?;
        let row = self
            .seed(Uuid::new_v4(), order.amount, &order.job_description)
            .await;
        let mut orders = self.orders.lock().await;
        let stored = orders.get_mut(&row.id).expect("just inserted");
        stored.user_id = order.user_id;
        Ok(stored.clone())
    }

    async fn get(&self, id: Uuid) -> Result<Option<OrderRow>, StoreError> {
        self.check_available()?;
        Ok(self.snapshot(id).await)
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<OrderRow>, StoreError> {
        self.check_available()?;
        let mut rows: Vec<_> = self
            .orders
            .lock()
            .await
            .values()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn update(&self, id: Uuid, changes: OrderChanges) -> Result<bool, StoreError> {
        self.check_available()?;
        match self.orders.lock().await.get_mut(&id) {
            Some(order) => {
                changes.apply_to(order);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn transition(
        &self,
        id: Uuid,
        expected: OrderStatus,
        next: OrderStatus,
        changes: OrderChanges,
    ) -> Result<bool, StoreError> {
        check_edge(expected, next)?;
        self.check_available()?;

        let mut orders = self.orders.lock().await;
        let Some(order) = orders.get_mut(&id) else {
            return Ok(false);
        };
        if order.status != expected {
            return Ok(false);
        }
        changes.apply_to(order);
        order.status = next;
        self.transitions.lock().await.push((id, expected, next));
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_conditional_transition_applies_once() {
        let store = MemoryOrderStore::new();
        let id = Uuid::new_v4();
        store.seed(id, 4900, "Backend role").await;

        let first = store
            .transition(id, OrderStatus::Pending, OrderStatus::Processing, OrderChanges::default())
            .await
            .unwrap();
        let second = store
            .transition(id, OrderStatus::Pending, OrderStatus::Processing, OrderChanges::default())
            .await
            .unwrap();

        assert!(first);
        assert!(!second);
        assert_eq!(store.transitions().await.len(), 1);
    }

    #[tokio::test]
    async fn test_transition_rejects_edges_outside_graph() {
        let store = MemoryOrderStore::new();
        let id = Uuid::new_v4();
        store.seed(id, 4900, "Backend role").await;

        let err = store
            .transition(id, OrderStatus::Pending, OrderStatus::Completed, OrderChanges::default())
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::InvalidTransition { .. }));
        assert_eq!(store.snapshot(id).await.unwrap().status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn test_unknown_order_does_not_transition() {
        let store = MemoryOrderStore::new();
        let applied = store
            .transition(
                Uuid::new_v4(),
                OrderStatus::Pending,
                OrderStatus::Processing,
                OrderChanges::default(),
            )
            .await
            .unwrap();
        assert!(!applied);
    }
}
