//! Payment webhook handler.
//!
//! POST /api/v1/webhooks/stripe. Takes the raw body, which signature verification needs byte for byte.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::errors::{AppError, WebhookError};
use crate::models::order::{OrderChanges, OrderStatus};
use crate::payments::event::{PaymentEvent, PaymentIntake};
use crate::payments::signature::verify_webhook_signature;
use crate::state::AppState;

pub const SIGNATURE_HEADER: &str = "stripe-signature";

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct WebhookAck {
    pub received: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub duplicate: bool,
}

impl WebhookAck {
    fn received() -> Self {
        Self {
            received: true,
            duplicate: false,
        }
    }

    fn duplicate() -> Self {
        Self {
            received: true,
            duplicate: true,
        }
    }
}

pub async fn handle_stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, AppError> {
    // 1. Verify signature
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| WebhookError::InvalidSignature("missing signature header".to_string()))?;

    verify_webhook_signature(
        &body,
        signature,
        &state.config.stripe_webhook_secret,
        state.config.webhook_tolerance,
    )
    .map_err(|e| WebhookError::InvalidSignature(e.to_string()))?;

    // 2. Parse and classify
    let event = PaymentEvent::parse(&body)?;
    info!(event_id = %event.id, event_type = %event.event_type, "Received payment webhook");

    let (order_id, payment_reference) = match event.classify()? {
        PaymentIntake::CheckoutCompleted {
            order_id,
            payment_reference,
        } => (order_id, payment_reference),
        PaymentIntake::Ignored { event_type } => {
            info!(event_id = %event.id, %event_type, "Payment event not handled; acknowledged");
            return Ok(Json(WebhookAck::received()));
        }
    };

    // 3. Claim: pending -> processing, at most once per order
    let claimed = state
        .orders
        .transition(
            order_id,
            OrderStatus::Pending,
            OrderStatus::Processing,
            OrderChanges::with_payment_reference(&payment_reference),
        )
        .await?;

    if !claimed {
        warn!(
            order_id = %order_id,
            event_id = %event.id,
            "Order not pending (duplicate delivery or unknown order); skipping"
        );
        return Ok(Json(WebhookAck::duplicate()));
    }
    info!(order_id = %order_id, %payment_reference, "Order claimed for processing");

    // 4. Hand off to the worker and acknowledge
    if let Err(e) = state.queue.enqueue(order_id).await {
        error!(order_id = %order_id, "Could not enqueue order: {e}");
        state.processor.mark_failed(order_id).await;
    }

    Ok(Json(WebhookAck::received()))
}
