//! Payment event envelope and intake classification.

use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::errors::WebhookError;

pub const CHECKOUT_COMPLETED: &str = "checkout.session.completed";
/// Metadata key the checkout session is created with.
pub const ORDER_ID_METADATA_KEY: &str = "orderId";

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    pub object: Value,
}

/// What the webhook should do with a verified event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentIntake {
    /// Payment confirmed for `order_id`.
    CheckoutCompleted {
        order_id: Uuid,
        payment_reference: String,
    },
    /// Any other event type; acknowledged without touching an order.
    Ignored { event_type: String },
}

impl PaymentEvent {
    pub fn parse(body: &[u8]) -> Result<Self, WebhookError> {
        serde_json::from_slice(body).map_err(|e| WebhookError::MalformedEvent(e.to_string()))
    }

    pub fn classify(&self) -> Result<PaymentIntake, WebhookError> {
        if self.event_type != CHECKOUT_COMPLETED {
            return Ok(PaymentIntake::Ignored {
                event_type: self.event_type.clone(),
            });
        }

        let session = &self.data.object;
        let order_id = session
            .get("metadata")
            .and_then(|m| m.get(ORDER_ID_METADATA_KEY))
            .and_then(Value::as_str)
            .and_then(|raw| Uuid::parse_str(raw.trim()).ok())
            .ok_or(WebhookError::MissingOrderReference)?;

        Ok(PaymentIntake::CheckoutCompleted {
            order_id,
            payment_reference: self.payment_reference(),
        })
    }

    /// Payment intent id (plain or expanded), else the session id, else the event id.
    fn payment_reference(&self) -> String {
        let session = &self.data.object;
        let intent = match session.get("payment_intent") {
            Some(Value::String(id)) => Some(id.as_str()),
            Some(Value::Object(expanded)) => expanded.get("id").and_then(Value::as_str),
            _ => None,
        };
        intent
            .or_else(|| session.get("id").and_then(Value::as_str))
            .unwrap_or(self.id.as_str())
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn event(event_type: &str, object: Value) -> PaymentEvent {
        let body = json!({
            "id": "evt_123",
            "type": event_type,
            "data": { "object": object }
        });
        PaymentEvent::parse(body.to_string().as_bytes()).unwrap()
    }

    #[test]
    fn test_checkout_completed_yields_order_and_intent() {
        let order_id = Uuid::new_v4();
        let e = event(
            CHECKOUT_COMPLETED,
            json!({
                "id": "cs_1",
                "payment_intent": "pi_1",
                "metadata": { "orderId": order_id.to_string() }
            }),
        );
        assert_eq!(
            e.classify().unwrap(),
            PaymentIntake::CheckoutCompleted {
                order_id,
                payment_reference: "pi_1".to_string()
            }
        );
    }

    #[test]
    fn test_expanded_intent_and_session_fallbacks() {
        let order_id = Uuid::new_v4();
        let expanded = event(
            CHECKOUT_COMPLETED,
            json!({
                "id": "cs_2",
                "payment_intent": { "id": "pi_2" },
                "metadata": { "orderId": order_id.to_string() }
            }),
        );
        let no_intent = event(
            CHECKOUT_COMPLETED,
            json!({
                "id": "cs_3",
                "payment_intent": null,
                "metadata": { "orderId": order_id.to_string() }
            }),
        );
        assert_eq!(expanded.payment_reference(), "pi_2");
        assert_eq!(no_intent.payment_reference(), "cs_3");
    }

    #[test]
    fn test_missing_metadata_is_missing_reference() {
        let e = event(CHECKOUT_COMPLETED, json!({ "id": "cs_1", "metadata": {} }));
        assert!(matches!(
            e.classify(),
            Err(WebhookError::MissingOrderReference)
        ));
        let e = event(CHECKOUT_COMPLETED, json!({ "id": "cs_1" }));
        assert!(matches!(
            e.classify(),
            Err(WebhookError::MissingOrderReference)
        ));
    }

    #[test]
    fn test_non_uuid_order_id_is_missing_reference() {
        let e = event(
            CHECKOUT_COMPLETED,
            json!({ "metadata": { "orderId": "not-a-uuid" } }),
        );
        assert!(matches!(
            e.classify(),
            Err(WebhookError::MissingOrderReference)
        ));
    }

    #[test]
    fn test_other_event_types_are_ignored() {
        let e = event("checkout.session.expired", json!({ "metadata": {} }));
        assert_eq!(
            e.classify().unwrap(),
            PaymentIntake::Ignored {
                event_type: "checkout.session.expired".to_string()
            }
        );
    }

    #[test]
    fn test_body_without_envelope_is_malformed() {
        assert!(matches!(
            PaymentEvent::parse(br#"{"hello": "world"}"#),
            Err(WebhookError::MalformedEvent(_))
        ));
    }
}
