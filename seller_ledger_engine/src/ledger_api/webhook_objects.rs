use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{
    db_types::{Cents, LedgerEntry, Order, OrderId},
    traits::LedgerError,
};

pub const PAYMENT_INTENT_SUCCEEDED: &str = "payment_intent.succeeded";
pub const PAYMENT_INTENT_FAILED: &str = "payment_intent.payment_failed";
pub const CHARGE_REFUNDED: &str = "charge.refunded";

/// The envelope the payment processor posts to the webhook endpoint. Only the fields the ledger reads are kept.
///
/// The signature on the request must be verified before the body is handed to the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessorEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventData {
    pub object: EventObject,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventObject {
    /// The payment intent id for `payment_intent.*` events, or the charge id for `charge.*` events
    pub id: Option<String>,
    pub latest_charge: Option<String>,
    pub payment_intent: Option<String>,
    /// Cumulative amount refunded on the charge so far
    pub amount_refunded: Option<Cents>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    pub last_payment_error: Option<PaymentError>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentError {
    pub message: Option<String>,
}

impl ProcessorEvent {
    pub fn from_json(json: &str) -> Result<Self, LedgerError> {
        serde_json::from_str(json).map_err(|e| LedgerError::InvalidEventPayload(e.to_string()))
    }

    /// Translates the event into the ledger action it calls for. The order is correlated through the `metadata_key`
    /// entry in the object's metadata.
    pub fn to_action(&self, metadata_key: &str) -> Result<PaymentEventAction, LedgerError> {
        let object = &self.data.object;
        let order_id = object.metadata.get(metadata_key).map(|id| OrderId::from(id.as_str()));
        let action = match self.event_type.as_str() {
            PAYMENT_INTENT_SUCCEEDED => PaymentEventAction::PaymentSucceeded {
                order_id,
                payment_intent_id: self.required_object_id()?,
                charge_id: object.latest_charge.clone(),
            },
            PAYMENT_INTENT_FAILED => PaymentEventAction::PaymentFailed {
                order_id,
                payment_intent_id: self.required_object_id()?,
                reason: object.last_payment_error.as_ref().and_then(|e| e.message.clone()),
            },
            CHARGE_REFUNDED => PaymentEventAction::RefundIssued {
                order_id,
                charge_id: self.required_object_id()?,
                amount_refunded: object.amount_refunded.ok_or_else(|| {
                    LedgerError::InvalidEventPayload(format!("Event {} has no refunded amount", self.id))
                })?,
            },
            _ => PaymentEventAction::Unhandled,
        };
        Ok(action)
    }

    fn required_object_id(&self) -> Result<String, LedgerError> {
        self.data
            .object
            .id
            .clone()
            .ok_or_else(|| LedgerError::InvalidEventPayload(format!("Event {} has no object id", self.id)))
    }
}

/// What a processor event asks the ledger to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentEventAction {
    PaymentSucceeded { order_id: Option<OrderId>, payment_intent_id: String, charge_id: Option<String> },
    PaymentFailed { order_id: Option<OrderId>, payment_intent_id: String, reason: Option<String> },
    /// `amount_refunded` is the cumulative refund on the charge, not the amount of this refund
    RefundIssued { order_id: Option<OrderId>, charge_id: String, amount_refunded: Cents },
    /// Acknowledged and marked as processed, but otherwise ignored
    Unhandled,
}

impl PaymentEventAction {
    pub fn order_id(&self) -> Option<&OrderId> {
        match self {
            Self::PaymentSucceeded { order_id, .. } |
            Self::PaymentFailed { order_id, .. } |
            Self::RefundIssued { order_id, .. } => order_id.as_ref(),
            Self::Unhandled => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderChanged {
    pub old_order: Order,
    pub new_order: Order,
    /// The refund entry appended to the ledger, for refund events
    pub ledger_entry: Option<LedgerEntry>,
}

#[derive(Debug, Clone)]
pub enum WebhookOutcome {
    /// The event changed local state
    Applied(OrderChanged),
    /// The event id has been seen before. Nothing was changed.
    AlreadyProcessed,
    /// The event was marked as processed without changing anything, for the given reason
    Ignored(String),
}

impl WebhookOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const SUCCEEDED: &str = r#"{
        "id": "evt_1",
        "object": "event",
        "type": "payment_intent.succeeded",
        "data": { "object": {
            "id": "pi_123",
            "object": "payment_intent",
            "amount": 1500,
            "latest_charge": "ch_456",
            "metadata": { "order_id": "1001", "store_id": "3" }
        } }
    }"#;

    #[test]
    fn payment_succeeded_action() {
        let event = ProcessorEvent::from_json(SUCCEEDED).unwrap();
        assert_eq!(event.event_type, PAYMENT_INTENT_SUCCEEDED);
        let action = event.to_action("order_id").unwrap();
        assert_eq!(action, PaymentEventAction::PaymentSucceeded {
            order_id: Some(OrderId::from("1001")),
            payment_intent_id: "pi_123".into(),
            charge_id: Some("ch_456".into()),
        });
        // A different metadata key finds no order
        let action = event.to_action("cart_id").unwrap();
        assert_eq!(action.order_id(), None);
    }

    #[test]
    fn payment_failed_action() {
        let json = r#"{"id": "evt_2", "type": "payment_intent.payment_failed", "data": { "object": {
            "id": "pi_9", "metadata": {"order_id": "77"},
            "last_payment_error": { "message": "Your card was declined." } } } }"#;
        let action = ProcessorEvent::from_json(json).unwrap().to_action("order_id").unwrap();
        assert_eq!(action, PaymentEventAction::PaymentFailed {
            order_id: Some(OrderId::from("77")),
            payment_intent_id: "pi_9".into(),
            reason: Some("Your card was declined.".into()),
        });
    }

    #[test]
    fn refund_requires_amount() {
        let json = r#"{"id": "evt_3", "type": "charge.refunded", "data": { "object": {
            "id": "ch_1", "metadata": {"order_id": "77"} } } }"#;
        let err = ProcessorEvent::from_json(json).unwrap().to_action("order_id").unwrap_err();
        assert!(matches!(err, LedgerError::InvalidEventPayload(_)));
    }

    #[test]
    fn unknown_types_are_unhandled() {
        let json = r#"{"id": "evt_4", "type": "customer.created", "data": { "object": {} } }"#;
        let action = ProcessorEvent::from_json(json).unwrap().to_action("order_id").unwrap();
        assert_eq!(action, PaymentEventAction::Unhandled);
    }

    #[test]
    fn malformed_payloads_are_rejected() {
        assert!(matches!(ProcessorEvent::from_json("{\"id\": 4}"), Err(LedgerError::InvalidEventPayload(_))));
    }
}
