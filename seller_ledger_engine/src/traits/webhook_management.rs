use crate::{
    db_types::WebhookEvent,
    ledger_api::webhook_objects::{PaymentEventAction, WebhookOutcome},
    traits::LedgerError,
};

/// Applies payment-processor events exactly once.
#[allow(async_fn_in_trait)]
pub trait WebhookManagement {
    /// In a single atomic transaction:
    /// * returns [`WebhookOutcome::AlreadyProcessed`] if `event_id` has been processed before,
    /// * applies `action` to the local order and ledger,
    /// * records `event_id` as processed.
    ///
    /// If the action fails because its order or store cannot be resolved, the event is still recorded as processed
    /// and committed, and the error is returned. Any other failure rolls the whole transaction back.
    async fn reconcile_event(
        &self,
        event_id: &str,
        event_type: &str,
        action: PaymentEventAction,
    ) -> Result<WebhookOutcome, LedgerError>;

    /// Records `event_id` as processed without applying anything. Used for events that can never be applied, so that
    /// redeliveries are recognised as duplicates. Returns `false` if the event had already been recorded.
    async fn mark_event_processed(&self, event_id: &str, event_type: &str) -> Result<bool, LedgerError>;

    async fn fetch_webhook_event(&self, event_id: &str) -> Result<Option<WebhookEvent>, LedgerError>;
}
