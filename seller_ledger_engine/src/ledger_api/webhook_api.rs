use std::fmt::Debug;

use log::*;

use crate::{
    config::LedgerConfig,
    events::{EventProducers, OrderStatusChangedEvent},
    ledger_api::webhook_objects::{ProcessorEvent, WebhookOutcome},
    traits::{LedgerError, WebhookManagement},
};

/// `WebhookApi` applies payment-processor events to local orders and the ledger, exactly once per event id.
///
/// Callers must verify the event's signature before handing it over.
pub struct WebhookApi<B> {
    db: B,
    config: LedgerConfig,
    producers: EventProducers,
}

impl<B> Debug for WebhookApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WebhookApi")
    }
}

impl<B> WebhookApi<B> {
    pub fn new(db: B, config: LedgerConfig, producers: EventProducers) -> Self {
        Self { db, config, producers }
    }
}

impl<B> WebhookApi<B>
where B: WebhookManagement
{
    /// Parses the raw event body and handles it. See [`Self::handle_event`].
    pub async fn handle_json(&self, body: &str) -> Result<WebhookOutcome, LedgerError> {
        let event = ProcessorEvent::from_json(body)?;
        self.handle_event(&event).await
    }

    /// Handles a processor event.
    ///
    /// Redelivered events return [`WebhookOutcome::AlreadyProcessed`] without changing anything. Events that refer to
    /// an order or store that cannot be found are marked as processed, and the error is returned so that it can be
    /// reported. They are not retried. The same goes for events whose payload is missing a field their type
    /// requires.
    pub async fn handle_event(&self, event: &ProcessorEvent) -> Result<WebhookOutcome, LedgerError> {
        if self.db.fetch_webhook_event(&event.id).await?.is_some() {
            debug!("🪝️ Event {} is a duplicate. Ignoring it.", event.id);
            return Ok(WebhookOutcome::AlreadyProcessed);
        }
        let action = match event.to_action(&self.config.order_metadata_key) {
            Ok(action) => action,
            Err(e) => {
                self.db.mark_event_processed(&event.id, &event.event_type).await?;
                error!("🪝️ Event {} ({}) is malformed and will not be retried. {e}", event.id, event.event_type);
                return Err(e);
            },
        };
        trace!("🪝️ Event {} ({}) maps to {action:?}", event.id, event.event_type);
        let outcome = self.db.reconcile_event(&event.id, &event.event_type, action).await.map_err(|e| {
            if e.is_unresolvable_reference() {
                error!("🪝️ Event {} ({}) could not be applied and will not be retried. {e}", event.id, event.event_type);
            } else {
                warn!("🪝️ Event {} ({}) failed. {e}", event.id, event.event_type);
            }
            e
        })?;
        match &outcome {
            WebhookOutcome::Applied(change) => {
                info!(
                    "🪝️ Event {} moved order {} from {} to {}",
                    event.id, change.new_order.order_id, change.old_order.status, change.new_order.status
                );
                let ev = OrderStatusChangedEvent::new(&event.id, change.old_order.clone(), change.new_order.clone());
                self.producers.publish_order_status_changed(ev).await;
            },
            WebhookOutcome::AlreadyProcessed => debug!("🪝️ Event {} is a duplicate. Ignoring it.", event.id),
            WebhookOutcome::Ignored(reason) => debug!("🪝️ Event {} acknowledged. {reason}", event.id),
        }
        Ok(outcome)
    }

    pub async fn is_processed(&self, event_id: &str) -> Result<bool, LedgerError> {
        Ok(self.db.fetch_webhook_event(event_id).await?.is_some())
    }
}
