//! Post-commit notifications.
//!
//! Ledger API objects publish an event only after the transaction behind it has committed, so subscribers never see
//! state that could still be rolled back.
mod channel;
mod event_types;
mod hooks;

pub use channel::{EventHandler, EventProducer, Handler};
pub use event_types::*;
pub use hooks::{EventHandlers, EventHooks, EventProducers};
