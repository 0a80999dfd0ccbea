//! Output side of the cycle: event/alert storage and alert delivery.

pub mod notifier;
pub mod storage;

pub use notifier::WebhookNotifier;
pub use storage::JsonlStore;
