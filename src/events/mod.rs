// ============================================================================
// Event Notification
// ============================================================================
//
// Every successful commit publishes one event per changed entity. Events are
// numbered from a counter guarded separately from the Database cell and are
// delivered to subscribers in commit order. Nothing is persisted: a
// subscriber only sees what is published while it is registered.
//
// ============================================================================

pub mod event;
pub mod filter;
pub mod service;

pub use event::{EditType, Event, EventId, EventPayload};
pub use filter::EventFilter;
pub use service::{EventService, Subscription};
