use super::{EditType, Event, EventFilter, EventId, EventPayload};
use crate::core::Result;
use futures::Stream;
use std::pin::Pin;
use std::sync::Mutex;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tracing::{Level, event};

struct Subscriber {
    filter: EventFilter,
    sender: mpsc::UnboundedSender<Event>,
}

#[derive(Default)]
struct Registry {
    last_id: u64,
    subscribers: Vec<Subscriber>,
}

/// Numbers committed changes and fans them out to live subscribers.
///
/// Ids are drawn and events delivered under one lock, so every subscriber
/// receives events in id order. Sending never blocks; subscribers whose
/// receiving side has been dropped are removed on the next publish.
#[derive(Default)]
pub struct EventService {
    registry: Mutex<Registry>,
}

impl std::fmt::Debug for EventService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventService").finish_non_exhaustive()
    }
}

impl EventService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a subscriber. Only events published after this call are seen.
    pub fn subscribe(&self, filter: EventFilter) -> Result<Subscription> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut registry = self.registry.lock()?;
        registry.subscribers.push(Subscriber { filter, sender });
        event!(Level::DEBUG, subscribers = registry.subscribers.len(), "subscriber registered");
        Ok(Subscription { receiver })
    }

    /// Assigns the next id to the event built by `build` and delivers it.
    pub fn publish(&self, build: impl FnOnce(EventId) -> Event) -> Result<EventId> {
        let mut registry = self.registry.lock()?;
        registry.last_id += 1;
        let event = build(EventId(registry.last_id));
        let id = event.id;
        deliver(&mut registry, event);
        Ok(id)
    }

    /// Publishes one event per change, in the order given.
    pub fn publish_all(
        &self,
        changes: impl IntoIterator<Item = (EditType, EventPayload)>,
    ) -> Result<Vec<EventId>> {
        let mut registry = self.registry.lock()?;
        let mut ids = Vec::new();
        for (edit_type, payload) in changes {
            registry.last_id += 1;
            let event = Event::new(EventId(registry.last_id), edit_type, payload);
            ids.push(event.id);
            deliver(&mut registry, event);
        }
        Ok(ids)
    }

    pub fn subscriber_count(&self) -> Result<usize> {
        let registry = self.registry.lock()?;
        Ok(registry.subscribers.iter().filter(|s| !s.sender.is_closed()).count())
    }

    /// Id of the most recently published event.
    pub fn last_event_id(&self) -> Result<Option<EventId>> {
        let registry = self.registry.lock()?;
        Ok((registry.last_id > 0).then_some(EventId(registry.last_id)))
    }
}

fn deliver(registry: &mut Registry, event: Event) {
    let before = registry.subscribers.len();
    registry.subscribers.retain(|s| {
        if !s.filter.matches(&event) {
            return !s.sender.is_closed();
        }
        s.sender.send(event.clone()).is_ok()
    });
    let pruned = before - registry.subscribers.len();
    if pruned > 0 {
        event!(Level::TRACE, pruned, "dropped closed subscribers");
    }
    event!(
        Level::TRACE,
        id = event.id.as_u64(),
        kind = %event.payload.kind(),
        entity = %event.payload.entity_id(),
        "event published"
    );
}

/// Unbounded stream of the events accepted by a subscription's filter.
///
/// Dropping the subscription unregisters it.
#[derive(Debug)]
pub struct Subscription {
    receiver: mpsc::UnboundedReceiver<Event>,
}

impl Subscription {
    /// Waits for the next event; `None` once the service is gone.
    pub async fn recv(&mut self) -> Option<Event> {
        self.receiver.recv().await
    }

    /// The next already-delivered event, if any.
    pub fn try_recv(&mut self) -> Option<Event> {
        self.receiver.try_recv().ok()
    }

    /// Every event delivered so far, without waiting.
    pub fn drain(&mut self) -> Vec<Event> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}

impl Stream for Subscription {
    type Item = Event;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Gid, ProgramId};
    use crate::model::Program;
    use crate::storage::Existence;
    use futures::StreamExt;

    fn payload(n: u64) -> EventPayload {
        EventPayload::Program(Program {
            id: ProgramId::from_value(n).unwrap(),
            existence: Existence::Present,
            name: None,
        })
    }

    #[test]
    fn test_ids_strictly_increase() {
        let service = EventService::new();
        let a = service.publish(|id| Event::new(id, EditType::Created, payload(1))).unwrap();
        let more = service
            .publish_all([(EditType::Updated, payload(1)), (EditType::Deleted, payload(1))])
            .unwrap();
        assert!(a < more[0] && more[0] < more[1]);
        assert_eq!(service.last_event_id().unwrap(), Some(more[1]));
    }

    #[test]
    fn test_late_subscriber_sees_only_new_events() {
        let service = EventService::new();
        service.publish_all([(EditType::Created, payload(1))]).unwrap();
        let mut sub = service.subscribe(EventFilter::all()).unwrap();
        service.publish_all([(EditType::Created, payload(2))]).unwrap();
        let seen = sub.drain();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].payload.entity_id(), "p-2");
    }

    #[test]
    fn test_dropped_subscribers_are_pruned() {
        let service = EventService::new();
        let keep = service.subscribe(EventFilter::all()).unwrap();
        drop(service.subscribe(EventFilter::all()).unwrap());
        service.publish_all([(EditType::Created, payload(1))]).unwrap();
        assert_eq!(service.subscriber_count().unwrap(), 1);
        drop(keep);
        assert_eq!(service.subscriber_count().unwrap(), 0);
    }

    #[test]
    fn test_subscription_is_a_stream() {
        let service = EventService::new();
        let mut sub = service.subscribe(EventFilter::all().edit_type(EditType::Deleted)).unwrap();
        service
            .publish_all([(EditType::Created, payload(1)), (EditType::Deleted, payload(1))])
            .unwrap();
        let next = tokio_test::block_on(sub.next()).unwrap();
        assert_eq!(next.edit_type, EditType::Deleted);
        tokio_test::assert_pending!(tokio_test::task::spawn(sub.next()).poll());
    }
}
