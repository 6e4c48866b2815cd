//! In-process typed publish/subscribe, used by every core service to propagate
//! status changes and received messages without coupling them to each other.
//!
//! Grounded on the teacher's `client::event::ClientEventsChannel`
//! (`tokio::sync::broadcast` wrapped in a newtype), generalized from a single
//! event variant to the tagged sum the design notes call for.

use crate::entity::{ChatInfo, Message, MessageId, Status};
use tokio::sync::broadcast;
use tracing::trace;

/// Default channel capacity; a lagging subscriber drops the oldest events rather
/// than blocking publishers (see [`Bus::subscribe`]).
const CHANNEL_CAPACITY: usize = 1024;

/// The tagged sum of everything the core publishes.
#[derive(Clone, Debug)]
pub enum Event {
    /// A previously Pending message reached a terminal (or Seen) status.
    MessageStatus { id: MessageId, status: Status },
    /// A message was received from a remote peer (direct or pub-sub).
    NewMessage(Message),
    /// A chat invite was received from a remote peer.
    InviteReceived(ChatInfo),
}

/// The event bus. Cheap to clone; all clones share the same underlying channel.
#[derive(Clone)]
pub struct Bus {
    sender: broadcast::Sender<Event>,
}

impl Default for Bus {
    fn default() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Bus { sender }
    }
}

impl Bus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes an event. Never blocks; if there are no subscribers the event is
    /// simply dropped, matching the source's "emitters don't need readers" semantics.
    pub fn publish(&self, event: Event) {
        if self.sender.send(event).is_err() {
            trace!("published event with no subscribers");
        }
    }

    /// Returns a new receiver. Multiple receivers may be active concurrently; each
    /// sees every event published after it subscribes.
    pub fn subscribe(&self) -> BusReceiver {
        BusReceiver(self.sender.subscribe())
    }
}

/// A subscription handle. Wraps `broadcast::Receiver` so callers don't need to
/// depend on `tokio::sync::broadcast` directly.
pub struct BusReceiver(broadcast::Receiver<Event>);

impl BusReceiver {
    /// Awaits the next event, transparently skipping past a `Lagged` gap (logging it)
    /// rather than treating it as fatal — a slow subscriber should not crash the node.
    pub async fn recv(&mut self) -> Option<Event> {
        loop {
            match self.0.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    trace!(skipped, "bus subscriber lagged, skipping missed events");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{ChatKind, Contact};

    #[tokio::test]
    async fn subscriber_receives_published_event() {
        let bus = Bus::new();
        let mut rx = bus.subscribe();
        bus.publish(Event::MessageStatus {
            id: "m1".into(),
            status: Status::Sent,
        });
        let event = rx.recv().await.expect("event");
        match event {
            Event::MessageStatus { id, status } => {
                assert_eq!(id, "m1");
                assert_eq!(status, Status::Sent);
            }
            _ => panic!("unexpected event"),
        }
    }

    #[tokio::test]
    async fn publish_without_subscribers_does_not_panic() {
        let bus = Bus::new();
        bus.publish(Event::NewMessage(Message {
            id: "m2".into(),
            chat_id: "c1".into(),
            created_at: 0,
            text: "hi".into(),
            status: Status::Received,
            author: Contact {
                id: "a".into(),
                name: "A".into(),
            },
            chat_kind: ChatKind::Private,
        }));
    }
}
