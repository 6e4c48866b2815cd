// Copyright 2023 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

//! The direct-messaging wire protocol: three length-delimited request/response
//! exchanges (message, invite, the reserved chat-event), each answered by an
//! empty [`Ack`]. Framing is `bincode` over libp2p's own length-prefixed
//! upgrade helpers (the same mechanism the teacher's `network::msg` codec
//! uses, with `bincode` swapped in for the payload encoding).

mod codec;

pub use codec::{WireCodec, WireProtocol};

use crate::entity::{ChatId, Contact, Invite, Message, MessageId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Semaphore, SemaphorePermit};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("i/o error on wire stream: {0}")]
    Io(#[from] std::io::Error),
    #[error("encoding error: {0}")]
    Encoding(#[from] bincode::Error),
    #[error("peer did not acknowledge the record")]
    NotAcked,
    #[error("record exceeds the maximum wire size of {max} bytes")]
    TooLarge { max: usize },
}

/// Hard ceiling on an encoded wire record, matching the external interface contract.
pub const MAX_RECORD_BYTES: usize = 10 * 1024;

/// Per-stream deadline for the whole request/response exchange.
pub const STREAM_DEADLINE: std::time::Duration = std::time::Duration::from_secs(60);

pub const MESSAGE_PROTOCOL: &str = "/chat/message/0.0.1";
pub const INVITE_PROTOCOL: &str = "/chat/invite/0.0.1";
pub const CHAT_EVENT_PROTOCOL: &str = "/chat/chat_event/0.0.1";

pub const MESSAGE_SERVICE: &str = "chat.message";
pub const INVITE_SERVICE: &str = "chat.invite";
pub const CHAT_EVENT_SERVICE: &str = "chat.event";

/// A record sent up a direct-messaging stream.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum WireRequest {
    Message(Message),
    Invite(Invite),
    ChatEvent(ChatEvent),
}

impl WireRequest {
    pub fn message_id(&self) -> MessageId {
        match self {
            WireRequest::Message(m) => m.id.clone(),
            WireRequest::Invite(i) => i.id.to_string(),
            WireRequest::ChatEvent(e) => e.msg_id.clone(),
        }
    }

    pub fn protocol(&self) -> &'static str {
        match self {
            WireRequest::Message(_) => MESSAGE_PROTOCOL,
            WireRequest::Invite(_) => INVITE_PROTOCOL,
            WireRequest::ChatEvent(_) => CHAT_EVENT_PROTOCOL,
        }
    }
}

/// The sole response record: an acknowledgement. Carries one marker byte
/// rather than zero fields — `bincode` encodes a fieldless struct to a
/// zero-length record, which is indistinguishable on the wire from a closed
/// stream, so `read_and_decode` would reject every `Ack` as a premature EOF.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack(u8);

/// Reserved, unused by any handler in this core — mirrors a dormant record in
/// the source that no caller ever constructs.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatEvent {
    pub chat_id: ChatId,
    pub msg_id: MessageId,
    pub event: ChatEventKind,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub enum ChatEventKind {
    Delivered,
    Seen,
}

/// On-wire contact record, distinct from [`crate::entity::Contact`] only in
/// name — kept as a type alias so the wire schema and persisted schema stay
/// visibly in lock-step.
pub type WireContact = Contact;

/// A semaphore-backed stand-in for the per-stream memory reservation the
/// source requests from its resource manager (`Scope().ReserveMemory`);
/// rust-libp2p streams have no equivalent API, so this models the same
/// invariant — acquire before I/O, release on every exit path — as an RAII
/// guard over a shared budget.
#[derive(Clone)]
pub struct StreamBudget {
    semaphore: Arc<Semaphore>,
}

impl StreamBudget {
    /// `capacity` streams worth of budget may be held concurrently.
    pub fn new(capacity: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
        }
    }

    pub async fn acquire(&self) -> StreamBudgetGuard<'_> {
        let permit = self
            .semaphore
            .acquire()
            .await
            .expect("StreamBudget semaphore is never closed");
        StreamBudgetGuard { _permit: permit }
    }
}

/// Held for the lifetime of one stream's I/O; dropping releases the budget
/// regardless of which exit path (success, error, reset) was taken.
pub struct StreamBudgetGuard<'a> {
    _permit: SemaphorePermit<'a>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use libp2p::request_response::Codec;

    #[test]
    fn ack_encodes_to_a_non_empty_record() {
        // `read_and_decode` treats a zero-length frame as a premature EOF, so an
        // `Ack` that bincode-encodes to zero bytes would make every send hang
        // forever waiting for an acknowledgement that can never be parsed.
        let bytes = bincode::serialize(&Ack::default()).unwrap();
        assert!(!bytes.is_empty());
    }

    #[tokio::test]
    async fn ack_round_trips_through_the_wire_codec() {
        let mut codec = WireCodec::default();
        let protocol = WireProtocol(MESSAGE_PROTOCOL);

        let mut wire = futures::io::Cursor::new(Vec::new());
        codec
            .write_response(&protocol, &mut wire, Ack::default())
            .await
            .expect("writing the ack must succeed");

        let mut wire = futures::io::Cursor::new(wire.into_inner());
        let ack = codec
            .read_response(&protocol, &mut wire)
            .await
            .expect("a written ack must read back, not EOF");
        assert_eq!(ack, Ack::default());
    }

    #[tokio::test]
    async fn message_request_round_trips_through_the_wire_codec() {
        let mut codec = WireCodec::default();
        let protocol = WireProtocol(MESSAGE_PROTOCOL);
        let request = WireRequest::Message(Message {
            id: "m1".into(),
            chat_id: "chat1".into(),
            created_at: 1,
            text: "hello".into(),
            status: crate::entity::Status::Pending,
            author: Contact {
                id: "a".into(),
                name: "A".into(),
            },
            chat_kind: crate::entity::ChatKind::Private,
        });

        let mut wire = futures::io::Cursor::new(Vec::new());
        codec
            .write_request(&protocol, &mut wire, request.clone())
            .await
            .expect("writing the request must succeed");

        let mut wire = futures::io::Cursor::new(wire.into_inner());
        let decoded = codec
            .read_request(&protocol, &mut wire)
            .await
            .expect("a written request must read back, not EOF");
        assert_eq!(decoded.message_id(), request.message_id());
    }

    #[tokio::test]
    async fn budget_blocks_once_capacity_is_exhausted() {
        let budget = StreamBudget::new(1);
        let _first = budget.acquire().await;
        let second = tokio::time::timeout(std::time::Duration::from_millis(50), budget.acquire()).await;
        assert!(second.is_err(), "second acquire should not complete while the first guard is held");
    }

    #[tokio::test]
    async fn budget_is_released_on_drop() {
        let budget = StreamBudget::new(1);
        {
            let _first = budget.acquire().await;
        }
        let second = tokio::time::timeout(std::time::Duration::from_millis(50), budget.acquire()).await;
        assert!(second.is_ok(), "dropping the guard must release the permit");
    }
}
