//! Core data model: identities, contacts, chats and messages.
//!
//! These types are both the persisted schema (see [`crate::store`]) and the
//! wire schema (see [`crate::wire`]) — the two are kept in lock-step so that a
//! [`Message`] read back from the store is exactly what went out over the wire.

use serde::{Deserialize, Serialize};

mod id;
pub use id::ChatId;

/// A peer identifier: the string form of a libp2p `PeerId`.
pub type PeerIdStr = String;

/// A globally unique message identifier (a UUID string).
pub type MessageId = String;

/// A node's long-lived identity.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Identity {
    pub id: PeerIdStr,
    pub name: String,
    /// Protobuf-encoded keypair bytes, as produced by `libp2p::identity::Keypair::to_protobuf_encoding`.
    pub key: Vec<u8>,
}

impl Identity {
    pub fn to_contact(&self) -> Contact {
        Contact {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }
}

/// A known remote participant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: PeerIdStr,
    pub name: String,
}

/// Whether a chat is a two-party direct conversation or a many-party group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatKind {
    Private = 0,
    Group = 1,
}

/// A conversation: either a deterministic private chat or an opaque group chat.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatInfo {
    pub id: ChatId,
    pub name: String,
    pub members: Vec<Contact>,
    pub kind: ChatKind,
    pub unread: u64,
    pub last_text: Option<String>,
    pub admins: Vec<Contact>,
}

impl ChatInfo {
    /// Builds a private chat between `me` and `other`. The id is derived deterministically
    /// so both participants compute the same identifier independently.
    pub fn new_private(other: Contact, me: Contact) -> Self {
        let id = ChatId::private(&other.id, &me.id);
        ChatInfo {
            id,
            name: other.name.clone(),
            members: vec![other, me],
            kind: ChatKind::Private,
            unread: 0,
            last_text: None,
            admins: vec![],
        }
    }

    /// Builds a group chat with a freshly generated id. `members` must already include
    /// the creator; `admins` must be non-empty.
    pub fn new_group(name: String, members: Vec<Contact>, admins: Vec<Contact>) -> Self {
        assert!(!admins.is_empty(), "group chat requires at least one admin");
        ChatInfo {
            id: ChatId::fresh_group(),
            name,
            members,
            kind: ChatKind::Group,
            unread: 0,
            last_text: None,
            admins,
        }
    }

    pub fn is_member(&self, contact_id: &str) -> bool {
        self.members.iter().any(|c| c.id == contact_id)
    }
}

/// Lifecycle of a [`Message`]. See the status-transition invariant in the module docs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Pending,
    Sent,
    Seen,
    Received,
    Failed,
}

/// A single chat message, as persisted and as carried on the wire.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub chat_id: ChatId,
    pub created_at: i64,
    pub text: String,
    pub status: Status,
    pub author: Contact,
    pub chat_kind: ChatKind,
}

/// A chat invite, carrying the full chat membership so the invitee can materialize it locally.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Invite {
    pub id: ChatId,
    pub name: String,
    pub members: Vec<Contact>,
    pub admins: Vec<Contact>,
    pub kind: ChatKind,
}

impl From<&ChatInfo> for Invite {
    fn from(c: &ChatInfo) -> Self {
        Invite {
            id: c.id.clone(),
            name: c.name.clone(),
            members: c.members.clone(),
            admins: c.admins.clone(),
            kind: c.kind,
        }
    }
}

impl From<Invite> for ChatInfo {
    fn from(i: Invite) -> Self {
        ChatInfo {
            id: i.id,
            name: i.name,
            members: i.members,
            kind: i.kind,
            unread: 0,
            last_text: None,
            admins: i.admins,
        }
    }
}

/// The payload a direct-messaging [`crate::direct::Envelope`] carries.
#[derive(Clone, Debug)]
pub enum Payload {
    Message(Message),
    Invite(Invite),
}

impl Payload {
    pub fn message_id(&self) -> MessageId {
        match self {
            Payload::Message(m) => m.id.clone(),
            Payload::Invite(i) => i.id.to_string(),
        }
    }
}
