//! The embedded indexed document store. A thin, synchronous wrapper around
//! `sled`, exposing exactly the CRUD/query contract the core needs — the
//! store's own internals (page cache, compaction, on-disk layout) are treated
//! as a primitive, per the "out of scope" collaborators in the specification.

pub mod error;
pub use error::{Error, Result};

use crate::entity::{ChatId, ChatInfo, Contact, Identity, Message, MessageId, PeerIdStr, Status};
use std::path::Path;

const IDENTITY_KEY: &[u8] = b"self";

/// The `sled`-backed store. Cheap to clone (all trees are `Arc`-backed internally).
#[derive(Clone)]
pub struct Store {
    identity: sled::Tree,
    contact: sled::Tree,
    chat_by_id: sled::Tree,
    chat_seq: sled::Tree,
    message: sled::Tree,
    db: sled::Db,
}

impl Store {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// An ephemeral in-memory store, for tests and demos.
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: sled::Db) -> Result<Self> {
        Ok(Store {
            identity: db.open_tree("identity")?,
            contact: db.open_tree("contact")?,
            chat_by_id: db.open_tree("chat_by_id")?,
            chat_seq: db.open_tree("chat_seq")?,
            message: db.open_tree("message")?,
            db,
        })
    }

    // --- Identity ---------------------------------------------------------

    pub fn get_identity(&self) -> Result<Option<Identity>> {
        get_bincode(&self.identity, IDENTITY_KEY)
    }

    pub fn put_identity(&self, identity: &Identity) -> Result<()> {
        put_bincode(&self.identity, IDENTITY_KEY, identity)
    }

    // --- Contact ------------------------------------------------------------

    pub fn upsert_contact(&self, contact: &Contact) -> Result<()> {
        put_bincode(&self.contact, contact.id.as_bytes(), contact)
    }

    pub fn get_contact(&self, id: &str) -> Result<Option<Contact>> {
        get_bincode(&self.contact, id.as_bytes())
    }

    pub fn contacts_by_ids(&self, ids: &[PeerIdStr]) -> Result<Vec<Contact>> {
        ids.iter()
            .filter_map(|id| self.get_contact(id).transpose())
            .collect()
    }

    pub fn contacts_page(&self, skip: usize, limit: usize) -> Result<Vec<Contact>> {
        let mut out = Vec::new();
        for entry in self.contact.iter().skip(skip).take(limit) {
            let (_, value) = entry?;
            out.push(bincode::deserialize(&value)?);
        }
        Ok(out)
    }

    // --- Chat ---------------------------------------------------------------

    /// Inserts or updates a chat. The insertion-order sequence index is only
    /// populated the first time a given chat id is stored.
    pub fn put_chat(&self, chat: &ChatInfo) -> Result<()> {
        let key = chat.id.as_str().as_bytes();
        let is_new = !self.chat_by_id.contains_key(key)?;
        put_bincode(&self.chat_by_id, key, chat)?;
        if is_new {
            let seq = self.db.generate_id()?;
            self.chat_seq.insert(seq.to_be_bytes(), key)?;
        }
        Ok(())
    }

    pub fn get_chat(&self, id: &ChatId) -> Result<Option<ChatInfo>> {
        get_bincode(&self.chat_by_id, id.as_str().as_bytes())
    }

    /// Chats in insertion order, paginated.
    pub fn chat_infos(&self, skip: usize, limit: usize) -> Result<Vec<ChatInfo>> {
        let mut out = Vec::new();
        for entry in self.chat_seq.iter().skip(skip).take(limit) {
            let (_, chat_id_bytes) = entry?;
            if let Some(value) = self.chat_by_id.get(&chat_id_bytes)? {
                out.push(bincode::deserialize(&value)?);
            }
        }
        Ok(out)
    }

    // --- Message --------------------------------------------------------------

    fn message_key(chat_id: &ChatId, created_at: i64, message_id: &str) -> Vec<u8> {
        format!(
            "{}\u{0}{:020}\u{0}{}",
            chat_id.as_str(),
            created_at,
            message_id
        )
        .into_bytes()
    }

    /// Inserts or updates a message. An update with a changed `created_at` would
    /// leave a stale index entry; callers never change `created_at` after insert.
    pub fn put_message(&self, message: &Message) -> Result<()> {
        let key = Self::message_key(&message.chat_id, message.created_at, &message.id);
        put_bincode(&self.message, &key, message)
    }

    pub fn get_message(&self, id: &MessageId) -> Result<Option<Message>> {
        for entry in self.message.iter() {
            let (_, value) = entry?;
            let msg: Message = bincode::deserialize(&value)?;
            if &msg.id == id {
                return Ok(Some(msg));
            }
        }
        Ok(None)
    }

    pub fn update_message_status(&self, id: &MessageId, status: Status) -> Result<()> {
        let Some(mut msg) = self.get_message(id)? else {
            return Err(Error::NotFound);
        };
        msg.status = status;
        self.put_message(&msg)
    }

    /// Messages for `chat_id`, newest first, optionally filtered to `statuses`.
    pub fn messages_in_chat(
        &self,
        chat_id: &ChatId,
        skip: usize,
        limit: usize,
        statuses: Option<&[Status]>,
    ) -> Result<Vec<Message>> {
        let prefix = format!("{}\u{0}", chat_id.as_str());
        let mut all = Vec::new();
        for entry in self.message.scan_prefix(prefix.as_bytes()) {
            let (_, value) = entry?;
            let msg: Message = bincode::deserialize(&value)?;
            if statuses.map(|s| s.contains(&msg.status)).unwrap_or(true) {
                all.push(msg);
            }
        }
        // Keys are lexicographically ordered by zero-padded created_at, which sorts
        // ascending; reverse for the newest-first contract.
        all.reverse();
        Ok(all.into_iter().skip(skip).take(limit).collect())
    }

    pub fn count_received(&self, chat_id: &ChatId) -> Result<u64> {
        let msgs = self.messages_in_chat(chat_id, 0, usize::MAX, Some(&[Status::Received]))?;
        Ok(msgs.len() as u64)
    }
}

fn get_bincode<T: serde::de::DeserializeOwned>(tree: &sled::Tree, key: &[u8]) -> Result<Option<T>> {
    match tree.get(key)? {
        Some(ivec) => Ok(Some(bincode::deserialize(&ivec)?)),
        None => Ok(None),
    }
}

fn put_bincode<T: serde::Serialize>(tree: &sled::Tree, key: &[u8], value: &T) -> Result<()> {
    let bytes = bincode::serialize(value)?;
    tree.insert(key, bytes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::ChatKind;

    fn contact(id: &str) -> Contact {
        Contact {
            id: id.to_string(),
            name: id.to_string(),
        }
    }

    #[test]
    fn chat_infos_preserve_insertion_order() {
        let store = Store::temporary().unwrap();
        let a = ChatInfo::new_private(contact("b"), contact("a"));
        let b = ChatInfo::new_group("grp".into(), vec![contact("a"), contact("c")], vec![contact("a")]);
        store.put_chat(&a).unwrap();
        store.put_chat(&b).unwrap();
        let page = store.chat_infos(0, 10).unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].id, a.id);
        assert_eq!(page[1].id, b.id);
    }

    #[test]
    fn messages_sorted_descending_and_filterable() {
        let store = Store::temporary().unwrap();
        let chat_id: ChatId = "chat1".into();
        for (i, status) in [(1, Status::Received), (2, Status::Seen), (3, Status::Received)] {
            store
                .put_message(&Message {
                    id: format!("m{i}"),
                    chat_id: chat_id.clone(),
                    created_at: i,
                    text: format!("text {i}"),
                    status,
                    author: contact("author"),
                    chat_kind: ChatKind::Private,
                })
                .unwrap();
        }
        let all = store.messages_in_chat(&chat_id, 0, 10, None).unwrap();
        assert_eq!(all.iter().map(|m| m.created_at).collect::<Vec<_>>(), vec![3, 2, 1]);

        let received_only = store
            .messages_in_chat(&chat_id, 0, 10, Some(&[Status::Received]))
            .unwrap();
        assert_eq!(received_only.len(), 2);
        assert_eq!(store.count_received(&chat_id).unwrap(), 2);
    }

    #[test]
    fn update_message_status_round_trips() {
        let store = Store::temporary().unwrap();
        let chat_id: ChatId = "chat1".into();
        let msg = Message {
            id: "m1".into(),
            chat_id,
            created_at: 1,
            text: "hi".into(),
            status: Status::Received,
            author: contact("author"),
            chat_kind: ChatKind::Private,
        };
        store.put_message(&msg).unwrap();
        store.update_message_status(&msg.id, Status::Seen).unwrap();
        let reloaded = store.get_message(&msg.id).unwrap().unwrap();
        assert_eq!(reloaded.status, Status::Seen);
    }
}
