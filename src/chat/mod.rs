// Copyright 2023 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

//! Orchestrates persistence and wire dispatch: the one component every public
//! operation (`send`, `seen`, `invite`, ...) and every inbound bus event flows
//! through.

use crate::bus::{Bus, Event};
use crate::direct::{DirectService, Envelope};
use crate::entity::{ChatId, ChatInfo, ChatKind, Contact, Identity, Invite, Message, MessageId, Status};
use crate::pubsub::{PubSubEnvelope, PubSubService};
use crate::store::Store;
use crate::{Error, Result};
use libp2p::Multiaddr;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Discriminates the two ways a new chat can be created via [`ChatService::new_chat`].
pub enum NewChatOptions {
    Private { other: Contact },
    Group { name: String, members: Vec<Contact> },
}

pub struct ChatService {
    store: Store,
    bus: Bus,
    direct: Arc<DirectService>,
    pub_sub: Arc<PubSubService>,
    me: Contact,
    relay_addrs: Vec<Multiaddr>,
}

fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is before the epoch")
        .as_secs() as i64
}

impl ChatService {
    pub fn spawn(
        store: Store,
        bus: Bus,
        direct: Arc<DirectService>,
        pub_sub: Arc<PubSubService>,
        identity: &Identity,
        relay_addrs: Vec<Multiaddr>,
    ) -> Arc<Self> {
        let service = Arc::new(Self {
            store,
            bus: bus.clone(),
            direct,
            pub_sub,
            me: identity.to_contact(),
            relay_addrs,
        });

        let worker = service.clone();
        let mut events = bus.subscribe();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                match event {
                    Event::NewMessage(message) => worker.received(message).await,
                    Event::InviteReceived(chat_info) => worker.join(chat_info).await,
                    Event::MessageStatus { id, status } => {
                        if let Err(e) = worker.update_message_status(&id, status) {
                            tracing::trace!(message_id = %id, error = %e, "could not update message status");
                        }
                    }
                }
            }
        });

        service
    }

    /// Creates a new chat and persists it. For `Group`, also joins the pub-sub room.
    pub async fn new_chat(&self, opt: NewChatOptions) -> Result<ChatInfo> {
        let chat = match opt {
            NewChatOptions::Private { other } => ChatInfo::new_private(other, self.me.clone()),
            NewChatOptions::Group { name, members } => {
                let mut members = members;
                if !members.iter().any(|c| c.id == self.me.id) {
                    members.push(self.me.clone());
                }
                let chat = ChatInfo::new_group(name, members, vec![self.me.clone()]);
                self.pub_sub.clone().join(&chat.id, &chat.admins, &self.relay_addrs).await;
                chat
            }
        };
        self.store.put_chat(&chat)?;
        Ok(chat)
    }

    /// Persists a Pending message and dispatches it according to the chat kind.
    pub async fn send(&self, chat_id: &ChatId, text: String) -> Result<Message> {
        let chat = self
            .store
            .get_chat(chat_id)?
            .ok_or_else(|| Error::ChatNotFound(chat_id.to_string()))?;

        let message = Message {
            id: Uuid::new_v4().to_string(),
            chat_id: chat_id.clone(),
            created_at: now(),
            text,
            status: Status::Pending,
            author: self.me.clone(),
            chat_kind: chat.kind,
        };
        self.store.put_message(&message)?;

        match chat.kind {
            ChatKind::Private => {
                for member in chat.members.iter().filter(|m| m.id != self.me.id) {
                    self.direct.send(Envelope::for_message(message.clone(), member.clone()));
                }
            }
            ChatKind::Group => {
                self.pub_sub
                    .send(PubSubEnvelope {
                        topic: chat_id.clone(),
                        message: message.clone(),
                    })
                    .await;
            }
        }
        Ok(message)
    }

    /// Sends chat invites to `contacts` for an existing group chat.
    pub async fn invite(&self, chat_id: &ChatId, contacts: Vec<Contact>) -> Result<()> {
        let chat = self
            .store
            .get_chat(chat_id)?
            .ok_or_else(|| Error::ChatNotFound(chat_id.to_string()))?;
        if chat.kind != ChatKind::Group {
            return Err(Error::UnsupportedChatKind);
        }
        let invite: Invite = (&chat).into();
        for contact in contacts {
            self.direct.send(Envelope::for_invite(invite.clone(), contact, now()));
        }
        Ok(())
    }

    /// Materializes a chat from a received invite and joins its pub-sub room.
    pub async fn join(&self, chat_info: ChatInfo) {
        if self.store.get_chat(&chat_info.id).ok().flatten().is_some() {
            return;
        }
        if self.store.put_chat(&chat_info).is_err() {
            return;
        }
        if chat_info.kind == ChatKind::Group {
            self.pub_sub.clone().join_chat_room(&chat_info.id).await;
        }
    }

    /// Ingests a message received over the wire: auto-creates the chat and/or
    /// contact if unknown, then persists the message as Received. A Group
    /// message from a non-member is delivered and persisted rather than
    /// dropped (see the design notes on membership checks).
    pub async fn received(&self, mut message: Message) {
        if self.store.get_contact(&message.author.id).ok().flatten().is_none() {
            let _ = self.store.upsert_contact(&message.author);
        }
        if self.store.get_chat(&message.chat_id).ok().flatten().is_none() {
            let chat = ChatInfo::new_private(message.author.clone(), self.me.clone());
            let _ = self.store.put_chat(&chat);
        }
        message.status = Status::Received;
        let _ = self.store.put_message(&message);
    }

    /// Marks every Received message in `chat_id` as Seen. Idempotent.
    pub fn seen(&self, chat_id: &ChatId) -> Result<()> {
        let received = self
            .store
            .messages_in_chat(chat_id, 0, usize::MAX, Some(&[Status::Received]))?;
        for message in received {
            self.store.update_message_status(&message.id, Status::Seen)?;
        }
        Ok(())
    }

    pub fn update_message_status(&self, message_id: &MessageId, status: Status) -> Result<()> {
        self.store.update_message_status(message_id, status)?;
        Ok(())
    }

    pub fn messages(&self, chat_id: &ChatId, skip: usize, limit: usize) -> Result<Vec<Message>> {
        Ok(self.store.messages_in_chat(chat_id, skip, limit, None)?)
    }

    pub fn chat_infos(&self, skip: usize, limit: usize) -> Result<Vec<ChatInfo>> {
        Ok(self.store.chat_infos(skip, limit)?)
    }

    pub fn find(&self, chat_id: &ChatId) -> Result<ChatInfo> {
        self.store
            .get_chat(chat_id)?
            .ok_or_else(|| Error::ChatNotFound(chat_id.to_string()))
    }
}
