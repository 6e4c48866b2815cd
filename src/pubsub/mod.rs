// Copyright 2023 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

//! Group-chat dispatch over gossipsub topics. One [`crate::host::TopicPublisher`]
//! (and its reader task) per joined chat; `"joined"` is a presence marker
//! distinct from any valid [`Message`] encoding.

use crate::bus::{Bus, Event};
use crate::entity::{ChatId, Contact, Message, Status};
use crate::host::Host;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::trace;

const JOINED_MARKER: &[u8] = b"joined";

/// A payload published on a chat's topic.
#[derive(Clone, Debug)]
pub struct PubSubEnvelope {
    pub topic: ChatId,
    pub message: Message,
}

fn topic_name(chat_id: &ChatId) -> String {
    format!("chat-room:{chat_id}")
}

pub struct PubSubService {
    host: Host,
    bus: Bus,
    publishers: Mutex<HashMap<ChatId, crate::host::TopicPublisher>>,
}

impl PubSubService {
    pub fn new(host: Host, bus: Bus) -> Arc<Self> {
        Arc::new(Self {
            host,
            bus,
            publishers: Mutex::new(HashMap::new()),
        })
    }

    /// Pre-populates the address book for each admin (via relay, when
    /// configured) and joins the chat's topic.
    pub async fn join(self: &Arc<Self>, chat_id: &ChatId, admins: &[Contact], relay_addrs: &[libp2p::Multiaddr]) {
        for admin in admins {
            if let Ok(peer_id) = admin.id.parse() {
                if !relay_addrs.is_empty() {
                    self.host.add_addresses(peer_id, relay_addrs.to_vec());
                }
            }
        }
        self.join_chat_room(chat_id).await;
    }

    pub async fn join_chat_room(self: &Arc<Self>, chat_id: &ChatId) {
        {
            let publishers = self.publishers.lock().await;
            if publishers.contains_key(chat_id) {
                return;
            }
        }
        let topic = topic_name(chat_id);
        let (publisher, mut messages) = match self.host.join_topic(&topic).await {
            Ok(joined) => joined,
            Err(e) => {
                trace!(%chat_id, error = %e, "failed to join pub-sub topic");
                return;
            }
        };
        self.publishers.lock().await.insert(chat_id.clone(), publisher.clone());
        let _ = publisher.publish(JOINED_MARKER.to_vec()).await;

        let bus = self.bus.clone();
        let local_peer_id = self.host.local_peer_id();
        tokio::spawn(async move {
            while let Some(gossip) = messages.recv().await {
                if gossip.source == Some(local_peer_id) {
                    continue;
                }
                if gossip.data == JOINED_MARKER {
                    continue;
                }
                match bincode::deserialize::<Message>(&gossip.data) {
                    Ok(message) => bus.publish(Event::NewMessage(message)),
                    Err(e) => trace!(error = %e, "dropping undecodable pub-sub payload"),
                }
            }
        });
    }

    pub async fn send(&self, envelope: PubSubEnvelope) {
        let message_id = envelope.message.id.clone();
        let publisher = self.publishers.lock().await.get(&envelope.topic).cloned();
        let Some(publisher) = publisher else {
            self.bus.publish(Event::MessageStatus { id: message_id, status: Status::Failed });
            return;
        };
        let Ok(bytes) = bincode::serialize(&envelope.message) else {
            self.bus.publish(Event::MessageStatus { id: message_id, status: Status::Failed });
            return;
        };
        match publisher.publish(bytes).await {
            Ok(()) => self.bus.publish(Event::MessageStatus { id: message_id, status: Status::Sent }),
            Err(_) => self.bus.publish(Event::MessageStatus { id: message_id, status: Status::Failed }),
        }
    }
}
