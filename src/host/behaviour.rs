// Copyright 2023 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

use crate::wire::{WireCodec, WireProtocol};
use libp2p::{
    gossipsub, identify,
    kad::{store::MemoryStore, Kademlia},
    mdns, relay, request_response,
    swarm::NetworkBehaviour,
};

/// The combined libp2p behaviour: DHT + local discovery for address
/// resolution, gossipsub for group-chat broadcast, relay-client for NAT
/// traversal, identify so peers learn each other's listen addresses, and the
/// direct-messaging request/response protocol.
#[derive(NetworkBehaviour)]
#[behaviour(out_event = "ChatBehaviourEvent")]
pub(super) struct ChatBehaviour {
    pub(super) kademlia: Kademlia<MemoryStore>,
    pub(super) mdns: mdns::tokio::Behaviour,
    pub(super) gossipsub: gossipsub::Behaviour,
    pub(super) relay_client: relay::client::Behaviour,
    pub(super) identify: identify::Behaviour,
    pub(super) wire: request_response::Behaviour<WireCodec>,
}

#[derive(Debug)]
pub(super) enum ChatBehaviourEvent {
    Kademlia(libp2p::kad::KademliaEvent),
    Mdns(Box<mdns::Event>),
    Gossipsub(Box<gossipsub::Event>),
    RelayClient(relay::client::Event),
    Identify(Box<identify::Event>),
    Wire(request_response::Event<crate::wire::WireRequest, crate::wire::Ack>),
}

impl From<libp2p::kad::KademliaEvent> for ChatBehaviourEvent {
    fn from(event: libp2p::kad::KademliaEvent) -> Self {
        ChatBehaviourEvent::Kademlia(event)
    }
}

impl From<mdns::Event> for ChatBehaviourEvent {
    fn from(event: mdns::Event) -> Self {
        ChatBehaviourEvent::Mdns(Box::new(event))
    }
}

impl From<gossipsub::Event> for ChatBehaviourEvent {
    fn from(event: gossipsub::Event) -> Self {
        ChatBehaviourEvent::Gossipsub(Box::new(event))
    }
}

impl From<relay::client::Event> for ChatBehaviourEvent {
    fn from(event: relay::client::Event) -> Self {
        ChatBehaviourEvent::RelayClient(event)
    }
}

impl From<identify::Event> for ChatBehaviourEvent {
    fn from(event: identify::Event) -> Self {
        ChatBehaviourEvent::Identify(Box::new(event))
    }
}

impl From<request_response::Event<crate::wire::WireRequest, crate::wire::Ack>> for ChatBehaviourEvent {
    fn from(event: request_response::Event<crate::wire::WireRequest, crate::wire::Ack>) -> Self {
        ChatBehaviourEvent::Wire(event)
    }
}

/// Builds the three protocol-name entries the `wire` request/response
/// behaviour answers on, all backed by the same [`WireCodec`].
pub(super) fn wire_protocols() -> impl Iterator<Item = (WireProtocol, request_response::ProtocolSupport)> {
    [
        crate::wire::MESSAGE_PROTOCOL,
        crate::wire::INVITE_PROTOCOL,
        crate::wire::CHAT_EVENT_PROTOCOL,
    ]
    .into_iter()
    .map(|name| (WireProtocol(name), request_response::ProtocolSupport::Full))
}
