// Copyright 2023 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

//! The libp2p-backed transport/connectivity/pubsub facade. Everything else in
//! this crate talks to the `Swarm` only through [`Host`] — the swarm itself is
//! single-owned by a background driver task, matching the teacher's
//! `network::EventLoop` shape (one task owns the swarm; callers go through a
//! command channel, the task emits events back out).

mod behaviour;
mod command;
mod error;

pub use error::{Error, Result};

use crate::addr::AddrInfo;
use crate::wire::{Ack, WireRequest};
use behaviour::{wire_protocols, ChatBehaviour, ChatBehaviourEvent};
use command::Command;
use futures::StreamExt;
use libp2p::core::muxing::StreamMuxerBox;
use libp2p::core::upgrade;
use libp2p::identity::Keypair;
use libp2p::kad::{store::MemoryStore, Kademlia, KademliaConfig};
use libp2p::request_response::{self, ResponseChannel};
use libp2p::swarm::{NetworkBehaviour, Swarm, SwarmBuilder, SwarmEvent};
use libp2p::{gossipsub, identify, mdns, noise, relay, tcp, yamux, Multiaddr, PeerId, Transport};
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{info, trace, warn};

/// Connectivity notifications, broadcast to every interested subscriber
/// (`Connector`, `DirectService`) — the typed subscription that stands in for
/// the source's notifiee-object pattern (see the expanded spec's design notes).
#[derive(Clone, Debug)]
pub enum HostEvent {
    Connected(PeerId),
    Disconnected(PeerId),
}

/// A gossipsub message delivered to a joined topic's reader.
#[derive(Clone, Debug)]
pub struct GossipMessage {
    pub source: Option<PeerId>,
    pub data: Vec<u8>,
}

/// An inbound direct-messaging record awaiting acknowledgement.
pub struct IncomingWireRequest {
    pub peer_id: PeerId,
    pub request: WireRequest,
    channel: ResponseChannel<Ack>,
    commands: mpsc::UnboundedSender<Command>,
}

impl IncomingWireRequest {
    /// Acknowledges the record, completing the sender's `send_wire_request`.
    pub fn ack(self) {
        let _ = self.commands.send(Command::SendWireResponse {
            channel: self.channel,
            ack: Ack::default(),
        });
    }
}

/// The publish half of a joined pub-sub room. Cheap to clone and share
/// between the caller of `join_chat_room` and the reader task it spawns.
#[derive(Clone)]
pub struct TopicPublisher {
    topic: String,
    host: Host,
}

impl TopicPublisher {
    pub async fn publish(&self, data: Vec<u8>) -> Result<()> {
        self.host.publish(&self.topic, data).await
    }
}

/// Handle to the swarm driver task. Cheap to clone (an `mpsc::Sender` plus a
/// `broadcast::Sender` subscription handle).
#[derive(Clone)]
pub struct Host {
    local_peer_id: PeerId,
    commands: mpsc::UnboundedSender<Command>,
    connectivity: broadcast::Sender<HostEvent>,
}

impl Host {
    /// Builds the transport and behaviour, spawns the driver task, and
    /// returns the handle plus the channel of inbound direct-messaging
    /// records (the single consumer is `DirectService`).
    pub async fn spawn(
        keypair: Keypair,
        listen_addrs: &[String],
        bootstrap_peers: &[String],
    ) -> Result<(Host, mpsc::UnboundedReceiver<IncomingWireRequest>)> {
        let local_peer_id = keypair.public().to_peer_id();

        let (relay_transport, relay_client) = relay::client::new(local_peer_id);
        let tcp_transport = tcp::tokio::Transport::new(tcp::Config::default().nodelay(true))
            .upgrade(upgrade::Version::V1)
            .authenticate(noise::Config::new(&keypair).map_err(|e| Error::Identity(e.to_string()))?)
            .multiplex(yamux::Config::default())
            .boxed();
        let quic_config = libp2p_quic::Config::new(&keypair);
        let quic_transport = libp2p_quic::tokio::Transport::new(quic_config)
            .map(|(peer_id, muxer), _| (peer_id, StreamMuxerBox::new(muxer)))
            .boxed();
        let relay_transport = relay_transport
            .upgrade(upgrade::Version::V1)
            .authenticate(noise::Config::new(&keypair).map_err(|e| Error::Identity(e.to_string()))?)
            .multiplex(yamux::Config::default())
            .boxed();
        let transport = tcp_transport
            .or_transport(quic_transport)
            .map(|either, _| either.into_inner())
            .boxed()
            .or_transport(relay_transport)
            .map(|either, _| either.into_inner())
            .boxed();

        let mut kad_config = KademliaConfig::default();
        kad_config.set_query_timeout(Duration::from_secs(5 * 60));
        let kademlia = Kademlia::with_config(local_peer_id, MemoryStore::new(local_peer_id), kad_config);
        let mdns = mdns::tokio::Behaviour::new(mdns::Config::default(), local_peer_id)?;
        let gossipsub = gossipsub::Behaviour::new(
            gossipsub::MessageAuthenticity::Signed(keypair.clone()),
            gossipsub::ConfigBuilder::default()
                .heartbeat_interval(Duration::from_secs(1))
                .validation_mode(gossipsub::ValidationMode::Strict)
                .build()
                .map_err(|e| Error::Identity(e.to_string()))?,
        )
        .map_err(|e| Error::Identity(e.to_string()))?;
        let identify = identify::Behaviour::new(identify::Config::new(
            "/chat/identify/0.0.1".to_string(),
            keypair.public(),
        ));
        let wire = request_response::Behaviour::new(
            crate::wire::WireCodec,
            wire_protocols(),
            request_response::Config::default().with_request_timeout(crate::wire::STREAM_DEADLINE),
        );

        let behaviour = ChatBehaviour {
            kademlia,
            mdns,
            gossipsub,
            relay_client,
            identify,
            wire,
        };

        let mut swarm =
            SwarmBuilder::with_tokio_executor(transport, behaviour, local_peer_id).build();

        for addr in listen_addrs {
            match addr.parse::<Multiaddr>() {
                Ok(addr) => {
                    if let Err(e) = swarm.listen_on(addr.clone()) {
                        warn!(%addr, error = %e, "failed to listen");
                    }
                }
                Err(e) => warn!(%addr, error = %e, "malformed listen address, skipping"),
            }
        }

        for peer in bootstrap_peers {
            if let Ok(addr) = peer.parse::<Multiaddr>() {
                if let Some(libp2p::multiaddr::Protocol::P2p(hash)) = addr.iter().last() {
                    if let Ok(peer_id) = PeerId::from_multihash(hash) {
                        swarm.behaviour_mut().kademlia.add_address(&peer_id, addr);
                    }
                }
            }
        }
        if let Err(e) = swarm.behaviour_mut().kademlia.bootstrap() {
            trace!(error = ?e, "kademlia bootstrap skipped, routing table is empty");
        }

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (wire_tx, wire_rx) = mpsc::unbounded_channel();
        let (connectivity_tx, _) = broadcast::channel(1024);

        let driver = Driver {
            swarm,
            commands: command_rx,
            wire_requests: wire_tx,
            connectivity: connectivity_tx.clone(),
            command_sender: command_tx.clone(),
            pending_dial: HashMap::new(),
            pending_wire: HashMap::new(),
            topics: HashMap::new(),
            connected: HashSet::new(),
        };
        tokio::spawn(driver.run());

        Ok((
            Host {
                local_peer_id,
                commands: command_tx,
                connectivity: connectivity_tx,
            },
            wire_rx,
        ))
    }

    pub fn local_peer_id(&self) -> PeerId {
        self.local_peer_id
    }

    pub fn subscribe_connectivity(&self) -> broadcast::Receiver<HostEvent> {
        self.connectivity.subscribe()
    }

    pub async fn dial(&self, addr_info: AddrInfo) -> Result<()> {
        let (resp, rx) = oneshot::channel();
        self.commands.send(Command::Dial { addr_info, resp })?;
        rx.await?
    }

    pub async fn is_connected(&self, peer_id: PeerId) -> bool {
        let (resp, rx) = oneshot::channel();
        if self.commands.send(Command::IsConnected { peer_id, resp }).is_err() {
            return false;
        }
        rx.await.unwrap_or(false)
    }

    /// Tags `peer_id` as protected under `tag`, preventing connection pruning
    /// from closing it. A no-op placeholder for libp2p backends (this one
    /// included) that have no connection pruner; kept so callers (`Connector`)
    /// have a stable contract if one is added later.
    pub fn protect(&self, peer_id: PeerId, tag: &str) {
        let _ = self.commands.send(Command::Protect {
            peer_id,
            tag: tag.to_string(),
        });
    }

    pub fn unprotect(&self, peer_id: PeerId, tag: &str) {
        let _ = self.commands.send(Command::Unprotect {
            peer_id,
            tag: tag.to_string(),
        });
    }

    pub fn add_addresses(&self, peer_id: PeerId, addrs: Vec<Multiaddr>) {
        let _ = self.commands.send(Command::AddAddresses { peer_id, addrs });
    }

    pub async fn send_wire_request(&self, peer_id: PeerId, request: WireRequest) -> Result<Ack> {
        let (resp, rx) = oneshot::channel();
        self.commands.send(Command::SendWireRequest { peer_id, request, resp })?;
        rx.await?
    }

    /// Subscribes to `topic` and returns a cloneable publisher plus the
    /// reader's inbound message stream.
    pub async fn join_topic(&self, topic: &str) -> Result<(TopicPublisher, mpsc::UnboundedReceiver<GossipMessage>)> {
        let (resp, rx) = oneshot::channel();
        self.commands.send(Command::JoinTopic {
            topic: topic.to_string(),
            resp,
        })?;
        let messages = rx.await??;
        Ok((
            TopicPublisher {
                topic: topic.to_string(),
                host: self.clone(),
            },
            messages,
        ))
    }

    async fn publish(&self, topic: &str, data: Vec<u8>) -> Result<()> {
        let (resp, rx) = oneshot::channel();
        self.commands.send(Command::Publish {
            topic: topic.to_string(),
            data,
            resp,
        })?;
        rx.await?
    }
}

struct Driver {
    swarm: Swarm<ChatBehaviour>,
    commands: mpsc::UnboundedReceiver<Command>,
    wire_requests: mpsc::UnboundedSender<IncomingWireRequest>,
    connectivity: broadcast::Sender<HostEvent>,
    command_sender: mpsc::UnboundedSender<Command>,
    pending_dial: HashMap<PeerId, oneshot::Sender<Result<()>>>,
    pending_wire: HashMap<request_response::RequestId, oneshot::Sender<Result<Ack>>>,
    topics: HashMap<String, mpsc::UnboundedSender<GossipMessage>>,
    connected: HashSet<PeerId>,
}

impl Driver {
    async fn run(mut self) {
        loop {
            tokio::select! {
                event = self.swarm.select_next_some() => self.handle_swarm_event(event),
                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => {
                        info!("host command channel closed, shutting down swarm driver");
                        return;
                    }
                },
            }
        }
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Dial { addr_info, resp } => {
                for addr in &addr_info.addrs {
                    self.swarm.behaviour_mut().kademlia.add_address(&addr_info.id, addr.clone());
                }
                match self.swarm.dial(addr_info.id) {
                    Ok(()) => {
                        self.pending_dial.insert(addr_info.id, resp);
                    }
                    Err(e) => {
                        let _ = resp.send(Err(Error::Dial(e)));
                    }
                }
            }
            Command::IsConnected { peer_id, resp } => {
                let _ = resp.send(self.connected.contains(&peer_id));
            }
            Command::Protect { .. } | Command::Unprotect { .. } => {
                // This backend prunes no connections; tagging is a no-op.
            }
            Command::AddAddresses { peer_id, addrs } => {
                for addr in addrs {
                    self.swarm.behaviour_mut().kademlia.add_address(&peer_id, addr);
                }
            }
            Command::SendWireRequest { peer_id, request, resp } => {
                let request_id = self.swarm.behaviour_mut().wire.send_request(&peer_id, request);
                self.pending_wire.insert(request_id, resp);
            }
            Command::SendWireResponse { channel, ack } => {
                if self.swarm.behaviour_mut().wire.send_response(channel, ack).is_err() {
                    trace!("peer disconnected before the acknowledgement could be sent");
                }
            }
            Command::JoinTopic { topic, resp } => {
                let gossip_topic = gossipsub::IdentTopic::new(topic.clone());
                let subscribed = self.swarm.behaviour_mut().gossipsub.subscribe(&gossip_topic);
                let result = match subscribed {
                    Ok(_) => {
                        let (tx, rx) = mpsc::unbounded_channel();
                        self.topics.insert(topic, tx);
                        Ok(rx)
                    }
                    Err(e) => Err(Error::from(e)),
                };
                let _ = resp.send(result);
            }
            Command::Publish { topic, data, resp } => {
                let gossip_topic = gossipsub::IdentTopic::new(topic);
                let result = self
                    .swarm
                    .behaviour_mut()
                    .gossipsub
                    .publish(gossip_topic, data)
                    .map(|_| ())
                    .map_err(Error::from);
                let _ = resp.send(result);
            }
        }
    }

    fn handle_swarm_event<E: std::fmt::Debug>(&mut self, event: SwarmEvent<ChatBehaviourEvent, E>) {
        match event {
            SwarmEvent::Behaviour(ChatBehaviourEvent::Mdns(mdns_event)) => match *mdns_event {
                mdns::Event::Discovered(list) => {
                    for (peer_id, addr) in list {
                        self.swarm.behaviour_mut().kademlia.add_address(&peer_id, addr);
                    }
                }
                mdns::Event::Expired(_) => {}
            },
            SwarmEvent::Behaviour(ChatBehaviourEvent::Wire(event)) => self.handle_wire_event(event),
            SwarmEvent::Behaviour(ChatBehaviourEvent::Gossipsub(event)) => {
                if let gossipsub::Event::Message { propagation_source, message, .. } = *event {
                    if let Some(tx) = self.topics.get(&message.topic.to_string()) {
                        let _ = tx.send(GossipMessage {
                            source: Some(propagation_source),
                            data: message.data,
                        });
                    }
                }
            }
            SwarmEvent::ConnectionEstablished { peer_id, .. } => {
                self.connected.insert(peer_id);
                if let Some(resp) = self.pending_dial.remove(&peer_id) {
                    let _ = resp.send(Ok(()));
                }
                let _ = self.connectivity.send(HostEvent::Connected(peer_id));
            }
            SwarmEvent::ConnectionClosed { peer_id, .. } => {
                self.connected.remove(&peer_id);
                let _ = self.connectivity.send(HostEvent::Disconnected(peer_id));
            }
            SwarmEvent::OutgoingConnectionError { peer_id: Some(peer_id), error, .. } => {
                if let Some(resp) = self.pending_dial.remove(&peer_id) {
                    let _ = resp.send(Err(Error::Io(std::io::Error::new(
                        std::io::ErrorKind::Other,
                        format!("{error:?}"),
                    ))));
                }
            }
            _ => {}
        }
    }

    fn handle_wire_event(&mut self, event: request_response::Event<WireRequest, Ack>) {
        match event {
            request_response::Event::Message { peer, message } => match message {
                request_response::Message::Request { request, channel, .. } => {
                    let incoming = IncomingWireRequest {
                        peer_id: peer,
                        request,
                        channel,
                        commands: self.command_sender.clone(),
                    };
                    if self.wire_requests.send(incoming).is_err() {
                        trace!("no direct-messaging consumer registered, dropping inbound record");
                    }
                }
                request_response::Message::Response { request_id, response } => {
                    if let Some(resp) = self.pending_wire.remove(&request_id) {
                        let _ = resp.send(Ok(response));
                    }
                }
            },
            request_response::Event::OutboundFailure { request_id, error, .. } => {
                if let Some(resp) = self.pending_wire.remove(&request_id) {
                    let _ = resp.send(Err(Error::Outbound(error)));
                }
            }
            request_response::Event::InboundFailure { peer, error, .. } => {
                warn!(%peer, ?error, "inbound direct-messaging stream failed");
            }
            request_response::Event::ResponseSent { .. } => {}
        }
    }
}
