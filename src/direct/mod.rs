// Copyright 2023 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

//! Direct (one-to-one) message dispatch: opens a stream per outgoing
//! envelope, defers to the [`crate::outbox::Outbox`] while the destination is
//! unreachable, and emits delivery-status events on the [`crate::bus::Bus`].

use crate::addr::AddrInfo;
use crate::bus::{Bus, Event};
use crate::connector::Connector;
use crate::entity::{Contact, Invite, Message, MessageId, Payload, Status};
use crate::host::{Host, IncomingWireRequest};
use crate::outbox::Outbox;
use crate::wire::{WireRequest, INVITE_SERVICE, MESSAGE_SERVICE};
use libp2p::PeerId;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{trace, warn};

/// A message or invite queued for delivery to a single contact.
#[derive(Clone, Debug)]
pub struct Envelope {
    pub id: MessageId,
    pub destination: Contact,
    pub payload: Payload,
    pub created_at: i64,
    pub protocol: &'static str,
}

impl Envelope {
    pub fn for_message(message: Message, destination: Contact) -> Self {
        Envelope {
            id: message.id.clone(),
            destination,
            created_at: message.created_at,
            payload: Payload::Message(message),
            protocol: MESSAGE_SERVICE,
        }
    }

    pub fn for_invite(invite: Invite, destination: Contact, created_at: i64) -> Self {
        Envelope {
            id: invite.id.to_string(),
            destination,
            created_at,
            payload: Payload::Invite(invite),
            protocol: INVITE_SERVICE,
        }
    }

    fn wire_request(&self) -> WireRequest {
        match &self.payload {
            Payload::Message(m) => WireRequest::Message(m.clone()),
            Payload::Invite(i) => WireRequest::Invite(i.clone()),
        }
    }

    fn peer_id(&self) -> Option<PeerId> {
        self.destination.id.parse().ok()
    }
}

pub struct DirectService {
    host: Host,
    connector: Connector,
    outbox: Arc<Outbox>,
    bus: Bus,
    input: mpsc::UnboundedSender<Envelope>,
}

impl DirectService {
    pub async fn spawn(
        host: Host,
        connector: Connector,
        bus: Bus,
        mut wire_requests: mpsc::UnboundedReceiver<IncomingWireRequest>,
        outbox_timeout: std::time::Duration,
        outbox_interval: std::time::Duration,
        outbox_keep: bool,
    ) -> Self {
        let (outbox, mut failures) = Outbox::new(outbox_timeout, outbox_interval, outbox_keep);
        let (input_tx, mut input_rx) = mpsc::unbounded_channel::<Envelope>();

        let service = DirectService {
            host: host.clone(),
            connector: connector.clone(),
            outbox: outbox.clone(),
            bus: bus.clone(),
            input: input_tx,
        };

        // Inbound records: decode, emit the corresponding bus event, ack.
        let inbound_bus = bus.clone();
        tokio::spawn(async move {
            while let Some(incoming) = wire_requests.recv().await {
                match incoming.request.clone() {
                    WireRequest::Message(message) => {
                        inbound_bus.publish(Event::NewMessage(message));
                    }
                    WireRequest::Invite(invite) => {
                        inbound_bus.publish(Event::InviteReceived(invite.into()));
                    }
                    WireRequest::ChatEvent(_) => {
                        // Reserved, no handler in this core.
                    }
                }
                incoming.ack();
            }
        });

        // Outbox failure stream: mark the message Failed, release the connector tag.
        let failure_bus = bus.clone();
        let failure_connector = connector.clone();
        tokio::spawn(async move {
            while let Some(envelope) = failures.recv().await {
                failure_bus.publish(Event::MessageStatus { id: envelope.id.clone(), status: Status::Failed });
                if let Some(peer_id) = envelope.peer_id() {
                    failure_connector.done(envelope.protocol, &peer_id);
                }
            }
        });

        // Connectivity notifications: drain the outbox for newly connected peers.
        let mut connectivity = host.subscribe_connectivity();
        let drain_service = DirectService {
            host: host.clone(),
            connector: connector.clone(),
            outbox: outbox.clone(),
            bus: bus.clone(),
            input: service.input.clone(),
        };
        tokio::spawn(async move {
            while let Ok(event) = connectivity.recv().await {
                if let crate::host::HostEvent::Connected(peer_id) = event {
                    drain_service.on_connected(peer_id).await;
                }
            }
        });

        // New outgoing envelopes.
        let dispatch_service = DirectService {
            host,
            connector,
            outbox,
            bus,
            input: service.input.clone(),
        };
        tokio::spawn(async move {
            while let Some(envelope) = input_rx.recv().await {
                dispatch_service.dispatch(envelope).await;
            }
        });

        service
    }

    /// Non-blocking enqueue of a new outgoing envelope.
    pub fn send(&self, envelope: Envelope) {
        if self.input.send(envelope).is_err() {
            warn!("direct-messaging dispatcher is no longer running");
        }
    }

    async fn dispatch(&self, envelope: Envelope) {
        let Some(peer_id) = envelope.peer_id() else {
            warn!(destination = %envelope.destination.id, "malformed or empty destination id, dropping envelope");
            return;
        };
        if peer_id == self.host.local_peer_id() {
            warn!("refusing to dispatch an envelope addressed to ourselves");
            return;
        }

        self.connector.need(envelope.protocol, AddrInfo::bare(peer_id)).await;

        if self.host.is_connected(peer_id).await {
            if self.open_stream_and_send(peer_id, &envelope).await.is_err() {
                self.outbox.put(peer_id, envelope);
            }
        } else {
            self.outbox.put(peer_id, envelope);
        }
    }

    async fn open_stream_and_send(&self, peer_id: PeerId, envelope: &Envelope) -> crate::wire::Result<()> {
        let request = envelope.wire_request();
        match self.host.send_wire_request(peer_id, request).await {
            Ok(_ack) => {
                self.bus.publish(Event::MessageStatus { id: envelope.id.clone(), status: Status::Sent });
                self.connector.done(envelope.protocol, &peer_id);
                Ok(())
            }
            Err(e) => {
                trace!(peer = %peer_id, error = %e, "direct send failed, deferring to outbox");
                Err(crate::wire::Error::NotAcked)
            }
        }
    }

    async fn on_connected(&self, peer_id: PeerId) {
        for envelope in self.outbox.pop(&peer_id) {
            if self.open_stream_and_send(peer_id, &envelope).await.is_err() {
                self.outbox.put(peer_id, envelope);
            }
        }
    }
}
