// Copyright 2023 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

use crate::addr::AddrInfo;
use crate::wire::{Ack, WireRequest};
use libp2p::request_response::ResponseChannel;
use libp2p::{Multiaddr, PeerId};
use tokio::sync::oneshot;

/// Commands accepted by the swarm-driver task. All of `Host`'s public methods
/// are thin wrappers that build one of these and await a response.
pub(super) enum Command {
    Dial {
        addr_info: AddrInfo,
        resp: oneshot::Sender<super::Result<()>>,
    },
    IsConnected {
        peer_id: PeerId,
        resp: oneshot::Sender<bool>,
    },
    Protect {
        peer_id: PeerId,
        tag: String,
    },
    Unprotect {
        peer_id: PeerId,
        tag: String,
    },
    AddAddresses {
        peer_id: PeerId,
        addrs: Vec<Multiaddr>,
    },
    SendWireRequest {
        peer_id: PeerId,
        request: WireRequest,
        resp: oneshot::Sender<super::Result<Ack>>,
    },
    SendWireResponse {
        channel: ResponseChannel<Ack>,
        ack: Ack,
    },
    JoinTopic {
        topic: String,
        resp: oneshot::Sender<super::Result<tokio::sync::mpsc::UnboundedReceiver<super::GossipMessage>>>,
    },
    Publish {
        topic: String,
        data: Vec<u8>,
        resp: oneshot::Sender<super::Result<()>>,
    },
}
