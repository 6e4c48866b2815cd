// Copyright 2023 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

use libp2p::{swarm::DialError, TransportError};
use std::io;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError<io::Error>),

    #[error("dial error: {0}")]
    Dial(#[from] DialError),

    #[error("outbound stream failure: {0}")]
    Outbound(#[from] libp2p::request_response::OutboundFailure),

    #[error("gossipsub publish failed: {0}")]
    Publish(#[from] libp2p::gossipsub::PublishError),

    #[error("gossipsub subscribe failed: {0}")]
    Subscribe(#[from] libp2p::gossipsub::SubscriptionError),

    #[error("identity error: {0}")]
    Identity(String),

    #[error("host command channel closed")]
    ChannelClosed,

    #[error("the swarm driver task is no longer running")]
    DriverGone,

    #[error("peer is not currently connected")]
    NotConnected,

    #[error("operation timed out")]
    Timeout,
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for Error {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        Error::ChannelClosed
    }
}

impl From<tokio::sync::oneshot::error::RecvError> for Error {
    fn from(_: tokio::sync::oneshot::error::RecvError) -> Self {
        Error::DriverGone
    }
}
