// Copyright 2023 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

//! A peer-to-peer instant-messaging engine: demand-driven connectivity over
//! libp2p, a per-peer outbox for offline delivery, direct and pub-sub message
//! dispatch, and an embedded store for chats, contacts and messages.
//!
//! [`node::NodeHandle`] wires every service together; most callers only need
//! that and [`chat::ChatService`].

pub mod error;
pub use error::{Error, Result};

pub mod addr;
pub mod bus;
pub mod chat;
pub mod config;
pub mod connector;
pub mod direct;
pub mod entity;
pub mod host;
pub mod identity;
pub mod log;
pub mod node;
pub mod outbox;
pub mod peerset;
pub mod pubsub;
pub mod store;
pub mod wire;
