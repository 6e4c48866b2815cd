// Copyright 2023 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

use thiserror::Error;

/// The type returned by the chat-core public API.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Top-level error for the chat engine.
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum Error {
    #[error("store error: {0}")]
    Store(#[from] crate::store::Error),
    #[error("host error: {0}")]
    Host(#[from] crate::host::Error),
    #[error("wire protocol error: {0}")]
    Wire(#[from] crate::wire::Error),
    #[error("config error: {0}")]
    Config(#[from] crate::config::Error),
    #[error("no chat found for id {0}")]
    ChatNotFound(String),
    #[error("no contact found for id {0}")]
    ContactNotFound(String),
    #[error("no message found for id {0}")]
    MessageNotFound(String),
    #[error("chat kind not supported for this operation")]
    UnsupportedChatKind,
    #[error("not logged in: no identity present on this node")]
    NotLoggedIn,
    #[error("event bus channel closed")]
    BusClosed,
}
