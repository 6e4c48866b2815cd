// Copyright 2023 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

//! Node identity: an Ed25519 keypair loaded from the store, or generated and
//! persisted on first run.

use crate::entity::Identity;
use crate::store::Store;
use crate::{Error, Result};
use libp2p::identity::Keypair;
use tracing::info;

/// Returns the node's persisted identity, creating and persisting a fresh one
/// (with `display_name`) if none exists yet.
pub fn load_or_create(store: &Store, display_name: &str) -> Result<(Identity, Keypair)> {
    match store.get_identity()? {
        Some(identity) => {
            let keypair = Keypair::from_protobuf_encoding(&identity.key)
                .map_err(|e| crate::host::Error::Identity(e.to_string()))?;
            Ok((identity, keypair))
        }
        None => {
            info!("no identity on record, generating a fresh Ed25519 keypair");
            let keypair = Keypair::generate_ed25519();
            let id = keypair.public().to_peer_id().to_string();
            let key = keypair
                .to_protobuf_encoding()
                .map_err(|e| crate::host::Error::Identity(e.to_string()))?;
            let identity = Identity {
                id,
                name: display_name.to_string(),
                key,
            };
            store.put_identity(&identity)?;
            Ok((identity, keypair))
        }
    }
}

/// Returns the persisted identity, or [`Error::NotLoggedIn`] if the node has
/// never generated one.
pub fn get_identity(store: &Store) -> Result<Identity> {
    store.get_identity()?.ok_or(Error::NotLoggedIn)
}
