// Copyright 2023 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

//! Wires every core service together into one running node, in the order
//! each depends on the last: store, identity, host, connector, direct and
//! pub-sub dispatch, chat orchestration.

use crate::bus::Bus;
use crate::chat::ChatService;
use crate::config::Config;
use crate::connector::Connector;
use crate::direct::DirectService;
use crate::entity::Identity;
use crate::host::Host;
use crate::pubsub::PubSubService;
use crate::store::Store;
use crate::{identity, Result};
use std::sync::Arc;

/// A fully wired, running node. Holds every long-lived handle; dropping it
/// does not tear down background tasks (they are detached `tokio::spawn`s),
/// so a node is expected to live for the process lifetime.
pub struct NodeHandle {
    pub identity: Identity,
    pub store: Store,
    pub bus: Bus,
    pub host: Host,
    pub connector: Connector,
    pub direct: Arc<DirectService>,
    pub pub_sub: Arc<PubSubService>,
    pub chat: Arc<ChatService>,
}

impl NodeHandle {
    /// Starts every service described by `config`. The store is opened (or
    /// created) at `config.store_path`; a first run generates and persists a
    /// fresh identity there.
    pub async fn start(config: &Config) -> Result<Self> {
        let store = Store::open(&config.store_path)?;
        let (identity, keypair) = identity::load_or_create(&store, &config.display_name)?;
        let bus = Bus::new();

        let (host, wire_requests) =
            Host::spawn(keypair, &config.listen_addrs, &config.bootstrap_peers).await?;

        let connector = Connector::new(host.clone(), config.connector_tick());
        {
            let connector = connector.clone();
            let mut connectivity = host.subscribe_connectivity();
            tokio::spawn(async move {
                while let Ok(event) = connectivity.recv().await {
                    match event {
                        crate::host::HostEvent::Connected(peer_id) => connector.on_connected(&peer_id),
                        crate::host::HostEvent::Disconnected(peer_id) => connector.on_disconnected(&peer_id),
                    }
                }
            });
        }

        let direct = Arc::new(
            DirectService::spawn(
                host.clone(),
                connector.clone(),
                bus.clone(),
                wire_requests,
                config.outbox.timeout(),
                config.outbox.interval(),
                config.outbox.keep,
            )
            .await,
        );

        let pub_sub = PubSubService::new(host.clone(), bus.clone());

        let relay_addrs = if config.use_static_relay_workaround {
            config.static_relay_addrs()
        } else {
            Vec::new()
        };
        let chat = ChatService::spawn(store.clone(), bus.clone(), direct.clone(), pub_sub.clone(), &identity, relay_addrs);

        Ok(NodeHandle {
            identity,
            store,
            bus,
            host,
            connector,
            direct,
            pub_sub,
            chat,
        })
    }
}
