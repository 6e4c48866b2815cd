// Copyright 2023 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

//! Layered configuration: built-in defaults, overridden by an optional TOML
//! file, overridden by CLI flags. Validated once at startup; an invalid
//! config is a fatal error, never a panic.

use libp2p::Multiaddr;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("could not read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("no static relays configured: at least one is required")]
    NoStaticRelays,
    #[error("malformed relay multiaddr {addr:?}: {source}")]
    MalformedRelay {
        addr: String,
        #[source]
        source: libp2p::multiaddr::Error,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct OutboxConfig {
    pub timeout_secs: u64,
    pub interval_secs: u64,
    pub keep: bool,
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 300,
            interval_secs: 60,
            keep: true,
        }
    }
}

impl OutboxConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Deserialized, CLI-overridable node configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub listen_addrs: Vec<String>,
    pub static_relays: Vec<String>,
    pub bootstrap_peers: Vec<String>,
    pub store_path: PathBuf,
    pub display_name: String,
    pub outbox: OutboxConfig,
    pub connector_tick_secs: u64,
    pub stream_deadline_secs: u64,
    pub use_static_relay_workaround: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addrs: vec!["/ip4/0.0.0.0/tcp/0".to_string(), "/ip4/0.0.0.0/udp/0/quic-v1".to_string()],
            static_relays: Vec::new(),
            bootstrap_peers: Vec::new(),
            store_path: PathBuf::from("./chat-data"),
            display_name: "anonymous".to_string(),
            outbox: OutboxConfig::default(),
            connector_tick_secs: 5,
            stream_deadline_secs: 60,
            use_static_relay_workaround: true,
        }
    }
}

impl Config {
    /// Loads defaults overlaid with `path`, if it exists. A missing file is not
    /// an error; a present-but-malformed file is.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(|source| Error::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = toml::from_str(&text).map_err(|source| Error::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(config)
    }

    pub fn connector_tick(&self) -> Duration {
        Duration::from_secs(self.connector_tick_secs)
    }

    pub fn stream_deadline(&self) -> Duration {
        Duration::from_secs(self.stream_deadline_secs)
    }

    /// Validates cross-field invariants that can't be expressed in the type
    /// alone: at least one static relay, and every relay a parseable multiaddr.
    pub fn validate(&self) -> Result<()> {
        if self.static_relays.is_empty() {
            return Err(Error::NoStaticRelays);
        }
        for addr in &self.static_relays {
            addr.parse::<Multiaddr>()
                .map_err(|source| Error::MalformedRelay {
                    addr: addr.clone(),
                    source,
                })?;
        }
        Ok(())
    }

    pub fn static_relay_addrs(&self) -> Vec<Multiaddr> {
        self.static_relays
            .iter()
            .filter_map(|a| a.parse().ok())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_no_relays_and_fails_validation() {
        let config = Config::default();
        assert!(matches!(config.validate(), Err(Error::NoStaticRelays)));
    }

    #[test]
    fn a_well_formed_relay_passes_validation() {
        let mut config = Config::default();
        config.static_relays.push("/ip4/1.2.3.4/tcp/4001/p2p/12D3KooWGRUD8kkfN3ov3Gx5R5eq4SR9Rhmqd7bCKQSSMbRnVBKr".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn a_malformed_relay_is_rejected() {
        let mut config = Config::default();
        config.static_relays.push("not-a-multiaddr".to_string());
        assert!(matches!(config.validate(), Err(Error::MalformedRelay { .. })));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = Config::load(Path::new("/nonexistent/path/config.toml")).unwrap();
        assert_eq!(config.display_name, "anonymous");
    }
}
