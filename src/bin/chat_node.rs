// Copyright 2023 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

use chat_core::chat::NewChatOptions;
use chat_core::config::Config;
use chat_core::entity::Contact;
use chat_core::log::init_node_logging;
use chat_core::node::NodeHandle;
use clap::Parser;
use eyre::Result;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[clap(name = "chat-node")]
struct Opt {
    /// Path to the TOML config file. Missing is not an error; defaults apply.
    #[clap(long, default_value = "./config.toml")]
    config: PathBuf,

    #[clap(long)]
    log_dir: Option<PathBuf>,

    /// Overrides `listen_addrs`; may be passed more than once.
    #[clap(long)]
    listen_addr: Vec<String>,

    /// Overrides `static_relays`; may be passed more than once.
    #[clap(long)]
    static_relay: Vec<String>,

    /// Overrides `bootstrap_peers`; may be passed more than once.
    #[clap(long)]
    bootstrap_peer: Vec<String>,

    #[clap(long)]
    display_name: Option<String>,

    #[clap(long)]
    store_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let opt = Opt::parse();
    let _log_appender_guard = init_node_logging(&opt.log_dir)?;

    let mut config = Config::load(&opt.config)?;
    if !opt.listen_addr.is_empty() {
        config.listen_addrs = opt.listen_addr;
    }
    if !opt.static_relay.is_empty() {
        config.static_relays = opt.static_relay;
    }
    if !opt.bootstrap_peer.is_empty() {
        config.bootstrap_peers = opt.bootstrap_peer;
    }
    if let Some(name) = opt.display_name {
        config.display_name = name;
    }
    if let Some(path) = opt.store_path {
        config.store_path = path;
    }

    if let Err(e) = config.validate() {
        warn!(error = %e, "starting without circuit-relay support");
    }

    let node = NodeHandle::start(&config).await?;
    info!(peer_id = %node.host.local_peer_id(), "chat node started");

    repl(node).await
}

/// Minimal line-oriented control surface: enough to drive the engine by hand
/// without a real UI wired on top.
async fn repl(node: NodeHandle) -> Result<()> {
    println!("commands: new <peer_id> <name> | send <chat_id> <text...> | seen <chat_id> | list | quit");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let mut parts = line.trim().splitn(3, ' ');
        match parts.next() {
            Some("new") => {
                let (Some(peer_id), Some(name)) = (parts.next(), parts.next()) else {
                    println!("usage: new <peer_id> <name>");
                    continue;
                };
                let other = Contact {
                    id: peer_id.to_string(),
                    name: name.to_string(),
                };
                match node.chat.new_chat(NewChatOptions::Private { other }).await {
                    Ok(chat) => println!("created chat {}", chat.id),
                    Err(e) => println!("error: {e}"),
                }
            }
            Some("send") => {
                let (Some(chat_id), Some(text)) = (parts.next(), parts.next()) else {
                    println!("usage: send <chat_id> <text>");
                    continue;
                };
                match node.chat.send(&chat_id.into(), text.to_string()).await {
                    Ok(message) => println!("queued message {}", message.id),
                    Err(e) => println!("error: {e}"),
                }
            }
            Some("seen") => {
                let Some(chat_id) = parts.next() else {
                    println!("usage: seen <chat_id>");
                    continue;
                };
                if let Err(e) = node.chat.seen(&chat_id.into()) {
                    println!("error: {e}");
                }
            }
            Some("list") => match node.chat.chat_infos(0, 100) {
                Ok(chats) => {
                    for chat in chats {
                        println!("{} ({:?}) {}", chat.id, chat.kind, chat.name);
                    }
                }
                Err(e) => println!("error: {e}"),
            },
            Some("quit") | Some("exit") => break,
            Some("") | None => {}
            Some(other) => println!("unknown command: {other}"),
        }
    }
    Ok(())
}
