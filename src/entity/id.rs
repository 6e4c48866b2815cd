use libp2p::identity::Keypair;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A chat identifier: for private chats the lexicographic concatenation of the two
/// member ids, for group chats a freshly generated peer id.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChatId(String);

impl ChatId {
    /// Deterministic private-chat id: depends only on the unordered pair of member ids.
    pub fn private(a: &str, b: &str) -> Self {
        let (first, second) = if a <= b { (a, b) } else { (b, a) };
        ChatId(format!("{first}{second}"))
    }

    /// A fresh, unpredictable group-chat id derived from a random Ed25519 keypair's peer id.
    pub fn fresh_group() -> Self {
        let keypair = Keypair::generate_ed25519();
        let peer_id = keypair.public().to_peer_id();
        ChatId(peer_id.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ChatId {
    fn from(s: String) -> Self {
        ChatId(s)
    }
}

impl From<&str> for ChatId {
    fn from(s: &str) -> Self {
        ChatId(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn private_chat_id_is_symmetric() {
        let a = ChatId::private("alice", "bob");
        let b = ChatId::private("bob", "alice");
        assert_eq!(a, b);
    }

    #[test]
    fn private_chat_id_depends_only_on_the_pair() {
        let a = ChatId::private("alice", "bob");
        let b = ChatId::private("alice", "carol");
        assert_ne!(a, b);
    }

    #[test]
    fn group_chat_ids_are_unique() {
        let a = ChatId::fresh_group();
        let b = ChatId::fresh_group();
        assert_ne!(a, b);
    }
}
