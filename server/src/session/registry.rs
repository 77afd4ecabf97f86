use std::collections::HashMap;

use super::ConnectionId;

#[derive(Debug, Clone)]
struct RegistryEntry {
    name: String,
    /// Join sequence number, used to order presence lists by join time.
    seq: u64,
}

/// Joined connections: connection id -> display name.
///
/// A connection with no entry has not completed a join. Not thread-safe on its own;
/// the session manager owns it behind the same lock as the name directory.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    entries: HashMap<ConnectionId, RegistryEntry>,
    next_seq: u64,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `name` for `connection_id`, last in join order.
    pub fn insert(&mut self, connection_id: ConnectionId, name: String) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert(connection_id, RegistryEntry { name, seq });
    }

    pub fn remove(&mut self, connection_id: &ConnectionId) -> Option<String> {
        self.entries.remove(connection_id).map(|entry| entry.name)
    }

    pub fn get(&self, connection_id: &ConnectionId) -> Option<&str> {
        self.entries.get(connection_id).map(|entry| entry.name.as_str())
    }

    pub fn contains(&self, connection_id: &ConnectionId) -> bool {
        self.entries.contains_key(connection_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Display names ordered by join time, earliest first.
    pub fn names(&self) -> Vec<String> {
        let mut entries: Vec<&RegistryEntry> = self.entries.values().collect();
        entries.sort_by_key(|entry| entry.seq);
        entries.into_iter().map(|entry| entry.name.clone()).collect()
    }
}
