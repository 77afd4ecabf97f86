//! Session state: which connections have joined, and under which names.
//!
//! The registry (connection -> name) and the name directory (claimed names) live in one
//! `SessionState` behind a single mutex, so every join/leave updates both or neither.

pub mod directory;
pub mod registry;

use chrono::Utc;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::chat::messages::ChatMessage;
use crate::chat::presence::PresenceChange;
use crate::config::Limits;

pub use directory::NameDirectory;
pub use registry::SessionRegistry;

/// Opaque identifier assigned to a transport connection at upgrade time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Reasons a join request is refused. The connection stays usable and may retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinError {
    EmptyName,
    NameTooLong,
    NameTaken,
    AlreadyJoined,
}

impl JoinError {
    /// Reason string sent to the client in `join-rejected`.
    pub fn as_code(&self) -> &'static str {
        match self {
            JoinError::EmptyName => "empty-name",
            JoinError::NameTooLong => "name-too-long",
            JoinError::NameTaken => "name-taken",
            JoinError::AlreadyJoined => "already-joined",
        }
    }
}

impl std::fmt::Display for JoinError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JoinError::EmptyName => write!(f, "Display name must not be empty"),
            JoinError::NameTooLong => write!(f, "Display name is too long"),
            JoinError::NameTaken => write!(f, "Display name is already taken"),
            JoinError::AlreadyJoined => write!(f, "Connection has already joined"),
        }
    }
}

impl std::error::Error for JoinError {}

/// Errors for events that require a joined connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    NotJoined,
    MessageTooLong,
}

impl SessionError {
    pub fn as_code(&self) -> &'static str {
        match self {
            SessionError::NotJoined => "not-joined",
            SessionError::MessageTooLong => "message-too-long",
        }
    }
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::NotJoined => write!(f, "Join the room before sending events"),
            SessionError::MessageTooLong => write!(f, "Message is too long"),
        }
    }
}

impl std::error::Error for SessionError {}

#[derive(Debug, Default)]
struct SessionState {
    registry: SessionRegistry,
    directory: NameDirectory,
}

impl SessionState {
    fn change_for(&self, name: String) -> PresenceChange {
        let names = self.registry.names();
        PresenceChange {
            name,
            count: names.len(),
            names,
        }
    }
}

/// Join/leave/lookup over the shared session state.
#[derive(Debug)]
pub struct SessionManager {
    state: Mutex<SessionState>,
    max_name_len: usize,
    max_message_len: usize,
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new(&Limits::default())
    }
}

impl SessionManager {
    pub fn new(limits: &Limits) -> Self {
        Self {
            state: Mutex::new(SessionState::default()),
            max_name_len: limits.max_name_len,
            max_message_len: limits.max_message_len,
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        // No operation panics while holding the guard; recover the data if one ever does.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Claim `requested_name` for `connection_id`.
    ///
    /// The name is trimmed first. On success both the registry and the directory are
    /// updated under one lock and the presence snapshot taken after the insert is returned.
    /// On failure nothing changes.
    pub fn join(
        &self,
        connection_id: ConnectionId,
        requested_name: &str,
    ) -> Result<PresenceChange, JoinError> {
        self.join_with(connection_id, requested_name, |_| {})
    }

    /// Like [`join`](Self::join), but runs `publish` with the snapshot before the lock is
    /// released. Presence events queued from `publish` reach every recipient in the same
    /// order the session state changed. `publish` must not block or call back into the
    /// manager.
    pub fn join_with<F>(
        &self,
        connection_id: ConnectionId,
        requested_name: &str,
        publish: F,
    ) -> Result<PresenceChange, JoinError>
    where
        F: FnOnce(&PresenceChange),
    {
        let name = requested_name.trim();
        if name.is_empty() {
            return Err(JoinError::EmptyName);
        }
        if name.chars().count() > self.max_name_len {
            return Err(JoinError::NameTooLong);
        }

        let mut state = self.lock();
        if state.registry.contains(&connection_id) {
            return Err(JoinError::AlreadyJoined);
        }
        if !state.directory.claim(name) {
            return Err(JoinError::NameTaken);
        }
        state.registry.insert(connection_id, name.to_string());

        let change = state.change_for(name.to_string());
        publish(&change);
        Ok(change)
    }

    /// Release whatever name `connection_id` holds. Safe to call on connections that
    /// never joined or already left; those return `None`.
    pub fn leave(&self, connection_id: ConnectionId) -> Option<PresenceChange> {
        self.leave_with(connection_id, |_| {})
    }

    /// Like [`leave`](Self::leave), with `publish` run under the lock when a name was
    /// released. Same constraints as [`join_with`](Self::join_with).
    pub fn leave_with<F>(&self, connection_id: ConnectionId, publish: F) -> Option<PresenceChange>
    where
        F: FnOnce(&PresenceChange),
    {
        let mut state = self.lock();
        let name = state.registry.remove(&connection_id)?;
        state.directory.release(&name);
        let change = state.change_for(name);
        publish(&change);
        Some(change)
    }

    pub fn lookup_name(&self, connection_id: ConnectionId) -> Option<String> {
        self.lock().registry.get(&connection_id).map(str::to_string)
    }

    /// Joined names, earliest join first.
    pub fn list_names(&self) -> Vec<String> {
        self.lock().registry.names()
    }

    pub fn count(&self) -> usize {
        self.lock().registry.len()
    }

    /// Build the chat message `connection_id` is sending.
    ///
    /// `Ok(None)` means the trimmed body was empty and the event is dropped without a reply.
    pub fn compose_message(
        &self,
        connection_id: ConnectionId,
        body: &str,
    ) -> Result<Option<ChatMessage>, SessionError> {
        let sender = self
            .lookup_name(connection_id)
            .ok_or(SessionError::NotJoined)?;

        let body = body.trim();
        if body.is_empty() {
            return Ok(None);
        }
        if body.chars().count() > self.max_message_len {
            return Err(SessionError::MessageTooLong);
        }

        Ok(Some(ChatMessage::compose(
            connection_id,
            &sender,
            body,
            Utc::now(),
        )))
    }

    #[cfg(test)]
    fn is_consistent(&self) -> bool {
        let state = self.lock();
        let mut registered: Vec<String> = state
            .registry
            .names()
            .iter()
            .map(|name| directory::normalize(name))
            .collect();
        let mut claimed: Vec<String> = state.directory.names().map(directory::normalize).collect();
        registered.sort();
        claimed.sort();
        registered == claimed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::Arc;

    #[test]
    fn test_join_trims_and_snapshots() {
        let sessions = SessionManager::default();
        let a = ConnectionId::new();
        let b = ConnectionId::new();

        let change = sessions.join(a, "  alice ").unwrap();
        assert_eq!(change.name, "alice");
        assert_eq!(change.count, 1);
        assert_eq!(change.names, vec!["alice"]);

        let change = sessions.join(b, "bob").unwrap();
        assert_eq!(change.count, 2);
        assert_eq!(change.names, vec!["alice", "bob"]);
        assert_eq!(sessions.lookup_name(a).as_deref(), Some("alice"));
    }

    #[test]
    fn test_join_rejections_leave_state_unchanged() {
        let sessions = SessionManager::default();
        let a = ConnectionId::new();
        let b = ConnectionId::new();
        sessions.join(a, "alice").unwrap();

        assert_eq!(sessions.join(b, "   "), Err(JoinError::EmptyName));
        assert_eq!(sessions.join(b, ""), Err(JoinError::EmptyName));
        assert_eq!(sessions.join(b, "Alice"), Err(JoinError::NameTaken));
        assert_eq!(sessions.join(b, " ALICE "), Err(JoinError::NameTaken));
        assert_eq!(sessions.join(b, &"x".repeat(33)), Err(JoinError::NameTooLong));
        assert_eq!(sessions.join(a, "alice2"), Err(JoinError::AlreadyJoined));

        assert_eq!(sessions.count(), 1);
        assert_eq!(sessions.list_names(), vec!["alice"]);
        assert_eq!(sessions.lookup_name(b), None);
        assert!(sessions.is_consistent());
    }

    #[test]
    fn test_name_length_counts_characters() {
        let limits = Limits {
            max_name_len: 3,
            ..Limits::default()
        };
        let sessions = SessionManager::new(&limits);
        assert!(sessions.join(ConnectionId::new(), "äöü").is_ok());
        assert_eq!(
            sessions.join(ConnectionId::new(), "abcd"),
            Err(JoinError::NameTooLong)
        );
    }

    #[test]
    fn test_leave_is_idempotent() {
        let sessions = SessionManager::default();
        let a = ConnectionId::new();
        let b = ConnectionId::new();
        sessions.join(a, "alice").unwrap();
        sessions.join(b, "bob").unwrap();

        let change = sessions.leave(a).unwrap();
        assert_eq!(change.name, "alice");
        assert_eq!(change.count, 1);
        assert_eq!(change.names, vec!["bob"]);

        assert_eq!(sessions.leave(a), None);
        assert_eq!(sessions.leave(ConnectionId::new()), None);
        assert_eq!(sessions.count(), 1);
        assert!(sessions.is_consistent());
    }

    #[test]
    fn test_name_reusable_after_leave() {
        let sessions = SessionManager::default();
        let a = ConnectionId::new();
        sessions.join(a, "Alice").unwrap();
        sessions.leave(a);

        let b = ConnectionId::new();
        assert_eq!(sessions.join(b, "alice").unwrap().name, "alice");
    }

    #[test]
    fn test_publish_runs_only_on_change() {
        let sessions = SessionManager::default();
        let a = ConnectionId::new();
        let mut published = Vec::new();

        sessions
            .join_with(a, "alice", |change| published.push(change.clone()))
            .unwrap();
        let _ = sessions.join_with(ConnectionId::new(), "ALICE", |change| {
            published.push(change.clone())
        });
        sessions.leave_with(a, |change| published.push(change.clone()));
        sessions.leave_with(a, |change| published.push(change.clone()));

        let names: Vec<_> = published.iter().map(|c| (c.name.as_str(), c.count)).collect();
        assert_eq!(names, vec![("alice", 1), ("alice", 0)]);
    }

    #[test]
    fn test_compose_message() {
        let sessions = SessionManager::default();
        let a = ConnectionId::new();

        assert_eq!(
            sessions.compose_message(a, "hi"),
            Err(SessionError::NotJoined)
        );
        // Authorization is checked before the body.
        assert_eq!(
            sessions.compose_message(a, "   "),
            Err(SessionError::NotJoined)
        );

        sessions.join(a, "alice").unwrap();
        assert_eq!(sessions.compose_message(a, " \n\t "), Ok(None));

        let message = sessions.compose_message(a, "  hi there ").unwrap().unwrap();
        assert_eq!(message.sender, "alice");
        assert_eq!(message.body, "hi there");
        assert!(message.id.ends_with(&a.to_string()));

        let too_long = "x".repeat(2001);
        assert_eq!(
            sessions.compose_message(a, &too_long),
            Err(SessionError::MessageTooLong)
        );
    }

    #[test]
    fn test_concurrent_joins_have_one_winner() {
        let sessions = Arc::new(SessionManager::default());
        let handles: Vec<_> = (0..16)
            .map(|i| {
                let sessions = sessions.clone();
                std::thread::spawn(move || {
                    let name = if i % 2 == 0 { "alice" } else { "ALICE" };
                    sessions.join(ConnectionId::new(), name).is_ok()
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
        assert_eq!(sessions.count(), 1);
        assert!(sessions.is_consistent());
    }

    #[derive(Debug, Clone)]
    enum Op {
        Join(usize, String),
        Leave(usize),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0..6usize, prop::sample::select(vec!["a", "A", "b", "B ", " c", "", "  "]))
                .prop_map(|(conn, name)| Op::Join(conn, name.to_string())),
            (0..6usize).prop_map(Op::Leave),
        ]
    }

    proptest! {
        #[test]
        fn registry_and_directory_stay_consistent(ops in proptest::collection::vec(op_strategy(), 0..64)) {
            let sessions = SessionManager::default();
            let ids: Vec<ConnectionId> = (0..6).map(|_| ConnectionId::new()).collect();

            for op in ops {
                match op {
                    Op::Join(conn, name) => {
                        let before = sessions.count();
                        if sessions.join(ids[conn], &name).is_err() {
                            prop_assert_eq!(sessions.count(), before);
                        }
                    }
                    Op::Leave(conn) => {
                        sessions.leave(ids[conn]);
                    }
                }

                prop_assert!(sessions.is_consistent());

                let mut lowered: Vec<String> =
                    sessions.list_names().iter().map(|n| n.to_lowercase()).collect();
                let total = lowered.len();
                lowered.sort();
                lowered.dedup();
                prop_assert_eq!(lowered.len(), total);
                prop_assert_eq!(sessions.count(), total);
            }
        }
    }
}
