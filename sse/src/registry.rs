use crate::connection::{ConnectionHandle, ConnectionId, UserId};
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;

/// A handle together with the id it was registered under.
#[derive(Clone)]
pub struct RegisteredConnection {
    pub connection_id: ConnectionId,
    pub handle: Arc<dyn ConnectionHandle>,
}

/// Concurrent user_id -> connection map. At most one live connection per user.
///
/// Every method returns owned values and releases the shard lock before
/// returning, so callers can write to or close handles without holding a lock.
/// Closing handles and emitting notifications is the manager's job; the
/// registry only keeps the mapping.
pub struct ConnectionRegistry {
    connections: DashMap<UserId, RegisteredConnection>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
        }
    }

    /// Insert or replace the user's connection and activate the handle.
    /// Returns the new connection id and the superseded connection, if any.
    pub fn register(
        &self,
        user_id: UserId,
        handle: Arc<dyn ConnectionHandle>,
    ) -> (ConnectionId, Option<RegisteredConnection>) {
        let connection_id = ConnectionId::new();
        handle.activate();

        let previous = self.connections.insert(
            user_id,
            RegisteredConnection {
                connection_id: connection_id.clone(),
                handle,
            },
        );

        (connection_id, previous)
    }

    /// Remove whatever connection the user has.
    pub fn remove(&self, user_id: &str) -> Option<RegisteredConnection> {
        self.connections.remove(user_id).map(|(_, connection)| connection)
    }

    /// Remove the user's connection only if it is still `connection_id`.
    pub fn remove_connection(
        &self,
        user_id: &str,
        connection_id: &ConnectionId,
    ) -> Option<RegisteredConnection> {
        self.connections
            .remove_if(user_id, |_, connection| {
                &connection.connection_id == connection_id
            })
            .map(|(_, connection)| connection)
    }

    pub fn get(&self, user_id: &str) -> Option<RegisteredConnection> {
        self.connections.get(user_id).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, user_id: &str) -> bool {
        self.connections.contains_key(user_id)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub fn user_ids(&self) -> HashSet<UserId> {
        self.connections
            .iter()
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Point-in-time copy of every registered connection.
    pub fn snapshot(&self) -> Vec<(UserId, RegisteredConnection)> {
        self.connections
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    /// Remove every connection present at call time and hand them back.
    pub fn drain(&self) -> Vec<(UserId, RegisteredConnection)> {
        let user_ids: Vec<UserId> = self.user_ids().into_iter().collect();
        user_ids
            .into_iter()
            .filter_map(|user_id| self.connections.remove(&user_id))
            .collect()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{ChannelConnection, ConnectionState};

    fn channel_handle() -> Arc<ChannelConnection> {
        Arc::new(ChannelConnection::new().0)
    }

    #[test]
    fn test_register_makes_user_visible_and_activates_handle() {
        let registry = ConnectionRegistry::new();
        let (connection, _rx) = ChannelConnection::new();
        let handle = Arc::new(connection);

        let (connection_id, previous) = registry.register("u1".to_string(), handle.clone());

        assert!(previous.is_none());
        assert!(registry.contains("u1"));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("u1").unwrap().connection_id, connection_id);
        assert_eq!(handle.state(), ConnectionState::Active);
    }

    #[test]
    fn test_register_same_user_returns_superseded_connection() {
        let registry = ConnectionRegistry::new();
        let (first_id, _) = registry.register("u1".to_string(), channel_handle());
        let (second_id, previous) = registry.register("u1".to_string(), channel_handle());

        assert_eq!(previous.unwrap().connection_id, first_id);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("u1").unwrap().connection_id, second_id);
    }

    #[test]
    fn test_remove_connection_ignores_stale_id() {
        let registry = ConnectionRegistry::new();
        let (stale_id, _) = registry.register("u1".to_string(), channel_handle());
        let (current_id, _) = registry.register("u1".to_string(), channel_handle());

        assert!(registry.remove_connection("u1", &stale_id).is_none());
        assert!(registry.contains("u1"));

        let removed = registry.remove_connection("u1", &current_id).unwrap();
        assert_eq!(removed.connection_id, current_id);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_remove_unknown_user_is_none() {
        let registry = ConnectionRegistry::new();
        assert!(registry.remove("nobody").is_none());
    }

    #[test]
    fn test_snapshot_is_detached_from_later_mutation() {
        let registry = ConnectionRegistry::new();
        registry.register("u1".to_string(), channel_handle());
        registry.register("u2".to_string(), channel_handle());

        let snapshot = registry.snapshot();
        registry.remove("u1");
        registry.register("u3".to_string(), channel_handle());

        let mut users: Vec<_> = snapshot.into_iter().map(|(user_id, _)| user_id).collect();
        users.sort();
        assert_eq!(users, vec!["u1", "u2"]);
    }

    #[test]
    fn test_drain_empties_registry() {
        let registry = ConnectionRegistry::new();
        registry.register("u1".to_string(), channel_handle());
        registry.register("u2".to_string(), channel_handle());

        let drained = registry.drain();

        assert_eq!(drained.len(), 2);
        assert!(registry.is_empty());
        assert!(registry.user_ids().is_empty());
    }
}
