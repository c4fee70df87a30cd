//! Hub registry abstraction.
//!
//! The registry owns every admitted connection and every live room. All
//! mutations (admit, join, evict, room create/delete) are atomic relative to
//! each other. Implementations live in the infrastructure layer.

use std::sync::Arc;

use async_trait::async_trait;

use super::{
    connection::{Connection, Identity},
    error::RepositoryError,
    room::{Delivery, Room},
    value_object::{ConnectionId, RoomId},
};

/// What the registry knows about one connection
#[derive(Debug, Clone)]
pub struct Binding {
    pub connection: Arc<Connection>,
    /// Identity established by the authenticator before the upgrade
    pub authenticated: Option<Identity>,
    /// Identity in use, replaced by each join
    pub identity: Option<Identity>,
    pub room_id: Option<RoomId>,
}

/// Result of a successful join
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOutcome {
    /// The room did not exist before this join
    pub created: bool,
    /// Room the connection had to leave first, if it was somewhere else
    pub left_room: Option<RoomId>,
    /// Fan-out of the `user-joined` notification
    pub delivery: Delivery,
}

/// Result of an eviction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Eviction {
    pub identity: Option<Identity>,
    pub room_id: Option<RoomId>,
    /// The room became empty and was deleted
    pub room_deleted: bool,
}

#[async_trait]
pub trait SignalingRepository: Send + Sync {
    /// Register a freshly admitted connection (not in any room yet).
    async fn register(
        &self,
        connection: Arc<Connection>,
        identity: Option<Identity>,
    ) -> Result<(), RepositoryError>;

    /// Look up a registered connection.
    async fn binding(&self, connection_id: &ConnectionId) -> Result<Binding, RepositoryError>;

    /// Bind `identity` to the connection and put it into `room_id`,
    /// creating the room on first use and leaving any previous room.
    async fn join_room(
        &self,
        connection_id: &ConnectionId,
        room_id: RoomId,
        identity: Identity,
    ) -> Result<JoinOutcome, RepositoryError>;

    /// Remove the connection from its room and from the registry, then close
    /// its outbound queue. `None` when it was not registered.
    async fn evict(&self, connection_id: &ConnectionId) -> Option<Eviction>;

    async fn find_room(&self, room_id: &RoomId) -> Option<Arc<Room>>;

    /// Forget the room binding of connections a fan-out dropped from
    /// `room_id`, and delete the room if nobody is left in it.
    /// Returns `true` if the room was deleted.
    async fn detach_evicted(&self, room_id: &RoomId, evicted: &[ConnectionId]) -> bool;

    /// All live rooms.
    async fn rooms(&self) -> Vec<Arc<Room>>;

    async fn count_connections(&self) -> usize;

    /// Close every outbound queue and forget all connections and rooms.
    /// Returns the number of connections that were closed.
    async fn shutdown(&self) -> usize;
}
