//! InMemory Signaling Repository 実装
//!
//! ドメイン層が定義する SignalingRepository trait の具体的な実装。
//! 接続テーブルとルームテーブルを 1 つの Mutex で保護し、
//! 入室・退出・ルームの生成と削除を互いにアトミックに扱います。
//!
//! ロックの順序は常に「レジストリ → ルーム」です。ルーム側のロックを
//! 保持したままレジストリをロックすることはありません。

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{
    domain::{
        Binding, Connection, ConnectionId, Eviction, Frame, Identity, JoinOutcome, Member,
        RepositoryError, Room, RoomId, SignalingRepository, Timestamp,
    },
    infrastructure::dto::websocket::{MessageType, encode_membership},
};

/// Registry entry for one admitted connection
struct ConnectionEntry {
    connection: Arc<Connection>,
    authenticated: Option<Identity>,
    identity: Option<Identity>,
    room_id: Option<RoomId>,
}

impl ConnectionEntry {
    fn binding(&self) -> Binding {
        Binding {
            connection: Arc::clone(&self.connection),
            authenticated: self.authenticated.clone(),
            identity: self.identity.clone(),
            room_id: self.room_id.clone(),
        }
    }
}

#[derive(Default)]
struct Registry {
    connections: HashMap<ConnectionId, ConnectionEntry>,
    rooms: HashMap<RoomId, Arc<Room>>,
}

/// インメモリ Signaling Repository 実装
///
/// HashMap をインメモリ DB として使用する実装。
/// ドメイン層の SignalingRepository trait を実装します（依存性の逆転）。
///
/// 各操作は途中で future が破棄されても不変条件を壊さないように、
/// テーブルの書き換えをルームのロック待ちの後にまとめて行います。
#[derive(Default)]
pub struct InMemorySignalingRepository {
    registry: Mutex<Registry>,
}

impl InMemorySignalingRepository {
    /// 新しい InMemorySignalingRepository を作成
    pub fn new() -> Self {
        Self::default()
    }
}

/// Encode a membership notification; encoding failures only cost the
/// notification.
fn membership_frame(kind: MessageType, room_id: &RoomId, identity: &Identity) -> Option<Frame> {
    match encode_membership(kind, room_id, identity) {
        Ok(frame) => Some(frame),
        Err(e) => {
            tracing::error!(
                "Failed to encode {} for room '{}': {}",
                kind.as_str(),
                room_id,
                e
            );
            None
        }
    }
}

/// Clear the room binding of connections a fan-out dropped from `room`.
/// Connections that are members again (or bound elsewhere) keep theirs.
async fn release_evicted(
    connections: &mut HashMap<ConnectionId, ConnectionEntry>,
    room: &Room,
    evicted: &[ConnectionId],
) {
    for connection_id in evicted {
        let Some(entry) = connections.get_mut(connection_id) else {
            continue;
        };
        if entry.room_id.as_ref() != Some(room.id()) || room.contains(connection_id).await {
            continue;
        }
        entry.room_id = None;
        tracing::debug!(
            "Detached evicted connection {} from room '{}'",
            connection_id,
            room.id()
        );
    }
}

/// Remove a connection from `room_id`, announcing `user-left` to the rest.
/// Deletes the room when it becomes empty; returns `true` in that case.
async fn leave_room(
    connections: &mut HashMap<ConnectionId, ConnectionEntry>,
    rooms: &mut HashMap<RoomId, Arc<Room>>,
    room_id: &RoomId,
    connection_id: &ConnectionId,
    identity: Option<&Identity>,
) -> bool {
    let Some(room) = rooms.get(room_id).cloned() else {
        return false;
    };
    let left = identity.and_then(|identity| membership_frame(MessageType::UserLeft, room_id, identity));
    let departure = room.remove_member(connection_id, left).await;
    let deleted = departure.remaining == 0;
    if deleted {
        rooms.remove(room_id);
        tracing::info!("Room '{}' deleted (empty)", room_id);
    }
    release_evicted(connections, &room, &departure.delivery.evicted).await;
    deleted
}

#[async_trait]
impl SignalingRepository for InMemorySignalingRepository {
    async fn register(
        &self,
        connection: Arc<Connection>,
        identity: Option<Identity>,
    ) -> Result<(), RepositoryError> {
        let mut registry = self.registry.lock().await;
        let connection_id = connection.id().clone();
        if registry.connections.contains_key(&connection_id) {
            return Err(RepositoryError::DuplicateConnection(
                connection_id.to_string(),
            ));
        }
        registry.connections.insert(
            connection_id.clone(),
            ConnectionEntry {
                connection,
                authenticated: identity.clone(),
                identity,
                room_id: None,
            },
        );
        tracing::info!("Connection registered: {}", connection_id);
        Ok(())
    }

    async fn binding(&self, connection_id: &ConnectionId) -> Result<Binding, RepositoryError> {
        let registry = self.registry.lock().await;
        registry
            .connections
            .get(connection_id)
            .map(ConnectionEntry::binding)
            .ok_or_else(|| RepositoryError::ConnectionNotFound(connection_id.to_string()))
    }

    async fn join_room(
        &self,
        connection_id: &ConnectionId,
        room_id: RoomId,
        identity: Identity,
    ) -> Result<JoinOutcome, RepositoryError> {
        let mut registry = self.registry.lock().await;
        let Registry { connections, rooms } = &mut *registry;
        let (connection, previous, previous_identity) = connections
            .get(connection_id)
            .map(|entry| {
                (
                    Arc::clone(&entry.connection),
                    entry.room_id.clone(),
                    entry.identity.clone(),
                )
            })
            .ok_or_else(|| RepositoryError::ConnectionNotFound(connection_id.to_string()))?;

        // A connection belongs to at most one room. Its binding is cleared
        // only once the previous room no longer lists it.
        let mut left_room = None;
        if let Some(previous) = previous.filter(|previous| previous != &room_id) {
            leave_room(
                connections,
                rooms,
                &previous,
                connection_id,
                previous_identity.as_ref(),
            )
            .await;
            if let Some(entry) = connections.get_mut(connection_id) {
                entry.room_id = None;
            }
            left_room = Some(previous);
        }

        // A new room enters the table only together with its first member.
        let existing = rooms.get(&room_id).cloned();
        let created = existing.is_none();
        let room = existing.unwrap_or_else(|| Arc::new(Room::new(room_id.clone(), Timestamp::now())));

        let joined = membership_frame(MessageType::UserJoined, &room_id, &identity);
        let delivery = room
            .add_member(Member::new(connection, identity.clone()), joined)
            .await;

        if created {
            rooms.insert(room_id.clone(), Arc::clone(&room));
            tracing::info!("Room '{}' created", room_id);
        }
        if let Some(entry) = connections.get_mut(connection_id) {
            entry.identity = Some(identity);
            entry.room_id = Some(room_id);
        }
        release_evicted(connections, &room, &delivery.evicted).await;

        Ok(JoinOutcome {
            created,
            left_room,
            delivery,
        })
    }

    async fn evict(&self, connection_id: &ConnectionId) -> Option<Eviction> {
        let mut registry = self.registry.lock().await;
        let Registry { connections, rooms } = &mut *registry;
        let (room_id, identity) = connections
            .get(connection_id)
            .map(|entry| (entry.room_id.clone(), entry.identity.clone()))?;

        // Stay registered until the room no longer lists the connection.
        let room_deleted = match &room_id {
            Some(room_id) => {
                leave_room(connections, rooms, room_id, connection_id, identity.as_ref()).await
            }
            None => false,
        };
        let entry = connections.remove(connection_id)?;
        entry.connection.close();
        tracing::info!("Connection unregistered: {}", connection_id);

        Some(Eviction {
            identity,
            room_id,
            room_deleted,
        })
    }

    async fn find_room(&self, room_id: &RoomId) -> Option<Arc<Room>> {
        let registry = self.registry.lock().await;
        registry.rooms.get(room_id).cloned()
    }

    async fn detach_evicted(&self, room_id: &RoomId, evicted: &[ConnectionId]) -> bool {
        let mut registry = self.registry.lock().await;
        let Registry { connections, rooms } = &mut *registry;
        let Some(room) = rooms.get(room_id).cloned() else {
            for connection_id in evicted {
                if let Some(entry) = connections.get_mut(connection_id)
                    && entry.room_id.as_ref() == Some(room_id)
                {
                    entry.room_id = None;
                }
            }
            return false;
        };

        release_evicted(connections, &room, evicted).await;
        if room.member_count().await > 0 {
            return false;
        }
        rooms.remove(room_id);
        tracing::info!("Room '{}' deleted (no responsive members)", room_id);
        true
    }

    async fn rooms(&self) -> Vec<Arc<Room>> {
        let registry = self.registry.lock().await;
        let mut rooms: Vec<Arc<Room>> = registry.rooms.values().cloned().collect();
        rooms.sort_by(|a, b| a.id().as_str().cmp(b.id().as_str()));
        rooms
    }

    async fn count_connections(&self) -> usize {
        self.registry.lock().await.connections.len()
    }

    async fn shutdown(&self) -> usize {
        let mut registry = self.registry.lock().await;
        let closed = registry.connections.len();
        for entry in registry.connections.values() {
            entry.connection.close();
        }
        registry.connections.clear();
        registry.rooms.clear();
        tracing::info!("Hub shut down, closed {} connection(s)", closed);
        closed
    }
}
