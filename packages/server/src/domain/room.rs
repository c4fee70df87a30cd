//! Room entity: membership bookkeeping and fan-out.
//!
//! Deliveries never wait on a recipient. A member whose outbound queue is
//! full (or already closed) is treated as unresponsive: its queue is closed
//! and it is dropped from the membership without being told. One slow
//! consumer therefore cannot stall the rest of the room.

use std::{collections::HashMap, sync::Arc};

use tokio::sync::RwLock;

use super::{
    connection::{Connection, EnqueueOutcome, Frame, Identity},
    value_object::{ConnectionId, RoomId, Timestamp, UserId},
};

/// A connection's entry in a room's membership
#[derive(Debug, Clone)]
pub struct Member {
    pub connection: Arc<Connection>,
    pub identity: Identity,
}

impl Member {
    pub fn new(connection: Arc<Connection>, identity: Identity) -> Self {
        Self {
            connection,
            identity,
        }
    }
}

/// Read-only view of a member, used by the HTTP API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberSnapshot {
    pub identity: Identity,
    pub connected_at: Timestamp,
}

/// Result of one delivery operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delivery {
    /// Number of members whose queue accepted the frame
    pub delivered: usize,
    /// Members removed because their queue could not accept the frame
    pub evicted: Vec<ConnectionId>,
}

/// Result of removing a member
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Departure {
    /// Members still in the room afterwards
    pub remaining: usize,
    /// Fan-out of the `left` notification
    pub delivery: Delivery,
}

/// A named group of connections sharing signaling traffic.
///
/// Deliveries take the membership read lock and may run concurrently with
/// each other; add and remove take the write lock. The lock is per room, so
/// contention never crosses rooms.
#[derive(Debug)]
pub struct Room {
    id: RoomId,
    created_at: Timestamp,
    members: RwLock<HashMap<ConnectionId, Member>>,
}

impl Room {
    /// Create a new empty room
    pub fn new(id: RoomId, created_at: Timestamp) -> Self {
        Self {
            id,
            created_at,
            members: RwLock::new(HashMap::new()),
        }
    }

    pub fn id(&self) -> &RoomId {
        &self.id
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// Insert a member and announce it to everyone else.
    ///
    /// The joiner never receives its own `joined` frame. Members already in
    /// the room are not replayed to the joiner.
    pub async fn add_member(&self, member: Member, joined: Option<Frame>) -> Delivery {
        let mut members = self.members.write().await;
        let joiner = member.connection.id().clone();
        tracing::info!(
            "Member '{}' ({}) joined room '{}'",
            member.identity.user_id,
            joiner,
            self.id
        );
        members.insert(joiner.clone(), member);

        let Some(frame) = joined else {
            return Delivery::default();
        };
        let delivery = fan_out(members.values(), |m| m.connection.id() != &joiner, &frame);
        self.drop_unresponsive(&mut members, &delivery.evicted);
        delivery
    }

    /// Remove a member and announce its departure to the remaining members.
    ///
    /// Nothing is sent when the connection was not a member. Members dropped
    /// by the notification fan-out are reported in the returned delivery.
    pub async fn remove_member(&self, connection_id: &ConnectionId, left: Option<Frame>) -> Departure {
        let mut members = self.members.write().await;
        let Some(removed) = members.remove(connection_id) else {
            return Departure {
                remaining: members.len(),
                delivery: Delivery::default(),
            };
        };
        tracing::info!(
            "Member '{}' ({}) left room '{}'",
            removed.identity.user_id,
            connection_id,
            self.id
        );

        let delivery = match left {
            Some(frame) => fan_out(members.values(), |_| true, &frame),
            None => Delivery::default(),
        };
        self.drop_unresponsive(&mut members, &delivery.evicted);
        Departure {
            remaining: members.len(),
            delivery,
        }
    }

    /// Deliver a frame to every member except `sender`.
    ///
    /// Join and leave notifications do not go through here: they are fanned
    /// out under the same write lock that changes the membership, so no
    /// member can see a notification about a membership it is not part of.
    pub async fn broadcast_except(&self, sender: &ConnectionId, frame: Frame) -> Delivery {
        let delivery = {
            let members = self.members.read().await;
            fan_out(members.values(), |m| m.connection.id() != sender, &frame)
        };
        self.evict_unresponsive(&delivery.evicted).await;
        delivery
    }

    /// Deliver a frame to the first member whose user id is `target`.
    ///
    /// Silent no-op when nobody matches.
    pub async fn send_to_user(&self, target: &UserId, frame: Frame) -> Delivery {
        let delivery = {
            let members = self.members.read().await;
            match members.values().find(|m| &m.identity.user_id == target) {
                Some(member) => fan_out(std::iter::once(member), |_| true, &frame),
                None => Delivery::default(),
            }
        };
        self.evict_unresponsive(&delivery.evicted).await;
        delivery
    }

    pub async fn member_count(&self) -> usize {
        self.members.read().await.len()
    }

    pub async fn contains(&self, connection_id: &ConnectionId) -> bool {
        self.members.read().await.contains_key(connection_id)
    }

    /// Snapshot of the current members, oldest connection first (ties by user id)
    pub async fn members(&self) -> Vec<MemberSnapshot> {
        let members = self.members.read().await;
        let mut snapshot: Vec<MemberSnapshot> = members
            .values()
            .map(|m| MemberSnapshot {
                identity: m.identity.clone(),
                connected_at: m.connection.connected_at(),
            })
            .collect();
        snapshot.sort_by(|a, b| {
            a.connected_at
                .cmp(&b.connected_at)
                .then_with(|| a.identity.user_id.as_str().cmp(b.identity.user_id.as_str()))
        });
        snapshot
    }

    #[cfg(test)]
    pub(crate) async fn lock_members(
        &self,
    ) -> tokio::sync::RwLockWriteGuard<'_, HashMap<ConnectionId, Member>> {
        self.members.write().await
    }

    async fn evict_unresponsive(&self, evicted: &[ConnectionId]) {
        if evicted.is_empty() {
            return;
        }
        let mut members = self.members.write().await;
        self.drop_unresponsive(&mut members, evicted);
    }

    fn drop_unresponsive(&self, members: &mut HashMap<ConnectionId, Member>, evicted: &[ConnectionId]) {
        for connection_id in evicted {
            if members.remove(connection_id).is_some() {
                tracing::warn!(
                    "Evicted unresponsive connection '{}' from room '{}'",
                    connection_id,
                    self.id
                );
            }
        }
    }
}

/// Offer `frame` to every selected member; close the queue of any member
/// that cannot take it.
fn fan_out<'a>(
    members: impl Iterator<Item = &'a Member>,
    select: impl Fn(&Member) -> bool,
    frame: &Frame,
) -> Delivery {
    let mut delivery = Delivery::default();
    for member in members.filter(|m| select(*m)) {
        match member.connection.try_enqueue(Arc::clone(frame)) {
            EnqueueOutcome::Queued => delivery.delivered += 1,
            EnqueueOutcome::Full | EnqueueOutcome::Closed => {
                member.connection.close();
                delivery.evicted.push(member.connection.id().clone());
            }
        }
    }
    delivery
}
