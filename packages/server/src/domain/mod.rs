//! Domain layer for the signaling relay.
//!
//! This module contains the connection and room model, independent of the
//! wire format and of the transport.

pub mod auth;
pub mod connection;
pub mod error;
pub mod factory;
pub mod repository;
pub mod room;
pub mod value_object;

pub use auth::{Authenticator, Credentials};
pub use connection::{Connection, DEFAULT_OUTBOUND_CAPACITY, EnqueueOutcome, Frame, Identity};
pub use error::{AuthError, RepositoryError, ValueObjectError};
pub use factory::ConnectionIdFactory;
pub use repository::{Binding, Eviction, JoinOutcome, SignalingRepository};
pub use room::{Delivery, Departure, Member, MemberSnapshot, Room};
pub use value_object::{ConnectionId, DisplayName, RoomId, Timestamp, UserId};
