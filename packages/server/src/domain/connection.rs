//! Connection entity and its outbound queue.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc::{self, error::TrySendError};

use super::value_object::{ConnectionId, DisplayName, Timestamp, UserId};

/// Default capacity of a connection's outbound queue
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 256;

/// One encoded text frame, shared between all recipients of a fan-out
pub type Frame = Arc<str>;

/// Who is on the other end of a connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub name: DisplayName,
}

impl Identity {
    /// Create a new identity
    pub fn new(user_id: UserId, name: DisplayName) -> Self {
        Self { user_id, name }
    }
}

/// Result of a non-blocking enqueue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// The frame is waiting for the write pump
    Queued,
    /// The queue is at capacity
    Full,
    /// The queue has already been closed
    Closed,
}

/// A single admitted duplex link.
///
/// Many producers (room fan-out, targeted relays, error replies) enqueue
/// frames; exactly one consumer, the write pump, holds the receiving half.
/// Dropping the sender is how the queue is closed, which ends the write pump
/// once the remaining frames are drained.
#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    connected_at: Timestamp,
    outbound: Mutex<Option<mpsc::Sender<Frame>>>,
}

impl Connection {
    /// Open a connection with a bounded outbound queue.
    ///
    /// Returns the shared connection handle together with the receiving half
    /// of its queue, which must be handed to the write pump.
    pub fn open(
        id: ConnectionId,
        connected_at: Timestamp,
        capacity: usize,
    ) -> (Arc<Self>, mpsc::Receiver<Frame>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let connection = Arc::new(Self {
            id,
            connected_at,
            outbound: Mutex::new(Some(tx)),
        });
        (connection, rx)
    }

    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    pub fn connected_at(&self) -> Timestamp {
        self.connected_at
    }

    /// Try to enqueue a frame without waiting.
    pub fn try_enqueue(&self, frame: Frame) -> EnqueueOutcome {
        let outbound = self.outbound.lock();
        let Some(tx) = outbound.as_ref() else {
            return EnqueueOutcome::Closed;
        };
        match tx.try_send(frame) {
            Ok(()) => EnqueueOutcome::Queued,
            Err(TrySendError::Full(_)) => EnqueueOutcome::Full,
            Err(TrySendError::Closed(_)) => EnqueueOutcome::Closed,
        }
    }

    /// Close the outbound queue.
    ///
    /// Returns `true` only for the call that actually closed it.
    pub fn close(&self) -> bool {
        self.outbound.lock().take().is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.outbound
            .lock()
            .as_ref()
            .is_none_or(|tx| tx.is_closed())
    }
}
