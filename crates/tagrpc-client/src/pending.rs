//! Pending-call table: correlation tag → single-delivery result slot.
//!
//! Registration (call path), resolution (receive loop) and teardown all go
//! through one mutex, which also guards the closed flag. A call can therefore
//! never register after teardown has drained the table, and a response can
//! never be delivered twice.
//!
//! A call abandoned after its frame went out leaves a marker under its tag.
//! The next frame on that tag is the abandoned call's late response: it is
//! discarded and the marker cleared, and only then can the tag be registered
//! again.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use bytes::Bytes;
use tokio::sync::oneshot;
use tracing::{debug, trace};

use crate::error::{CallError, Result};
use crate::gate::TagTurn;

type Delivery = Result<Bytes>;

enum Slot {
    Waiting {
        id: u64,
        tx: oneshot::Sender<Delivery>,
    },
    /// Holds the tag's gate turn until the late response is consumed.
    Abandoned { _turn: Option<TagTurn> },
}

#[derive(Default)]
struct TableState {
    slots: HashMap<u32, Slot>,
    closed: bool,
    next_id: u64,
}

/// Mapping from correlation tag to the call waiting on it.
#[derive(Clone, Default)]
pub struct PendingTable {
    state: Arc<Mutex<TableState>>,
}

impl PendingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a call waiting on `tag`.
    ///
    /// Fails with [`CallError::ConnectionClosed`] once the table has been
    /// drained, and with [`CallError::TagInUse`] while another registration
    /// (or an abandoned call's unanswered frame) for the same tag is
    /// outstanding.
    pub fn register(&self, tag: u32) -> Result<PendingSlot> {
        let mut state = self.lock();
        if state.closed {
            return Err(CallError::ConnectionClosed);
        }
        if state.slots.contains_key(&tag) {
            return Err(CallError::TagInUse(tag));
        }

        let id = state.next_id;
        state.next_id += 1;
        let (tx, rx) = oneshot::channel();
        state.slots.insert(tag, Slot::Waiting { id, tx });
        trace!(tag, id, "registered pending call");

        Ok(PendingSlot {
            tag,
            id,
            submitted_at: Instant::now(),
            written: false,
            turn: None,
            rx,
            table: Arc::clone(&self.state),
        })
    }

    /// Deliver `payload` to the call registered under `tag`.
    ///
    /// Returns `false` when no call is waiting: a stale or duplicate frame, or
    /// the late response of an abandoned call.
    pub fn resolve(&self, tag: u32, payload: Bytes) -> bool {
        let slot = self.lock().slots.remove(&tag);
        match slot {
            Some(Slot::Waiting { tx, .. }) => tx.send(Ok(payload)).is_ok(),
            Some(Slot::Abandoned { .. }) => {
                debug!(tag, "discarded late response of abandoned call");
                false
            }
            None => false,
        }
    }

    /// Fail every outstanding call and refuse further registrations.
    ///
    /// Returns how many waiting calls were failed. Calling it again is a no-op.
    pub fn drain_all(&self, failure: impl Fn() -> CallError) -> usize {
        let drained: Vec<Slot> = {
            let mut state = self.lock();
            state.closed = true;
            state.slots.drain().map(|(_, slot)| slot).collect()
        };

        let mut count = 0;
        for slot in drained {
            if let Slot::Waiting { tx, .. } = slot {
                let _ = tx.send(Err(failure()));
                count += 1;
            }
        }
        count
    }

    /// Number of calls waiting for a response.
    pub fn len(&self) -> usize {
        self.lock()
            .slots
            .values()
            .filter(|slot| matches!(slot, Slot::Waiting { .. }))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether [`PendingTable::drain_all`] has run.
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    fn lock(&self) -> MutexGuard<'_, TableState> {
        lock_state(&self.state)
    }
}

fn lock_state(state: &Mutex<TableState>) -> MutexGuard<'_, TableState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The waiting side of one registration.
///
/// Dropping an unresolved slot removes its own registration (and only its
/// own). If its frame was already written, the registration is replaced by a
/// marker that swallows the late response.
pub struct PendingSlot {
    tag: u32,
    id: u64,
    submitted_at: Instant,
    written: bool,
    turn: Option<TagTurn>,
    rx: oneshot::Receiver<Delivery>,
    table: Arc<Mutex<TableState>>,
}

impl PendingSlot {
    pub fn tag(&self) -> u32 {
        self.tag
    }

    pub fn submitted_at(&self) -> Instant {
        self.submitted_at
    }

    /// Record that the request frame is on its way to the peer.
    pub fn mark_written(&mut self) {
        self.written = true;
    }

    /// Keep the tag's gate turn until this call is answered.
    pub(crate) fn hold_turn(&mut self, turn: TagTurn) {
        self.turn = Some(turn);
    }

    /// Wait for the response payload or the teardown failure.
    pub async fn wait(mut self) -> Result<Bytes> {
        match (&mut self.rx).await {
            Ok(delivery) => delivery,
            // Sender dropped without a delivery: the table itself went away.
            Err(_) => Err(CallError::ConnectionClosed),
        }
    }
}

impl Drop for PendingSlot {
    fn drop(&mut self) {
        let mut state = lock_state(&self.table);
        let ours = matches!(
            state.slots.get(&self.tag),
            Some(Slot::Waiting { id, .. }) if *id == self.id
        );
        if !ours {
            return;
        }

        if self.written {
            let turn = self.turn.take();
            let replaced = state
                .slots
                .insert(self.tag, Slot::Abandoned { _turn: turn });
            drop(state);
            drop(replaced);
            debug!(tag = self.tag, id = self.id, "abandoned call awaiting late response");
        } else {
            let removed = state.slots.remove(&self.tag);
            drop(state);
            drop(removed);
            trace!(tag = self.tag, id = self.id, "abandoned pending call");
        }
    }
}

impl std::fmt::Debug for PendingSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingSlot")
            .field("tag", &self.tag)
            .field("id", &self.id)
            .field("submitted_at", &self.submitted_at)
            .field("written", &self.written)
            .finish()
    }
}
