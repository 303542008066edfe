//! Per-tag call gate.
//!
//! Correlation tags name methods, not call instances, so two concurrent calls
//! to the same method would both wait on one tag. The gate gives each tag a
//! FIFO async lane: a second call with a tag already in flight waits for the
//! first call to finish before it registers and writes its frame.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{ready, Context, Poll};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type Lane = Arc<AsyncMutex<()>>;
type Lanes = Arc<Mutex<HashMap<u32, Lane>>>;

#[derive(Default)]
pub(crate) struct TagGate {
    lanes: Lanes,
}

impl TagGate {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive use of `tag`.
    ///
    /// Cancel safe: a dropped wait leaves no lane behind.
    pub(crate) async fn acquire(&self, tag: u32) -> TagTurn {
        let lane = Arc::clone(lock_lanes(&self.lanes).entry(tag).or_default());
        let guard = Queued {
            lanes: Arc::clone(&self.lanes),
            tag,
            wait: Some(Box::pin(lane.lock_owned())),
        }
        .await;

        TagTurn {
            lanes: Arc::clone(&self.lanes),
            tag,
            guard: Some(guard),
        }
    }

    /// Number of tags with a call in flight or queued.
    pub(crate) fn active_tags(&self) -> usize {
        lock_lanes(&self.lanes).len()
    }
}

fn lock_lanes(lanes: &Mutex<HashMap<u32, Lane>>) -> MutexGuard<'_, HashMap<u32, Lane>> {
    lanes.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Drop the lane for `tag` if only the map still references it.
fn prune(lanes: &mut HashMap<u32, Lane>, tag: u32) {
    if lanes
        .get(&tag)
        .is_some_and(|lane| Arc::strong_count(lane) == 1)
    {
        lanes.remove(&tag);
    }
}

/// A caller still queued on a lane.
struct Queued<F> {
    lanes: Lanes,
    tag: u32,
    wait: Option<Pin<Box<F>>>,
}

impl<F: Future> Future for Queued<F> {
    type Output = F::Output;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<F::Output> {
        let Some(wait) = self.wait.as_mut() else {
            return Poll::Pending;
        };
        let out = ready!(wait.as_mut().poll(cx));
        self.wait = None;
        Poll::Ready(out)
    }
}

impl<F> Drop for Queued<F> {
    fn drop(&mut self) {
        if self.wait.is_none() {
            return;
        }
        let mut lanes = lock_lanes(&self.lanes);
        // The pending lock future owns our lane reference.
        drop(self.wait.take());
        prune(&mut lanes, self.tag);
    }
}

/// Exclusive use of one tag; released on drop.
pub(crate) struct TagTurn {
    lanes: Lanes,
    tag: u32,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for TagTurn {
    fn drop(&mut self) {
        let mut lanes = lock_lanes(&self.lanes);
        drop(self.guard.take());
        prune(&mut lanes, self.tag);
    }
}

impl std::fmt::Debug for TagTurn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TagTurn").field("tag", &self.tag).finish()
    }
}
