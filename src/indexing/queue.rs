//! Orders saves whose directory lineages overlap.
//!
//! Every save registers a key (the path its tree's children live under)
//! before it is spawned. Registration records the still-pending saves with
//! an overlapping key; the new save waits for all of them before it reads
//! storage. Keys overlap when one is a prefix of the other, so a save of
//! `./a/` waits for earlier saves of `./`, `./a/` and `./a/b/` but not
//! `./c/`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;

use crate::error::{IndexError, Result};

struct Pending {
    ticket: u64,
    key: String,
    done: watch::Receiver<bool>,
}

#[derive(Default)]
pub struct SaveQueue {
    pending: Mutex<Vec<Pending>>,
    next_ticket: AtomicU64,
    generation: AtomicU64,
}

impl SaveQueue {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn pending(&self) -> MutexGuard<'_, Vec<Pending>> {
        // The list stays consistent even if a holder panicked.
        self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Take a place in line behind every pending save that overlaps `key`.
    pub fn enqueue(self: &Arc<Self>, key: impl Into<String>) -> Ticket {
        let key = key.into();
        let ticket = self.next_ticket.fetch_add(1, Ordering::SeqCst);
        let (done_tx, done_rx) = watch::channel(false);

        let mut pending = self.pending();
        let predecessors = pending
            .iter()
            .filter(|p| overlaps(&p.key, &key))
            .map(|p| p.done.clone())
            .collect();
        pending.push(Pending {
            ticket,
            key: key.clone(),
            done: done_rx,
        });
        // Read under the lock so a concurrent cancel_pending either sees this
        // ticket or happened entirely before it.
        let generation = self.generation.load(Ordering::SeqCst);
        drop(pending);

        Ticket {
            queue: Arc::clone(self),
            ticket,
            key,
            generation,
            predecessors,
            done: done_tx,
        }
    }

    /// Cancel every ticket issued so far that has not got its turn yet.
    pub fn cancel_pending(&self) {
        let _pending = self.pending();
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Number of saves queued or running.
    pub fn len(&self) -> usize {
        self.pending().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn release(&self, ticket: u64) {
        self.pending().retain(|p| p.ticket != ticket);
    }
}

fn overlaps(a: &str, b: &str) -> bool {
    a.starts_with(b) || b.starts_with(a)
}

/// A place in the queue. Dropping it, whether the save finished, failed or
/// panicked, lets the saves behind it proceed.
pub struct Ticket {
    queue: Arc<SaveQueue>,
    ticket: u64,
    key: String,
    generation: u64,
    predecessors: Vec<watch::Receiver<bool>>,
    done: watch::Sender<bool>,
}

impl Ticket {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Wait until every overlapping save queued earlier has finished.
    pub async fn wait_turn(&mut self) -> Result<()> {
        for done in &mut self.predecessors {
            // A dropped sender also means the predecessor is gone.
            let _ = done.wait_for(|finished| *finished).await;
        }
        self.predecessors.clear();

        if self.queue.generation.load(Ordering::SeqCst) != self.generation {
            return Err(IndexError::Cancelled(self.key.clone()));
        }
        Ok(())
    }
}

impl Drop for Ticket {
    fn drop(&mut self) {
        self.queue.release(self.ticket);
        self.done.send_replace(true);
    }
}
