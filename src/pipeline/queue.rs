//! Ownership-transferring FIFO between two stages.
//!
//! Unbounded: pushes never block beyond the lock. Consumers wait on a condition variable
//! with a bounded timeout and re-check the termination flag between waits.

use anyhow::{anyhow, Result};
use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use std::time::Duration;

use super::Termination;

pub struct HandoffQueue<T> {
    name: &'static str,
    items: Mutex<VecDeque<T>>,
    ready: Condvar,
    backlog_warn: usize,
}

impl<T> HandoffQueue<T> {
    pub fn new(name: &'static str, backlog_warn: usize) -> Self {
        Self {
            name,
            items: Mutex::new(VecDeque::new()),
            ready: Condvar::new(),
            backlog_warn,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Append an item and wake one waiting consumer. Returns the depth after the push.
    pub fn push(&self, item: T) -> Result<usize> {
        let depth = {
            let mut items = self
                .items
                .lock()
                .map_err(|_| anyhow!("queue {} lock poisoned", self.name))?;
            items.push_back(item);
            items.len()
        };
        self.ready.notify_one();
        if self.backlog_warn > 0 && depth == self.backlog_warn {
            log::warn!(
                "queue {} backlog reached {} items; consumer is falling behind",
                self.name,
                depth
            );
        }
        Ok(depth)
    }

    /// Take the oldest item, waiting in `poll` slices until one arrives. Returns `None`
    /// once termination is signaled.
    pub fn pop(&self, termination: &Termination, poll: Duration) -> Result<Option<T>> {
        let mut items = self
            .items
            .lock()
            .map_err(|_| anyhow!("queue {} lock poisoned", self.name))?;
        loop {
            if termination.is_signaled() {
                return Ok(None);
            }
            if let Some(item) = items.pop_front() {
                return Ok(Some(item));
            }
            items = self
                .ready
                .wait_timeout(items, poll)
                .map_err(|_| anyhow!("queue {} lock poisoned", self.name))?
                .0;
        }
    }

    /// Wake every waiting consumer so it can observe termination.
    pub fn wake_all(&self) {
        self.ready.notify_all();
    }

    pub fn len(&self) -> usize {
        self.items.lock().map(|items| items.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
