//! Async bounded queue with acknowledgement tracking.

use std::collections::VecDeque;
use std::future::Future;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::core::Message;
use crate::errors::QueueError;

#[derive(Debug)]
struct QueueState<T> {
    items: VecDeque<T>,
    unfinished: usize,
}

/// A named FIFO channel with an optional capacity bound.
///
/// A capacity of zero means unbounded. `put` waits while the queue is full,
/// `get` waits while it is empty; neither drops nor reorders items.
#[derive(Debug)]
pub struct BoundedQueue<T = Message> {
    name: String,
    capacity: usize,
    state: Mutex<QueueState<T>>,
    not_empty: Notify,
    not_full: Notify,
    all_done: Notify,
}

impl<T> BoundedQueue<T> {
    /// Creates a queue. `capacity == 0` makes it unbounded.
    #[must_use]
    pub fn new(name: impl Into<String>, capacity: usize) -> Self {
        Self {
            name: name.into(),
            capacity,
            state: Mutex::new(QueueState {
                items: VecDeque::new(),
                unfinished: 0,
            }),
            not_empty: Notify::new(),
            not_full: Notify::new(),
            all_done: Notify::new(),
        }
    }

    /// Creates an unbounded queue.
    #[must_use]
    pub fn unbounded(name: impl Into<String>) -> Self {
        Self::new(name, 0)
    }

    /// The queue name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The configured capacity (zero means unbounded).
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns true if the queue has a capacity bound.
    #[must_use]
    pub fn is_bounded(&self) -> bool {
        self.capacity > 0
    }

    /// Current depth. For observability only.
    #[must_use]
    pub fn size(&self) -> usize {
        self.state.lock().items.len()
    }

    /// Items put but not yet acknowledged with [`task_done`](Self::task_done).
    #[must_use]
    pub fn unfinished(&self) -> usize {
        self.state.lock().unfinished
    }

    /// Enqueues `item`, waiting while the queue is at capacity.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Timeout`] if `timeout` elapses before space frees.
    /// The item is not enqueued in that case.
    pub async fn put(&self, item: T, timeout: Option<Duration>) -> Result<(), QueueError> {
        self.bounded_wait(self.put_wait(item), timeout).await
    }

    /// Dequeues the oldest item, waiting while the queue is empty.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Timeout`] if `timeout` elapses first.
    pub async fn get(&self, timeout: Option<Duration>) -> Result<T, QueueError> {
        self.bounded_wait(self.get_wait(), timeout).await
    }

    /// Dequeues the oldest item if one is present.
    pub fn try_get(&self) -> Option<T> {
        let item = self.state.lock().items.pop_front();
        if item.is_some() {
            self.not_full.notify_one();
        }
        item
    }

    /// Waits until the queue holds at least one item.
    pub async fn readable(&self) {
        loop {
            let notified = self.not_empty.notified();
            if self.size() > 0 {
                return;
            }
            notified.await;
        }
    }

    /// Returns true if a `put` would not wait right now.
    #[must_use]
    pub fn has_room(&self) -> bool {
        self.capacity == 0 || self.size() < self.capacity
    }

    /// Waits until the queue has room for at least one item.
    pub async fn writable(&self) {
        loop {
            let notified = self.not_full.notified();
            if self.has_room() {
                return;
            }
            notified.await;
        }
    }

    /// Acknowledges one dequeued item.
    pub fn task_done(&self) {
        let mut state = self.state.lock();
        state.unfinished = state.unfinished.saturating_sub(1);
        if state.unfinished == 0 {
            drop(state);
            self.all_done.notify_waiters();
        }
    }

    /// Returns a guard that calls [`task_done`](Self::task_done) when dropped.
    #[must_use]
    pub fn task_guard(&self) -> TaskGuard<'_, T> {
        TaskGuard { queue: self }
    }

    /// Waits until every item ever put has been acknowledged.
    pub async fn join(&self) {
        loop {
            let notified = self.all_done.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.unfinished() == 0 {
                return;
            }
            notified.await;
        }
    }

    async fn put_wait(&self, item: T) {
        loop {
            let notified = self.not_full.notified();
            {
                let mut state = self.state.lock();
                if self.capacity == 0 || state.items.len() < self.capacity {
                    state.items.push_back(item);
                    state.unfinished += 1;
                    drop(state);
                    self.not_empty.notify_one();
                    return;
                }
            }
            notified.await;
        }
    }

    async fn get_wait(&self) -> T {
        loop {
            let notified = self.not_empty.notified();
            if let Some(item) = self.try_get() {
                return item;
            }
            notified.await;
        }
    }

    async fn bounded_wait<F, R>(&self, wait: F, timeout: Option<Duration>) -> Result<R, QueueError>
    where
        F: Future<Output = R>,
    {
        match timeout {
            None => Ok(wait.await),
            Some(limit) => tokio::time::timeout(limit, wait)
                .await
                .map_err(|_| QueueError::Timeout {
                    queue: self.name.clone(),
                    waited: limit,
                }),
        }
    }
}

/// Acknowledges one dequeued item on drop, including on early return or error.
#[derive(Debug)]
pub struct TaskGuard<'a, T> {
    queue: &'a BoundedQueue<T>,
}

impl<T> Drop for TaskGuard<'_, T> {
    fn drop(&mut self) {
        self.queue.task_done();
    }
}
