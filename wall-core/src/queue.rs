//! Thread-safe FIFO of wire-ready outbound messages.
//!
//! Producers (UI actions) push from any thread without blocking; the
//! connection engine is the single consumer. Each push also wakes the
//! engine so the exchange loop does not have to spin.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::Instant;

#[derive(Debug, Default)]
struct QueueInner {
    messages: Mutex<VecDeque<String>>,
    notify: Notify,
}

/// Cloneable handle to the shared outbound queue.
///
/// Unbounded; messages are stored exactly as the codec produced them.
#[derive(Debug, Clone, Default)]
pub struct OutboundQueue {
    inner: Arc<QueueInner>,
}

impl OutboundQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<String>> {
        self.inner
            .messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a message to the tail. Never blocks, never rejects.
    pub fn push(&self, message: impl Into<String>) {
        self.lock().push_back(message.into());
        self.inner.notify.notify_one();
    }

    /// Remove and return the head, if any.
    pub fn pop(&self) -> Option<String> {
        self.lock().pop_front()
    }

    pub fn has_pending(&self) -> bool {
        !self.lock().is_empty()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        !self.has_pending()
    }

    /// Drop every pending message.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Resolves after the next `push` (or immediately if a push happened
    /// since the last wake-up). May wake spuriously.
    pub async fn notified(&self) {
        self.inner.notify.notified().await;
    }

    /// Pop the head, waiting up to `timeout` for one to arrive.
    pub async fn wait_pop(&self, timeout: Duration) -> Option<String> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(message) = self.pop() {
                return Some(message);
            }
            if tokio::time::timeout_at(deadline, self.notified())
                .await
                .is_err()
            {
                return self.pop();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_order() {
        let queue = OutboundQueue::new();
        for i in 0..5 {
            queue.push(format!("m{i}"));
        }
        assert_eq!(queue.len(), 5);
        for i in 0..5 {
            assert_eq!(queue.pop(), Some(format!("m{i}")));
        }
        assert_eq!(queue.pop(), None);
        assert!(!queue.has_pending());
    }

    #[test]
    fn clear_drops_everything() {
        let queue = OutboundQueue::new();
        queue.push("a");
        queue.push("b");
        queue.clear();
        assert!(queue.is_empty());
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn clones_share_storage() {
        let queue = OutboundQueue::new();
        let producer = queue.clone();
        producer.push("x");
        assert_eq!(queue.pop().as_deref(), Some("x"));
    }

    #[test]
    fn concurrent_producers_keep_per_producer_order() {
        let queue = OutboundQueue::new();
        let handles: Vec<_> = (0..4)
            .map(|p| {
                let queue = queue.clone();
                std::thread::spawn(move || {
                    for i in 0..250 {
                        queue.push(format!("{p}:{i}"));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let mut next = [0usize; 4];
        let mut total = 0;
        while let Some(msg) = queue.pop() {
            let (p, i) = msg.split_once(':').unwrap();
            let p: usize = p.parse().unwrap();
            let i: usize = i.parse().unwrap();
            assert_eq!(i, next[p], "producer {p} reordered");
            next[p] += 1;
            total += 1;
        }
        assert_eq!(total, 1000);
    }

    #[tokio::test]
    async fn wait_pop_times_out_on_empty_queue() {
        let queue = OutboundQueue::new();
        let got = queue.wait_pop(Duration::from_millis(20)).await;
        assert!(got.is_none());
    }

    #[tokio::test]
    async fn wait_pop_wakes_on_push() {
        let queue = OutboundQueue::new();
        let producer = queue.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            producer.push("late");
        });
        let got = queue.wait_pop(Duration::from_secs(2)).await;
        assert_eq!(got.as_deref(), Some("late"));
    }
}
