//! Actor mailbox implementation
//!
//! TigerStyle: FIFO ordering, explicit counters, no silent drops.
//!
//! Mailboxes are unbounded multi-producer/single-consumer queues:
//! backpressure belongs to the layer that accepts messages from the outside
//! world, not to the scheduler. Only the episode currently driving the
//! owning executor dequeues.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

/// Unbounded FIFO of undelivered messages for one actor
///
/// Messages posted by a single sender are dequeued in send order.
/// Cross-sender ordering is unspecified.
#[derive(Debug)]
pub struct Mailbox<M> {
    /// Pending messages
    queue: Mutex<VecDeque<M>>,
    /// Pending message count, readable without taking the queue lock
    len: AtomicUsize,
    /// Total messages posted (for observability)
    posted_count: AtomicU64,
    /// Total messages dequeued (for observability)
    dequeued_count: AtomicU64,
}

impl<M: Send> Mailbox<M> {
    /// Create an empty mailbox
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            len: AtomicUsize::new(0),
            posted_count: AtomicU64::new(0),
            dequeued_count: AtomicU64::new(0),
        }
    }

    /// Append a message
    ///
    /// Non-blocking and safe from any thread. Never fails: the mailbox is
    /// unbounded.
    pub fn post(&self, msg: M) {
        let mut queue = self.queue.lock().expect("mailbox lock poisoned");
        queue.push_back(msg);
        // Published while the lock is held so a dequeuer that observes the
        // new length also observes the message.
        self.len.store(queue.len(), Ordering::SeqCst);
        self.posted_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Remove the head message, if present
    pub fn dequeue(&self) -> Option<M> {
        let mut queue = self.queue.lock().expect("mailbox lock poisoned");
        let msg = queue.pop_front();
        if msg.is_some() {
            self.len.store(queue.len(), Ordering::SeqCst);
            self.dequeued_count.fetch_add(1, Ordering::Relaxed);
        }
        msg
    }

    /// Non-blocking snapshot: does the mailbox hold any messages?
    pub fn has_messages(&self) -> bool {
        self.len.load(Ordering::SeqCst) > 0
    }

    /// Number of pending messages
    pub fn len(&self) -> usize {
        self.len.load(Ordering::SeqCst)
    }

    /// Whether the mailbox is empty
    pub fn is_empty(&self) -> bool {
        !self.has_messages()
    }

    /// Remove and return all pending messages
    ///
    /// Used when an actor is removed with messages still queued.
    pub fn drain(&self) -> Vec<M> {
        let mut queue = self.queue.lock().expect("mailbox lock poisoned");
        let drained: Vec<M> = queue.drain(..).collect();
        self.len.store(0, Ordering::SeqCst);
        self.dequeued_count
            .fetch_add(drained.len() as u64, Ordering::Relaxed);
        drained
    }

    /// Total messages posted since creation
    pub fn posted_count(&self) -> u64 {
        self.posted_count.load(Ordering::Relaxed)
    }

    /// Total messages dequeued since creation
    pub fn dequeued_count(&self) -> u64 {
        self.dequeued_count.load(Ordering::Relaxed)
    }
}

impl<M: Send> Default for Mailbox<M> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_mailbox_post_dequeue() {
        let mailbox = Mailbox::new();

        mailbox.post("m1");
        mailbox.post("m2");

        assert_eq!(mailbox.len(), 2);
        assert!(mailbox.has_messages());

        assert_eq!(mailbox.dequeue(), Some("m1"));
        assert_eq!(mailbox.dequeue(), Some("m2"));

        assert!(mailbox.is_empty());
        assert_eq!(mailbox.dequeue(), None);
    }

    #[test]
    fn test_mailbox_fifo_order() {
        let mailbox = Mailbox::new();

        for i in 0..10 {
            mailbox.post(i);
        }

        for i in 0..10 {
            assert_eq!(mailbox.dequeue(), Some(i));
        }
    }

    #[test]
    fn test_mailbox_counters() {
        let mailbox = Mailbox::new();

        assert_eq!(mailbox.posted_count(), 0);
        assert_eq!(mailbox.dequeued_count(), 0);

        mailbox.post(1);
        mailbox.post(2);
        assert_eq!(mailbox.posted_count(), 2);
        assert_eq!(mailbox.dequeued_count(), 0);

        mailbox.dequeue();
        assert_eq!(mailbox.dequeued_count(), 1);

        mailbox.dequeue();
        assert_eq!(mailbox.dequeued_count(), 2);
    }

    #[test]
    fn test_mailbox_drain() {
        let mailbox = Mailbox::new();

        mailbox.post(1);
        mailbox.post(2);
        mailbox.post(3);

        let drained = mailbox.drain();
        assert_eq!(drained, vec![1, 2, 3]);
        assert!(mailbox.is_empty());
        assert_eq!(mailbox.dequeued_count(), 3);
    }

    #[test]
    fn test_mailbox_cross_thread_posts_preserve_sender_order() {
        let mailbox = Arc::new(Mailbox::new());
        let mut handles = Vec::new();

        for sender in 0..4u64 {
            let mailbox = mailbox.clone();
            handles.push(std::thread::spawn(move || {
                for seq in 0..100u64 {
                    mailbox.post((sender, seq));
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(mailbox.len(), 400);

        // Per-sender sequence numbers must come out ascending.
        let mut last_seq = [None::<u64>; 4];
        while let Some((sender, seq)) = mailbox.dequeue() {
            if let Some(prev) = last_seq[sender as usize] {
                assert!(seq > prev, "sender {} reordered: {} after {}", sender, seq, prev);
            }
            last_seq[sender as usize] = Some(seq);
        }
    }
}
