//! # Death Notification
//!
//! A remote object dies when the process serving it goes away. Every recipient
//! registered before that moment hears about it exactly once.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use dashmap::DashMap;
use tracing::debug;

/// Receives the death of a remote object.
pub trait DeathRecipient: Send + Sync {
    fn on_remote_died(&self);
}

/// The registrations of one remote object.
///
/// Once [`notify`](Self::notify) has run the notifier is inert: new registrations
/// are refused and later calls deliver nothing.
#[derive(Default)]
pub struct DeathNotifier {
    dead: AtomicBool,
    recipients: DashMap<usize, Arc<dyn DeathRecipient>>,
}

impl DeathNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dead(&self) -> bool {
        self.dead.load(Ordering::Acquire)
    }

    /// Returns `false` if the object is already dead.
    pub fn add(&self, recipient: Arc<dyn DeathRecipient>) -> bool {
        if self.is_dead() {
            return false;
        }
        let key = key_of(&recipient);
        self.recipients.insert(key, recipient);

        // Lost a race with notify: deliver here if it did not.
        if self.is_dead() {
            if let Some((_, recipient)) = self.recipients.remove(&key) {
                recipient.on_remote_died();
            }
        }
        true
    }

    pub fn remove(&self, recipient: &Arc<dyn DeathRecipient>) -> bool {
        self.recipients.remove(&key_of(recipient)).is_some()
    }

    /// Marks the object dead and notifies every registered recipient.
    ///
    /// Returns how many recipients this call notified; zero on every call after
    /// the first.
    pub fn notify(&self) -> usize {
        if self.dead.swap(true, Ordering::AcqRel) {
            return 0;
        }
        let keys: Vec<usize> = self.recipients.iter().map(|e| *e.key()).collect();
        let mut delivered = 0;
        for key in keys {
            // Removal hands each recipient to exactly one caller.
            if let Some((_, recipient)) = self.recipients.remove(&key) {
                recipient.on_remote_died();
                delivered += 1;
            }
        }
        debug!(delivered, "remote object died");
        delivered
    }

    pub fn len(&self) -> usize {
        self.recipients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipients.is_empty()
    }
}

fn key_of(recipient: &Arc<dyn DeathRecipient>) -> usize {
    Arc::as_ptr(recipient) as *const () as usize
}
