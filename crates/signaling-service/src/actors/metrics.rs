//! Router mailbox monitoring.
//!
//! The router is the single serialization point for every socket, so its
//! queue depth is the first signal that the relay is falling behind:
//!
//! | Depth       | Level    |
//! |-------------|----------|
//! | <= 100      | Normal   |
//! | 101-500     | Warning  |
//! | > 500       | Critical |

use crate::observability::metrics::set_actor_mailbox_depth;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tracing::{debug, warn};

/// Mailbox depth thresholds for the router actor.
pub const ROUTER_MAILBOX_NORMAL: usize = 100;
pub const ROUTER_MAILBOX_WARNING: usize = 500;

/// Mailbox depth level for alerting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailboxLevel {
    /// At or below normal threshold.
    Normal,
    /// Between normal and warning thresholds.
    Warning,
    /// Above warning threshold.
    Critical,
}

/// Tracks queue depth and throughput for one actor.
#[derive(Debug)]
pub struct MailboxMonitor {
    /// Actor name for log fields.
    actor: &'static str,
    /// Depth observed at the last dequeue.
    depth: AtomicUsize,
    /// Highest depth observed since the last reset.
    peak_depth: AtomicUsize,
    /// Total messages processed.
    messages_processed: AtomicU64,
}

impl MailboxMonitor {
    #[must_use]
    pub fn new(actor: &'static str) -> Self {
        Self {
            actor,
            depth: AtomicUsize::new(0),
            peak_depth: AtomicUsize::new(0),
            messages_processed: AtomicU64::new(0),
        }
    }

    /// Record the number of messages still queued behind the one being handled.
    pub fn record_depth(&self, depth: usize) {
        let previous = self.depth.swap(depth, Ordering::Relaxed);
        self.peak_depth.fetch_max(depth, Ordering::Relaxed);
        set_actor_mailbox_depth(depth);

        match Self::level_for_depth(depth) {
            MailboxLevel::Critical => {
                warn!(
                    target: "signaling.actor.mailbox",
                    actor = self.actor,
                    depth = depth,
                    threshold = ROUTER_MAILBOX_WARNING,
                    "Mailbox depth critical"
                );
            }
            MailboxLevel::Warning if previous <= ROUTER_MAILBOX_NORMAL => {
                // Log once when crossing into the warning band
                debug!(
                    target: "signaling.actor.mailbox",
                    actor = self.actor,
                    depth = depth,
                    "Mailbox depth elevated"
                );
            }
            _ => {}
        }
    }

    /// Record a message as fully handled.
    pub fn record_processed(&self) {
        self.messages_processed.fetch_add(1, Ordering::Relaxed);
    }

    #[cfg(test)]
    pub fn current_depth(&self) -> usize {
        self.depth.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn peak_depth(&self) -> usize {
        self.peak_depth.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn messages_processed(&self) -> u64 {
        self.messages_processed.load(Ordering::Relaxed)
    }

    #[cfg(test)]
    pub fn current_level(&self) -> MailboxLevel {
        Self::level_for_depth(self.current_depth())
    }

    /// Reset peak depth to the current depth.
    #[cfg(test)]
    pub fn reset_peak(&self) {
        self.peak_depth
            .store(self.current_depth(), Ordering::Relaxed);
    }

    fn level_for_depth(depth: usize) -> MailboxLevel {
        if depth > ROUTER_MAILBOX_WARNING {
            MailboxLevel::Critical
        } else if depth > ROUTER_MAILBOX_NORMAL {
            MailboxLevel::Warning
        } else {
            MailboxLevel::Normal
        }
    }
}
