//! Write-path handoff and the dispatch loop.
//!
//! [`ChangeQueue::publish`] never waits: it pushes the event onto a bounded
//! [`tokio::sync::broadcast`] ring with exactly one receiver, the dispatch
//! loop. When the loop falls behind by more than the capacity, the ring
//! overwrites the oldest events and the loop is told how many it missed,
//! which gives a drop-oldest policy.
//!
//! The ring's size is the configured capacity rounded up to the next power
//! of two, so a capacity of 1000 keeps up to 1024 undispatched events.
//!
//! The loop ends once every [`ChangeQueue`] clone has been dropped and the
//! remaining events have been broadcast.

use std::sync::Arc;

use beli_types::ChangeEvent;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{HubError, check_capacity};
use crate::hub::NotificationHub;

/// Producer side of the change queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ChangeQueue {
    tx: broadcast::Sender<ChangeEvent>,
}

impl ChangeQueue {
    /// Enqueue `event` for broadcast.
    ///
    /// Returns `false` if the dispatch loop is no longer running, in which
    /// case the event is discarded.
    pub fn publish(&self, event: ChangeEvent) -> bool {
        // send only fails when the receiver (the dispatch loop) is gone.
        self.tx.send(event).is_ok()
    }
}

/// Largest accepted change-queue capacity. The ring is allocated up front.
pub const MAX_QUEUE_CAPACITY: usize = 1 << 20;

/// Number of events the ring actually holds for a given `capacity`.
pub const fn ring_size(capacity: usize) -> usize {
    match capacity.checked_next_power_of_two() {
        Some(size) => size,
        None => capacity,
    }
}

/// Counters reported by the dispatch loop when it exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Events broadcast to the hub.
    pub dispatched: u64,
    /// Events overwritten before the loop could read them.
    pub dropped: u64,
}

/// Start the dispatch loop on a background Tokio task.
///
/// `capacity` bounds how many undispatched events may queue up before the
/// oldest ones are dropped. The bound is rounded up to a power of two, see
/// [`ring_size`].
///
/// # Errors
///
/// Returns [`HubError::ZeroCapacity`] if `capacity` is zero, or
/// [`HubError::CapacityTooLarge`] if it exceeds [`MAX_QUEUE_CAPACITY`].
pub fn spawn_dispatcher(
    hub: Arc<NotificationHub>,
    capacity: usize,
) -> Result<(ChangeQueue, JoinHandle<DispatchStats>), HubError> {
    check_capacity("change queue", capacity, MAX_QUEUE_CAPACITY)?;
    let (tx, rx) = broadcast::channel(capacity);
    let handle = tokio::spawn(dispatch_loop(hub, rx));
    info!(capacity, ring = ring_size(capacity), "Change dispatcher started");
    Ok((ChangeQueue { tx }, handle))
}

async fn dispatch_loop(
    hub: Arc<NotificationHub>,
    mut rx: broadcast::Receiver<ChangeEvent>,
) -> DispatchStats {
    let mut stats = DispatchStats::default();
    loop {
        match rx.recv().await {
            Ok(event) => {
                let delivered = hub.broadcast(&event);
                stats.dispatched = stats.dispatched.saturating_add(1);
                debug!(
                    offset = event.offset,
                    color = event.color,
                    delivered,
                    "Change broadcast"
                );
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                stats.dropped = stats.dropped.saturating_add(skipped);
                warn!(skipped, "Change queue overflowed, dropped oldest events");
            }
            Err(broadcast::error::RecvError::Closed) => {
                info!(
                    dispatched = stats.dispatched,
                    dropped = stats.dropped,
                    "Change dispatcher stopped"
                );
                return stats;
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use beli_types::ObserverId;

    use super::*;
    use crate::observer::ChannelObserver;

    #[tokio::test]
    async fn published_events_reach_observers() {
        let hub = Arc::new(NotificationHub::new());
        let (observer, mut rx) = ChannelObserver::channel(16).unwrap();
        hub.register(ObserverId::new(), Arc::new(observer));

        let (queue, handle) = spawn_dispatcher(Arc::clone(&hub), 16).unwrap();
        assert!(queue.publish(ChangeEvent::new(23, 200)));
        assert!(queue.publish(ChangeEvent::new(0, 1)));

        let first = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await.unwrap();
        let second = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await.unwrap();
        assert_eq!(first.as_deref(), Some("23,200"));
        assert_eq!(second.as_deref(), Some("0,1"));

        drop(queue);
        let stats = handle.await.unwrap();
        assert_eq!(stats, DispatchStats { dispatched: 2, dropped: 0 });
    }

    #[tokio::test(flavor = "current_thread")]
    async fn overflow_drops_oldest_events() {
        let hub = Arc::new(NotificationHub::new());
        let (observer, mut rx) = ChannelObserver::channel(64).unwrap();
        hub.register(ObserverId::new(), Arc::new(observer));

        let (queue, handle) = spawn_dispatcher(Arc::clone(&hub), 4).unwrap();
        // On a current-thread runtime the dispatcher cannot run until we
        // yield, so all ten events pile up in a ring of four.
        for offset in 0..10 {
            assert!(queue.publish(ChangeEvent::new(offset, 1)));
        }
        drop(queue);

        let stats = handle.await.unwrap();
        assert_eq!(stats, DispatchStats { dispatched: 4, dropped: 6 });

        let mut frames = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            frames.push(frame.to_string());
        }
        assert_eq!(frames, vec!["6,1", "7,1", "8,1", "9,1"]);
    }

    #[tokio::test]
    async fn publish_after_dispatcher_exit_reports_false() {
        let hub = Arc::new(NotificationHub::new());
        let (queue, handle) = spawn_dispatcher(hub, 4).unwrap();
        handle.abort();
        let _ = handle.await;
        assert!(!queue.publish(ChangeEvent::new(1, 1)));
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let hub = Arc::new(NotificationHub::new());
        assert!(matches!(
            spawn_dispatcher(hub, 0),
            Err(HubError::ZeroCapacity(_))
        ));
    }

    #[test]
    fn oversized_capacity_is_rejected() {
        for capacity in [MAX_QUEUE_CAPACITY.saturating_add(1), usize::MAX] {
            let hub = Arc::new(NotificationHub::new());
            assert!(matches!(
                spawn_dispatcher(hub, capacity),
                Err(HubError::CapacityTooLarge { max: MAX_QUEUE_CAPACITY, .. })
            ));
        }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn capacity_rounds_up_to_power_of_two() {
        assert_eq!(ring_size(3), 4);
        assert_eq!(ring_size(4), 4);
        assert_eq!(ring_size(1000), 1024);

        let hub = Arc::new(NotificationHub::new());
        let (queue, handle) = spawn_dispatcher(hub, 3).unwrap();
        for offset in 0..10 {
            assert!(queue.publish(ChangeEvent::new(offset, 1)));
        }
        drop(queue);

        let stats = handle.await.unwrap();
        assert_eq!(stats, DispatchStats { dispatched: 4, dropped: 6 });
    }
}
