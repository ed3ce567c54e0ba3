//! Change notification for the Beli canvas.
//!
//! Every committed cell write produces a [`ChangeEvent`]. The write path
//! hands it to a bounded [`ChangeQueue`] and returns immediately; a single
//! dispatch task drains the queue and fans each event out to every
//! registered [`Observer`] through the [`NotificationHub`].
//!
//! ```text
//! write path --publish--> ChangeQueue (bounded, drop-oldest)
//!                              |
//!                        dispatch loop
//!                              |
//!                      NotificationHub::broadcast
//!                        |      |      |
//!                      obs A  obs B  obs C   (failures unregister)
//! ```
//!
//! There is no replay: an observer only sees events broadcast while it is
//! registered, and events published while the queue is saturated may be
//! dropped (oldest first).
//!
//! [`ChangeEvent`]: beli_types::ChangeEvent

pub mod dispatch;
pub mod error;
pub mod hub;
pub mod observer;

// Re-export primary types for convenience.
pub use dispatch::{ChangeQueue, DispatchStats, MAX_QUEUE_CAPACITY, ring_size, spawn_dispatcher};
pub use error::HubError;
pub use hub::NotificationHub;
pub use observer::{ChannelObserver, DeliveryError, MAX_OBSERVER_BUFFER, Observer};
