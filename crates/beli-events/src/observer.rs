//! Observer sinks.
//!
//! An [`Observer`] is anything that can accept one change frame without
//! blocking. The hub only knows the trait; the `WebSocket` layer plugs in
//! [`ChannelObserver`], whose receiving half is drained by the socket task.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::error::{HubError, check_capacity};

/// Why a frame could not be handed to an observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    /// The observer's buffer is full; it is not keeping up.
    #[error("observer buffer full")]
    Full,

    /// The observer has gone away.
    #[error("observer disconnected")]
    Closed,
}

/// A sink for change frames.
///
/// Implementations must not block: a slow consumer has to fail with
/// [`DeliveryError::Full`] rather than stall the dispatch loop.
pub trait Observer: Send + Sync {
    /// Hand one `"<offset>,<color>"` frame to the observer.
    ///
    /// # Errors
    ///
    /// Returns a [`DeliveryError`] if the frame could not be accepted. The
    /// hub unregisters the observer in response.
    fn deliver(&self, frame: Arc<str>) -> Result<(), DeliveryError>;
}

/// Largest accepted per-observer frame buffer.
pub const MAX_OBSERVER_BUFFER: usize = 1 << 16;

/// Observer backed by a bounded channel.
///
/// Dropping the observer (for example when the hub unregisters it) closes
/// the channel, which tells the consuming task to shut down.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::Sender<Arc<str>>,
}

impl ChannelObserver {
    /// Create an observer with room for `buffer` undelivered frames.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::ZeroCapacity`] if `buffer` is zero, or
    /// [`HubError::CapacityTooLarge`] if it exceeds [`MAX_OBSERVER_BUFFER`].
    pub fn channel(buffer: usize) -> Result<(Self, mpsc::Receiver<Arc<str>>), HubError> {
        check_capacity("observer buffer", buffer, MAX_OBSERVER_BUFFER)?;
        let (tx, rx) = mpsc::channel(buffer);
        Ok((Self { tx }, rx))
    }
}

impl Observer for ChannelObserver {
    fn deliver(&self, frame: Arc<str>) -> Result<(), DeliveryError> {
        self.tx.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DeliveryError::Full,
            mpsc::error::TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }
}
