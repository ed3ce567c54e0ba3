//! Error types for the notification layer.
//!
//! Delivery failures are never surfaced to writers; only setup mistakes
//! produce a [`HubError`].

/// Errors that can occur when setting up change dispatch.
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    /// A queue or buffer was configured with zero capacity.
    #[error("{0} capacity must be at least 1")]
    ZeroCapacity(&'static str),

    /// A queue or buffer was configured larger than supported.
    #[error("{what} capacity {requested} exceeds the maximum of {max}")]
    CapacityTooLarge {
        /// Which queue or buffer.
        what: &'static str,
        /// The configured value.
        requested: usize,
        /// Largest accepted value.
        max: usize,
    },
}

/// Check `requested` lies in `1..=max`.
pub(crate) const fn check_capacity(
    what: &'static str,
    requested: usize,
    max: usize,
) -> Result<(), HubError> {
    if requested == 0 {
        Err(HubError::ZeroCapacity(what))
    } else if requested > max {
        Err(HubError::CapacityTooLarge {
            what,
            requested,
            max,
        })
    } else {
        Ok(())
    }
}
