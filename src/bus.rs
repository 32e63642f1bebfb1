// SPDX-License-Identifier: GPL-3.0-only

//! Shared control bus handshake
//!
//! The camera sensor sits on a serial control bus that another peripheral
//! driver may already own. The camera subsystem must acquire the existing
//! handle, never create its own bus instance, so initialization ordering
//! matters: the peer driver comes up first.

use tracing::debug;

/// Opaque handle to the shared control bus, handed out by the owning
/// peripheral driver. Cloning the handle does not transfer ownership.
#[derive(Debug, Clone)]
pub struct BusHandle {
    owner: String,
}

impl BusHandle {
    /// Name of the peripheral driver that initialized the bus
    pub fn owner(&self) -> &str {
        &self.owner
    }
}

/// Source of the shared control bus handle.
///
/// Implemented by whichever component models the peer peripheral driver.
/// Returning `None` means the bus has not been initialized yet and camera
/// init must fail with `ResourceUnavailable`.
pub trait BusProvider {
    fn acquire_shared_bus(&self) -> Option<BusHandle>;
}

/// A control bus that has already been claimed by a peer peripheral driver
pub struct SharedBus {
    handle: BusHandle,
}

impl SharedBus {
    /// Model a bus brought up by the named peer driver
    pub fn claimed_by(owner: &str) -> Self {
        debug!(owner, "Shared control bus registered");
        Self {
            handle: BusHandle {
                owner: owner.to_string(),
            },
        }
    }
}

impl BusProvider for SharedBus {
    fn acquire_shared_bus(&self) -> Option<BusHandle> {
        Some(self.handle.clone())
    }
}

/// A bus provider for the case where no peer driver has initialized the bus
pub struct NoBus;

impl BusProvider for NoBus {
    fn acquire_shared_bus(&self) -> Option<BusHandle> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claimed_bus_is_acquirable() {
        let bus = SharedBus::claimed_by("display-driver");
        let handle = bus.acquire_shared_bus().expect("bus should be available");
        assert_eq!(handle.owner(), "display-driver");
    }

    #[test]
    fn test_unclaimed_bus_is_not_acquirable() {
        assert!(NoBus.acquire_shared_bus().is_none());
    }
}
