//! Device capability traits
//!
//! Devices are composed from small capabilities instead of a class
//! hierarchy. The buffer core never sees a device; devices only see the
//! producer side of the buffers they were handed at construction.

use crate::{ContractError, DeviceConfig, SourceId};

/// A device that runs its own acquisition thread.
///
/// # Example
///
/// ```ignore
/// let device: Box<dyn Acquirable> = make_device(&config, buffer)?;
/// device.start()?;
/// // ... consumers read from the buffer ...
/// device.stop();
/// ```
pub trait Acquirable: Send + Sync {
    /// Device id
    fn device_id(&self) -> &SourceId;

    /// Start the acquisition thread.
    ///
    /// Calling `start` on a running device is a no-op.
    fn start(&self) -> Result<(), ContractError>;

    /// Stop the acquisition thread and wait until no write is in flight.
    fn stop(&self);

    fn is_acquiring(&self) -> bool;
}

/// A device whose settings can be (re)applied between acquisition sessions.
pub trait Configurable {
    /// Apply a new configuration. Implementations reject this while acquiring.
    fn configure(&mut self, config: &DeviceConfig) -> Result<(), ContractError>;

    /// Currently applied configuration
    fn config(&self) -> &DeviceConfig;
}
