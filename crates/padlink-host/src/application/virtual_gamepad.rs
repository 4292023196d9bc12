//! The virtual gamepad seam between the session and the OS.
//!
//! The session only knows these two traits.  Each platform provides a
//! [`GamepadBackend`] in the infrastructure layer that builds a
//! [`VirtualGamepad`] for a negotiated layout.

use padlink_core::{Capability, ControlValue, Layout};
use thiserror::Error;

/// Error type for virtual gamepad construction and I/O.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// A controller with the requested name already exists on this host.
    #[error("device name {0:?} is already taken by another controller")]
    NameTaken(String),

    /// The OS virtual input facility is missing or not accessible.
    #[error("virtual input driver unavailable: {0}")]
    DriverUnavailable(String),

    /// The layout exceeds what the driver can expose.
    #[error("layout not supported by this driver: {0}")]
    UnsupportedLayout(String),

    /// `set_value` was called for a capability the device was not built with.
    #[error("capability {0} is not registered on this device")]
    UnregisteredCapability(Capability),

    /// Writing to the driver failed.
    #[error("device I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A virtual game controller exposing a fixed capability list.
///
/// Values set with [`set_value`](Self::set_value) become visible to the OS
/// no later than the next [`commit`](Self::commit).
pub trait VirtualGamepad: Send {
    /// Capabilities in registration order.
    fn capabilities(&self) -> &[Capability];

    /// Updates one control.
    fn set_value(&mut self, capability: Capability, value: ControlValue)
        -> Result<(), DeviceError>;

    /// Publishes all values set since the previous commit as one report.
    fn commit(&mut self) -> Result<(), DeviceError>;

    /// Returns the device to the OS.  Calling it twice is a no-op.
    fn release(&mut self) -> Result<(), DeviceError>;
}

/// Factory for virtual gamepads, selected once at process start.
pub trait GamepadBackend: Send {
    /// Builds a device exposing exactly `layout`'s capabilities.
    fn create(&mut self, layout: &Layout) -> Result<Box<dyn VirtualGamepad>, DeviceError>;

    /// Short human-readable driver name for logs.
    fn driver_name(&self) -> &'static str;
}
