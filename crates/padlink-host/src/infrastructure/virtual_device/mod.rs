//! Virtual gamepad backends.
//!
//! | Backend        | Platform | Model                                    |
//! |----------------|----------|------------------------------------------|
//! | `UInputBackend`| Linux    | direct-emit: one event per value + sync  |
//! | `VJoyBackend`  | Windows  | batched-register: one record per frame   |
//! | `MockBackend`  | any      | records everything, emits nothing        |
//!
//! [`make_backend`] picks the platform backend at compile time.

pub mod direct_emit;
pub mod mock;
pub mod register;

#[cfg(target_os = "linux")]
pub mod uinput;

#[cfg(target_os = "windows")]
pub mod vjoy;

use serde::{Deserialize, Serialize};

use crate::application::virtual_gamepad::{DeviceError, GamepadBackend};

pub use mock::{MockBackend, MockRecord};

/// Which backend to build devices with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// uinput on Linux, vJoy on Windows.
    #[default]
    Platform,
    /// Recording backend; no OS device is created.
    Mock,
}

/// Full device name for a service name and id, e.g. `"Yoke-1"`.
pub fn device_name(name: &str, id: u8) -> String {
    format!("{name}-{id}")
}

/// Builds the backend for `kind`.
///
/// # Errors
///
/// Returns [`DeviceError::DriverUnavailable`] when `kind` is
/// [`BackendKind::Platform`] on an OS without a virtual gamepad driver.
pub fn make_backend(
    kind: BackendKind,
    name: &str,
    id: u8,
) -> Result<Box<dyn GamepadBackend>, DeviceError> {
    match kind {
        BackendKind::Mock => Ok(Box::new(MockBackend::new(device_name(name, id)))),
        BackendKind::Platform => platform_backend(name, id),
    }
}

#[cfg(target_os = "linux")]
fn platform_backend(name: &str, id: u8) -> Result<Box<dyn GamepadBackend>, DeviceError> {
    Ok(Box::new(uinput::UInputBackend::new(device_name(name, id))))
}

#[cfg(target_os = "windows")]
fn platform_backend(_name: &str, id: u8) -> Result<Box<dyn GamepadBackend>, DeviceError> {
    Ok(Box::new(vjoy::VJoyBackend::new(id)))
}

#[cfg(not(any(target_os = "linux", target_os = "windows")))]
fn platform_backend(_name: &str, _id: u8) -> Result<Box<dyn GamepadBackend>, DeviceError> {
    Err(DeviceError::DriverUnavailable(format!(
        "no virtual gamepad driver on {}",
        std::env::consts::OS
    )))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
