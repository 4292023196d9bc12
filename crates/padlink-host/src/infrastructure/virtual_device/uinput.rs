//! Linux `uinput` backend for the direct-emit gamepad.
//!
//! Opens `/dev/uinput`, registers every axis and button of the layout and
//! creates a device that identifies itself as an Xbox 360 pad on the USB bus,
//! which most games and SDL map out of the box.
//!
//! # Permissions (for beginners)
//!
//! `/dev/uinput` is usually only writable by root.  Either run the host as
//! root, or add a udev rule granting your user access, e.g.
//!
//! ```text
//! KERNEL=="uinput", MODE="0660", GROUP="input", OPTIONS+="static_node=uinput"
//! ```
//!
//! A missing or inaccessible `/dev/uinput` is reported as
//! [`DeviceError::DriverUnavailable`].

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use input_linux::{
    sys, AbsoluteAxis, AbsoluteInfo, AbsoluteInfoSetup, EventKind, InputId, Key, UInputHandle,
};
use padlink_core::Layout;
use tracing::{info, warn};

use super::direct_emit::{ensure_name_free, DirectEmitGamepad, EventSink, Registration, SYSFS_INPUT};
use crate::application::virtual_gamepad::{DeviceError, GamepadBackend, VirtualGamepad};

/// Default uinput device node.
pub const UINPUT_PATH: &str = "/dev/uinput";

// see usb ids: http://www.linux-usb.org/usb.ids
const BUS_USB: u16 = 0x03;
const VENDOR_MICROSOFT: u16 = 0x045e;
const PRODUCT_XBOX360: u16 = 0x028e;
const VERSION: u16 = 0x0110;

/// An open, created uinput device.
pub struct UInputSink {
    handle: UInputHandle<File>,
    destroyed: bool,
}

impl UInputSink {
    /// Opens `path` and creates a device for `registration`.
    ///
    /// # Errors
    ///
    /// - [`DeviceError::DriverUnavailable`] if `path` is missing or not writable.
    /// - [`DeviceError::UnsupportedLayout`] if a code is outside the kernel's range.
    /// - [`DeviceError::Io`] for any other ioctl failure.
    pub fn create(path: &Path, registration: &Registration) -> Result<Self, DeviceError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => {
                    DeviceError::DriverUnavailable(format!("{}: {e}", path.display()))
                }
                _ => DeviceError::Io(e),
            })?;
        let handle = UInputHandle::new(file);

        let (minimum, maximum) = registration.axis_range;
        let mut setups = Vec::with_capacity(registration.axes.len());
        if !registration.axes.is_empty() {
            handle.set_evbit(EventKind::Absolute)?;
            for &code in &registration.axes {
                let axis = AbsoluteAxis::from_code(code).map_err(|_| {
                    DeviceError::UnsupportedLayout(format!("axis code 0x{code:02x}"))
                })?;
                handle.set_absbit(axis)?;
                setups.push(AbsoluteInfoSetup {
                    axis,
                    info: AbsoluteInfo {
                        value: 0,
                        minimum,
                        maximum,
                        fuzz: 0,
                        flat: 0,
                        resolution: 0,
                    },
                });
            }
        }
        if !registration.keys.is_empty() {
            handle.set_evbit(EventKind::Key)?;
            for &code in &registration.keys {
                let key = Key::from_code(code).map_err(|_| {
                    DeviceError::UnsupportedLayout(format!("button code 0x{code:03x}"))
                })?;
                handle.set_keybit(key)?;
            }
        }

        let id = InputId {
            bustype: BUS_USB,
            vendor: VENDOR_MICROSOFT,
            product: PRODUCT_XBOX360,
            version: VERSION,
        };
        handle.create(&id, registration.name.as_bytes(), 0, &setups)?;

        Ok(Self {
            handle,
            destroyed: false,
        })
    }

    fn write_all(&self, events: &[sys::input_event]) -> io::Result<()> {
        let mut written = 0;
        while written < events.len() {
            written += self.handle.write(&events[written..])?;
        }
        Ok(())
    }
}

impl EventSink for UInputSink {
    fn emit(&mut self, kind: u16, code: u16, value: i32) -> io::Result<()> {
        self.write_all(&[sys::input_event {
            time: sys::timeval {
                tv_sec: 0,
                tv_usec: 0,
            },
            type_: kind,
            code,
            value,
        }])
    }

    fn destroy(&mut self) -> io::Result<()> {
        if self.destroyed {
            return Ok(());
        }
        self.destroyed = true;
        self.handle.dev_destroy()
    }
}

impl Drop for UInputSink {
    fn drop(&mut self) {
        if let Err(err) = self.destroy() {
            warn!("failed to destroy uinput device: {err}");
        }
    }
}

/// Builds direct-emit gamepads on `/dev/uinput`.
#[derive(Debug, Clone)]
pub struct UInputBackend {
    device_name: String,
    uinput_path: PathBuf,
    sysfs_input: PathBuf,
}

impl UInputBackend {
    /// `device_name` is the full name, e.g. `"Yoke-1"`.
    pub fn new(device_name: impl Into<String>) -> Self {
        Self {
            device_name: device_name.into(),
            uinput_path: PathBuf::from(UINPUT_PATH),
            sysfs_input: PathBuf::from(SYSFS_INPUT),
        }
    }
}

impl GamepadBackend for UInputBackend {
    fn create(&mut self, layout: &Layout) -> Result<Box<dyn VirtualGamepad>, DeviceError> {
        ensure_name_free(&self.sysfs_input, &self.device_name)?;
        let registration = Registration::for_layout(self.device_name.clone(), layout);
        let sink = UInputSink::create(&self.uinput_path, &registration)?;
        info!(
            "uinput device {:?} created: {} axes, {} buttons",
            registration.name,
            registration.axes.len(),
            registration.keys.len()
        );
        Ok(Box::new(DirectEmitGamepad::new(layout, sink)))
    }

    fn driver_name(&self) -> &'static str {
        "uinput"
    }
}
