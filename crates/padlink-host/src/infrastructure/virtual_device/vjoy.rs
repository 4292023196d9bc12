//! Windows vJoy backend for the batched-register gamepad.
//!
//! `vJoyInterface.dll` ships with the vJoy driver.  It is loaded at runtime
//! with `LoadLibraryW` so the host still starts on machines without vJoy and
//! reports [`DeviceError::DriverUnavailable`] only when a device is needed.
//!
//! The device id (1..=16) must be enabled in the "Configure vJoy" tool with
//! at least as many axes and buttons as the layouts you intend to use.

#![cfg(target_os = "windows")]

use std::ffi::c_void;

use padlink_core::Layout;
use tracing::{info, warn};
use windows::core::{s, w, PCSTR};
use windows::Win32::Foundation::{FreeLibrary, HMODULE};
use windows::Win32::System::LibraryLoader::{GetProcAddress, LoadLibraryW};

use super::register::{JoystickPosition, RegisterDriver, RegisterGamepad, SlotMap};
use crate::application::virtual_gamepad::{DeviceError, GamepadBackend, VirtualGamepad};

type EnabledFn = unsafe extern "C" fn() -> i32;
type DeviceFn = unsafe extern "C" fn(u32) -> i32;
type UpdateFn = unsafe extern "C" fn(u32, *mut c_void) -> i32;

/// The loaded DLL and the four entry points we use.
struct VJoyLibrary {
    module: HMODULE,
    enabled: EnabledFn,
    acquire: DeviceFn,
    relinquish: DeviceFn,
    update: UpdateFn,
}

// SAFETY: the module handle is process-global and the vJoy entry points may
// be called from any thread.
unsafe impl Send for VJoyLibrary {}

impl VJoyLibrary {
    fn load() -> Result<Self, DeviceError> {
        // SAFETY: the argument is a valid, NUL-terminated wide string.
        let module = unsafe { LoadLibraryW(w!("vJoyInterface.dll")) }
            .map_err(|e| DeviceError::DriverUnavailable(format!("vJoyInterface.dll: {e}")))?;

        let library = (|| {
            // SAFETY: each symbol is transmuted to the signature published in
            // the vJoy SDK's `vjoyinterface.h`.
            unsafe {
                Ok(Self {
                    module,
                    enabled: std::mem::transmute(symbol(module, s!("vJoyEnabled"))?),
                    acquire: std::mem::transmute(symbol(module, s!("AcquireVJD"))?),
                    relinquish: std::mem::transmute(symbol(module, s!("RelinquishVJD"))?),
                    update: std::mem::transmute(symbol(module, s!("UpdateVJD"))?),
                })
            }
        })();
        if library.is_err() {
            // SAFETY: `module` came from `LoadLibraryW` above and is not used again.
            unsafe {
                let _ = FreeLibrary(module);
            }
        }
        library
    }
}

impl Drop for VJoyLibrary {
    fn drop(&mut self) {
        // SAFETY: `module` came from `LoadLibraryW` and no entry point
        // outlives `self`.
        if let Err(err) = unsafe { FreeLibrary(self.module) } {
            warn!("failed to unload vJoyInterface.dll: {err}");
        }
    }
}

fn symbol(
    module: HMODULE,
    name: PCSTR,
) -> Result<unsafe extern "system" fn() -> isize, DeviceError> {
    // SAFETY: `module` is a loaded library and `name` is NUL-terminated.
    unsafe { GetProcAddress(module, name) }.ok_or_else(|| {
        // SAFETY: `name` comes from the `s!` macro.
        let name = unsafe { name.to_string() }.unwrap_or_default();
        DeviceError::DriverUnavailable(format!("vJoyInterface.dll lacks {name}"))
    })
}

/// A vJoy device acquired for one layout.
pub struct VJoyDriver {
    library: VJoyLibrary,
    device_id: u32,
}

impl VJoyDriver {
    fn acquire(library: VJoyLibrary, device_id: u32) -> Result<Self, DeviceError> {
        // SAFETY: entry points were resolved by `VJoyLibrary::load`.
        if unsafe { (library.enabled)() } == 0 {
            return Err(DeviceError::DriverUnavailable(
                "vJoy is installed but disabled".into(),
            ));
        }
        // SAFETY: as above.
        if unsafe { (library.acquire)(device_id) } == 0 {
            return Err(DeviceError::NameTaken(format!("vJoy device {device_id}")));
        }
        Ok(Self { library, device_id })
    }
}

impl RegisterDriver for VJoyDriver {
    fn update(&mut self, position: &JoystickPosition) -> Result<(), DeviceError> {
        let mut record = *position;
        // SAFETY: `record` is a `#[repr(C)]` JOYSTICK_POSITION_V2 that lives
        // for the whole call.
        let ok = unsafe {
            (self.library.update)(self.device_id, (&mut record as *mut JoystickPosition).cast())
        };
        if ok == 0 {
            return Err(DeviceError::Io(std::io::Error::other(format!(
                "UpdateVJD({}) failed",
                self.device_id
            ))));
        }
        Ok(())
    }

    fn relinquish(&mut self) -> Result<(), DeviceError> {
        // SAFETY: the device was acquired in `VJoyDriver::acquire`.
        unsafe { (self.library.relinquish)(self.device_id) };
        Ok(())
    }
}

/// Builds batched-register gamepads on a vJoy device id.
#[derive(Debug, Clone)]
pub struct VJoyBackend {
    device_id: u8,
}

impl VJoyBackend {
    pub fn new(device_id: u8) -> Self {
        Self { device_id }
    }
}

impl GamepadBackend for VJoyBackend {
    fn create(&mut self, layout: &Layout) -> Result<Box<dyn VirtualGamepad>, DeviceError> {
        let slots = SlotMap::assign(layout)?;
        let driver = VJoyDriver::acquire(VJoyLibrary::load()?, u32::from(self.device_id))?;
        info!(
            "vJoy device {} acquired: {} axes, {} buttons",
            self.device_id,
            slots.axis_count(),
            slots.button_count()
        );
        Ok(Box::new(RegisterGamepad::new(
            self.device_id,
            layout,
            slots,
            driver,
        )))
    }

    fn driver_name(&self) -> &'static str {
        "vjoy"
    }
}
