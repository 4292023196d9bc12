//! Batched-register gamepad: values accumulate in memory and are submitted
//! as one packed record per frame.
//!
//! This is how vJoy works on Windows.  A vJoy device has a fixed set of axis
//! slots and a 128-bit button field; it does not know Linux event codes.
//! Axes and buttons therefore get consecutive slots in layout order, and
//! every `commit` hands the whole [`JoystickPosition`] to the driver in one
//! call.
//!
//! # Value mapping
//!
//! vJoy axes range over `[1, 0x8000]`; 0 means "never set".  Wire values are
//! `[0, 0x7FFF]`, so the stored value is `wire + 1`.
//!
//! Buttons are OR-ed into the mask and the mask is cleared after every
//! commit.  Each frame carries every button, so a released button simply
//! does not set its bit in the next frame.

use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};
use padlink_core::{Capability, CapabilityKind, ControlValue, Layout};

use crate::application::virtual_gamepad::{DeviceError, VirtualGamepad};

/// Axis slots in the driver record.
pub const AXIS_SLOTS: usize = 15;
/// Axis slots the driver actually exposes (X, Y, Z, RX, RY, RZ, slider, dial).
pub const MAX_AXES: usize = 8;
/// Buttons the driver exposes.
pub const MAX_BUTTONS: usize = 128;
/// Hat value meaning "centered".
pub const HAT_CENTERED: u32 = u32::MAX;

/// The driver's `JOYSTICK_POSITION_V2` record, 108 bytes.
///
/// Field order and sizes follow the vJoy SDK's `public.h`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct JoystickPosition {
    pub device: u8,
    pub _padding: [u8; 3],
    /// Throttle, rudder and aileron; unused.
    pub unused: [i32; 3],
    pub axes: [i32; AXIS_SLOTS],
    /// Buttons 1..32.
    pub buttons: u32,
    pub hats: [u32; 4],
    /// Buttons 33..128 in three words.
    pub buttons_ex: [u32; 3],
}

/// Submits records to the driver.
pub trait RegisterDriver: Send {
    /// Sends one complete record.
    fn update(&mut self, position: &JoystickPosition) -> Result<(), DeviceError>;

    /// Returns the device id to the driver pool.  Called at most once.
    fn relinquish(&mut self) -> Result<(), DeviceError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Axis(usize),
    Button(u32),
}

/// Slot assignment for one layout.
///
/// Each distinct capability gets the next free slot of its kind, in
/// first-occurrence order; a repeated capability reuses its slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotMap {
    slots: HashMap<Capability, Slot>,
    axes: usize,
    buttons: usize,
}

impl SlotMap {
    /// # Errors
    ///
    /// Returns [`DeviceError::UnsupportedLayout`] if the layout has more than
    /// [`MAX_AXES`] distinct axes or [`MAX_BUTTONS`] distinct buttons.
    pub fn assign(layout: &Layout) -> Result<Self, DeviceError> {
        let mut map = Self {
            slots: HashMap::new(),
            axes: 0,
            buttons: 0,
        };
        for capability in layout.capabilities() {
            if map.slots.contains_key(capability) {
                continue;
            }
            let slot = match capability.kind {
                CapabilityKind::Axis => {
                    map.axes += 1;
                    Slot::Axis(map.axes - 1)
                }
                CapabilityKind::Button => {
                    map.buttons += 1;
                    Slot::Button((map.buttons - 1) as u32)
                }
            };
            map.slots.insert(*capability, slot);
        }

        if map.axes > MAX_AXES {
            return Err(DeviceError::UnsupportedLayout(format!(
                "{} axes, at most {MAX_AXES} supported",
                map.axes
            )));
        }
        if map.buttons > MAX_BUTTONS {
            return Err(DeviceError::UnsupportedLayout(format!(
                "{} buttons, at most {MAX_BUTTONS} supported",
                map.buttons
            )));
        }
        Ok(map)
    }

    pub fn axis_count(&self) -> usize {
        self.axes
    }

    pub fn button_count(&self) -> usize {
        self.buttons
    }
}

/// A [`VirtualGamepad`] accumulating values into a [`JoystickPosition`].
pub struct RegisterGamepad<D: RegisterDriver> {
    device_id: u8,
    capabilities: Vec<Capability>,
    slots: SlotMap,
    axes: [i32; AXIS_SLOTS],
    buttons: u128,
    driver: D,
    released: bool,
}

impl<D: RegisterDriver> RegisterGamepad<D> {
    /// Wraps a driver that has already acquired `device_id`.
    pub fn new(device_id: u8, layout: &Layout, slots: SlotMap, driver: D) -> Self {
        Self {
            device_id,
            capabilities: layout.capabilities().to_vec(),
            slots,
            axes: [0; AXIS_SLOTS],
            buttons: 0,
            driver,
            released: false,
        }
    }

    /// The record the next `commit` would submit.
    pub fn position(&self) -> JoystickPosition {
        JoystickPosition {
            device: self.device_id,
            _padding: [0; 3],
            unused: [0; 3],
            axes: self.axes,
            buttons: self.buttons as u32,
            hats: [HAT_CENTERED; 4],
            buttons_ex: [
                (self.buttons >> 32) as u32,
                (self.buttons >> 64) as u32,
                (self.buttons >> 96) as u32,
            ],
        }
    }
}

impl<D: RegisterDriver> VirtualGamepad for RegisterGamepad<D> {
    fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    fn set_value(
        &mut self,
        capability: Capability,
        value: ControlValue,
    ) -> Result<(), DeviceError> {
        let slot = self
            .slots
            .slots
            .get(&capability)
            .copied()
            .ok_or(DeviceError::UnregisteredCapability(capability))?;
        match (slot, value) {
            (Slot::Axis(index), ControlValue::Axis(v)) => self.axes[index] = i32::from(v) + 1,
            (Slot::Button(bit), ControlValue::Button(pressed)) => {
                self.buttons |= u128::from(pressed) << bit;
            }
            _ => return Err(DeviceError::UnregisteredCapability(capability)),
        }
        Ok(())
    }

    fn commit(&mut self) -> Result<(), DeviceError> {
        let position = self.position();
        self.driver.update(&position)?;
        self.buttons = 0;
        Ok(())
    }

    fn release(&mut self) -> Result<(), DeviceError> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        self.driver.relinquish()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
