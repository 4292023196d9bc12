//! Application layer of the host.
//!
//! # What lives here? (for beginners)
//!
//! This layer holds the rules of a controller session without touching any
//! socket or driver.  It talks to the outside world only through traits,
//! which the infrastructure layer implements:
//!
//! - **`virtual_gamepad`** – The [`VirtualGamepad`](virtual_gamepad::VirtualGamepad)
//!   and [`GamepadBackend`](virtual_gamepad::GamepadBackend) traits plus
//!   [`DeviceError`](virtual_gamepad::DeviceError).  uinput, vJoy and the
//!   mock backend all sit behind them.
//!
//! - **`session`** – The peer-binding state machine.  It classifies each
//!   datagram, applies state frames to the device, renegotiates layouts and
//!   times out a silent peer.  Because it receives bytes and timestamps as
//!   plain arguments, every transition is unit-tested without a network.

pub mod session;
pub mod virtual_gamepad;
