//! Linux input event names and codes understood by the host.
//!
//! Values are those of `linux/input-event-codes.h`.  Reference:
//! https://github.com/torvalds/linux/blob/master/include/uapi/linux/input-event-codes.h
//!
//! # Why Linux names on every platform? (for beginners)
//!
//! The client describes its controls with names such as `ABS_X` (the
//! horizontal axis of the left stick) or `BTN_SOUTH` (the bottom face
//! button).  These come from the Linux kernel, which has the most complete
//! and stable naming scheme for game controllers.  On Linux the codes are
//! passed straight to `uinput`; on Windows only the *kind* (axis or button)
//! and the *order* matter, so the same names work there too.
//!
//! Several names can share one code.  `BTN_GAMEPAD`, `BTN_SOUTH` and `BTN_A`
//! are all 0x130.  The first entry for a code in [`CATALOGUE`] is its
//! canonical name.

use super::CapabilityKind;

/// Number of `BTN_TRIGGER_HAPPY<n>` buttons (1-based `n`).
pub const TRIGGER_HAPPY_COUNT: u16 = 40;

/// Code of `BTN_TRIGGER_HAPPY1`.
pub const BTN_TRIGGER_HAPPY1: u16 = 0x2c0;

const TRIGGER_HAPPY_PREFIX: &str = "BTN_TRIGGER_HAPPY";

/// Named codes.  `BTN_TRIGGER_HAPPY<n>` is computed, see [`lookup`].
pub const CATALOGUE: &[(&str, CapabilityKind, u16)] = &[
    // Absolute axes
    ("ABS_X", CapabilityKind::Axis, 0x00),
    ("ABS_Y", CapabilityKind::Axis, 0x01),
    ("ABS_Z", CapabilityKind::Axis, 0x02),
    ("ABS_RX", CapabilityKind::Axis, 0x03),
    ("ABS_RY", CapabilityKind::Axis, 0x04),
    ("ABS_RZ", CapabilityKind::Axis, 0x05),
    ("ABS_THROTTLE", CapabilityKind::Axis, 0x06),
    ("ABS_RUDDER", CapabilityKind::Axis, 0x07),
    ("ABS_WHEEL", CapabilityKind::Axis, 0x08),
    ("ABS_GAS", CapabilityKind::Axis, 0x09),
    ("ABS_BRAKE", CapabilityKind::Axis, 0x0a),
    ("ABS_HAT0X", CapabilityKind::Axis, 0x10),
    ("ABS_HAT0Y", CapabilityKind::Axis, 0x11),
    ("ABS_HAT1X", CapabilityKind::Axis, 0x12),
    ("ABS_HAT1Y", CapabilityKind::Axis, 0x13),
    ("ABS_HAT2X", CapabilityKind::Axis, 0x14),
    ("ABS_HAT2Y", CapabilityKind::Axis, 0x15),
    ("ABS_HAT3X", CapabilityKind::Axis, 0x16),
    ("ABS_HAT3Y", CapabilityKind::Axis, 0x17),
    ("ABS_PRESSURE", CapabilityKind::Axis, 0x18),
    ("ABS_DISTANCE", CapabilityKind::Axis, 0x19),
    ("ABS_TILT_X", CapabilityKind::Axis, 0x1a),
    ("ABS_TILT_Y", CapabilityKind::Axis, 0x1b),
    ("ABS_TOOL_WIDTH", CapabilityKind::Axis, 0x1c),
    ("ABS_VOLUME", CapabilityKind::Axis, 0x20),
    ("ABS_MISC", CapabilityKind::Axis, 0x28),
    // Joystick buttons
    ("BTN_TRIGGER", CapabilityKind::Button, 0x120),
    ("BTN_JOYSTICK", CapabilityKind::Button, 0x120),
    ("BTN_THUMB", CapabilityKind::Button, 0x121),
    ("BTN_THUMB2", CapabilityKind::Button, 0x122),
    ("BTN_TOP", CapabilityKind::Button, 0x123),
    ("BTN_TOP2", CapabilityKind::Button, 0x124),
    ("BTN_PINKIE", CapabilityKind::Button, 0x125),
    ("BTN_BASE", CapabilityKind::Button, 0x126),
    ("BTN_BASE2", CapabilityKind::Button, 0x127),
    ("BTN_BASE3", CapabilityKind::Button, 0x128),
    ("BTN_BASE4", CapabilityKind::Button, 0x129),
    ("BTN_BASE5", CapabilityKind::Button, 0x12a),
    ("BTN_BASE6", CapabilityKind::Button, 0x12b),
    ("BTN_DEAD", CapabilityKind::Button, 0x12f),
    // Gamepad buttons
    ("BTN_SOUTH", CapabilityKind::Button, 0x130),
    ("BTN_GAMEPAD", CapabilityKind::Button, 0x130),
    ("BTN_A", CapabilityKind::Button, 0x130),
    ("BTN_EAST", CapabilityKind::Button, 0x131),
    ("BTN_B", CapabilityKind::Button, 0x131),
    ("BTN_C", CapabilityKind::Button, 0x132),
    ("BTN_NORTH", CapabilityKind::Button, 0x133),
    ("BTN_X", CapabilityKind::Button, 0x133),
    ("BTN_WEST", CapabilityKind::Button, 0x134),
    ("BTN_Y", CapabilityKind::Button, 0x134),
    ("BTN_Z", CapabilityKind::Button, 0x135),
    ("BTN_TL", CapabilityKind::Button, 0x136),
    ("BTN_TR", CapabilityKind::Button, 0x137),
    ("BTN_TL2", CapabilityKind::Button, 0x138),
    ("BTN_TR2", CapabilityKind::Button, 0x139),
    ("BTN_SELECT", CapabilityKind::Button, 0x13a),
    ("BTN_START", CapabilityKind::Button, 0x13b),
    ("BTN_MODE", CapabilityKind::Button, 0x13c),
    ("BTN_THUMBL", CapabilityKind::Button, 0x13d),
    ("BTN_THUMBR", CapabilityKind::Button, 0x13e),
    // D-pad buttons
    ("BTN_DPAD_UP", CapabilityKind::Button, 0x220),
    ("BTN_DPAD_DOWN", CapabilityKind::Button, 0x221),
    ("BTN_DPAD_LEFT", CapabilityKind::Button, 0x222),
    ("BTN_DPAD_RIGHT", CapabilityKind::Button, 0x223),
];

/// Looks up a capability name, returning its kind and event code.
///
/// Returns `None` if `name` is not a known event name.  Matching is
/// case-sensitive, exactly as the names appear in the kernel header.
pub fn lookup(name: &str) -> Option<(CapabilityKind, u16)> {
    if let Some(entry) = CATALOGUE.iter().find(|(n, _, _)| *n == name) {
        return Some((entry.1, entry.2));
    }
    let digits = name.strip_prefix(TRIGGER_HAPPY_PREFIX)?;
    if digits.starts_with('0') || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let n: u16 = digits.parse().ok()?;
    (1..=TRIGGER_HAPPY_COUNT)
        .contains(&n)
        .then(|| (CapabilityKind::Button, BTN_TRIGGER_HAPPY1 + n - 1))
}

/// Returns the canonical name for `(kind, code)`, if it is catalogued.
///
/// `BTN_TRIGGER_HAPPY<n>` codes have no static name; see
/// [`trigger_happy_index`].
pub fn canonical_name(kind: CapabilityKind, code: u16) -> Option<&'static str> {
    CATALOGUE
        .iter()
        .find(|(_, k, c)| *k == kind && *c == code)
        .map(|(n, _, _)| *n)
}

/// Returns `n` if `code` is `BTN_TRIGGER_HAPPY<n>`.
pub fn trigger_happy_index(code: u16) -> Option<u16> {
    let n = code.checked_sub(BTN_TRIGGER_HAPPY1)? + 1;
    (n <= TRIGGER_HAPPY_COUNT).then_some(n)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
