//! Short aliases used by clients to name groups of capabilities.
//!
//! The touchscreen client labels its controls with mnemonics such as `j1`
//! (first joystick) or `dp` (d-pad).  Each mnemonic expands to one or more
//! capability names:
//!
//! | Alias         | Control                        | Expansion                          |
//! |---------------|--------------------------------|------------------------------------|
//! | `j1`..`j4`    | joystick                       | two axes                           |
//! | `s1`..`s4`    | slide pad (same as joystick)   | two axes                           |
//! | `t1`, `t2`    | thumbstick with click          | two axes + thumb button            |
//! | `mx`..`mg`    | motion sensor                  | one axis                           |
//! | `pa`,`pb`,`pt`| pedal (gas, brake, throttle)   | one axis                           |
//! | `k1`..`k3`    | knob                           | one axis                           |
//! | `a1`..`a4`    | analog button                  | one axis                           |
//! | `b1`..`b16`   | button                         | one button                         |
//! | `dp`          | d-pad                          | four buttons                       |
//!
//! The table is built once at start-up and never mutated afterwards.

use std::collections::BTreeMap;

const BUILTIN: &[(&str, &str)] = &[
    ("j1", "ABS_X,ABS_Y"),
    ("j2", "ABS_RX,ABS_RY"),
    ("j3", "ABS_HAT0X,ABS_HAT0Y"),
    ("j4", "ABS_HAT1X,ABS_HAT1Y"),
    ("s1", "ABS_X,ABS_Y"),
    ("s2", "ABS_RX,ABS_RY"),
    ("s3", "ABS_HAT0X,ABS_HAT0Y"),
    ("s4", "ABS_HAT1X,ABS_HAT1Y"),
    ("t1", "ABS_X,ABS_Y,BTN_THUMBL"),
    ("t2", "ABS_RX,ABS_RY,BTN_THUMBR"),
    ("mx", "ABS_TILT_X"),
    ("my", "ABS_TILT_Y"),
    ("mz", "ABS_TOOL_WIDTH"),
    ("ma", "ABS_HAT2X"),
    ("mb", "ABS_HAT2Y"),
    ("mg", "ABS_MISC"),
    ("pa", "ABS_GAS"),
    ("pb", "ABS_BRAKE"),
    ("pt", "ABS_THROTTLE"),
    ("k1", "ABS_WHEEL"),
    ("k2", "ABS_RUDDER"),
    ("k3", "ABS_VOLUME"),
    ("a1", "ABS_Z"),
    ("a2", "ABS_RZ"),
    ("a3", "ABS_HAT3X"),
    ("a4", "ABS_HAT3Y"),
    ("b1", "BTN_GAMEPAD"),
    ("b2", "BTN_EAST"),
    ("b3", "BTN_NORTH"),
    ("b4", "BTN_WEST"),
    ("b5", "BTN_TL"),
    ("b6", "BTN_TR"),
    ("b7", "BTN_TL2"),
    ("b8", "BTN_TR2"),
    ("b9", "BTN_SELECT"),
    ("b10", "BTN_START"),
    ("b11", "BTN_MODE"),
    ("b12", "BTN_TRIGGER_HAPPY1"),
    ("b13", "BTN_TRIGGER_HAPPY2"),
    ("b14", "BTN_TRIGGER_HAPPY3"),
    ("b15", "BTN_TRIGGER_HAPPY4"),
    ("b16", "BTN_TRIGGER_HAPPY5"),
    ("dp", "BTN_DPAD_UP,BTN_DPAD_LEFT,BTN_DPAD_DOWN,BTN_DPAD_RIGHT"),
];

/// Mapping from short token to comma-separated expansion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasTable {
    entries: BTreeMap<String, String>,
}

impl AliasTable {
    /// A table with no aliases; only raw event names resolve.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The built-in table matching the client's control mnemonics.
    pub fn builtin() -> Self {
        Self::empty().with_overrides(BUILTIN.iter().copied())
    }

    /// Returns a copy of this table with `extra` entries added.
    ///
    /// An entry whose token already exists replaces the previous expansion.
    pub fn with_overrides<I, K, V>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (token, expansion) in extra {
            self.entries.insert(token.into(), expansion.into());
        }
        self
    }

    /// Returns the expansion of a whole token, if it is an alias.
    pub fn expand(&self, token: &str) -> Option<&str> {
        self.entries.get(token).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
