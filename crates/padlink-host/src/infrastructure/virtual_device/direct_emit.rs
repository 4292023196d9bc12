//! Direct-emit gamepad: one OS event per value, one sync per frame.
//!
//! This is how Linux `uinput` devices work.  Every `set_value` writes a
//! single `EV_ABS` or `EV_KEY` event straight to the kernel, and `commit`
//! writes the `SYN_REPORT` that tells readers "this report is complete".
//!
//! The gamepad logic is generic over an [`EventSink`] so it can be tested
//! without `/dev/uinput`; the real sink lives in `uinput.rs`.
//!
//! # Name collisions
//!
//! Games often pick controllers by name.  Before registering, the backend
//! reads the names of existing joysticks from sysfs
//! (`/sys/class/input/js*/device/name`) and refuses a name that is already
//! present, so two hosts never publish indistinguishable devices.

use std::io;
use std::path::Path;

use padlink_core::{Capability, CapabilityKind, ControlValue, Layout, AXIS_MAX};

use crate::application::virtual_gamepad::{DeviceError, VirtualGamepad};

/// `EV_SYN` event type.
pub const EV_SYN: u16 = 0x00;
/// `EV_KEY` event type (buttons).
pub const EV_KEY: u16 = 0x01;
/// `EV_ABS` event type (absolute axes).
pub const EV_ABS: u16 = 0x03;
/// `SYN_REPORT` code of `EV_SYN`.
pub const SYN_REPORT: u16 = 0x00;

/// Default sysfs directory holding `js*` joystick entries.
pub const SYSFS_INPUT: &str = "/sys/class/input";

/// Destination of raw input events.
pub trait EventSink: Send {
    fn emit(&mut self, kind: u16, code: u16, value: i32) -> io::Result<()>;

    /// Writes `SYN_REPORT`.
    fn sync(&mut self) -> io::Result<()> {
        self.emit(EV_SYN, SYN_REPORT, 0)
    }

    /// Unregisters the device.  Must tolerate being called twice.
    fn destroy(&mut self) -> io::Result<()>;
}

/// What to register with the OS for one layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    /// Full device name as shown to games.
    pub name: String,
    /// Distinct `ABS_*` codes in first-occurrence order.
    pub axes: Vec<u16>,
    /// Distinct `BTN_*` codes in first-occurrence order.
    pub keys: Vec<u16>,
    /// Inclusive `(minimum, maximum)` for every axis.
    pub axis_range: (i32, i32),
}

impl Registration {
    pub fn for_layout(name: impl Into<String>, layout: &Layout) -> Self {
        let mut axes = Vec::new();
        let mut keys = Vec::new();
        for capability in layout.capabilities() {
            let codes = match capability.kind {
                CapabilityKind::Axis => &mut axes,
                CapabilityKind::Button => &mut keys,
            };
            if !codes.contains(&capability.code) {
                codes.push(capability.code);
            }
        }
        Self {
            name: name.into(),
            axes,
            keys,
            axis_range: (0, i32::from(AXIS_MAX)),
        }
    }
}

/// A [`VirtualGamepad`] forwarding every value straight to an [`EventSink`].
pub struct DirectEmitGamepad<S: EventSink> {
    capabilities: Vec<Capability>,
    sink: S,
    released: bool,
}

impl<S: EventSink> DirectEmitGamepad<S> {
    /// Wraps an already registered sink.
    pub fn new(layout: &Layout, sink: S) -> Self {
        Self {
            capabilities: layout.capabilities().to_vec(),
            sink,
            released: false,
        }
    }
}

impl<S: EventSink> VirtualGamepad for DirectEmitGamepad<S> {
    fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    fn set_value(
        &mut self,
        capability: Capability,
        value: ControlValue,
    ) -> Result<(), DeviceError> {
        if !self.capabilities.contains(&capability) {
            return Err(DeviceError::UnregisteredCapability(capability));
        }
        let kind = match capability.kind {
            CapabilityKind::Axis => EV_ABS,
            CapabilityKind::Button => EV_KEY,
        };
        self.sink.emit(kind, capability.code, value.as_i32())?;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), DeviceError> {
        self.sink.sync()?;
        Ok(())
    }

    fn release(&mut self) -> Result<(), DeviceError> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        self.sink.destroy()?;
        Ok(())
    }
}

/// Reads the names of all joysticks under `sysfs_input`.
///
/// Each `js*/device/name` file holds one name followed by a newline.  A
/// missing directory means there are no joysticks.
///
/// # Errors
///
/// Returns any I/O error other than "not found".
pub fn joystick_names(sysfs_input: &Path) -> io::Result<Vec<String>> {
    let entries = match std::fs::read_dir(sysfs_input) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_name().to_string_lossy().starts_with("js") {
            continue;
        }
        match std::fs::read_to_string(entry.path().join("device").join("name")) {
            Ok(name) => names.push(name.trim_end().to_string()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
    }
    Ok(names)
}

/// Fails with [`DeviceError::NameTaken`] if a joystick named `name` exists.
pub fn ensure_name_free(sysfs_input: &Path, name: &str) -> Result<(), DeviceError> {
    if joystick_names(sysfs_input)?.iter().any(|n| n == name) {
        return Err(DeviceError::NameTaken(name.to_string()));
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use padlink_core::AliasTable;

    /// Records every event instead of writing to the kernel.
    #[derive(Default)]
    struct RecordingSink {
        events: Vec<(u16, u16, i32)>,
        destroyed: usize,
        should_fail: bool,
    }

    impl EventSink for RecordingSink {
        fn emit(&mut self, kind: u16, code: u16, value: i32) -> io::Result<()> {
            if self.should_fail {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "mock failure"));
            }
            self.events.push((kind, code, value));
            Ok(())
        }

        fn destroy(&mut self) -> io::Result<()> {
            self.destroyed += 1;
            Ok(())
        }
    }

    fn layout(text: &str) -> Layout {
        Layout::negotiate(text.as_bytes(), &AliasTable::builtin()).unwrap()
    }

    fn temp_sysfs() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("padlink-sysfs-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn add_joystick(root: &Path, node: &str, name: &str) {
        let device = root.join(node).join("device");
        std::fs::create_dir_all(&device).unwrap();
        std::fs::write(device.join("name"), format!("{name}\n")).unwrap();
    }

    // ── Registration ──────────────────────────────────────────────────────────

    #[test]
    fn test_registration_splits_axes_and_keys_in_order() {
        // Arrange / Act
        let reg = Registration::for_layout("Yoke-1", &layout("b2,j1,b1"));

        // Assert
        assert_eq!(reg.name, "Yoke-1");
        assert_eq!(reg.axes, vec![0x00, 0x01]);
        assert_eq!(reg.keys, vec![0x131, 0x130]);
        assert_eq!(reg.axis_range, (0, 0x7FFF));
    }

    #[test]
    fn test_registration_deduplicates_codes() {
        let reg = Registration::for_layout("Yoke-1", &layout("j1,s1,b1,BTN_A"));
        assert_eq!(reg.axes.len(), 2);
        assert_eq!(reg.keys, vec![0x130]);
    }

    // ── Gamepad ───────────────────────────────────────────────────────────────

    #[test]
    fn test_set_value_emits_exactly_one_event() {
        // Arrange
        let mut pad = DirectEmitGamepad::new(&layout("j1,b1"), RecordingSink::default());

        // Act
        pad.set_value(Capability::axis(0x01), ControlValue::Axis(0x1234))
            .unwrap();
        pad.set_value(Capability::button(0x130), ControlValue::Button(true))
            .unwrap();

        // Assert
        assert_eq!(
            pad.sink.events,
            vec![(EV_ABS, 0x01, 0x1234), (EV_KEY, 0x130, 1)]
        );
    }

    #[test]
    fn test_commit_emits_one_sync_report() {
        // Arrange
        let mut pad = DirectEmitGamepad::new(&layout("b1"), RecordingSink::default());
        pad.set_value(Capability::button(0x130), ControlValue::Button(false))
            .unwrap();

        // Act
        pad.commit().unwrap();

        // Assert
        assert_eq!(pad.sink.events.last(), Some(&(EV_SYN, SYN_REPORT, 0)));
        assert_eq!(pad.sink.events.len(), 2);
    }

    #[test]
    fn test_set_value_for_unregistered_capability_emits_nothing() {
        let mut pad = DirectEmitGamepad::new(&layout("b1"), RecordingSink::default());

        let result = pad.set_value(Capability::button(0x131), ControlValue::Button(true));

        assert!(matches!(result, Err(DeviceError::UnregisteredCapability(_))));
        assert!(pad.sink.events.is_empty());
    }

    #[test]
    fn test_sink_failure_surfaces_as_io_error() {
        let sink = RecordingSink {
            should_fail: true,
            ..RecordingSink::default()
        };
        let mut pad = DirectEmitGamepad::new(&layout("b1"), sink);

        let result = pad.commit();

        assert!(matches!(result, Err(DeviceError::Io(_))));
    }

    #[test]
    fn test_release_destroys_once() {
        let mut pad = DirectEmitGamepad::new(&layout("b1"), RecordingSink::default());

        pad.release().unwrap();
        pad.release().unwrap();

        assert_eq!(pad.sink.destroyed, 1);
    }

    // ── Name collisions ───────────────────────────────────────────────────────

    #[test]
    fn test_joystick_names_reads_js_entries_only() {
        // Arrange
        let root = temp_sysfs();
        add_joystick(&root, "js0", "Xbox Wireless Controller");
        add_joystick(&root, "js1", "Yoke-1");
        add_joystick(&root, "event3", "Power Button");

        // Act
        let mut names = joystick_names(&root).unwrap();
        names.sort();

        // Assert
        assert_eq!(names, vec!["Xbox Wireless Controller", "Yoke-1"]);
        std::fs::remove_dir_all(root).ok();
    }

    #[test]
    fn test_joystick_names_of_missing_directory_is_empty() {
        let root = std::env::temp_dir().join("padlink-no-such-sysfs");
        assert!(joystick_names(&root).unwrap().is_empty());
    }

    #[test]
    fn test_ensure_name_free_detects_collision() {
        // Arrange
        let root = temp_sysfs();
        add_joystick(&root, "js0", "Yoke-1");

        // Act
        let taken = ensure_name_free(&root, "Yoke-1");
        let free = ensure_name_free(&root, "Yoke-2");

        // Assert
        assert!(matches!(taken, Err(DeviceError::NameTaken(n)) if n == "Yoke-1"));
        assert!(free.is_ok());
        std::fs::remove_dir_all(root).ok();
    }
}
