//! Recording gamepad backend for tests and dry runs.
//!
//! # Why a mock backend?
//!
//! The real backends talk to `/dev/uinput` or `vJoyInterface.dll`.  Those
//! need root permissions or an installed driver, and their effect cannot be
//! observed from test code.  [`MockBackend`] instead records every layout it
//! builds, every value and every commit into a shared [`MockRecord`] so tests
//! can assert on exactly what the session did.
//!
//! It is also selectable from the command line (`--backend mock`) to try the
//! network side on a machine without a virtual input driver.
//!
//! # Usage in tests
//!
//! ```ignore
//! let backend = MockBackend::new("Yoke-1");
//! let record = backend.record();
//! let mut session = Session::new(Box::new(backend), ...)?;
//!
//! // ... feed datagrams ...
//!
//! assert_eq!(record.commits.lock().unwrap().len(), 1);
//! ```
//!
//! # Failure injection
//!
//! `set_fail_create(true)` makes every `create` fail with
//! `DriverUnavailable`; `fail_next_creates(n)` fails only the next `n`.  Push
//! a name into `taken_names` to simulate another controller already using
//! this backend's device name.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use padlink_core::{Capability, ControlValue, Layout};
use tracing::debug;

use crate::application::virtual_gamepad::{DeviceError, GamepadBackend, VirtualGamepad};

/// One committed report: every `(capability, value)` set since the previous
/// commit, in call order.
pub type CommittedReport = Vec<(Capability, ControlValue)>;

/// Everything the mock backend and its devices did, shared across clones.
#[derive(Debug, Default)]
pub struct MockRecord {
    /// Layout of every successfully created device, in creation order.
    pub created: Mutex<Vec<Layout>>,
    /// Committed reports across all devices, in commit order.
    pub commits: Mutex<Vec<CommittedReport>>,
    /// Layout of every released device, in release order.
    pub released: Mutex<Vec<Layout>>,
    /// Number of live devices at the moment of each successful `create`.
    pub live_at_create: Mutex<Vec<usize>>,
    /// Names already in use by "other" controllers.
    pub taken_names: Mutex<Vec<String>>,
    /// When `true`, `create` fails with [`DeviceError::DriverUnavailable`].
    pub fail_create: AtomicBool,
    /// Number of upcoming `create` calls that fail before creation works again.
    pub failures_pending: AtomicUsize,
}

impl MockRecord {
    /// Number of devices created and not yet released.
    pub fn live_devices(&self) -> usize {
        lock(&self.created).len() - lock(&self.released).len()
    }

    pub fn set_fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    /// Makes the next `count` `create` calls fail.
    pub fn fail_next_creates(&self, count: usize) {
        self.failures_pending.store(count, Ordering::SeqCst);
    }

    fn take_pending_failure(&self) -> bool {
        self.failures_pending
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

/// Backend building [`MockGamepad`]s.
#[derive(Debug, Clone)]
pub struct MockBackend {
    device_name: String,
    record: Arc<MockRecord>,
}

impl MockBackend {
    /// Creates a backend whose devices are named `device_name`.
    pub fn new(device_name: impl Into<String>) -> Self {
        Self {
            device_name: device_name.into(),
            record: Arc::new(MockRecord::default()),
        }
    }

    /// Shared handle to the record, valid after the backend moves.
    pub fn record(&self) -> Arc<MockRecord> {
        Arc::clone(&self.record)
    }
}

impl GamepadBackend for MockBackend {
    fn create(&mut self, layout: &Layout) -> Result<Box<dyn VirtualGamepad>, DeviceError> {
        if self.record.fail_create.load(Ordering::SeqCst) || self.record.take_pending_failure() {
            return Err(DeviceError::DriverUnavailable("mock driver disabled".into()));
        }
        if lock(&self.record.taken_names).contains(&self.device_name) {
            return Err(DeviceError::NameTaken(self.device_name.clone()));
        }

        debug!(
            "mock device {:?} created with {} capabilities",
            self.device_name,
            layout.len()
        );
        let live = self.record.live_devices();
        lock(&self.record.live_at_create).push(live);
        lock(&self.record.created).push(layout.clone());
        Ok(Box::new(MockGamepad {
            layout: layout.clone(),
            pending: Vec::new(),
            record: Arc::clone(&self.record),
            released: false,
        }))
    }

    fn driver_name(&self) -> &'static str {
        "mock"
    }
}

/// A device that records instead of emitting.
#[derive(Debug)]
pub struct MockGamepad {
    layout: Layout,
    pending: CommittedReport,
    record: Arc<MockRecord>,
    released: bool,
}

impl VirtualGamepad for MockGamepad {
    fn capabilities(&self) -> &[Capability] {
        self.layout.capabilities()
    }

    fn set_value(
        &mut self,
        capability: Capability,
        value: ControlValue,
    ) -> Result<(), DeviceError> {
        if !self.layout.capabilities().contains(&capability) {
            return Err(DeviceError::UnregisteredCapability(capability));
        }
        self.pending.push((capability, value));
        Ok(())
    }

    fn commit(&mut self) -> Result<(), DeviceError> {
        lock(&self.record.commits).push(std::mem::take(&mut self.pending));
        Ok(())
    }

    fn release(&mut self) -> Result<(), DeviceError> {
        if !self.released {
            self.released = true;
            lock(&self.record.released).push(self.layout.clone());
        }
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
