//! The session state machine: one peer, one layout, one virtual gamepad.
//!
//! # States
//!
//! ```text
//!            first datagram from A
//!   Idle ───────────────────────────▶ Bound { peer: A }
//!    ▲                                     │
//!    └──── no datagram from A for ─────────┘
//!          longer than the liveness window
//! ```
//!
//! While `Bound`, datagrams from any address other than the bound peer are
//! ignored.  The first datagram after entering `Idle` always wins the peer
//! slot, whatever its content.
//!
//! # Datagrams from the bound peer
//!
//! - **State frame** (first byte `0x00`): decoded with the active
//!   [`FrameFormat`]; every value is handed to the device in layout order,
//!   then the device commits once.  A frame of the wrong length is dropped.
//! - **Negotiation** (any other first byte): builds a new [`Layout`] and a new
//!   device for it.  The previous device is released *before* the new one is
//!   created, so both never exist at the same time.  If creation fails the
//!   previous layout's device is rebuilt and stays active.
//!
//! The session never touches sockets; the service feeds it bytes and a
//! timestamp, which keeps every transition testable without a network.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use padlink_core::{AliasTable, Datagram, FrameError, FrameFormat, Layout, NegotiationError};
use tracing::{debug, error, info, warn};

use crate::application::virtual_gamepad::{DeviceError, GamepadBackend, VirtualGamepad};

/// Largest UDP payload over IPv4.
pub const MAX_DATAGRAM_SIZE: usize = 65_507;

/// Default time without datagrams from the peer before it is dropped.
pub const DEFAULT_LIVENESS_WINDOW: Duration = Duration::from_secs(2);

/// Default maximum accepted datagram size.
pub const DEFAULT_RECEIVE_SIZE: usize = 64;

/// Tunables fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Receive size restored on every timeout.
    pub default_receive_size: usize,
    /// Silence from the bound peer tolerated before returning to `Idle`.
    pub liveness_window: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_receive_size: DEFAULT_RECEIVE_SIZE,
            liveness_window: DEFAULT_LIVENESS_WINDOW,
        }
    }
}

/// Peer binding state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Bound { peer: SocketAddr },
}

/// Why a negotiation did not change the layout.
#[derive(Debug)]
pub enum LayoutRejection {
    /// The payload did not resolve to a layout.
    Negotiation(NegotiationError),
    /// The layout resolved but no device could be built for it.
    Device(DeviceError),
}

/// What handling one datagram (or one liveness check) did.
#[derive(Debug)]
pub enum SessionEvent {
    /// A state frame was decoded and committed.
    FrameApplied,
    /// A state frame could not be decoded and was dropped.
    FrameDiscarded(FrameError),
    /// A zero-length datagram was dropped.
    EmptyDatagram,
    /// A new layout and device are active.
    LayoutApplied { capabilities: usize, frame_size: usize },
    /// The negotiation repeated the active layout.
    LayoutUnchanged,
    /// The negotiation was discarded; the previous layout stays active.
    LayoutRejected(LayoutRejection),
    /// The negotiation may have been truncated; the receive size grew.
    ReceiveSizeWidened { from: usize, to: usize },
    /// The datagram came from someone other than the bound peer.
    ForeignPeerIgnored { from: SocketAddr },
    /// The device refused a value or the commit.
    DeviceFault(DeviceError),
    /// No device is active, so the frame had nowhere to go.
    NoDevice,
    /// The bound peer went silent and the session returned to `Idle`.
    TimedOut { peer: SocketAddr, silent_for: Duration },
}

/// One peer session driving one virtual gamepad.
pub struct Session {
    backend: Box<dyn GamepadBackend>,
    aliases: AliasTable,
    config: SessionConfig,
    default_layout: Layout,
    layout: Layout,
    format: FrameFormat,
    device: Option<Box<dyn VirtualGamepad>>,
    state: SessionState,
    last_activity: Instant,
    receive_size: usize,
}

impl Session {
    /// Creates the session and the device for `default_layout`.
    ///
    /// `config.default_receive_size` is capped at [`MAX_DATAGRAM_SIZE`].
    ///
    /// # Errors
    ///
    /// Returns the [`DeviceError`] from the backend if the initial device
    /// cannot be built.  This is the one device failure that is fatal.
    pub fn new(
        mut backend: Box<dyn GamepadBackend>,
        aliases: AliasTable,
        default_layout: Layout,
        mut config: SessionConfig,
        now: Instant,
    ) -> Result<Self, DeviceError> {
        config.default_receive_size = config.default_receive_size.min(MAX_DATAGRAM_SIZE);
        let device = backend.create(&default_layout)?;
        info!(
            "{} gamepad ready with {} capabilities",
            backend.driver_name(),
            default_layout.len()
        );
        let mut session = Self {
            backend,
            aliases,
            config,
            format: default_layout.frame_format(),
            layout: default_layout.clone(),
            default_layout,
            device: Some(device),
            state: SessionState::Idle,
            last_activity: now,
            receive_size: 0,
        };
        session.receive_size = session.settled_receive_size();
        Ok(session)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn peer(&self) -> Option<SocketAddr> {
        match self.state {
            SessionState::Idle => None,
            SessionState::Bound { peer } => Some(peer),
        }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn frame_format(&self) -> &FrameFormat {
        &self.format
    }

    /// Current maximum accepted datagram size.
    pub fn receive_size(&self) -> usize {
        self.receive_size
    }

    pub fn has_device(&self) -> bool {
        self.device.is_some()
    }

    /// Handles one datagram received from `from` at `now`.
    pub fn handle_datagram(&mut self, from: SocketAddr, bytes: &[u8], now: Instant) -> SessionEvent {
        match self.state {
            SessionState::Idle => {
                info!("connected to {from}");
                self.state = SessionState::Bound { peer: from };
            }
            SessionState::Bound { peer } if peer != from => {
                return SessionEvent::ForeignPeerIgnored { from };
            }
            SessionState::Bound { .. } => {}
        }
        self.last_activity = now;

        match Datagram::classify(bytes) {
            Datagram::Empty => SessionEvent::EmptyDatagram,
            Datagram::StateFrame(frame) => self.apply_frame(frame),
            Datagram::Negotiation(payload) => self.negotiate(payload),
        }
    }

    /// Returns the session to `Idle` if the bound peer has been silent for
    /// longer than the liveness window.
    ///
    /// On timeout the receive size is reset and the device is rebuilt for the
    /// default layout, so a reconnecting peer starts from a known state.
    pub fn check_liveness(&mut self, now: Instant) -> Option<SessionEvent> {
        let SessionState::Bound { peer } = self.state else {
            return None;
        };
        let silent_for = now.saturating_duration_since(self.last_activity);
        if silent_for <= self.config.liveness_window {
            return None;
        }

        self.state = SessionState::Idle;
        if let Err(e) = self.reconfigure(self.default_layout.clone()) {
            error!("could not rebuild the default gamepad after timeout: {e}");
        }
        self.receive_size = self.settled_receive_size();
        Some(SessionEvent::TimedOut { peer, silent_for })
    }

    /// Releases the device.  Safe to call more than once.
    pub fn shutdown(&mut self) {
        self.release_device();
    }

    // ── Datagram handlers ────────────────────────────────────────────────────

    fn apply_frame(&mut self, frame: &[u8]) -> SessionEvent {
        let Some(device) = self.device.as_mut() else {
            return SessionEvent::NoDevice;
        };
        let values = match self.format.decode(frame) {
            Ok(values) => values,
            Err(e) => {
                debug!("dropping state frame: {e}");
                return SessionEvent::FrameDiscarded(e);
            }
        };

        for (capability, value) in self.layout.capabilities().iter().zip(values) {
            if let Err(e) = device.set_value(*capability, value) {
                warn!("device rejected {capability}={value:?}: {e}");
                return SessionEvent::DeviceFault(e);
            }
        }
        match device.commit() {
            Ok(()) => SessionEvent::FrameApplied,
            Err(e) => {
                warn!("device commit failed: {e}");
                SessionEvent::DeviceFault(e)
            }
        }
    }

    fn negotiate(&mut self, payload: &[u8]) -> SessionEvent {
        if payload.len() > self.receive_size {
            let from = self.receive_size;
            let to = (from * 2).max(payload.len()).min(MAX_DATAGRAM_SIZE);
            self.receive_size = to;
            info!("layout message may be truncated; receive size {from} -> {to}, awaiting resend");
            return SessionEvent::ReceiveSizeWidened { from, to };
        }

        if self.layout.is_negotiated_by(payload) {
            return SessionEvent::LayoutUnchanged;
        }

        let layout = match Layout::negotiate(payload, &self.aliases) {
            Ok(layout) => layout,
            Err(e) => {
                warn!("invalid layout discarded: {e}");
                return SessionEvent::LayoutRejected(LayoutRejection::Negotiation(e));
            }
        };

        match self.reconfigure(layout) {
            Ok(()) => {
                info!(
                    "new control layout chosen: {} capabilities, {}-byte frames",
                    self.layout.len(),
                    self.format.size()
                );
                SessionEvent::LayoutApplied {
                    capabilities: self.layout.len(),
                    frame_size: self.format.size(),
                }
            }
            Err(e) => {
                warn!("layout discarded, device could not be built: {e}");
                SessionEvent::LayoutRejected(LayoutRejection::Device(e))
            }
        }
    }

    // ── Device lifecycle ─────────────────────────────────────────────────────

    /// Swaps in a device for `layout`, restoring the current layout's device
    /// if that fails.
    fn reconfigure(&mut self, layout: Layout) -> Result<(), DeviceError> {
        self.release_device();
        match self.backend.create(&layout) {
            Ok(device) => {
                self.format = layout.frame_format();
                self.layout = layout;
                self.receive_size = self.settled_receive_size();
                self.device = Some(device);
                Ok(())
            }
            Err(e) => {
                match self.backend.create(&self.layout) {
                    Ok(device) => self.device = Some(device),
                    Err(restore) => error!("previous gamepad could not be restored: {restore}"),
                }
                Err(e)
            }
        }
    }

    /// Receive size for the active layout: its frames and a resend of its
    /// own negotiation both fit.
    fn settled_receive_size(&self) -> usize {
        self.format
            .size()
            .max(self.layout.raw().len())
            .max(self.config.default_receive_size)
    }

        fn release_device(&mut self) {
        if let Some(mut device) = self.device.take() {
            if let Err(e) = device.release() {
                warn!("failed to release gamepad: {e}");
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.release_device();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use padlink_core::{Capability, ControlValue};

    use crate::infrastructure::virtual_device::mock::{MockBackend, MockRecord};

    const PEER: &str = "192.168.1.20:40000";
    const OTHER: &str = "192.168.1.21:40000";

    fn addr(s: &str) -> SocketAddr {
        s.parse().unwrap()
    }

    fn session() -> (Session, Arc<MockRecord>, Instant) {
        let backend = MockBackend::new("Yoke-1");
        let record = backend.record();
        let now = Instant::now();
        let session = Session::new(
            Box::new(backend),
            AliasTable::builtin(),
            Layout::empty(),
            SessionConfig::default(),
            now,
        )
        .expect("session");
        (session, record, now)
    }

    /// A session bound to PEER with layout "j1,b1" active.
    fn bound_j1_b1() -> (Session, Arc<MockRecord>, Instant) {
        let (mut s, record, now) = session();
        let event = s.handle_datagram(addr(PEER), b"j1,b1", now);
        assert!(matches!(event, SessionEvent::LayoutApplied { .. }));
        (s, record, now)
    }

    // ── Binding ───────────────────────────────────────────────────────────────

    #[test]
    fn test_new_session_is_idle_with_default_device() {
        // Arrange / Act
        let (s, record, _) = session();

        // Assert
        assert_eq!(s.state(), SessionState::Idle);
        assert!(s.has_device());
        assert_eq!(record.live_devices(), 1);
        assert_eq!(s.receive_size(), DEFAULT_RECEIVE_SIZE);
    }

    #[test]
    fn test_new_session_fails_when_device_cannot_be_built() {
        // Arrange
        let backend = MockBackend::new("Yoke-1");
        backend.record().taken_names.lock().unwrap().push("Yoke-1".into());

        // Act
        let result = Session::new(
            Box::new(backend),
            AliasTable::builtin(),
            Layout::empty(),
            SessionConfig::default(),
            Instant::now(),
        );

        // Assert
        assert!(matches!(result, Err(DeviceError::NameTaken(_))));
    }

    #[test]
    fn test_first_datagram_binds_even_when_malformed() {
        // Arrange
        let (mut s, _, now) = session();

        // Act
        let event = s.handle_datagram(addr(PEER), &[0x00, 0x01, 0x02], now);

        // Assert
        assert!(matches!(event, SessionEvent::FrameDiscarded(_)));
        assert_eq!(s.state(), SessionState::Bound { peer: addr(PEER) });
    }

    #[test]
    fn test_datagrams_from_other_addresses_are_ignored() {
        // Arrange
        let (mut s, record, now) = bound_j1_b1();
        let layout_before = s.layout().clone();

        // Act
        let frame = s.handle_datagram(addr(OTHER), &[0, 0, 1, 0, 1, 1], now);
        let negotiation = s.handle_datagram(addr(OTHER), b"b1", now);

        // Assert
        assert!(matches!(frame, SessionEvent::ForeignPeerIgnored { .. }));
        assert!(matches!(negotiation, SessionEvent::ForeignPeerIgnored { .. }));
        assert_eq!(s.layout(), &layout_before);
        assert!(record.commits.lock().unwrap().is_empty());
        assert_eq!(s.peer(), Some(addr(PEER)));
    }

    #[test]
    fn test_same_ip_different_port_is_a_different_peer() {
        let (mut s, _, now) = bound_j1_b1();
        let event = s.handle_datagram(addr("192.168.1.20:40001"), b"b1", now);
        assert!(matches!(event, SessionEvent::ForeignPeerIgnored { .. }));
    }

    // ── State frames ──────────────────────────────────────────────────────────

    #[test]
    fn test_state_frame_sets_values_in_layout_order_and_commits_once() {
        // Arrange
        let (mut s, record, now) = bound_j1_b1();

        // Act
        let event = s.handle_datagram(addr(PEER), &[0x00, 0x00, 0x00, 0x7F, 0xFF, 0x01], now);

        // Assert
        assert!(matches!(event, SessionEvent::FrameApplied));
        let commits = record.commits.lock().unwrap();
        assert_eq!(commits.len(), 1);
        assert_eq!(
            commits[0],
            vec![
                (Capability::axis(0x00), ControlValue::Axis(0)),
                (Capability::axis(0x01), ControlValue::Axis(0x7FFF)),
                (Capability::button(0x130), ControlValue::Button(true)),
            ]
        );
    }

    #[test]
    fn test_malformed_frame_leaves_state_unchanged() {
        // Arrange
        let (mut s, record, now) = bound_j1_b1();
        let layout_before = s.layout().clone();
        let created_before = record.created.lock().unwrap().len();

        // Act
        for len in [1usize, 5, 7, 40] {
            let frame = vec![0u8; len];
            let event = s.handle_datagram(addr(PEER), &frame, now);
            assert!(matches!(
                event,
                SessionEvent::FrameDiscarded(FrameError::MalformedFrame { expected: 6, .. })
            ));
        }

        // Assert
        assert_eq!(s.layout(), &layout_before);
        assert_eq!(s.peer(), Some(addr(PEER)));
        assert_eq!(record.created.lock().unwrap().len(), created_before);
        assert!(record.commits.lock().unwrap().is_empty());
    }

    #[test]
    fn test_empty_datagram_is_dropped() {
        let (mut s, _, now) = bound_j1_b1();
        assert!(matches!(
            s.handle_datagram(addr(PEER), &[], now),
            SessionEvent::EmptyDatagram
        ));
    }

    // ── Negotiation ───────────────────────────────────────────────────────────

    #[test]
    fn test_negotiation_replaces_layout_and_device() {
        // Arrange
        let (mut s, record, now) = session();

        // Act
        let event = s.handle_datagram(addr(PEER), b"j1,b1", now);

        // Assert
        assert!(matches!(
            event,
            SessionEvent::LayoutApplied { capabilities: 3, frame_size: 6 }
        ));
        assert_eq!(s.frame_format().size(), 6);
        assert_eq!(record.created.lock().unwrap().len(), 2);
        assert_eq!(record.released.lock().unwrap().len(), 1);
        assert_eq!(record.live_devices(), 1);
    }

    #[test]
    fn test_old_device_is_released_before_new_one_is_created() {
        // Arrange
        let (mut s, record, now) = bound_j1_b1();

        // Act
        s.handle_datagram(addr(PEER), b"b1,b2", now);

        // Assert
        assert_eq!(record.live_at_create.lock().unwrap().last(), Some(&0));
        assert_eq!(record.live_devices(), 1);
        let released = record.released.lock().unwrap();
        assert_eq!(released.last().unwrap().raw(), b"j1,b1");
    }

    #[test]
    fn test_duplicate_negotiation_is_ignored() {
        // Arrange
        let (mut s, record, now) = bound_j1_b1();
        let created_before = record.created.lock().unwrap().len();

        // Act
        let event = s.handle_datagram(addr(PEER), b"j1,b1", now);

        // Assert
        assert!(matches!(event, SessionEvent::LayoutUnchanged));
        assert_eq!(record.created.lock().unwrap().len(), created_before);
        assert_eq!(record.live_devices(), 1);
    }

    #[test]
    fn test_unknown_token_leaves_layout_and_device_unchanged() {
        // Arrange
        let (mut s, record, now) = bound_j1_b1();
        let created_before = record.created.lock().unwrap().len();

        // Act
        let event = s.handle_datagram(addr(PEER), b"zz9", now);

        // Assert
        assert!(matches!(
            event,
            SessionEvent::LayoutRejected(LayoutRejection::Negotiation(
                NegotiationError::UnknownCapability(ref t)
            )) if t == "zz9"
        ));
        assert_eq!(s.layout().raw(), b"j1,b1");
        assert_eq!(record.created.lock().unwrap().len(), created_before);
        assert_eq!(record.live_devices(), 1);
    }

    #[test]
    fn test_device_failure_restores_previous_device() {
        // Arrange
        let (mut s, record, now) = bound_j1_b1();
        record.fail_next_creates(1);

        // Act
        let event = s.handle_datagram(addr(PEER), b"b1,b2", now);

        // Assert
        assert!(matches!(
            event,
            SessionEvent::LayoutRejected(LayoutRejection::Device(DeviceError::DriverUnavailable(_)))
        ));
        assert_eq!(s.layout().raw(), b"j1,b1");
        assert_eq!(s.frame_format().size(), 6);
        assert!(s.has_device());
        assert_eq!(record.live_devices(), 1);
        assert_eq!(record.created.lock().unwrap().last().unwrap().raw(), b"j1,b1");

        // The restored device takes frames in the old format
        assert!(matches!(
            s.handle_datagram(addr(PEER), &[0, 0, 0, 0, 0, 1], now),
            SessionEvent::FrameApplied
        ));
    }

    #[test]
    fn test_device_failure_without_driver_leaves_no_device() {
        // Arrange
        let (mut s, record, now) = bound_j1_b1();
        record.set_fail_create(true);

        // Act
        let event = s.handle_datagram(addr(PEER), b"b1,b2", now);

        // Assert
        assert!(matches!(
            event,
            SessionEvent::LayoutRejected(LayoutRejection::Device(_))
        ));
        assert_eq!(s.layout().raw(), b"j1,b1");
        assert!(!s.has_device());
        assert!(matches!(
            s.handle_datagram(addr(PEER), &[0, 0, 0, 0, 0, 0], now),
            SessionEvent::NoDevice
        ));
    }

    #[test]
    fn test_oversized_negotiation_widens_receive_size_only() {
        // Arrange
        let (mut s, record, now) = bound_j1_b1();
        let created_before = record.created.lock().unwrap().len();
        let truncated = vec![b'b'; DEFAULT_RECEIVE_SIZE + 1];

        // Act
        let event = s.handle_datagram(addr(PEER), &truncated, now);

        // Assert
        assert!(matches!(
            event,
            SessionEvent::ReceiveSizeWidened { from: 64, to: 128 }
        ));
        assert_eq!(s.receive_size(), 128);
        assert_eq!(s.layout().raw(), b"j1,b1");
        assert_eq!(record.created.lock().unwrap().len(), created_before);
    }

    #[test]
    fn test_receive_size_never_exceeds_udp_maximum() {
        // Arrange
        let (mut s, _, now) = bound_j1_b1();
        let huge = vec![b'b'; MAX_DATAGRAM_SIZE];

        // Act
        while s.receive_size() < MAX_DATAGRAM_SIZE {
            let len = s.receive_size() + 1;
            s.handle_datagram(addr(PEER), &huge[..len], now);
        }

        // Assert
        assert_eq!(s.receive_size(), MAX_DATAGRAM_SIZE);
    }

    #[test]
    fn test_widened_receive_size_admits_long_negotiation() {
        // Arrange: 48 buttons negotiated with 164 bytes of text
        let (mut s, _, now) = session();
        let text = (1..=16).map(|n| format!("b{n}")).collect::<Vec<_>>().join(",");
        let text = format!("{text},{text},{text}");
        while s.receive_size() < text.len() {
            s.handle_datagram(addr(PEER), &text.as_bytes()[..s.receive_size() + 1], now);
        }

        // Act
        let event = s.handle_datagram(addr(PEER), text.as_bytes(), now);

        // Assert
        assert!(matches!(event, SessionEvent::LayoutApplied { frame_size: 49, .. }));
        assert_eq!(s.receive_size(), text.len());
    }

    #[test]
    fn test_resent_long_negotiation_is_a_duplicate() {
        // Arrange: ABS_X plus 30 buttons, 95 bytes of text
        let (mut s, record, now) = session();
        let text = format!("ABS_X,{}", vec!["b1"; 30].join(","));
        assert_eq!(text.len(), 95);
        let mut events = Vec::new();

        // Act: the client resends until it sees frames accepted
        for _ in 0..4 {
            let len = text.len().min(s.receive_size() + 1);
            events.push(s.handle_datagram(addr(PEER), &text.as_bytes()[..len], now));
        }

        // Assert
        assert!(matches!(events[0], SessionEvent::ReceiveSizeWidened { from: 64, to: 128 }));
        assert!(matches!(events[1], SessionEvent::LayoutApplied { .. }));
        assert!(events[2..]
            .iter()
            .all(|e| matches!(e, SessionEvent::LayoutUnchanged)));
        assert_eq!(record.created.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_default_receive_size_is_capped_at_udp_maximum() {
        let session = Session::new(
            Box::new(MockBackend::new("Yoke-1")),
            AliasTable::builtin(),
            Layout::empty(),
            SessionConfig {
                default_receive_size: usize::MAX,
                ..SessionConfig::default()
            },
            Instant::now(),
        )
        .unwrap();

        assert_eq!(session.receive_size(), MAX_DATAGRAM_SIZE);
    }

    #[test]
    fn test_large_layout_raises_receive_size_to_frame_size() {
        // Arrange: 20 d-pads = 80 buttons, 81-byte frames, 59 bytes of text
        let (mut s, _, now) = session();
        let text = vec!["dp"; 20].join(",");

        // Act
        s.handle_datagram(addr(PEER), text.as_bytes(), now);

        // Assert
        assert_eq!(s.frame_format().size(), 81);
        assert_eq!(s.receive_size(), 81);
    }

    #[test]
    fn test_negotiation_never_commits() {
        let (mut s, record, now) = bound_j1_b1();
        s.handle_datagram(addr(PEER), b"dp", now);
        assert!(record.commits.lock().unwrap().is_empty());
    }

    // ── Liveness ──────────────────────────────────────────────────────────────

    #[test]
    fn test_no_timeout_within_liveness_window() {
        let (mut s, _, now) = bound_j1_b1();
        assert!(s.check_liveness(now + DEFAULT_LIVENESS_WINDOW).is_none());
        assert_eq!(s.peer(), Some(addr(PEER)));
    }

    #[test]
    fn test_idle_session_never_times_out() {
        let (mut s, _, now) = session();
        assert!(s.check_liveness(now + Duration::from_secs(3600)).is_none());
    }

    #[test]
    fn test_timeout_returns_to_idle_with_default_layout() {
        // Arrange
        let (mut s, record, now) = bound_j1_b1();
        s.handle_datagram(addr(PEER), &vec![b'b'; 65], now);
        assert_eq!(s.receive_size(), 128);

        // Act
        let later = now + DEFAULT_LIVENESS_WINDOW + Duration::from_millis(1);
        let event = s.check_liveness(later);

        // Assert
        assert!(matches!(event, Some(SessionEvent::TimedOut { .. })));
        assert_eq!(s.state(), SessionState::Idle);
        assert_eq!(s.receive_size(), DEFAULT_RECEIVE_SIZE);
        assert!(s.layout().is_empty());
        assert!(s.has_device());
        assert_eq!(record.live_devices(), 1);
    }

    #[test]
    fn test_activity_from_peer_refreshes_liveness() {
        // Arrange
        let (mut s, _, now) = bound_j1_b1();
        let later = now + Duration::from_millis(1500);

        // Act
        s.handle_datagram(addr(PEER), &[0, 0, 0, 0, 0, 0], later);

        // Assert
        assert!(s.check_liveness(now + Duration::from_millis(3000)).is_none());
    }

    #[test]
    fn test_foreign_datagrams_do_not_refresh_liveness() {
        let (mut s, _, now) = bound_j1_b1();
        s.handle_datagram(addr(OTHER), &[0, 0, 0, 0, 0, 0], now + Duration::from_millis(1500));
        assert!(s.check_liveness(now + Duration::from_millis(2500)).is_some());
    }

    #[test]
    fn test_after_timeout_any_address_can_bind() {
        // Arrange
        let (mut s, _, now) = bound_j1_b1();
        let later = now + Duration::from_secs(3);
        s.check_liveness(later);

        // Act
        s.handle_datagram(addr(OTHER), b"j1", later);

        // Assert
        assert_eq!(s.peer(), Some(addr(OTHER)));
    }

    // ── Shutdown ──────────────────────────────────────────────────────────────

    #[test]
    fn test_shutdown_releases_device_once() {
        // Arrange
        let (mut s, record, _) = bound_j1_b1();

        // Act
        s.shutdown();
        s.shutdown();
        drop(s);

        // Assert
        assert_eq!(record.live_devices(), 0);
        assert_eq!(record.released.lock().unwrap().len(), 2);
    }
}
