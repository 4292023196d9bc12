//! Integration tests for the controller session over real UDP sockets.
//!
//! A loopback `GamepadService` drives the mock backend end to end: a client
//! socket negotiates a layout, streams state frames, and goes silent until
//! the session times out.

use std::net::{IpAddr, Ipv4Addr, UdpSocket};
use std::sync::Arc;
use std::time::{Duration, Instant};

use padlink_core::{AliasTable, Capability, ControlValue, Layout};
use padlink_host::application::session::{Session, SessionConfig, SessionEvent, SessionState};
use padlink_host::infrastructure::network::{
    GamepadService, InterfaceChoice, NullAdvertiser, ServiceConfig,
};
use padlink_host::infrastructure::virtual_device::{MockBackend, MockRecord};

// ── Helpers ───────────────────────────────────────────────────────────────────

fn start(liveness: Duration) -> (GamepadService, Arc<MockRecord>) {
    let backend = MockBackend::new("Yoke-1");
    let record = backend.record();
    let session = Session::new(
        Box::new(backend),
        AliasTable::builtin(),
        Layout::empty(),
        SessionConfig {
            liveness_window: liveness,
            ..SessionConfig::default()
        },
        Instant::now(),
    )
    .expect("mock device");
    let config = ServiceConfig {
        interface: InterfaceChoice::Addr(IpAddr::V4(Ipv4Addr::LOCALHOST)),
        ..ServiceConfig::default()
    };
    let service =
        GamepadService::bind(&config, session, Box::new(NullAdvertiser)).expect("bind loopback");
    (service, record)
}

fn client() -> UdpSocket {
    UdpSocket::bind("127.0.0.1:0").expect("client socket")
}

/// Polls until `count` events arrived or a second passed.
fn poll_events(service: &mut GamepadService, count: usize) -> Vec<SessionEvent> {
    let deadline = Instant::now() + Duration::from_secs(1);
    let mut events = Vec::new();
    while events.len() < count && Instant::now() < deadline {
        events.extend(service.poll_once(Instant::now()).expect("poll"));
        std::thread::sleep(Duration::from_millis(5));
    }
    events
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[test]
fn test_layout_and_frames_arrive_in_order() {
    // Arrange
    let (mut service, record) = start(Duration::from_secs(2));
    let pad = client();
    let target = service.local_addr();

    // Act
    pad.send_to(b"j1,b1", target).unwrap();
    poll_events(&mut service, 1);
    pad.send_to(&[0x00, 0x00, 0x00, 0x7F, 0xFF, 0x01], target).unwrap();
    pad.send_to(&[0x00, 0x40, 0x00, 0x40, 0x00, 0x00], target).unwrap();
    let events = poll_events(&mut service, 2);

    // Assert
    assert!(events.iter().all(|e| matches!(e, SessionEvent::FrameApplied)));
    let commits = record.commits.lock().unwrap();
    assert_eq!(commits.len(), 2);
    assert_eq!(
        commits[0],
        vec![
            (Capability::axis(0x00), ControlValue::Axis(0)),
            (Capability::axis(0x01), ControlValue::Axis(0x7FFF)),
            (Capability::button(0x130), ControlValue::Button(true)),
        ]
    );
    assert_eq!(commits[1][2], (Capability::button(0x130), ControlValue::Button(false)));
}

#[test]
fn test_second_client_is_ignored_while_first_is_bound() {
    // Arrange
    let (mut service, record) = start(Duration::from_secs(2));
    let first = client();
    let second = client();
    let target = service.local_addr();
    first.send_to(b"b1", target).unwrap();
    poll_events(&mut service, 1);

    // Act
    second.send_to(b"j1,j2", target).unwrap();
    let events = poll_events(&mut service, 1);

    // Assert
    assert!(matches!(events[0], SessionEvent::ForeignPeerIgnored { .. }));
    assert_eq!(service.session().peer(), Some(first.local_addr().unwrap()));
    assert_eq!(service.session().layout().len(), 1);
    assert_eq!(record.created.lock().unwrap().len(), 2);
}

#[test]
fn test_unknown_token_keeps_previous_layout() {
    // Arrange
    let (mut service, record) = start(Duration::from_secs(2));
    let pad = client();
    let target = service.local_addr();
    pad.send_to(b"j1,b1", target).unwrap();
    poll_events(&mut service, 1);

    // Act
    pad.send_to(b"j1,zz9", target).unwrap();
    let events = poll_events(&mut service, 1);

    // Assert
    assert!(matches!(events[0], SessionEvent::LayoutRejected(_)));
    assert_eq!(service.session().frame_format().size(), 6);
    assert_eq!(record.live_devices(), 1);
}

#[test]
fn test_silent_peer_times_out_and_another_can_bind() {
    // Arrange
    let (mut service, record) = start(Duration::from_millis(50));
    let first = client();
    let second = client();
    let target = service.local_addr();
    first.send_to(b"j1", target).unwrap();
    poll_events(&mut service, 1);

    // Act
    std::thread::sleep(Duration::from_millis(120));
    let timeout = service.poll_once(Instant::now()).unwrap();
    second.send_to(b"b1", target).unwrap();
    poll_events(&mut service, 1);

    // Assert
    assert!(matches!(timeout.last(), Some(SessionEvent::TimedOut { .. })));
    assert_eq!(
        service.session().state(),
        SessionState::Bound {
            peer: second.local_addr().unwrap()
        }
    );
    assert_eq!(record.live_devices(), 1);
}

#[test]
fn test_close_releases_the_device() {
    let (mut service, record) = start(Duration::from_secs(2));

    service.close();
    service.close();

    assert_eq!(record.live_devices(), 0);
    assert_eq!(record.released.lock().unwrap().len(), 1);
}
