//! The gamepad service: one UDP socket feeding one [`Session`].
//!
//! # Lifecycle
//!
//! 1. [`GamepadService::bind`] resolves the interface, opens a non-blocking
//!    UDP socket with a small kernel receive buffer and publishes the
//!    advertisement.
//! 2. [`GamepadService::run`] polls until the shared `running` flag is
//!    cleared.  Each poll drains pending datagrams (at most
//!    [`MAX_READS_PER_POLL`]), hands them to the session in delivery order
//!    and checks liveness once.
//! 3. [`GamepadService::close`] releases the device, closes the socket and
//!    withdraws the advertisement.  It runs at most once, from `Drop` if
//!    nobody called it.
//!
//! # Receive buffer
//!
//! `SO_RCVBUF` is set to the configured receive size, so the kernel holds
//! only a few frames.  When the loop falls behind, older frames are dropped
//! in the kernel rather than queued.
//!
//! Each read asks for one byte more than the session's receive size.  A
//! longer datagram arrives cut to that length on every platform (Windows
//! reports it as `WSAEMSGSIZE`, which `socket2` turns into a truncation
//! flag), so the session sees it as oversized and widens.

use std::io;
use std::mem::MaybeUninit;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use socket2::{Domain, MaybeUninitSlice, Protocol, Socket, Type};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::discovery::{Advertisement, Advertiser, DiscoveryError};
use crate::application::session::{Session, SessionEvent, DEFAULT_RECEIVE_SIZE};

/// Default sleep between two polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Most datagrams handled by one poll before liveness is checked.
pub const MAX_READS_PER_POLL: usize = 256;

/// Error type for the UDP service.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The interface is neither `auto` nor an IP address.
    #[error("invalid interface {0:?}: expected \"auto\" or an IP address")]
    InvalidInterface(String),

    /// The socket could not be created, configured or bound.
    #[error("failed to bind UDP socket on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// The service was used after `close`.
    #[error("service is closed")]
    Closed,

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
}

/// Which local address to bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterfaceChoice {
    /// The address of the interface holding the default route.
    #[default]
    Auto,
    Addr(IpAddr),
}

impl FromStr for InterfaceChoice {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("auto") || s.is_empty() {
            return Ok(Self::Auto);
        }
        s.parse()
            .map(Self::Addr)
            .map_err(|_| ServiceError::InvalidInterface(s.to_string()))
    }
}

impl InterfaceChoice {
    /// Resolves to a concrete address.
    ///
    /// `Auto` connects an unbound UDP socket to a public address (no packet
    /// is sent) and reads back the local address the OS picked.  Without a
    /// default route it falls back to `0.0.0.0`.
    pub fn resolve(self) -> IpAddr {
        match self {
            Self::Addr(ip) => ip,
            Self::Auto => match default_route_address() {
                Ok(ip) => ip,
                Err(e) => {
                    warn!("no default route ({e}); listening on all interfaces");
                    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
                }
            },
        }
    }
}

fn default_route_address() -> io::Result<IpAddr> {
    let probe = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
    probe.connect((Ipv4Addr::new(8, 8, 8, 8), 80))?;
    Ok(probe.local_addr()?.ip())
}

/// Socket and loop settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub interface: InterfaceChoice,
    /// 0 lets the OS pick.
    pub port: u16,
    /// Kernel receive buffer (`SO_RCVBUF`) in bytes.
    pub receive_buffer: usize,
    pub poll_interval: Duration,
    /// Service name, e.g. `"Yoke"`.
    pub name: String,
    pub id: u8,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            interface: InterfaceChoice::Auto,
            port: 0,
            receive_buffer: DEFAULT_RECEIVE_SIZE,
            poll_interval: DEFAULT_POLL_INTERVAL,
            name: "Yoke".to_string(),
            id: 1,
        }
    }
}

/// A bound service driving one session.
pub struct GamepadService {
    socket: Option<Socket>,
    session: Session,
    advertiser: Box<dyn Advertiser>,
    local_addr: SocketAddr,
    instance_name: String,
    poll_interval: Duration,
    buf: Vec<u8>,
    polls_since_activity: u64,
    closed: bool,
}

impl GamepadService {
    /// Binds the socket and publishes the advertisement.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::Bind`] if the socket cannot be opened or bound.
    /// - [`ServiceError::Discovery`] if the advertisement cannot be published.
    pub fn bind(
        config: &ServiceConfig,
        session: Session,
        mut advertiser: Box<dyn Advertiser>,
    ) -> Result<Self, ServiceError> {
        let addr = SocketAddr::new(config.interface.resolve(), config.port);
        let socket = open_socket(addr, config.receive_buffer)
            .map_err(|source| ServiceError::Bind { addr, source })?;
        let local_addr = socket
            .local_addr()
            .and_then(|bound| {
                bound
                    .as_socket()
                    .ok_or_else(|| io::Error::other("bound address is not IP"))
            })
            .map_err(|source| ServiceError::Bind { addr, source })?;

        let instance_name = format!("{}-{}-{}", host_name(), config.name, config.id);
        info!("{instance_name} listening on UDP {local_addr}");
        advertiser.publish(&Advertisement {
            instance_name: instance_name.clone(),
            address: local_addr,
        })?;

        Ok(Self {
            socket: Some(socket),
            session,
            advertiser,
            local_addr,
            instance_name,
            poll_interval: config.poll_interval,
            buf: Vec::new(),
            polls_since_activity: 0,
            closed: false,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// `<hostname>-<name>-<id>`.
    pub fn instance_name(&self) -> &str {
        &self.instance_name
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Drains pending datagrams, then checks liveness once.
    ///
    /// Returns every session event produced, in order.  A receive error
    /// other than would-block, timeout or connection reset is logged and
    /// ends the drain for this poll.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Closed`] after [`close`](Self::close).
    pub fn poll_once(&mut self, now: Instant) -> Result<Vec<SessionEvent>, ServiceError> {
        let socket = self.socket.as_ref().ok_or(ServiceError::Closed)?;
        self.polls_since_activity += 1;

        let mut events = drain(socket, &mut self.session, &mut self.buf, now);
        if events
            .iter()
            .any(|e| !matches!(e, SessionEvent::ForeignPeerIgnored { .. }))
        {
            self.polls_since_activity = 0;
        }

        if let Some(event) = self.session.check_liveness(now) {
            if let SessionEvent::TimedOut { peer, silent_for } = &event {
                let rate = self.polls_since_activity as f64 / silent_for.as_secs_f64().max(f64::EPSILON);
                info!("{peer} timed out after {silent_for:?}; listened {rate:.0} times per second");
            }
            self.polls_since_activity = 0;
            events.push(event);
        }
        Ok(events)
    }

    /// Polls until `running` is cleared, sleeping between polls.
    pub fn run(&mut self, running: &AtomicBool) {
        info!("service loop started");
        while running.load(Ordering::Relaxed) {
            match self.poll_once(Instant::now()) {
                Ok(events) => {
                    for event in events {
                        log_event(&event);
                    }
                }
                Err(ServiceError::Closed) => break,
                Err(e) => error!("{e}"),
            }
            std::thread::sleep(self.poll_interval);
        }
        info!("service loop stopped");
    }

    /// Releases the device, closes the socket and withdraws the
    /// advertisement.  Later calls do nothing.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.session.shutdown();
        self.socket = None;
        self.advertiser.withdraw();
        info!("{} closed", self.instance_name);
    }
}

impl Drop for GamepadService {
    fn drop(&mut self) {
        self.close();
    }
}

fn open_socket(addr: SocketAddr, receive_buffer: usize) -> io::Result<Socket> {
    let socket = Socket::new(Domain::for_address(addr), Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_recv_buffer_size(receive_buffer)?;
    socket.bind(&addr.into())?;
    socket.set_nonblocking(true)?;
    Ok(socket)
}

// ── Receiving ─────────────────────────────────────────────────────────────────

/// One datagram read into the receive buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Received {
    len: usize,
    from: SocketAddr,
}

/// Where the poll loop reads datagrams from.
trait DatagramSource {
    /// Reads one datagram into `buf`.  A datagram longer than `buf` fills it
    /// and reports `buf.len()` bytes.
    fn recv_datagram(&self, buf: &mut [u8]) -> io::Result<Received>;
}

impl DatagramSource for Socket {
    fn recv_datagram(&self, buf: &mut [u8]) -> io::Result<Received> {
        let capacity = buf.len();
        // SAFETY: `buf` is initialised and the socket only ever writes
        // initialised bytes into it.
        let uninit = unsafe { &mut *(buf as *mut [u8] as *mut [MaybeUninit<u8>]) };
        let (len, flags, sender) = self.recv_from_vectored(&mut [MaybeUninitSlice::new(uninit)])?;
        let from = sender
            .as_socket()
            .ok_or_else(|| io::Error::other("datagram sender is not an IP address"))?;
        let len = if flags.is_truncated() { capacity } else { len.min(capacity) };
        Ok(Received { len, from })
    }
}

/// Hands pending datagrams to `session` until the source runs dry or
/// [`MAX_READS_PER_POLL`] were read.
fn drain(
    source: &impl DatagramSource,
    session: &mut Session,
    buf: &mut Vec<u8>,
    now: Instant,
) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    for _ in 0..MAX_READS_PER_POLL {
        // One spare byte makes an oversized datagram visible as such.
        buf.resize(session.receive_size() + 1, 0);
        let received = match source.recv_datagram(buf) {
            Ok(received) => received,
            Err(e) if is_timeout_error(&e) => break,
            // Windows reports ICMP port-unreachable from an earlier send
            // on the next receive.
            Err(e) if e.kind() == io::ErrorKind::ConnectionReset => continue,
            Err(e) => {
                warn!("receive error: {e}");
                break;
            }
        };
        events.push(session.handle_datagram(received.from, &buf[..received.len], now));
    }
    events
}

/// Best-effort host name, `"padlink"` if none can be found.
pub fn host_name() -> String {
    ["HOSTNAME", "COMPUTERNAME"]
        .iter()
        .find_map(|var| std::env::var(var).ok())
        .or_else(|| std::fs::read_to_string("/proc/sys/kernel/hostname").ok())
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "padlink".to_string())
}

fn log_event(event: &SessionEvent) {
    match event {
        SessionEvent::ForeignPeerIgnored { from } => debug!("ignoring datagram from {from}"),
        SessionEvent::EmptyDatagram => debug!("ignoring empty datagram"),
        SessionEvent::NoDevice => debug!("state frame dropped: no device"),
        _ => {}
    }
}

/// Returns `true` for "nothing to read right now".
fn is_timeout_error(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

// ── Tests ─────────────────────────────────────────────────────────────────────
