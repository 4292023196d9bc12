//! Network infrastructure for the host.
//!
//! # Sub-modules
//!
//! - **`service`** – Owns the UDP socket, polls it and feeds every datagram to
//!   the session.  Also resolves the listening interface and the instance name.
//!
//! - **`discovery`** – Registers the bound service as a `_yoke._udp` DNS-SD
//!   instance over multicast DNS so controller apps can find it.

pub mod discovery;
pub mod service;

pub use discovery::{Advertisement, Advertiser, DiscoveryError, MdnsAdvertiser, NullAdvertiser};
pub use service::{GamepadService, InterfaceChoice, ServiceConfig, ServiceError};
