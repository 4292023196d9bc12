//! Infrastructure layer of the host.
//!
//! Contains OS-facing adapters: virtual gamepad drivers, the UDP service and
//! its mDNS advertisement, the client asset server, and config storage.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `padlink_core`, but MUST NOT be imported by the `application` layer.

pub mod assets;
pub mod network;
pub mod storage;
pub mod virtual_device;
