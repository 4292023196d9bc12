//! Service advertisement over multicast DNS (DNS-SD).
//!
//! Once the service is bound it publishes an [`Advertisement`] so controller
//! apps on the LAN can find it without typing an address.  The host is
//! registered as an instance of `_yoke._udp.local.`, the service type the
//! Yoke controller apps browse for:
//!
//! ```text
//! desk-Yoke-1._yoke._udp.local.   SRV  desk-Yoke-1.local.:40213
//! desk-Yoke-1.local.              A    192.168.1.20
//! ```
//!
//! # Who answers the queries (for beginners)
//!
//! `mdns-sd` runs its own daemon thread that joins the multicast group and
//! answers browse queries for every registered service.  [`MdnsAdvertiser`]
//! starts that daemon on publish, unregisters the service on
//! withdraw (which sends a "goodbye" so browsers drop the entry at once) and
//! then shuts the daemon down.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use mdns_sd::{ServiceDaemon, ServiceInfo};
use thiserror::Error;
use tracing::{debug, info, warn};

/// DNS-SD service type the controller apps browse for.
pub const SERVICE_TYPE: &str = "_yoke._udp.local.";

/// How long withdraw waits for the goodbye to go out.
const UNREGISTER_TIMEOUT: Duration = Duration::from_secs(1);

/// Error type for service advertisement.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The mDNS daemon refused to start or to register the service.
    #[error("mDNS advertisement failed: {0}")]
    Mdns(#[from] mdns_sd::Error),
}

/// What the service tells the network about itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advertisement {
    /// `<hostname>-<name>-<id>`.
    pub instance_name: String,
    /// Address and UDP port controllers should send to.
    pub address: SocketAddr,
}

impl Advertisement {
    /// `<instance>._yoke._udp.local.`
    pub fn full_name(&self) -> String {
        format!("{}.{SERVICE_TYPE}", self.instance_name)
    }

    /// The DNS-SD record set for this advertisement.
    ///
    /// An unspecified address (listening on every interface) is replaced by
    /// the addresses of all interfaces when the record is announced.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::Mdns`] if the instance name is not a valid
    /// DNS-SD label.
    pub fn service_info(&self) -> Result<ServiceInfo, DiscoveryError> {
        let host = format!("{}.local.", self.instance_name);
        let ip: IpAddr = self.address.ip();
        let info = ServiceInfo::new(
            SERVICE_TYPE,
            &self.instance_name,
            &host,
            ip,
            self.address.port(),
            None::<HashMap<String, String>>,
        )?;
        Ok(if ip.is_unspecified() {
            info.enable_addr_auto()
        } else {
            info
        })
    }
}

/// Publishes and withdraws the service on the local network.
#[cfg_attr(test, mockall::automock)]
pub trait Advertiser: Send {
    /// Starts advertising.  Replaces any earlier advertisement.
    fn publish(&mut self, advertisement: &Advertisement) -> Result<(), DiscoveryError>;

    /// Stops advertising.  Calling it when nothing is published is a no-op.
    fn withdraw(&mut self);
}

/// Advertiser that does nothing, for `--no-advertise` and tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAdvertiser;

impl Advertiser for NullAdvertiser {
    fn publish(&mut self, _advertisement: &Advertisement) -> Result<(), DiscoveryError> {
        Ok(())
    }

    fn withdraw(&mut self) {}
}

/// Advertiser registering a DNS-SD service with an `mdns-sd` daemon.
#[derive(Default)]
pub struct MdnsAdvertiser {
    daemon: Option<ServiceDaemon>,
    registered: Option<String>,
}

impl MdnsAdvertiser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Full name of the registered service, if any.
    pub fn registered(&self) -> Option<&str> {
        self.registered.as_deref()
    }
}

impl Advertiser for MdnsAdvertiser {
    fn publish(&mut self, advertisement: &Advertisement) -> Result<(), DiscoveryError> {
        self.withdraw();

        let info = advertisement.service_info()?;
        let full_name = advertisement.full_name();
        let daemon = ServiceDaemon::new()?;
        daemon.register(info)?;
        self.daemon = Some(daemon);
        self.registered = Some(full_name);

        info!(
            "advertising {} at {} as {SERVICE_TYPE}",
            advertisement.instance_name, advertisement.address
        );
        Ok(())
    }

    fn withdraw(&mut self) {
        let Some(daemon) = self.daemon.take() else {
            return;
        };
        if let Some(full_name) = self.registered.take() {
            match daemon.unregister(&full_name) {
                Ok(status) => {
                    if let Err(e) = status.recv_timeout(UNREGISTER_TIMEOUT) {
                        debug!("no unregister confirmation for {full_name}: {e}");
                    }
                }
                Err(e) => warn!("failed to unregister {full_name}: {e}"),
            }
        }
        if let Err(e) = daemon.shutdown() {
            warn!("mDNS daemon did not shut down cleanly: {e}");
        }
        info!("advertisement withdrawn");
    }
}

impl Drop for MdnsAdvertiser {
    fn drop(&mut self) {
        self.withdraw();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
