//! padlink host: entry point.
//!
//! Turns a phone's touchscreen controls into a virtual gamepad on this
//! machine.  The phone app sends a layout ("j1,b1,b2") and then a stream of
//! state frames over UDP; the host mirrors them onto a uinput (Linux) or vJoy
//! (Windows) device that games see as a regular controller.
//!
//! # Usage
//!
//! ```text
//! padlink [OPTIONS]
//!
//! Options:
//!   --name <NAME>          Device name shown to games [default: Yoke]
//!   --id <ID>              Device number, also the vJoy id [default: 1]
//!   --iface <IFACE>        "auto" or an IP address to listen on [default: auto]
//!   --port <PORT>          UDP (and HTTP) port, 0 = any [default: 0]
//!   --bufsize <BYTES>      Receive buffer size [default: 64]
//!   --client-path <DIR>    Directory served to the phone app [default: client]
//!   --no-assets            Do not serve the client directory
//!   --no-advertise         Do not register the mDNS service
//!   --backend <KIND>       platform | mock [default: platform]
//!   --config <FILE>        Config file instead of the platform default
//!   --liveness-ms <MS>     Peer silence before disconnecting [default: 2000]
//!   --poll-ms <MS>         Sleep between socket polls [default: 10]
//!   --write-config         Save the merged settings to the config file and exit
//! ```
//!
//! Defaults come from the config file; every flag overrides it and can also
//! be set through the `PADLINK_*` environment variable of the same name.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  ├─ load config, apply CLI overrides
//!  ├─ Session (virtual gamepad for the default layout)
//!  ├─ GamepadService (UDP socket + mDNS)      -- blocking thread
//!  ├─ asset server (axum on the same port)     -- tokio task
//!  └─ Ctrl-C handler clears `running`          -- tokio task
//! ```

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use padlink_core::{AliasTable, Layout};
use padlink_host::application::session::{Session, SessionConfig, MAX_DATAGRAM_SIZE};
use padlink_host::infrastructure::assets::{serve_assets, write_manifest};
use padlink_host::infrastructure::network::{
    Advertiser, GamepadService, InterfaceChoice, MdnsAdvertiser, NullAdvertiser, ServiceConfig,
};
use padlink_host::infrastructure::storage::config::{
    config_file_path, load_config, save_config, HostConfig,
};
use padlink_host::infrastructure::virtual_device::{make_backend, BackendKind};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Remote touchscreen gamepad host.
///
/// Every option left unset falls back to the config file, then to the
/// built-in default.
#[derive(Debug, Parser)]
#[command(
    name = "padlink",
    about = "Turns a phone's touchscreen controls into a virtual gamepad",
    version
)]
struct Cli {
    /// Device name shown to games; the full name is `<name>-<id>`.
    #[arg(long, env = "PADLINK_NAME")]
    name: Option<String>,

    /// Device number (1..=16 on vJoy).
    #[arg(long, env = "PADLINK_ID")]
    id: Option<u8>,

    /// `auto` or the IP address of the interface to listen on.
    #[arg(long, env = "PADLINK_IFACE")]
    iface: Option<String>,

    /// UDP port for controllers; the asset server uses the same TCP port.
    #[arg(long, env = "PADLINK_PORT")]
    port: Option<u16>,

    /// Receive buffer size in bytes.
    #[arg(long, env = "PADLINK_BUFSIZE")]
    bufsize: Option<usize>,

    /// Directory holding the controller web client.
    #[arg(long, env = "PADLINK_CLIENT_PATH")]
    client_path: Option<PathBuf>,

    /// Do not serve the client directory.
    #[arg(long, env = "PADLINK_NO_ASSETS")]
    no_assets: bool,

    /// Do not register the mDNS service.
    #[arg(long, env = "PADLINK_NO_ADVERTISE")]
    no_advertise: bool,

    /// Virtual gamepad backend.
    #[arg(long, value_enum, env = "PADLINK_BACKEND")]
    backend: Option<BackendKind>,

    /// Config file to read instead of the platform default.
    #[arg(long, env = "PADLINK_CONFIG")]
    config: Option<PathBuf>,

    /// Peer silence in milliseconds before the session is dropped.
    #[arg(long, env = "PADLINK_LIVENESS_MS")]
    liveness_ms: Option<u64>,

    /// Sleep between socket polls in milliseconds.
    #[arg(long, env = "PADLINK_POLL_MS")]
    poll_ms: Option<u64>,

    /// Save the merged settings to the config file and exit.
    #[arg(long)]
    write_config: bool,
}

impl Cli {
    /// Applies every flag that was given on top of `config`.
    ///
    /// The receive buffer is capped at [`MAX_DATAGRAM_SIZE`] whichever
    /// source set it.
    fn into_host_config(self, mut config: HostConfig) -> HostConfig {
        if let Some(name) = self.name {
            config.device.name = name;
        }
        if let Some(id) = self.id {
            config.device.id = id;
        }
        if let Some(backend) = self.backend {
            config.device.backend = backend;
        }
        if let Some(iface) = self.iface {
            config.network.interface = iface;
        }
        if let Some(port) = self.port {
            config.network.port = port;
        }
        if let Some(bufsize) = self.bufsize {
            config.network.receive_buffer = bufsize;
        }
        if let Some(ms) = self.liveness_ms {
            config.network.liveness_ms = ms;
        }
        if let Some(ms) = self.poll_ms {
            config.network.poll_interval_ms = ms;
        }
        if self.no_advertise {
            config.network.advertise = false;
        }
        if let Some(path) = self.client_path {
            config.assets.client_path = path;
        }
        if self.no_assets {
            config.assets.enabled = false;
        }
        config.network.receive_buffer = config.network.receive_buffer.min(MAX_DATAGRAM_SIZE);
        config
    }
}

/// Saves `config` to `path`, or to the platform config file when `None`.
fn write_config_file(config: &HostConfig, path: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    let path = match path {
        Some(path) => path,
        None => config_file_path().context("no platform config directory; pass --config")?,
    };
    save_config(config, &path).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let file_config =
        load_config(cli.config.as_deref()).context("failed to load configuration")?;
    let config_path = cli.config.clone();
    let write_config = cli.write_config;
    let config = cli.into_host_config(file_config);

    // `RUST_LOG` wins over the config file's `log_level`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    if write_config {
        let path = write_config_file(&config, config_path)?;
        info!("configuration written to {}", path.display());
        return Ok(());
    }

    info!("padlink host starting");

    // ── Session ───────────────────────────────────────────────────────────────
    let aliases = AliasTable::builtin().with_overrides(config.aliases.clone());
    let default_layout = if config.device.default_layout.trim().is_empty() {
        Layout::empty()
    } else {
        Layout::negotiate(config.device.default_layout.as_bytes(), &aliases)
            .context("invalid default layout in configuration")?
    };
    let backend = make_backend(config.device.backend, &config.device.name, config.device.id)
        .context("no virtual gamepad backend")?;
    let session = Session::new(
        backend,
        aliases,
        default_layout,
        SessionConfig {
            default_receive_size: config.network.receive_buffer,
            liveness_window: Duration::from_millis(config.network.liveness_ms),
        },
        Instant::now(),
    )
    .context("failed to create the virtual gamepad")?;

    // ── UDP service ───────────────────────────────────────────────────────────
    let service_config = ServiceConfig {
        interface: config
            .network
            .interface
            .parse::<InterfaceChoice>()
            .context("invalid --iface")?,
        port: config.network.port,
        receive_buffer: config.network.receive_buffer,
        poll_interval: Duration::from_millis(config.network.poll_interval_ms),
        name: config.device.name.clone(),
        id: config.device.id,
    };
    let advertiser: Box<dyn Advertiser> = if config.network.advertise {
        Box::new(MdnsAdvertiser::new())
    } else {
        Box::new(NullAdvertiser)
    };
    let mut service = GamepadService::bind(&service_config, session, advertiser)
        .context("failed to start the gamepad service")?;
    let local_addr = service.local_addr();
    info!("{} ready at {local_addr}", service.instance_name());

    // ── Asset server ──────────────────────────────────────────────────────────
    let (stop_assets, assets_stopped) = tokio::sync::oneshot::channel::<()>();
    let assets_task = if config.assets.enabled {
        let root = config.assets.client_path.clone();
        if let Err(e) = write_manifest(&root) {
            warn!("could not write manifest.json; the app may use stale layouts: {e}");
        }
        match tokio::net::TcpListener::bind(local_addr).await {
            Ok(listener) => Some(tokio::spawn(serve_assets(listener, root, async move {
                let _ = assets_stopped.await;
            }))),
            Err(e) => {
                warn!("asset server not started on TCP {local_addr}: {e}");
                None
            }
        }
    } else {
        None
    };

    // ── Ctrl-C handler ────────────────────────────────────────────────────────
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("shutdown signal received");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => error!("failed to listen for Ctrl+C signal: {e}"),
        }
    });

    // ── Service loop ──────────────────────────────────────────────────────────
    tokio::task::spawn_blocking(move || {
        service.run(&running);
        service.close();
    })
    .await
    .context("service thread panicked")?;

    let _ = stop_assets.send(());
    if let Some(task) = assets_task {
        match task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("{e}"),
            Err(e) => warn!("asset server task failed: {e}"),
        }
    }

    info!("padlink host stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
