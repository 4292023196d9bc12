//! Static HTTP server for the controller web client.
//!
//! The controller app downloads its layouts and scripts from the host.  On
//! startup the host walks the client directory, writes a `manifest.json`
//! describing it, and serves the directory over HTTP on the same port number
//! as the UDP service (TCP and UDP ports are independent).
//!
//! The manifest lets the app decide whether its cached copy is stale:
//!
//! ```json
//! {"folders":["layouts"],"files":["index.html","layouts/racing.json"],"size":5120,"mtime":1700000000.5}
//! ```
//!
//! Paths are relative and always `/`-separated.  `mtime` is the newest file
//! modification time in seconds since the Unix epoch.  `manifest.json`
//! itself is never listed.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use axum::Router;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tracing::info;

/// File name of the generated manifest.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Error type for the asset server and manifest.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode manifest: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("asset server failed: {0}")]
    Serve(#[source] std::io::Error),
}

/// Summary of the client directory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub folders: Vec<String>,
    pub files: Vec<String>,
    /// Total size of `files` in bytes.
    pub size: u64,
    /// Newest modification time, seconds since the epoch.
    pub mtime: f64,
}

/// Walks `root` and describes every file below it.
///
/// Entries are visited in name order, folders before their contents.
///
/// # Errors
///
/// Returns [`AssetError::Io`] if any directory or file cannot be read.
pub fn build_manifest(root: &Path) -> Result<Manifest, AssetError> {
    let mut manifest = Manifest::default();
    walk(root, root, &mut manifest)?;
    Ok(manifest)
}

fn walk(root: &Path, dir: &Path, manifest: &mut Manifest) -> Result<(), AssetError> {
    let mut entries = std::fs::read_dir(dir)
        .map_err(io_err(dir))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(io_err(dir))?;
    entries.sort_by_key(|entry| entry.file_name());

    let mut subdirs = Vec::new();
    for entry in entries {
        let path = entry.path();
        let meta = entry.metadata().map_err(io_err(&path))?;
        if meta.is_dir() {
            subdirs.push(path);
            continue;
        }
        if dir == root && entry.file_name() == MANIFEST_FILE {
            continue;
        }
        manifest.files.push(relative(root, &path));
        manifest.size += meta.len();
        if let Some(secs) = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs_f64())
        {
            manifest.mtime = manifest.mtime.max(secs);
        }
    }

    for sub in subdirs {
        manifest.folders.push(relative(root, &sub));
        walk(root, &sub, manifest)?;
    }
    Ok(())
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> AssetError {
    let path = path.to_path_buf();
    move |source| AssetError::Io { path, source }
}

fn relative(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Builds the manifest and writes it to `root/manifest.json`.
///
/// # Errors
///
/// Returns [`AssetError::Io`] if the directory cannot be walked or the file
/// cannot be written.
pub fn write_manifest(root: &Path) -> Result<Manifest, AssetError> {
    let manifest = build_manifest(root)?;
    let path = root.join(MANIFEST_FILE);
    std::fs::write(&path, serde_json::to_vec(&manifest)?)
        .map_err(|source| AssetError::Io { path, source })?;
    info!(
        "manifest written: {} files, {} bytes",
        manifest.files.len(),
        manifest.size
    );
    Ok(manifest)
}

/// Serves `root` on `listener` until `shutdown` completes.
///
/// # Errors
///
/// Returns [`AssetError::Serve`] if the server stops with an I/O error.
pub async fn serve_assets<F>(
    listener: TcpListener,
    root: PathBuf,
    shutdown: F,
) -> Result<(), AssetError>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!("serving {} on http://{addr}", root.display());
    }
    let app = Router::new().fallback_service(ServeDir::new(root));
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(AssetError::Serve)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
