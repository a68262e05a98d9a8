use std::io;
use std::net::{SocketAddr, TcpStream};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};
use rtstatus_common::{Limits, Settings};
use tempfile::{NamedTempFile, TempDir};

/// Number of files placed in the generated document root.
pub const FILE_COUNT: usize = 16;
/// Directory inside the document root; requesting it yields 403.
pub const FORBIDDEN_DIR: &str = "private";

pub struct ServerProcess {
    child: Child,
    pub addr: SocketAddr,
}

impl Drop for ServerProcess {
    fn drop(&mut self) {
        self.child.kill().ok();
    }
}

/// A running server together with the files it serves.
pub struct Host {
    pub process: ServerProcess,
    /// Request paths of every file in the document root.
    pub files: Vec<String>,
    // Kept alive so the document root and settings file stay on disk until the process exits.
    _root: TempDir,
    _settings: NamedTempFile,
}

/// Reserve `count` free TCP ports by binding to port 0 for each, then
/// releasing them all at once.  Holding all listeners alive until the ports
/// are collected prevents the same port from being issued twice.
pub fn pick_free_ports(count: usize) -> io::Result<Vec<u16>> {
    let listeners = (0..count)
        .map(|_| std::net::TcpListener::bind("127.0.0.1:0"))
        .collect::<io::Result<Vec<_>>>()?;
    listeners.iter().map(|l| Ok(l.local_addr()?.port())).collect()
}

/// Fill `root` with [`FILE_COUNT`] files of growing size plus the
/// [`FORBIDDEN_DIR`] directory. Returns the request path of each file.
pub fn populate_document_root(root: &Path) -> io::Result<Vec<String>> {
    std::fs::create_dir_all(root.join(FORBIDDEN_DIR))?;
    (0..FILE_COUNT)
        .map(|i| {
            let name = format!("page_{i}.html");
            std::fs::write(root.join(&name), vec![b'x'; 64 + i * 512])?;
            Ok(format!("/{name}"))
        })
        .collect()
}

/// Return the path to the `rtstatus-server` binary that sits alongside this
/// executable in `target/debug/` (or `target/debug/deps/` when run as a test).
fn server_binary_path() -> Result<PathBuf, String> {
    let mut path = std::env::current_exe()
        .map_err(|e| format!("Cannot determine own executable path: {e}"))?;
    path.pop(); // remove own filename
    if path.file_name().map(|n| n == "deps").unwrap_or(false) {
        path.pop(); // step out of target/debug/deps → target/debug/
    }
    path.push("rtstatus-server");
    Ok(path)
}

const READY_TIMEOUT: Duration = Duration::from_secs(30);

impl Host {
    /// Build the `rtstatus-server` binary, spawn it on a free port over a
    /// generated document root, and wait until it accepts connections.
    ///
    /// Returns `Err` if the build fails, the process cannot be spawned, or the
    /// readiness deadline elapses. The caller maps this to exit code 3.
    pub fn build_and_spawn(limits: Limits) -> Result<Self, String> {
        let status = Command::new("cargo")
            .args(["build", "-p", "rtstatus-server"])
            .status()
            .map_err(|e| format!("Failed to invoke cargo build: {e}"))?;
        if !status.success() {
            return Err(format!("cargo build -p rtstatus-server failed: {status}"));
        }

        let root = tempfile::tempdir().map_err(|e| format!("Failed to create document root: {e}"))?;
        let files = populate_document_root(root.path())
            .map_err(|e| format!("Failed to populate document root: {e}"))?;

        let port = pick_free_ports(1)
            .map_err(|e| format!("Failed to reserve a port: {e}"))?
            .first()
            .copied()
            .ok_or("No port reserved")?;
        let addr = SocketAddr::from(([127, 0, 0, 1], port));

        let settings = Settings {
            listen_addr: addr.to_string(),
            server_limit: limits.server_limit,
            thread_limit: limits.thread_limit,
            document_root: root.path().to_path_buf(),
            listen_file: None,
        };
        let settings_file =
            NamedTempFile::new().map_err(|e| format!("Failed to create settings file: {e}"))?;
        serde_json::to_writer(&settings_file, &settings)
            .map_err(|e| format!("Failed to write settings JSON: {e}"))?;

        let child = Command::new(server_binary_path()?)
            .arg("--config")
            .arg(settings_file.path())
            .stdout(Stdio::null())
            .spawn()
            .map_err(|e| format!("Failed to spawn server: {e}"))?;
        // If polling fails, `process` drops here and kills the child.
        let process = ServerProcess { child, addr };

        poll_until_ready(addr, Instant::now() + READY_TIMEOUT)
            .map_err(|e| format!("Server not ready within timeout: {e}"))?;

        Ok(Host { process, files, _root: root, _settings: settings_file })
    }
}

/// Poll `addr` with a TCP connect attempt until the connection succeeds
/// or `deadline` is reached. A bare connect is not an HTTP request, so it
/// leaves no trace in the server's counters.
fn poll_until_ready(addr: SocketAddr, deadline: Instant) -> Result<(), String> {
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(format!("timed out waiting for {addr}"));
        }
        let attempt = Duration::min(remaining, Duration::from_millis(200));
        if TcpStream::connect_timeout(&addr, attempt).is_ok() {
            return Ok(());
        }
        std::thread::sleep(Duration::from_millis(50));
    }
}
