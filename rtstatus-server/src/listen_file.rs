//! Startup file describing where the server lives and listens.

use std::fs;
use std::io;
use std::net::SocketAddr;
use std::path::Path;

/// Writes `ServerRoot`, `DocumentRoot` and `Listen[0]` lines to `path`,
/// replacing any previous content.
pub fn write(path: &Path, document_root: &Path, addr: SocketAddr) -> io::Result<()> {
    fs::write(path, contents(&std::env::current_dir()?, document_root, addr))
}

pub fn contents(server_root: &Path, document_root: &Path, addr: SocketAddr) -> String {
    format!(
        "ServerRoot: {}\nDocumentRoot: {}\nListen[0]: http://{}\n",
        server_root.display(),
        document_root.display(),
        addr
    )
}
