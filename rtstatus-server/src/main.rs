use clap::Parser;
use rtstatus_common::Settings;
use rtstatus_server::{Server, ServerConfig};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "rtstatus-server")]
struct Args {
    /// Path to a JSON settings file. Flags below override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to bind, e.g. 127.0.0.1:8080.
    #[arg(long)]
    listen: Option<String>,

    /// Number of server groups in the worker slot table.
    #[arg(long)]
    server_limit: Option<usize>,

    /// Number of worker slots per server group.
    #[arg(long)]
    thread_limit: Option<usize>,

    /// Directory static files are served from.
    #[arg(long)]
    document_root: Option<PathBuf>,

    /// File to describe the listening address in once bound.
    #[arg(long)]
    listen_file: Option<PathBuf>,
}

impl Args {
    fn into_settings(self) -> Result<Settings, Box<dyn std::error::Error>> {
        let mut settings: Settings = match &self.config {
            Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
            None => Settings::default(),
        };
        if let Some(listen) = self.listen {
            settings.listen_addr = listen;
        }
        if let Some(n) = self.server_limit {
            settings.server_limit = n;
        }
        if let Some(n) = self.thread_limit {
            settings.thread_limit = n;
        }
        if let Some(root) = self.document_root {
            settings.document_root = root;
        }
        if self.listen_file.is_some() {
            settings.listen_file = self.listen_file;
        }
        Ok(settings)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = Args::parse().into_settings()?;
    let config = ServerConfig::from_settings(&settings)?;

    let (ready_tx, ready_rx) = tokio::sync::oneshot::channel();

    // Print "Listening on <addr>" once the server signals it is bound.
    tokio::spawn(async move {
        if let Ok(addr) = ready_rx.await {
            println!("Listening on {}", addr);
        }
    });

    Server::new(config).run(ready_tx).await?;
    Ok(())
}
