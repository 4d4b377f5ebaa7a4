use std::path::PathBuf;

use clap::Parser;
use lantern::config::Config;
use lantern::server;
use tracing_subscriber::EnvFilter;

/// Minimal static HTTP/1.1 server
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(short, long)]
    address: Option<String>,

    #[arg(short, long)]
    port: Option<u16>,

    /// Idle timeout in seconds
    #[arg(short, long)]
    timeout: Option<u64>,

    /// Directory served as the content root
    #[arg(short, long)]
    root: Option<PathBuf>,
}

impl Args {
    fn into_config(self) -> anyhow::Result<Config> {
        let base = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };
        let mut cfg = base.with_env(|key| std::env::var(key).ok());

        if self.address.is_some() || self.port.is_some() {
            let (current_host, current_port) = cfg
                .listen_addr
                .rsplit_once(':')
                .unwrap_or((cfg.listen_addr.as_str(), "8001"));
            let host = self.address.as_deref().unwrap_or(current_host);
            let port = self.port.map(|p| p.to_string()).unwrap_or_else(|| current_port.to_string());
            cfg.listen_addr = format!("{}:{}", host, port);
        }
        if let Some(timeout) = self.timeout {
            cfg.timeout_secs = timeout;
        }
        if let Some(root) = self.root {
            cfg.content_root = root;
        }

        Ok(cfg)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = Args::parse().into_config()?;
    tracing::info!(
        root = %cfg.content_root.display(),
        timeout_secs = cfg.timeout_secs,
        "Starting server"
    );

    server::listener::run(&cfg, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    })
    .await
}
