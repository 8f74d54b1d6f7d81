//! peercam: entry point.
//!
//! ```text
//! peercam                          Run with peercam.toml (or defaults)
//! peercam --config <path>          Load a custom config TOML
//! peercam --target <host:port>     Override the peer address
//! peercam --bind <addr>            Override the local UDP address
//! peercam --gen-config             Write default config to stdout
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use peercam::config::NodeConfig;
use peercam::node::PeerNode;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "peercam", about = "Peer-to-peer UDP video node")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "peercam.toml")]
    config: PathBuf,

    /// Peer address, overriding the config file.
    #[arg(short, long, value_name = "HOST:PORT")]
    target: Option<String>,

    /// Local UDP bind address, overriding the config file.
    #[arg(short, long, value_name = "ADDR")]
    bind: Option<String>,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // --gen-config: dump defaults and exit.
    if cli.gen_config {
        println!("{}", NodeConfig::default_toml()?);
        return Ok(());
    }

    // Load config, then apply overrides.
    let mut config = NodeConfig::load(&cli.config);
    if let Some(target) = &cli.target {
        config.set_target(target)?;
    }
    if let Some(bind) = cli.bind {
        config.network.bind = bind;
    }

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("peercam v{}", env!("CARGO_PKG_VERSION"));
    info!("bind: {}", config.network.bind);
    info!(
        "target: {}:{}",
        config.network.target_host, config.network.target_port
    );
    info!(
        "capture: {}x{} @ {} fps",
        config.capture.width, config.capture.height, config.capture.fps
    );

    let node = PeerNode::new(config);
    let stop = node.stop_handle();

    // Ctrl-C handler.
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Ctrl-C received, shutting down");
        stop.cancel();
    });

    node.run().await?;

    Ok(())
}
