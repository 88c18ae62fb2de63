mod spool;

use std::io::stderr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use bba::bridge::Bridge;
use bba::config::Watcher;
use bba::framing::DEFAULT_MAX_FRAME_LEN;
use bba::source::{Connector, SourceKind, DEFAULT_PORT};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Bridge a BBA data concentrator stream onto the outbound bus.
///
/// Connects to the concentrator's data port (or replays a capture file),
/// decodes and validates each packet, resolves station and channel names
/// from the site configuration, and republishes every packet wrapped in a
/// forwarding envelope. Runs until the stream or the outbound side fails;
/// restart is left to process supervision.
///
/// The site configuration is re-read whenever the file changes, without a
/// restart.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Address of the data concentrator.
    #[arg(short = 'a', long, conflicts_with = "replay")]
    address: Option<String>,

    /// Data port on the concentrator.
    #[arg(short = 'd', long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Replay a captured byte stream from a file instead of connecting.
    #[arg(short = 't', long, value_name = "path")]
    replay: Option<PathBuf>,

    /// Site configuration file.
    #[arg(short = 'g', long, default_value = "bba2bus.json", value_name = "path")]
    config: PathBuf,

    /// Spool file enveloped packets are appended to.
    #[arg(short, long, default_value = "bba2bus.spool", value_name = "path")]
    output: PathBuf,

    /// Maximum bytes accumulated for a single frame.
    #[arg(long, default_value_t = DEFAULT_MAX_FRAME_LEN)]
    max_frame_len: usize,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(stderr)
        .with_ansi(false)
        .with_env_filter(
            EnvFilter::try_from_env("BBA_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let kind = match (&cli.address, &cli.replay) {
        (Some(host), None) => SourceKind::Net {
            host: host.clone(),
            port: cli.port,
        },
        (None, Some(path)) => SourceKind::File { path: path.clone() },
        _ => bail!("an address (-a) or a replay file (-t) is required"),
    };

    let mut watcher = Watcher::new(&cli.config);
    let config = watcher
        .poll()
        .with_context(|| format!("loading config {:?}", cli.config))?
        .expect("first poll always loads");
    info!(
        path = %cli.config.display(),
        network = %config.network,
        stations = config.tables.stations.len(),
        "config file loaded"
    );

    let mut bridge = Bridge::new(&config.network, Arc::new(config.tables), cli.max_frame_len);
    let mut source = Connector::builder().build().connect(&kind)?;
    let mut sink = spool::SpoolSink::create(&cli.output)
        .with_context(|| format!("creating spool {:?}", cli.output))?;

    let mut reload = || match watcher.poll() {
        Ok(Some(config)) => {
            info!(network = %config.network, "updated config file loaded");
            Some(Arc::new(config.tables))
        }
        Ok(None) => None,
        Err(err) => {
            warn!(%err, "config reload failed, keeping current tables");
            None
        }
    };

    let zult = bridge.run(&mut source, &mut sink, &mut reload);
    info!(
        forwarded = bridge.stats.forwarded,
        dropped = bridge.stats.dropped,
        "bridge stopped"
    );
    zult.context("bridge terminated")
}
