//! Site configuration loading.
//!
//! The configuration is a JSON document carrying the network name and the
//! lookup tables:
//!
//! ```json
//! {
//!   "network": "AZ",
//!   "stations": { "697": "PFO" },
//!   "station_channels": { "BBA/BS_697_1": { "sensor": "BHZ" } },
//!   "das_params": { "3": "BATT" },
//!   "dc_params": {},
//!   "rtx_params": {}
//! }
//! ```
//!
//! [`Watcher`] carries the reload contract: it re-reads the file only when
//! the modification time changed, so a rewrite of the file is picked up
//! without a restart.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::Deserialize;
use tracing::debug;

use crate::site::TableSet;
use crate::{Error, Result};

#[derive(Debug, Deserialize)]
pub struct BridgeConfig {
    /// Network code prepended to every source name.
    pub network: String,
    #[serde(flatten)]
    pub tables: TableSet,
}

/// Load the configuration file.
///
/// # Errors
/// [`Error::Io`] if the file cannot be opened, [`Error::Config`] if it
/// does not parse.
pub fn load<P: AsRef<Path>>(path: P) -> Result<BridgeConfig> {
    let file = File::open(path.as_ref())?;
    serde_json::from_reader(file).map_err(|err| Error::Config(err.to_string()))
}

/// Reloads the configuration when the file changes.
pub struct Watcher {
    path: PathBuf,
    modified: Option<SystemTime>,
}

impl Watcher {
    #[must_use]
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Watcher {
            path: path.as_ref().to_path_buf(),
            modified: None,
        }
    }

    /// Load the configuration if the file changed since the last
    /// successful load. The first call always loads.
    ///
    /// # Errors
    /// [`Error::Io`] if the file cannot be examined or opened,
    /// [`Error::Config`] if it does not parse. The recorded modification
    /// time is only advanced on success, so a failed reload is retried on
    /// the next poll.
    pub fn poll(&mut self) -> Result<Option<BridgeConfig>> {
        let modified = std::fs::metadata(&self.path)?.modified()?;
        if self.modified == Some(modified) {
            return Ok(None);
        }
        let config = load(&self.path)?;
        debug!(path = %self.path.display(), stations = config.tables.stations.len(), "config file read");
        self.modified = Some(modified);
        Ok(Some(config))
    }
}
