//! Station and channel identity tables.
//!
//! The concentrator speaks in numeric station and channel ids; downstream
//! consumers want names. The mappings come from the site configuration and
//! are held as an immutable [`TableSet`] snapshot behind an `Arc`. A reload
//! never mutates a snapshot in place; it builds a new one and the bridge
//! swaps the reference between frames, so an in-flight decode always sees
//! a self-consistent table.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Deserialize;
use tracing::warn;

use crate::framing::Subtype;
use crate::{Error, Result};

/// One entry of the station-channel table.
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelDetail {
    /// Sensor name reported for the channel, e.g. `BHZ`.
    pub sensor: String,
}

/// The five lookup tables, keyed by decimal-string ids as they appear in
/// the site configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TableSet {
    /// Station name by station id.
    pub stations: HashMap<String, String>,
    /// Channel detail by `BBA/{subcode}_{station}_{channel}`.
    pub station_channels: HashMap<String, ChannelDetail>,
    /// Parameter name by channel id, DAS state-of-health packets.
    pub das_params: HashMap<String, String>,
    /// Parameter name by channel id, DC state-of-health packets.
    pub dc_params: HashMap<String, String>,
    /// Parameter name by channel id, RTX state-of-health packets.
    pub rtx_params: HashMap<String, String>,
}

/// Resolves numeric ids against the current [`TableSet`] snapshot.
pub struct Resolver {
    tables: Arc<TableSet>,
    /// Station-channel keys already reported missing, so the synthesized
    /// fallback is logged once per key instead of once per packet.
    logged_misses: HashSet<String>,
}

impl Resolver {
    #[must_use]
    pub fn new(tables: Arc<TableSet>) -> Self {
        Resolver {
            tables,
            logged_misses: HashSet::new(),
        }
    }

    /// Swap in a new table snapshot. The miss log survives so a reload
    /// does not repeat old noise.
    pub fn replace(&mut self, tables: Arc<TableSet>) {
        self.tables = tables;
    }

    /// Rate class for a data packet's sample rate: under 10 Hz is `LS`,
    /// 10 up to 100 is `BS`, 100 and above is `HS`.
    ///
    /// # Errors
    /// [`Error::BadRate`] for a negative or non-finite rate.
    pub fn rate_class(&self, rate: f32) -> Result<&'static str> {
        if rate >= 100.0 {
            Ok("HS")
        } else if rate >= 10.0 {
            Ok("BS")
        } else if rate >= 0.0 {
            Ok("LS")
        } else {
            Err(Error::BadRate(rate))
        }
    }

    /// Station name for a station id.
    ///
    /// # Errors
    /// [`Error::UnknownStation`] if the station table has no entry.
    pub fn station_name(&self, id: u16) -> Result<String> {
        self.tables
            .stations
            .get(&id.to_string())
            .cloned()
            .ok_or(Error::UnknownStation(id))
    }

    /// Channel name for one channel sub-header.
    ///
    /// Data packets look up `BBA/{subcode}_{station}_{channel}` in the
    /// station-channel table and fall back to a synthesized
    /// `{subcode}_{channel}` name on a miss; the miss is logged the first
    /// time each key is seen. State-of-health packets look up the channel
    /// id in their flat parameter table; there a miss is an error and is
    /// logged on every occurrence.
    ///
    /// # Errors
    /// [`Error::UnknownParam`] on a state-of-health table miss.
    pub fn channel_name(
        &mut self,
        subtype: Subtype,
        subcode: &str,
        station_id: u16,
        channel: u8,
    ) -> Result<String> {
        if subtype == Subtype::Data {
            let key = format!("BBA/{subcode}_{station_id}_{channel}");
            return match self.tables.station_channels.get(&key) {
                Some(detail) => Ok(detail.sensor.clone()),
                None => {
                    let fallback = format!("{subcode}_{channel}");
                    if self.logged_misses.insert(key.clone()) {
                        warn!(%key, %fallback, "no station-channel entry, synthesizing name");
                    }
                    Ok(fallback)
                }
            };
        }

        let (table, params) = match subtype {
            Subtype::DasStatus => ("DAS", &self.tables.das_params),
            Subtype::DcStatus => ("DC", &self.tables.dc_params),
            Subtype::RtxStatus => ("RTX", &self.tables.rtx_params),
            Subtype::Data => unreachable!("data subtype handled above"),
        };
        match params.get(&channel.to_string()) {
            Some(name) => Ok(name.clone()),
            None => {
                warn!(table, channel, "no parameter entry for channel");
                Err(Error::UnknownParam { table, channel })
            }
        }
    }
}
