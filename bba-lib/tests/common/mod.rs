use std::collections::HashMap;
use std::sync::Arc;

use bba::framing::{checksum, Subtype, SYNC};
use bba::packet;
use bba::site::{ChannelDetail, TableSet};

pub const HEADER_SIZE: u16 = 24;

/// Build a sealed wire frame with the given channels as (id, data) pairs.
pub fn wire_frame(subtype: Subtype, station: u16, rate: u16, channels: &[(u8, &[u8])]) -> Vec<u8> {
    let mut dat = vec![0u8; usize::from(HEADER_SIZE)];
    for (id, body) in channels {
        dat.push(*id);
        dat.push(0);
        dat.extend_from_slice(&u16::try_from(body.len()).unwrap().to_be_bytes());
        dat.extend_from_slice(body);
    }
    let size = u16::try_from(dat.len()).unwrap();
    dat[0] = SYNC;
    dat[1] = subtype.wire();
    dat[packet::SIZE_OFFSET..packet::SIZE_OFFSET + 2].copy_from_slice(&size.to_be_bytes());
    dat[packet::HEADER_SIZE_OFFSET..packet::HEADER_SIZE_OFFSET + 2]
        .copy_from_slice(&HEADER_SIZE.to_be_bytes());
    dat[packet::STATION_OFFSET..packet::STATION_OFFSET + 2].copy_from_slice(&station.to_be_bytes());
    dat[packet::SECONDS_OFFSET..packet::SECONDS_OFFSET + 4].copy_from_slice(&3600u32.to_be_bytes());
    dat[packet::SAMPLE_COUNT_OFFSET..packet::SAMPLE_COUNT_OFFSET + 2]
        .copy_from_slice(&100u16.to_be_bytes());
    dat[packet::SAMPLE_RATE_OFFSET..packet::SAMPLE_RATE_OFFSET + 2]
        .copy_from_slice(&rate.to_be_bytes());
    dat[packet::DATA_TYPE_OFFSET] = 0x00;
    dat[packet::CHANNEL_COUNT_OFFSET] = u8::try_from(channels.len()).unwrap();
    checksum::seal(&mut dat);
    dat
}

/// Tables with station 697 (PFO) and a couple of its broadband channels.
pub fn pfo_tables() -> Arc<TableSet> {
    let mut stations = HashMap::new();
    stations.insert("697".to_string(), "PFO".to_string());
    let mut station_channels = HashMap::new();
    for (key, sensor) in [("BBA/BS_697_1", "BHZ"), ("BBA/BS_697_2", "BHN")] {
        station_channels.insert(
            key.to_string(),
            ChannelDetail {
                sensor: sensor.to_string(),
            },
        );
    }
    let mut das_params = HashMap::new();
    das_params.insert("3".to_string(), "BATT".to_string());
    Arc::new(TableSet {
        stations,
        station_channels,
        das_params,
        ..TableSet::default()
    })
}
