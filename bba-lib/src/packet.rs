//! Decoded BBA packet fields and source naming.
//!
//! Wire layout, offsets from the sync byte, all multi-byte fields
//! big-endian:
//!
//! | Offset | Size | Field |
//! |---|---|---|
//! | 0 | 1 | sync (0xDA) |
//! | 1 | 1 | subtype |
//! | 2 | 2 | checksum |
//! | 4 | 2 | packet size |
//! | 6 | 2 | header size |
//! | 10 | 2 | station id |
//! | 14 | 4 | seconds into year |
//! | 18 | 2 | sample count |
//! | 20 | 2 | sample rate |
//! | 22 | 1 | data type code |
//! | 23 | 1 | channel count |
//!
//! Channel sub-headers follow at the declared header size: a 1-byte
//! channel id, 2 reserved bytes, and a 2-byte byte length, then that many
//! data bytes, repeated per channel.

use std::fmt::Display;

use chrono::{DateTime, Datelike, TimeZone, Utc};

use crate::framing::{RawFrame, Subtype};
use crate::site::Resolver;
use crate::{Error, Result};

pub const SIZE_OFFSET: usize = 4;
pub const HEADER_SIZE_OFFSET: usize = 6;
pub const STATION_OFFSET: usize = 10;
pub const SECONDS_OFFSET: usize = 14;
pub const SAMPLE_COUNT_OFFSET: usize = 18;
pub const SAMPLE_RATE_OFFSET: usize = 20;
pub const DATA_TYPE_OFFSET: usize = 22;
pub const CHANNEL_COUNT_OFFSET: usize = 23;

/// Shortest frame that holds every fixed field.
pub const MIN_LEN: usize = 24;

/// Size of one channel sub-header.
pub const CHANNEL_HEADER_LEN: usize = 4;

/// Sample encoding, from the data type code byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Int16,
    Int32,
    /// Vendor compression; the code distinguishes the variant on the wire
    /// but all are forwarded opaquely.
    Compressed(u8),
}

impl DataType {
    /// Construct from the wire code.
    ///
    /// # Errors
    /// [`Error::BadDataType`] for a code outside the known set.
    pub fn from_wire(code: u8) -> Result<Self> {
        match code {
            0x00 => Ok(DataType::Int16),
            0x01 => Ok(DataType::Int32),
            0x02 | 0x10 | 0x11 | 0x12 => Ok(DataType::Compressed(code)),
            other => Err(Error::BadDataType(other)),
        }
    }

    #[must_use]
    pub fn code(&self) -> u8 {
        match self {
            DataType::Int16 => 0x00,
            DataType::Int32 => 0x01,
            DataType::Compressed(code) => *code,
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            DataType::Int16 => "2-byte-int",
            DataType::Int32 => "4-byte-int",
            DataType::Compressed(_) => "compressed",
        }
    }
}

/// Composite routing identifier attached to each forwarded packet.
///
/// Formats as `net_sta[_chan][_loc]/suffix/subcode`, empty parts omitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrcName {
    pub network: String,
    pub station: String,
    /// Resolved channel names joined with `_`, wire order.
    pub channels: String,
    pub location: String,
    pub suffix: String,
    pub subcode: String,
}

impl Display for SrcName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", self.network, self.station)?;
        if !self.channels.is_empty() {
            write!(f, "_{}", self.channels)?;
        }
        if !self.location.is_empty() {
            write!(f, "_{}", self.location)?;
        }
        write!(f, "/{}", self.suffix)?;
        if !self.subcode.is_empty() {
            write!(f, "/{}", self.subcode)?;
        }
        Ok(())
    }
}

/// Fields decoded from one validated frame.
#[derive(Debug, Clone)]
pub struct PacketInfo {
    pub subtype: Subtype,
    pub packet_size: u16,
    pub header_size: u16,
    pub station_id: u16,
    pub sample_count: u16,
    pub sample_rate: u16,
    pub channel_count: u8,
    pub data_type: DataType,
    /// The sync+subtype word exactly as it appeared on the wire.
    pub raw_type: u16,
    /// Packet time: seconds-into-year applied to the current UTC year.
    pub time: DateTime<Utc>,
    pub src: SrcName,
}

fn be16(dat: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([dat[offset], dat[offset + 1]])
}

fn be32(dat: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([
        dat[offset],
        dat[offset + 1],
        dat[offset + 2],
        dat[offset + 3],
    ])
}

fn nonzero(value: u16, field: &'static str) -> Result<u16> {
    if value == 0 {
        Err(Error::ZeroField(field))
    } else {
        Ok(value)
    }
}

/// Midnight Jan 1 of the current UTC year.
///
/// The wire carries seconds-into-year with no year field, so packet times
/// assume decode happens in the year the data was produced. Archived
/// streams replayed across a year boundary will be mis-dated.
fn year_start() -> DateTime<Utc> {
    let year = Utc::now().year();
    Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0)
        .single()
        .expect("Jan 1 00:00:00 exists in every year")
}

impl PacketInfo {
    /// Decode the fixed fields of a checksum-valid frame and resolve its
    /// station and channel names.
    ///
    /// # Errors
    /// All errors are frame-local: [`Error::TooShort`],
    /// [`Error::ZeroField`] naming the offending field,
    /// [`Error::BadDataType`], [`Error::BadRate`],
    /// [`Error::UnknownStation`], or [`Error::UnknownParam`].
    pub fn parse(frame: &RawFrame, resolver: &mut Resolver, network: &str) -> Result<PacketInfo> {
        let dat = &frame.data;
        if dat.len() < MIN_LEN {
            return Err(Error::TooShort {
                actual: dat.len(),
                minimum: MIN_LEN,
            });
        }

        let packet_size = nonzero(be16(dat, SIZE_OFFSET), "packet size")?;
        let header_size = nonzero(be16(dat, HEADER_SIZE_OFFSET), "header size")?;
        let station_id = nonzero(be16(dat, STATION_OFFSET), "station id")?;
        let seconds = be32(dat, SECONDS_OFFSET);
        let sample_count = nonzero(be16(dat, SAMPLE_COUNT_OFFSET), "sample count")?;
        let sample_rate = nonzero(be16(dat, SAMPLE_RATE_OFFSET), "sample rate")?;
        let data_type = DataType::from_wire(dat[DATA_TYPE_OFFSET])?;
        let channel_count = dat[CHANNEL_COUNT_OFFSET];
        if channel_count == 0 {
            return Err(Error::ZeroField("channel count"));
        }

        let time = year_start() + chrono::Duration::seconds(i64::from(seconds));

        // DC state-of-health packets carry the concentrator's own id, which
        // has no station table entry; the id itself is the station name.
        let (subcode, station) = match frame.subtype {
            Subtype::Data => {
                let subcode = resolver.rate_class(f32::from(sample_rate))?;
                (subcode, resolver.station_name(station_id)?)
            }
            Subtype::DasStatus => ("DAS", resolver.station_name(station_id)?),
            Subtype::DcStatus => ("DC", station_id.to_string()),
            Subtype::RtxStatus => ("RTX", resolver.station_name(station_id)?),
        };

        let channels = channel_names(
            dat,
            frame.subtype,
            subcode,
            station_id,
            header_size,
            channel_count,
            resolver,
        )?;

        Ok(PacketInfo {
            subtype: frame.subtype,
            packet_size,
            header_size,
            station_id,
            sample_count,
            sample_rate,
            channel_count,
            data_type,
            raw_type: u16::from_be_bytes([dat[0], dat[1]]),
            time,
            src: SrcName {
                network: network.to_string(),
                station,
                channels,
                location: String::new(),
                suffix: "BBA".to_string(),
                subcode: subcode.to_string(),
            },
        })
    }
}

/// Walk the channel sub-headers and join the resolved names with `_` in
/// wire order.
fn channel_names(
    dat: &[u8],
    subtype: Subtype,
    subcode: &str,
    station_id: u16,
    header_size: u16,
    channel_count: u8,
    resolver: &mut Resolver,
) -> Result<String> {
    let mut names = Vec::with_capacity(usize::from(channel_count));
    let mut cursor = usize::from(header_size);
    for _ in 0..channel_count {
        if cursor + CHANNEL_HEADER_LEN > dat.len() {
            return Err(Error::TooShort {
                actual: dat.len(),
                minimum: cursor + CHANNEL_HEADER_LEN,
            });
        }
        let channel = dat[cursor];
        let byte_len = be16(dat, cursor + 2);
        names.push(resolver.channel_name(subtype, subcode, station_id, channel)?);
        cursor += CHANNEL_HEADER_LEN + usize::from(byte_len);
    }
    Ok(names.join("_"))
}
