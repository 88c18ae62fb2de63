//! Forwarding envelope.
//!
//! Each frame is republished with a descriptive envelope in front of the
//! untouched wire bytes, so consumers can route and size-check packets
//! without re-deriving the vendor header. Layout, all fields big-endian:
//!
//! pre-header: raw packet type word (2), format tag (2), envelope size (2)
//! metadata: calibration f32 (4), sample rate f32 (4), data type (2),
//! sample count (2), channel count (2), header size (2), channel-name
//! byte length (2), channel-name bytes.

use crate::framing::RawFrame;
use crate::packet::PacketInfo;

/// Identifies this envelope layout to consumers.
pub const FORMAT_TAG: u16 = 0xbba0;

const PRE_HEADER_LEN: usize = 6;
const METADATA_FIXED_LEN: usize = 18;

/// Envelope size for a packet whose channel-name string is `name_len`
/// bytes long.
#[must_use]
pub fn envelope_len(name_len: usize) -> usize {
    PRE_HEADER_LEN + METADATA_FIXED_LEN + name_len
}

/// Serialize the envelope followed by the verbatim frame bytes.
///
/// # Panics
/// If the produced length does not equal envelope size plus the declared
/// packet size. The framer guarantees `frame.data` is exactly the declared
/// length, so a mismatch is a bug here, not a property of the input.
#[must_use]
pub fn build(info: &PacketInfo, frame: &RawFrame) -> Vec<u8> {
    let names = info.src.channels.as_bytes();
    let env_len = envelope_len(names.len());
    let total = env_len + usize::from(info.packet_size);

    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(&info.raw_type.to_be_bytes());
    out.extend_from_slice(&FORMAT_TAG.to_be_bytes());
    out.extend_from_slice(&u16::try_from(env_len).expect("envelope fits u16").to_be_bytes());

    // Calibration is applied per channel downstream; the envelope slot is
    // always zero.
    out.extend_from_slice(&0f32.to_be_bytes());
    out.extend_from_slice(&f32::from(info.sample_rate).to_be_bytes());
    out.extend_from_slice(&u16::from(info.data_type.code()).to_be_bytes());
    out.extend_from_slice(&info.sample_count.to_be_bytes());
    out.extend_from_slice(&u16::from(info.channel_count).to_be_bytes());
    out.extend_from_slice(&info.header_size.to_be_bytes());
    out.extend_from_slice(&u16::try_from(names.len()).expect("name block fits u16").to_be_bytes());
    out.extend_from_slice(names);

    out.extend_from_slice(&frame.data);

    assert_eq!(out.len(), total, "envelope length contract violated");
    out
}
