//! 16-bit XOR frame checksum.
//!
//! The frame is treated as a sequence of big-endian 16-bit words. The
//! accumulator XORs the first word (sync+subtype), skips the stored
//! checksum word while still advancing past it, then XORs every remaining
//! word through the declared packet length. A trailing lone byte is
//! treated as the high byte of a zero-padded word.

use crate::{Error, Result};

/// Byte offset of the stored checksum word within a frame.
pub const CHECKSUM_OFFSET: usize = 2;

/// Shortest frame the checksum is defined over: sync+subtype word plus the
/// stored checksum word.
const MIN_LEN: usize = 4;

/// Compute the checksum over a complete frame, excluding the stored
/// checksum word.
#[must_use]
pub fn compute(frame: &[u8]) -> u16 {
    let mut acc = 0u16;
    let mut i = 0;
    while i < frame.len() {
        if i != CHECKSUM_OFFSET {
            let lo = if i + 1 < frame.len() { frame[i + 1] } else { 0 };
            acc ^= u16::from_be_bytes([frame[i], lo]);
        }
        i += 2;
    }
    acc
}

/// The checksum stored in the frame's checksum field.
///
/// # Errors
/// [`Error::TooShort`] if the frame cannot hold the field.
pub fn stored(frame: &[u8]) -> Result<u16> {
    if frame.len() < MIN_LEN {
        return Err(Error::TooShort {
            actual: frame.len(),
            minimum: MIN_LEN,
        });
    }
    Ok(u16::from_be_bytes([
        frame[CHECKSUM_OFFSET],
        frame[CHECKSUM_OFFSET + 1],
    ]))
}

/// Verify a frame against its stored checksum.
///
/// # Errors
/// [`Error::Checksum`] with both values on mismatch; [`Error::TooShort`]
/// if the frame cannot hold the checksum field. Both are frame-local.
pub fn validate(frame: &[u8]) -> Result<()> {
    let stored = stored(frame)?;
    let computed = compute(frame);
    if stored == computed {
        Ok(())
    } else {
        Err(Error::Checksum { stored, computed })
    }
}

/// Write the correct checksum into a frame's checksum field. The encoding
/// counterpart of [`validate`], used to build outgoing or test frames.
///
/// # Panics
/// If the frame cannot hold the checksum field.
pub fn seal(frame: &mut [u8]) {
    assert!(frame.len() >= MIN_LEN, "frame too short to seal");
    let sum = compute(frame);
    frame[CHECKSUM_OFFSET..CHECKSUM_OFFSET + 2].copy_from_slice(&sum.to_be_bytes());
}
