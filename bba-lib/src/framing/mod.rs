//! BBA frame recovery.
//!
//! The concentrator emits a continuous byte stream with no out-of-band
//! record boundaries; frames are delimited only by the sync byte and the
//! declared packet length. [`Framer`] is a push-style scanner: feed it
//! stream bytes as they arrive and it hands back candidate frames, dropping
//! garbage and resynchronizing on its own.
pub mod checksum;

use tracing::{debug, trace};

use crate::packet;

/// Leading marker byte of every BBA frame.
pub const SYNC: u8 = 0xDA;

/// Header bytes following sync+subtype that must accumulate before the
/// declared packet length is known.
const FIXED_HEADER_LEN: usize = 16;

/// Default cap on accumulated frame bytes, matching the concentrator's
/// maximum transmission unit with room to spare.
pub const DEFAULT_MAX_FRAME_LEN: usize = 5000;

/// Marker bytes the concentrator family uses for record kinds this bridge
/// does not carry. Logged when skipped so a misconfigured feed is visible.
const UNSUPPORTED_MARKERS: [u8; 2] = [0x5b, 0xbb];

/// Packet category, from the byte following sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subtype {
    /// Waveform data.
    Data,
    /// DAS state-of-health.
    DasStatus,
    /// Data concentrator state-of-health.
    DcStatus,
    /// RTX state-of-health.
    RtxStatus,
}

impl Subtype {
    /// Construct from the wire code, or `None` for an unknown code.
    #[must_use]
    pub fn from_wire(code: u8) -> Option<Self> {
        match code {
            0xab => Some(Subtype::Data),
            0xbc => Some(Subtype::DasStatus),
            0xcd => Some(Subtype::DcStatus),
            0xde => Some(Subtype::RtxStatus),
            _ => None,
        }
    }

    #[must_use]
    pub fn wire(&self) -> u8 {
        match self {
            Subtype::Data => 0xab,
            Subtype::DasStatus => 0xbc,
            Subtype::DcStatus => 0xcd,
            Subtype::RtxStatus => 0xde,
        }
    }
}

/// A complete candidate frame, sync byte through declared packet length.
/// Candidate because the checksum has not been verified yet.
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub subtype: Subtype,
    /// All frame bytes, exactly the declared packet length.
    pub data: Vec<u8>,
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum FrameError {
    #[error("unknown subtype {0:#04x}")]
    UnknownSubtype(u8),
    #[error("declared packet length is zero")]
    ZeroLength,
    #[error("declared packet length {0} too small to frame")]
    BadLength(u16),
    #[error("frame overflow at {len} bytes (cap {max})")]
    Overflow { len: usize, max: usize },
}

#[derive(Debug)]
enum State {
    WaitSync,
    ReadSubtype,
    ReadFixedHeader,
    ReadBody { need: usize },
}

/// Scans a byte stream for BBA frames.
///
/// Feed bytes with [`Framer::feed`]; a returned frame is complete through
/// its declared length. Any frame-local problem resets the scanner to
/// sync-hunting and is reported as a [`FrameError`] so the caller can log
/// and move on. The scanner itself never becomes unusable.
pub struct Framer {
    state: State,
    buf: Vec<u8>,
    subtype: Option<Subtype>,
    max_frame_len: usize,
    /// Bytes dropped while hunting for sync since the last frame start.
    pub discarded: u64,
}

impl Framer {
    #[must_use]
    pub fn new(max_frame_len: usize) -> Self {
        Framer {
            state: State::WaitSync,
            buf: Vec::new(),
            subtype: None,
            max_frame_len,
            discarded: 0,
        }
    }

    /// True while a frame is partially accumulated, i.e. the stream is
    /// expected to produce more bytes promptly.
    #[must_use]
    pub fn in_frame(&self) -> bool {
        !matches!(self.state, State::WaitSync)
    }

    fn reset(&mut self) {
        self.state = State::WaitSync;
        self.buf.clear();
        self.subtype = None;
    }

    /// Consume one stream byte.
    ///
    /// Returns `Ok(Some(frame))` when the byte completes a frame,
    /// `Ok(None)` while scanning or accumulating.
    ///
    /// # Errors
    /// A [`FrameError`] when the byte forces the current frame to be
    /// dropped. The scanner has already reset itself; the error exists so
    /// the caller can log the drop.
    pub fn feed(&mut self, b: u8) -> crate::Result<Option<RawFrame>> {
        match self.state {
            State::WaitSync => {
                if b == SYNC {
                    if self.discarded > 0 {
                        debug!(discarded = self.discarded, "sync regained");
                        self.discarded = 0;
                    }
                    self.buf.push(b);
                    self.state = State::ReadSubtype;
                } else {
                    if UNSUPPORTED_MARKERS.contains(&b) {
                        debug!("skipping unsupported record marker {b:#04x}");
                    } else {
                        trace!("discarding {b:#04x} while hunting for sync");
                    }
                    self.discarded += 1;
                }
                Ok(None)
            }
            State::ReadSubtype => match Subtype::from_wire(b) {
                Some(subtype) => {
                    self.buf.push(b);
                    self.subtype = Some(subtype);
                    self.state = State::ReadFixedHeader;
                    Ok(None)
                }
                None => {
                    self.reset();
                    Err(FrameError::UnknownSubtype(b).into())
                }
            },
            State::ReadFixedHeader => {
                self.buf.push(b);
                if self.buf.len() < 2 + FIXED_HEADER_LEN {
                    return Ok(None);
                }
                let declared = u16::from_be_bytes([
                    self.buf[packet::SIZE_OFFSET],
                    self.buf[packet::SIZE_OFFSET + 1],
                ]);
                let need = declared as usize;
                if declared == 0 {
                    self.reset();
                    return Err(FrameError::ZeroLength.into());
                }
                if need < self.buf.len() {
                    self.reset();
                    return Err(FrameError::BadLength(declared).into());
                }
                if need > self.max_frame_len {
                    self.reset();
                    return Err(FrameError::Overflow {
                        len: need,
                        max: self.max_frame_len,
                    }
                    .into());
                }
                if need == self.buf.len() {
                    return Ok(Some(self.complete()));
                }
                self.state = State::ReadBody { need };
                Ok(None)
            }
            State::ReadBody { need } => {
                self.buf.push(b);
                if self.buf.len() > self.max_frame_len {
                    let len = self.buf.len();
                    self.reset();
                    return Err(FrameError::Overflow {
                        len,
                        max: self.max_frame_len,
                    }
                    .into());
                }
                if self.buf.len() == need {
                    return Ok(Some(self.complete()));
                }
                Ok(None)
            }
        }
    }

    fn complete(&mut self) -> RawFrame {
        let data = std::mem::take(&mut self.buf);
        let subtype = self.subtype.take().expect("subtype set before body");
        self.state = State::WaitSync;
        RawFrame { subtype, data }
    }
}

impl Default for Framer {
    fn default() -> Self {
        Framer::new(DEFAULT_MAX_FRAME_LEN)
    }
}
