//! The bridge hot path.
//!
//! One frame at a time, synchronously: recover a frame, verify its
//! checksum, decode and resolve it, wrap it in the forwarding envelope,
//! publish it. Frame-local failures drop the frame and the scan resumes;
//! the loop never stops for bad input. Stream and sink failures are fatal
//! and propagate out so the process can exit for external supervision to
//! restart.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::envelope;
use crate::framing::{checksum, Framer, RawFrame};
use crate::packet::PacketInfo;
use crate::sink::Sink;
use crate::site::{Resolver, TableSet};
use crate::source::{ByteSource, Poll};
use crate::{Error, Result};

const READ_CHUNK: usize = 4096;

/// Counters for the life of the bridge.
#[derive(Debug, Default, Clone, Copy)]
pub struct Stats {
    pub forwarded: u64,
    pub dropped: u64,
}

/// Ties the framer, resolver, envelope, and sink together.
pub struct Bridge {
    framer: Framer,
    resolver: Resolver,
    network: String,
    pub stats: Stats,
}

impl Bridge {
    #[must_use]
    pub fn new(network: &str, tables: Arc<TableSet>, max_frame_len: usize) -> Self {
        Bridge {
            framer: Framer::new(max_frame_len),
            resolver: Resolver::new(tables),
            network: network.to_string(),
            stats: Stats::default(),
        }
    }

    /// Swap in a new table snapshot. In-flight work is unaffected; the
    /// next frame resolves against the new tables.
    pub fn reload(&mut self, tables: Arc<TableSet>) {
        self.resolver.replace(tables);
        info!("lookup tables replaced");
    }

    /// True while a frame is partially accumulated.
    #[must_use]
    pub fn in_frame(&self) -> bool {
        self.framer.in_frame()
    }

    /// Feed a chunk of stream bytes, publishing every frame that survives
    /// validation.
    ///
    /// # Errors
    /// Only fatal errors surface here (sink failures); frame-local
    /// problems are logged, counted, and recovered internally.
    pub fn feed(&mut self, buf: &[u8], sink: &mut dyn Sink) -> Result<()> {
        for &b in buf {
            let frame = match self.framer.feed(b) {
                Ok(Some(frame)) => frame,
                Ok(None) => continue,
                Err(err) => {
                    warn!(%err, "frame dropped");
                    self.stats.dropped += 1;
                    continue;
                }
            };
            match self.forward(&frame, sink) {
                Ok(()) => self.stats.forwarded += 1,
                Err(err) if err.is_frame_local() => {
                    warn!(%err, len = frame.data.len(), "frame dropped");
                    self.stats.dropped += 1;
                }
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    fn forward(&mut self, frame: &RawFrame, sink: &mut dyn Sink) -> Result<()> {
        checksum::validate(&frame.data)?;
        let info = PacketInfo::parse(frame, &mut self.resolver, &self.network)?;
        let out = envelope::build(&info, frame);
        debug!(
            src = %info.src,
            subtype = ?info.subtype,
            len = out.len(),
            "forwarding packet"
        );
        sink.publish(&info.src, info.time, &out)
    }

    /// Run until the stream or the sink fails.
    ///
    /// `reload` is polled between frames; returning a new snapshot swaps
    /// the lookup tables. An idle timeout while sync-hunting just means no
    /// data has arrived yet; an idle timeout mid-frame means the
    /// concentrator died mid-packet and is fatal, as is end of stream.
    ///
    /// # Errors
    /// The fatal error that ended the bridge: [`Error::Stream`] or
    /// [`Error::Sink`].
    pub fn run(
        &mut self,
        source: &mut ByteSource,
        sink: &mut dyn Sink,
        reload: &mut dyn FnMut() -> Option<Arc<TableSet>>,
    ) -> Result<()> {
        let mut buf = [0u8; READ_CHUNK];
        loop {
            match source.poll(&mut buf)? {
                Poll::Data(n) => self.feed(&buf[..n], sink)?,
                Poll::Idle => {
                    if self.framer.in_frame() {
                        return Err(Error::Stream("read timed out mid-frame".to_string()));
                    }
                }
                Poll::Eof => {
                    return Err(Error::Stream("unexpected end of stream".to_string()));
                }
            }
            if !self.framer.in_frame() {
                if let Some(tables) = reload() {
                    self.reload(tables);
                }
            }
        }
    }
}
