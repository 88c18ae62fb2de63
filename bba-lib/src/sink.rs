//! Outbound message-bus seam.

use chrono::{DateTime, Utc};

use crate::packet::SrcName;
use crate::Result;

/// Destination for enveloped packets. The actual bus client lives outside
/// this crate; anything that can take a source name, a packet time, and
/// the enveloped bytes can stand in for it.
pub trait Sink {
    /// Publish one enveloped packet.
    ///
    /// # Errors
    /// [`crate::Error::Sink`] on failure. Publish failures are fatal to
    /// the bridge; there is no buffering or retry on the outbound side.
    fn publish(&mut self, src: &SrcName, time: DateTime<Utc>, data: &[u8]) -> Result<()>;
}
