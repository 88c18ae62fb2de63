//! Spool-file sink.
//!
//! Stand-in for the outbound bus client: each published packet is appended
//! as a one-line text header (source name, RFC 3339 time, byte count)
//! followed by the raw enveloped bytes. A downstream injector can replay
//! the spool onto the real bus.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use bba::packet::SrcName;
use bba::sink::Sink;
use bba::{Error, Result};
use chrono::{DateTime, SecondsFormat, Utc};

pub struct SpoolSink {
    out: BufWriter<File>,
}

impl SpoolSink {
    pub fn create<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let file = File::options()
            .create(true)
            .append(true)
            .open(path.as_ref())?;
        Ok(SpoolSink {
            out: BufWriter::new(file),
        })
    }
}

impl Sink for SpoolSink {
    fn publish(&mut self, src: &SrcName, time: DateTime<Utc>, data: &[u8]) -> Result<()> {
        let write = |out: &mut BufWriter<File>| -> std::io::Result<()> {
            writeln!(
                out,
                "{src} {} {}",
                time.to_rfc3339_opts(SecondsFormat::Secs, true),
                data.len()
            )?;
            out.write_all(data)?;
            out.flush()
        };
        write(&mut self.out).map_err(|err| Error::Sink(err.to_string()))
    }
}
