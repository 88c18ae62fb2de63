//! Byte-source connection management.
//!
//! The concentrator's data port is a plain TCP stream; a captured stream
//! in a file serves as a replay source for testing and post-mortems.
//! [`Connector`] opens either kind with bounded retry, and [`ByteSource`]
//! wraps the open handle so the read loop can tell "no data yet" apart
//! from "stream dead".

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::net::{IpAddr, SocketAddr, TcpStream, ToSocketAddrs};
use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, info, warn};
use typed_builder::TypedBuilder;

use crate::{Error, Result};

/// Data port the concentrator listens on unless configured otherwise.
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(3);
/// Bounded wait on socket reads. A mid-frame stall past this is treated
/// as a dead connection.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Where the byte stream comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
    /// The concentrator's TCP data port.
    Net { host: String, port: u16 },
    /// A captured stream replayed from a file.
    File { path: PathBuf },
}

/// Sleeping between connect attempts goes through this seam so retry
/// timing is observable in tests.
pub trait Sleep {
    fn sleep(&self, d: Duration);
}

/// Production sleeper.
pub struct ThreadSleep;

impl Sleep for ThreadSleep {
    fn sleep(&self, d: Duration) {
        std::thread::sleep(d);
    }
}

/// Opens a [`ByteSource`] with bounded retry.
#[derive(TypedBuilder)]
pub struct Connector {
    #[builder(default = DEFAULT_MAX_ATTEMPTS)]
    max_attempts: u32,
    #[builder(default = DEFAULT_RETRY_DELAY)]
    retry_delay: Duration,
    #[builder(default = DEFAULT_READ_TIMEOUT)]
    read_timeout: Duration,
    #[builder(default = Box::new(ThreadSleep))]
    sleep: Box<dyn Sleep>,
}

impl Connector {
    /// Open the byte source, retrying up to the configured attempt count
    /// with the configured delay between attempts.
    ///
    /// # Errors
    /// [`Error::ConnectExhausted`] once every attempt has failed. This is
    /// fatal to the caller; there is no byte stream to bridge.
    pub fn connect(&self, kind: &SourceKind) -> Result<ByteSource> {
        for attempt in 1..=self.max_attempts {
            match self.try_open(kind) {
                Ok(source) => {
                    info!(attempt, kind = source.kind_name(), "byte source connected");
                    return Ok(source);
                }
                Err(err) => {
                    warn!(attempt, max = self.max_attempts, %err, "connect attempt failed");
                    if attempt < self.max_attempts {
                        self.sleep.sleep(self.retry_delay);
                    }
                }
            }
        }
        Err(Error::ConnectExhausted {
            attempts: self.max_attempts,
        })
    }

    fn try_open(&self, kind: &SourceKind) -> Result<ByteSource> {
        match kind {
            SourceKind::Net { host, port } => {
                let addr = resolve(host, *port)?;
                debug!(%addr, "connecting to data port");
                let stream = TcpStream::connect(addr)?;
                stream.set_read_timeout(Some(self.read_timeout))?;
                Ok(ByteSource {
                    inner: Inner::Net(BufReader::new(stream)),
                })
            }
            SourceKind::File { path } => {
                debug!(path = %path.display(), "opening replay file");
                let file = File::open(path)?;
                Ok(ByteSource {
                    inner: Inner::File(BufReader::new(file)),
                })
            }
        }
    }
}

/// Numeric dotted form first, name resolution otherwise.
fn resolve(host: &str, port: u16) -> Result<SocketAddr> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, port));
    }
    (host, port)
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| Error::Stream(format!("no address for host {host}")))
}

/// Outcome of one read against the byte source.
#[derive(Debug, PartialEq, Eq)]
pub enum Poll {
    /// This many bytes were placed at the start of the buffer.
    Data(usize),
    /// The bounded wait elapsed with nothing to read.
    Idle,
    /// The stream ended.
    Eof,
}

#[derive(Debug)]
enum Inner {
    Net(BufReader<TcpStream>),
    File(BufReader<File>),
}

/// A connected, buffered byte stream.
#[derive(Debug)]
pub struct ByteSource {
    inner: Inner,
}

impl ByteSource {
    /// Read whatever is available into `buf`.
    ///
    /// # Errors
    /// [`Error::Stream`] for any read failure other than the bounded wait
    /// elapsing; those are fatal to the stream.
    pub fn poll(&mut self, buf: &mut [u8]) -> Result<Poll> {
        let zult = match &mut self.inner {
            Inner::Net(r) => r.read(buf),
            Inner::File(r) => r.read(buf),
        };
        match zult {
            Ok(0) => Ok(Poll::Eof),
            Ok(n) => Ok(Poll::Data(n)),
            Err(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                Ok(Poll::Idle)
            }
            Err(err) => Err(Error::Stream(err.to_string())),
        }
    }

    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self.inner {
            Inner::Net(_) => "net",
            Inner::File(_) => "file",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::io::Write;
    use std::rc::Rc;

    struct RecordingSleep {
        log: Rc<RefCell<Vec<Duration>>>,
    }

    impl Sleep for RecordingSleep {
        fn sleep(&self, d: Duration) {
            self.log.borrow_mut().push(d);
        }
    }

    #[test]
    fn retries_exactly_max_attempts_with_delay_between() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let connector = Connector::builder()
            .max_attempts(3)
            .retry_delay(Duration::from_secs(3))
            .sleep(Box::new(RecordingSleep { log: log.clone() }))
            .build();

        let kind = SourceKind::File {
            path: PathBuf::from("/nonexistent/bba-capture.dat"),
        };
        let err = connector.connect(&kind).unwrap_err();
        assert!(matches!(err, Error::ConnectExhausted { attempts: 3 }));

        let sleeps = log.borrow();
        assert_eq!(sleeps.len(), 2, "a delay between each pair of attempts");
        assert!(sleeps.iter().all(|d| *d == Duration::from_secs(3)));
    }

    #[test]
    fn first_success_stops_retrying() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(&[0xda, 0xab, 0x00]).unwrap();

        let log = Rc::new(RefCell::new(Vec::new()));
        let connector = Connector::builder()
            .max_attempts(5)
            .sleep(Box::new(RecordingSleep { log: log.clone() }))
            .build();
        let kind = SourceKind::File {
            path: tmp.path().to_path_buf(),
        };
        let mut source = connector.connect(&kind).unwrap();
        assert!(log.borrow().is_empty(), "no sleeping on first success");

        let mut buf = [0u8; 16];
        assert_eq!(source.poll(&mut buf).unwrap(), Poll::Data(3));
        assert_eq!(&buf[..3], &[0xda, 0xab, 0x00]);
        assert_eq!(source.poll(&mut buf).unwrap(), Poll::Eof);
    }

    #[test]
    fn resolve_prefers_numeric() {
        let addr = resolve("192.0.2.10", 5000).unwrap();
        assert_eq!(addr, "192.0.2.10:5000".parse().unwrap());
    }
}
