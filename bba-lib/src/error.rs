#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Frame(#[from] crate::framing::FrameError),

    #[error("checksum mismatch: stored={stored:#06x} computed={computed:#06x}")]
    Checksum { stored: u16, computed: u16 },

    #[error("frame too short: {actual} bytes, need {minimum}")]
    TooShort { actual: usize, minimum: usize },

    #[error("{0} field is zero")]
    ZeroField(&'static str),

    #[error("unknown data type code {0:#04x}")]
    BadDataType(u8),

    #[error("no rate class for sample rate {0}")]
    BadRate(f32),

    #[error("no station entry for id {0}")]
    UnknownStation(u16),

    #[error("no {table} parameter entry for channel {channel}")]
    UnknownParam { table: &'static str, channel: u8 },

    #[error("connect failed after {attempts} attempts")]
    ConnectExhausted { attempts: u32 },

    #[error("byte source failed: {0}")]
    Stream(String),

    #[error("sink publish failed: {0}")]
    Sink(String),

    #[error("invalid config: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for errors that drop the current frame but leave the stream
    /// usable. Everything else terminates the bridge.
    #[must_use]
    pub fn is_frame_local(&self) -> bool {
        matches!(
            self,
            Error::Frame(_)
                | Error::Checksum { .. }
                | Error::TooShort { .. }
                | Error::ZeroField(_)
                | Error::BadDataType(_)
                | Error::BadRate(_)
                | Error::UnknownStation(_)
                | Error::UnknownParam { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
