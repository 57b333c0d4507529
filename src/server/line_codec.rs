use std::io;

use tokio_util::bytes::BytesMut;
use tokio_util::codec::{Decoder, LinesCodec, LinesCodecError};

/// Longest command line a client may send, newline excluded.
pub const MAX_LINE_LENGTH: usize = 1024;

#[derive(Debug, PartialEq, Eq)]
pub enum LineError {
    TooLong,
    NotUtf8,
}

impl LineError {
    pub fn code(&self) -> &'static str {
        match self {
            LineError::TooLong => "line-too-long",
            LineError::NotUtf8 => "invalid-input",
        }
    }
}

/// `LinesCodec` with a length cap whose per-line failures are yielded as
/// items. A framed reader stops after the first decoder error, so bad
/// lines must not surface as one.
pub struct CommandLines {
    inner: LinesCodec,
}

impl CommandLines {
    pub fn new() -> Self {
        Self::with_max_length(MAX_LINE_LENGTH)
    }

    pub fn with_max_length(max_length: usize) -> Self {
        Self {
            inner: LinesCodec::new_with_max_length(max_length),
        }
    }
}

impl Default for CommandLines {
    fn default() -> Self {
        Self::new()
    }
}

fn split_error(
    result: Result<Option<String>, LinesCodecError>,
) -> Result<Option<Result<String, LineError>>, io::Error> {
    match result {
        Ok(line) => Ok(line.map(Ok)),
        Err(LinesCodecError::MaxLineLengthExceeded) => Ok(Some(Err(LineError::TooLong))),
        Err(LinesCodecError::Io(e)) if e.kind() == io::ErrorKind::InvalidData => {
            Ok(Some(Err(LineError::NotUtf8)))
        }
        Err(LinesCodecError::Io(e)) => Err(e),
    }
}

impl Decoder for CommandLines {
    type Item = Result<String, LineError>;
    type Error = io::Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, io::Error> {
        split_error(self.inner.decode(buf))
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, io::Error> {
        split_error(self.inner.decode_eof(buf))
    }
}
