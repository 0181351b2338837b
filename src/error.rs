use std::io;
use std::path::PathBuf;

/// Every way a preview session can fail. None of these are retried; the
/// session is torn down and the message is reported on stderr.
#[derive(Debug, thiserror::Error)]
pub enum MosaicError {
    #[error("Error in opening file: {}", path.display())]
    FileUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Error in opening file as a PNG file")]
    BadSignature,

    #[error("Out of memory while decoding the PNG file")]
    OutOfMemory,

    #[error("Error in reading data from PNG file: {0}")]
    CorruptStream(String),

    #[error("{0}")]
    UnsupportedTerminal(String),

    #[error("Terminal: {0}")]
    Terminal(#[from] io::Error),
}

impl MosaicError {
    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::CorruptStream(msg.into())
    }

    pub fn unsupported_terminal(msg: impl Into<String>) -> Self {
        Self::UnsupportedTerminal(msg.into())
    }
}

impl From<png::DecodingError> for MosaicError {
    fn from(err: png::DecodingError) -> Self {
        match err {
            png::DecodingError::LimitsExceeded => MosaicError::OutOfMemory,
            other => MosaicError::CorruptStream(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, MosaicError>;
