#![forbid(unsafe_code)]

/// Errors produced by the sellado signature engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The (format, mode) pair is absent from the capability table.
    #[error("signature mode {mode} is not supported by format {format}")]
    UnsupportedMode { format: String, mode: String },

    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("malformed signature container: {0}")]
    MalformedContainer(String),

    #[error("unknown algorithm: {0}")]
    UnknownAlgorithm(String),

    #[error("signing error: {0}")]
    Signing(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("key error: {0}")]
    Key(String),

    #[error("certificate error: {0}")]
    Certificate(String),

    #[error("XML parsing error: {0}")]
    XmlParse(String),

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for errors caused by the caller's configuration rather than
    /// by the data being signed.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_) | Self::UnsupportedMode { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
