use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("invalid argument")]
    InvalidArgument,
    #[error("invalid format")]
    InvalidFormat,
    #[error("insufficient memory({0})")]
    InsufficientMemory(usize),
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
    #[error("IO error")]
    IOError,
    #[error("{0} not supported")]
    NotSupported(&'static str),
}

impl From<std::io::Error> for Error {
    #[inline]
    fn from(_src: std::io::Error) -> Self {
        Error::IOError
    }
}

impl From<std::str::Utf8Error> for Error {
    #[inline]
    fn from(_src: std::str::Utf8Error) -> Error {
        Error::InvalidFormat
    }
}

impl From<std::num::ParseIntError> for Error {
    #[inline]
    fn from(_src: std::num::ParseIntError) -> Error {
        Error::InvalidFormat
    }
}

impl From<std::num::ParseFloatError> for Error {
    #[inline]
    fn from(_src: std::num::ParseFloatError) -> Error {
        Error::InvalidFormat
    }
}

impl From<stratadb_catalog::error::Error> for Error {
    #[inline]
    fn from(_src: stratadb_catalog::error::Error) -> Error {
        Error::InvalidArgument
    }
}
