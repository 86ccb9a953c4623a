use std::fmt;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PigzrError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("write failed: {0}")]
    Output(io::Error),

    #[error("Compression error: {0}")]
    Compression(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{0}")]
    Usage(String),

    #[error("Thread error: {0}")]
    Thread(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PigzrError {
    pub fn compression<T: fmt::Display>(msg: T) -> Self {
        PigzrError::Compression(msg.to_string())
    }

    pub fn invalid_argument<T: fmt::Display>(msg: T) -> Self {
        PigzrError::InvalidArgument(msg.to_string())
    }

    pub fn thread<T: fmt::Display>(msg: T) -> Self {
        PigzrError::Thread(msg.to_string())
    }

    pub fn internal<T: fmt::Display>(msg: T) -> Self {
        PigzrError::Internal(msg.to_string())
    }

    /// True for errors raised before any compression starts.
    pub fn is_configuration(&self) -> bool {
        matches!(self, PigzrError::InvalidArgument(_) | PigzrError::Usage(_))
    }
}

impl From<flate2::CompressError> for PigzrError {
    fn from(e: flate2::CompressError) -> Self {
        PigzrError::Compression(e.to_string())
    }
}

pub type PigzrResult<T> = Result<T, PigzrError>;
