use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AmfError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("unsupported amf value marker: {marker}")]
    Unsupported { marker: u8 },
    #[error("unknown marker: {marker}")]
    Unknown { marker: u8 },
    #[error("string size out of range: {length}")]
    StringSizeOutOfRange { length: usize },
    #[error("unexpected eof while reading amf value")]
    UnexpectedEof,
}

pub type AmfResult<T> = Result<T, AmfError>;
