use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HandshakeError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("plain rtmp handshake required, C0 version byte was {0:#04x}")]
    PlainRequired(u8),
}

pub type HandshakeResult<T> = Result<T, HandshakeError>;
