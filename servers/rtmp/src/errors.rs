use std::{backtrace::Backtrace as StdBacktrace, io};

use rtmp_formats::{chunk::errors::ChunkMessageError, handshake::errors::HandshakeError};
use stream_center::errors::StreamCenterError;
use thiserror::Error;

type Bt = StdBacktrace;

#[derive(Debug, Error)]
pub enum RtmpServerError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("handshake failed: {0}")]
    HandshakeFailed(#[from] HandshakeError),
    #[error("chunk message codec failed: {0}")]
    ChunkMessageFailed(#[from] ChunkMessageError),
    #[error("stream center operation failed: {0}")]
    StreamCenterError(#[from] StreamCenterError),
    #[error("channel send failed, {backtrace}")]
    ChannelSendFailed { backtrace: Bt },
    #[error("the first command must be connect, got: {0}")]
    ConnectRequired(String),
    #[error("client identified as neither play nor publish: {0}")]
    InvalidClient(String),
    #[error("invalid stream param: {0}")]
    InvalidStreamParam(String),
}

pub type RtmpServerResult<T> = Result<T, RtmpServerError>;
