use std::{backtrace::Backtrace as StdBacktrace, io};

use thiserror::Error;

type Bt = StdBacktrace;

#[derive(Error, Debug)]
pub enum ChunkMessageError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("unexpected fmt bits: {0:#b}")]
    UnexpectedFmt(u8),
    #[error("unknown message type: {type_id}, backtrace: {backtrace}")]
    UnknownMessageType { type_id: u8, backtrace: Bt },
    #[error("invalid csid: {0}")]
    InvalidBasicHeader(String),
    #[error("chunk stream start violation: {0}")]
    ChunkStreamStart(String),
    #[error("message payload length out of range: {0}")]
    InvalidMessagePayloadSize(u32),
    #[error("chunk size below protocol minimum: {0}")]
    InvalidChunkSize(usize),
    #[error("unexpected amf type: {0}")]
    UnexpectedAmfType(String),
    #[error("unexpected command name: {0}")]
    UnexpectedCommandName(String),
    #[error("invalid tcUrl: {0}")]
    InvalidTcUrl(String),
    #[error("unknown user control event type: {0}")]
    UnknownEventType(u16),
    #[error("invalid message: {0}")]
    InvalidMessage(String),
    #[error("amf codec failed: {0}")]
    Amf(#[from] amf::errors::AmfError),
}

pub type ChunkMessageResult<T> = Result<T, ChunkMessageError>;
