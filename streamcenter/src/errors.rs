use std::backtrace::Backtrace as StdBacktrace;

use thiserror::Error;

use crate::stream_source::StreamIdentifier;

type Bt = StdBacktrace;

#[derive(Debug, Error)]
pub enum StreamCenterError {
    #[error("stream is already publishing: {0:?}")]
    DuplicateStream(StreamIdentifier),
    #[error("stream not found: {0:?}")]
    StreamNotFound(StreamIdentifier),
    #[error("channel send failed, {backtrace}")]
    ChannelSendFailed { backtrace: Bt },
    #[error("invalid metadata message: {0}")]
    InvalidMetaData(String),
    #[error("amf codec failed: {0}")]
    Amf(#[from] amf::errors::AmfError),
}

pub type StreamCenterResult<T> = Result<T, StreamCenterError>;
