use self::errors::ChunkMessageError;

use crate::{
    message::{RtmpMessageType, RtmpUserMessageBody},
    protocol_control::{ProtocolControlMessage, ProtocolControlMessageType},
    user_control::{UserControlEvent, consts::USER_CONTROL_MESSAGE_TYPE},
};

pub mod consts;
pub mod errors;
pub mod reader;
pub mod writer;

pub type CSID = u32;

///! @see: 5.3.1.1. Chunk Basic Header
///! 1, 2 or 3 bytes; fmt in the 2 high bits, csid in the rest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkBasicHeader {
    pub fmt: u8,
    pub chunk_stream_id: CSID,
}

impl ChunkBasicHeader {
    pub fn new(fmt: u8, csid: CSID) -> Result<Self, ChunkMessageError> {
        if !(2..65600).contains(&csid) {
            return Err(ChunkMessageError::InvalidBasicHeader(format!(
                "invalid csid: {}",
                csid
            )));
        }
        Ok(Self {
            fmt,
            chunk_stream_id: csid,
        })
    }
}

/// Message-level header assembled from chunk headers.
///
/// `timestamp_delta` keeps the last 3-byte delta field; a value of
/// 0xFFFFFF marks the extended-timestamp extension. Timestamps roll as
/// unsigned 32 bit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageHeader {
    pub message_type: u8,
    pub payload_length: u32,
    pub timestamp: u32,
    pub timestamp_delta: u32,
    pub stream_id: u32,
}

///! @see: 5.3.1. Chunk Format
/// +--------------+----------------+--------------------+--------------+
/// | Basic Header | Message Header | Extended Timestamp |  Chunk Data  |
/// +--------------+----------------+--------------------+--------------+
/// |                                                    |
/// |<------------------- Chunk Header ----------------->|
#[derive(Debug)]
pub struct ChunkMessage {
    pub csid: CSID,
    pub header: MessageHeader,
    pub body: RtmpChunkMessageBody,
}

#[derive(Debug)]
pub enum RtmpChunkMessageBody {
    ProtocolControl(ProtocolControlMessage),
    UserControl(UserControlEvent),
    RtmpUserMessage(RtmpUserMessageBody),
}

#[derive(Debug)]
pub enum ChunkMessageType {
    ProtocolControl(ProtocolControlMessageType),
    UserControl,
    RtmpUserMessage(RtmpMessageType),
}

impl TryFrom<u8> for ChunkMessageType {
    type Error = ChunkMessageError;
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if value == USER_CONTROL_MESSAGE_TYPE {
            return Ok(ChunkMessageType::UserControl);
        }
        if let Ok(v) = ProtocolControlMessageType::try_from(value) {
            return Ok(ChunkMessageType::ProtocolControl(v));
        }
        if let Ok(v) = RtmpMessageType::try_from(value) {
            return Ok(ChunkMessageType::RtmpUserMessage(v));
        }
        Err(ChunkMessageError::UnknownMessageType {
            type_id: value,
            backtrace: std::backtrace::Backtrace::capture(),
        })
    }
}
