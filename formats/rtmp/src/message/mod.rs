use std::{backtrace::Backtrace, fmt::Debug};

use tokio_util::bytes::{Buf, Bytes};

use crate::{
    chunk::errors::{ChunkMessageError, ChunkMessageResult},
    commands::{RtmpC2SCommands, RtmpS2CCommands},
};

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RtmpMessageType {
    Audio = 8,
    Video = 9,
    AMF3Data = 15,
    AMF3Command = 17,
    AMF0Data = 18,
    AMF0Command = 20,
}

impl From<RtmpMessageType> for u8 {
    fn from(value: RtmpMessageType) -> Self {
        value as u8
    }
}

impl TryFrom<u8> for RtmpMessageType {
    type Error = ChunkMessageError;
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            8 => Ok(RtmpMessageType::Audio),
            9 => Ok(RtmpMessageType::Video),
            15 => Ok(RtmpMessageType::AMF3Data),
            17 => Ok(RtmpMessageType::AMF3Command),
            18 => Ok(RtmpMessageType::AMF0Data),
            20 => Ok(RtmpMessageType::AMF0Command),
            _ => Err(ChunkMessageError::UnknownMessageType {
                type_id: value,
                backtrace: Backtrace::capture(),
            }),
        }
    }
}

/// Message-level body. Media and data payloads stay as `Bytes` so the
/// fan-out layer can hand the same storage to every player.
pub enum RtmpUserMessageBody {
    C2SCommand(RtmpC2SCommands),
    S2Command(RtmpS2CCommands),
    MetaData { payload: Bytes },
    Audio { payload: Bytes },
    Video { payload: Bytes },
}

impl Debug for RtmpUserMessageBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::C2SCommand(command) => write!(f, "C2SCommand: {:?}", command),
            Self::S2Command(command) => write!(f, "S2CCommand: {:?}", command),
            Self::MetaData { payload } => write!(f, "Meta, length: {}", payload.len()),
            Self::Audio { payload } => write!(f, "Audio, length: {}", payload.len()),
            Self::Video { payload } => write!(f, "Video, length: {}", payload.len()),
        }
    }
}

impl RtmpUserMessageBody {
    /// Decodes a complete message payload as received from a client.
    ///
    /// AMF3 command/data payloads open with a one-byte AMF3 envelope; the
    /// byte is skipped and the rest decodes as AMF0 (no AMF3 value
    /// support).
    pub fn read_c2s_from(
        payload: Bytes,
        message_type: RtmpMessageType,
    ) -> ChunkMessageResult<Self> {
        match message_type {
            RtmpMessageType::Audio => Ok(RtmpUserMessageBody::Audio { payload }),
            RtmpMessageType::Video => Ok(RtmpUserMessageBody::Video { payload }),
            RtmpMessageType::AMF0Data => Ok(RtmpUserMessageBody::MetaData { payload }),
            RtmpMessageType::AMF3Data => Ok(RtmpUserMessageBody::MetaData {
                payload: Self::strip_amf3_envelope(payload),
            }),
            RtmpMessageType::AMF0Command => {
                let mut reader = payload.reader();
                Ok(RtmpUserMessageBody::C2SCommand(RtmpC2SCommands::read_from(
                    &mut reader,
                )?))
            }
            RtmpMessageType::AMF3Command => {
                let mut reader = Self::strip_amf3_envelope(payload).reader();
                Ok(RtmpUserMessageBody::C2SCommand(RtmpC2SCommands::read_from(
                    &mut reader,
                )?))
            }
        }
    }

    fn strip_amf3_envelope(payload: Bytes) -> Bytes {
        match payload.first() {
            Some(0x00) => payload.slice(1..),
            _ => payload,
        }
    }
}
