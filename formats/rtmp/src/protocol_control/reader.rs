use std::io;

use byteorder::{BigEndian, ReadBytesExt};

use crate::chunk::errors::ChunkMessageResult;

use super::{
    AbortMessage, Acknowledgement, ProtocolControlMessage, ProtocolControlMessageType,
    SetChunkSize, SetPeerBandwidth, WindowAckSize,
};

#[derive(Debug)]
pub struct Reader<'a, R> {
    inner: &'a mut R,
}

impl<'a, R> Reader<'a, R>
where
    R: io::Read,
{
    pub fn new(inner: &'a mut R) -> Self {
        Self { inner }
    }

    pub fn read(
        &mut self,
        message_type: ProtocolControlMessageType,
    ) -> ChunkMessageResult<ProtocolControlMessage> {
        match message_type {
            ProtocolControlMessageType::SetChunkSize => {
                // the high bit of the field is reserved and must be zero
                let chunk_size = self.inner.read_u32::<BigEndian>()? & 0x7FFF_FFFF;
                Ok(ProtocolControlMessage::SetChunkSize(SetChunkSize {
                    chunk_size,
                }))
            }
            ProtocolControlMessageType::Abort => {
                let chunk_stream_id = self.inner.read_u32::<BigEndian>()?;
                Ok(ProtocolControlMessage::Abort(AbortMessage {
                    chunk_stream_id,
                }))
            }
            ProtocolControlMessageType::Acknowledgement => {
                let sequence_number = self.inner.read_u32::<BigEndian>()?;
                Ok(ProtocolControlMessage::Ack(Acknowledgement {
                    sequence_number,
                }))
            }
            ProtocolControlMessageType::WindowAckSize => {
                let size = self.inner.read_u32::<BigEndian>()?;
                Ok(ProtocolControlMessage::WindowAckSize(WindowAckSize {
                    size,
                }))
            }
            ProtocolControlMessageType::SetPeerBandwidth => {
                let size = self.inner.read_u32::<BigEndian>()?;
                let limit_type = self.inner.read_u8()?.try_into()?;
                Ok(ProtocolControlMessage::SetPeerBandwidth(SetPeerBandwidth {
                    size,
                    limit_type,
                }))
            }
        }
    }
}
