use std::io;

use byteorder::{BigEndian, WriteBytesExt};

use crate::chunk::errors::ChunkMessageResult;

use super::ProtocolControlMessage;

#[derive(Debug)]
pub struct Writer<'a, W> {
    inner: &'a mut W,
}

impl<'a, W> Writer<'a, W>
where
    W: io::Write,
{
    pub fn new(inner: &'a mut W) -> Self {
        Self { inner }
    }

    pub fn write(&mut self, message: &ProtocolControlMessage) -> ChunkMessageResult<()> {
        match message {
            ProtocolControlMessage::SetChunkSize(message) => {
                self.inner
                    .write_u32::<BigEndian>(message.chunk_size & 0x7FFF_FFFF)?;
            }
            ProtocolControlMessage::Abort(message) => {
                self.inner.write_u32::<BigEndian>(message.chunk_stream_id)?;
            }
            ProtocolControlMessage::Ack(message) => {
                self.inner.write_u32::<BigEndian>(message.sequence_number)?;
            }
            ProtocolControlMessage::WindowAckSize(message) => {
                self.inner.write_u32::<BigEndian>(message.size)?;
            }
            ProtocolControlMessage::SetPeerBandwidth(message) => {
                self.inner.write_u32::<BigEndian>(message.size)?;
                self.inner.write_u8(message.limit_type.into())?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::protocol_control::{
        ProtocolControlMessage, ProtocolControlMessageType, SetChunkSize, SetPeerBandwidth,
        SetPeerBandwidthLimitType, WindowAckSize,
    };

    fn round_trip(message: ProtocolControlMessage, message_type: ProtocolControlMessageType) {
        let mut bytes = Vec::new();
        message.write_to(&mut bytes).unwrap();
        let mut slice = bytes.as_slice();
        let decoded = ProtocolControlMessage::read_from(&mut slice, message_type).unwrap();
        match (message, decoded) {
            (
                ProtocolControlMessage::SetChunkSize(a),
                ProtocolControlMessage::SetChunkSize(b),
            ) => assert_eq!(a, b),
            (
                ProtocolControlMessage::WindowAckSize(a),
                ProtocolControlMessage::WindowAckSize(b),
            ) => assert_eq!(a, b),
            (
                ProtocolControlMessage::SetPeerBandwidth(a),
                ProtocolControlMessage::SetPeerBandwidth(b),
            ) => assert_eq!(a, b),
            (a, b) => panic!("variant mismatch: {:?} vs {:?}", a, b),
        }
    }

    #[test]
    fn set_chunk_size_payload() {
        let message = ProtocolControlMessage::SetChunkSize(SetChunkSize { chunk_size: 4096 });
        let mut bytes = Vec::new();
        message.write_to(&mut bytes).unwrap();
        assert_eq!(bytes, [0x00, 0x00, 0x10, 0x00]);
        round_trip(message, ProtocolControlMessageType::SetChunkSize);
    }

    #[test]
    fn window_ack_size_round_trip() {
        round_trip(
            ProtocolControlMessage::WindowAckSize(WindowAckSize { size: 2_500_000 }),
            ProtocolControlMessageType::WindowAckSize,
        );
    }

    #[test]
    fn set_peer_bandwidth_round_trip() {
        round_trip(
            ProtocolControlMessage::SetPeerBandwidth(SetPeerBandwidth {
                size: 2_500_000,
                limit_type: SetPeerBandwidthLimitType::Dynamic,
            }),
            ProtocolControlMessageType::SetPeerBandwidth,
        );
    }
}
