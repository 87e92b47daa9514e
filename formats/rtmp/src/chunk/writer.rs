use std::cmp::min;

use tokio_util::bytes::{BufMut, BytesMut};
use utils::traits::{dynamic_sized_packet::DynamicSizedPacket, writer::WriteTo};

use crate::{
    commands::{
        ConnectCommandResponse, CreateStreamCommandResponse, FmleStartCommandResponse,
        OnBwDoneCommand, OnStatusCallCommand, OnStatusDataMessage, RtmpS2CCommands,
        SampleAccessMessage,
    },
    message::RtmpMessageType,
    protocol_control::{
        ProtocolControlMessage, SetChunkSize, SetPeerBandwidth, SetPeerBandwidthLimitType,
        WindowAckSize, consts::PROTOCOL_CONTROL_MESSAGE_STREAM_ID,
    },
    user_control::{
        UserControlEvent,
        consts::{USER_CONTROL_MESSAGE_STREAM_ID, USER_CONTROL_MESSAGE_TYPE},
    },
};

use super::{
    CSID, ChunkBasicHeader, MessageHeader,
    consts::{INIT_CHUNK_SIZE, MAX_MESSAGE_PAYLOAD, MAX_TIMESTAMP, MIN_CHUNK_SIZE, csid},
    errors::{ChunkMessageError, ChunkMessageResult},
};

/// Chunk-level sender.
///
/// Every message goes out as one format-0 chunk followed by format-3
/// continuations, each capped at the outgoing chunk size. Output
/// accumulates in an internal buffer; the session layer flushes it to the
/// socket so one syscall covers the queued header+payload runs.
#[derive(Debug)]
pub struct Writer {
    buffer: BytesMut,
    chunk_size: usize,
}

impl Default for Writer {
    fn default() -> Self {
        Self::new()
    }
}

impl Writer {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
            chunk_size: INIT_CHUNK_SIZE,
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Applies a new outgoing chunk size. The caller raises this only
    /// after the matching Set Chunk Size message has been sent out.
    pub fn set_chunk_size(&mut self, size: usize) -> ChunkMessageResult<usize> {
        if size < MIN_CHUNK_SIZE {
            return Err(ChunkMessageError::InvalidChunkSize(size));
        }
        let old_size = self.chunk_size;
        self.chunk_size = size;
        Ok(old_size)
    }

    pub fn buffered_bytes_count(&self) -> usize {
        self.buffer.len()
    }

    /// Hands out everything queued so far and leaves the buffer empty.
    pub fn take_bytes(&mut self) -> BytesMut {
        self.buffer.split()
    }

    pub fn write_message(
        &mut self,
        csid: CSID,
        header: &MessageHeader,
        payload: &[u8],
    ) -> ChunkMessageResult<()> {
        if payload.len() as u64 > MAX_MESSAGE_PAYLOAD as u64 {
            return Err(ChunkMessageError::InvalidMessagePayloadSize(
                payload.len() as u32
            ));
        }
        ChunkBasicHeader::new(0, csid)?;

        let extended = header.timestamp >= MAX_TIMESTAMP;
        self.put_basic_header(0, csid);
        self.buffer
            .put_uint(min(header.timestamp, MAX_TIMESTAMP) as u64, 3);
        self.buffer.put_uint(payload.len() as u64, 3);
        self.buffer.put_u8(header.message_type);
        self.buffer.put_u32_le(header.stream_id);
        if extended {
            self.buffer.put_u32(header.timestamp);
        }

        let first = min(payload.len(), self.chunk_size);
        self.buffer.put_slice(&payload[..first]);

        let mut offset = first;
        while offset < payload.len() {
            self.put_basic_header(3, csid);
            if extended {
                // every continuation chunk restates the extended timestamp
                self.buffer.put_u32(header.timestamp);
            }
            let end = min(offset + self.chunk_size, payload.len());
            self.buffer.put_slice(&payload[offset..end]);
            offset = end;
        }
        Ok(())
    }

    fn put_basic_header(&mut self, fmt: u8, csid: CSID) {
        match csid {
            id if id < 64 => {
                self.buffer.put_u8(fmt << 6 | id as u8);
            }
            id if id < 320 => {
                self.buffer.put_u8(fmt << 6);
                self.buffer.put_u8((id - 64) as u8);
            }
            id => {
                self.buffer.put_u8(fmt << 6 | 1);
                self.buffer.put_u8(((id - 64) % 256) as u8);
                self.buffer.put_u8(((id - 64) / 256) as u8);
            }
        }
    }

    fn write_protocol_control(
        &mut self,
        message: &ProtocolControlMessage,
    ) -> ChunkMessageResult<()> {
        let mut payload = Vec::with_capacity(8);
        message.write_to(&mut payload)?;
        self.write_message(
            csid::PROTOCOL_CONTROL.into(),
            &MessageHeader {
                message_type: message.message_type_id(),
                payload_length: payload.len() as u32,
                timestamp: 0,
                timestamp_delta: 0,
                stream_id: PROTOCOL_CONTROL_MESSAGE_STREAM_ID.into(),
            },
            &payload,
        )
    }

    pub fn write_set_chunk_size(&mut self, chunk_size: u32) -> ChunkMessageResult<()> {
        self.write_protocol_control(&ProtocolControlMessage::SetChunkSize(SetChunkSize {
            chunk_size,
        }))
    }

    pub fn write_window_ack_size(&mut self, size: u32) -> ChunkMessageResult<()> {
        self.write_protocol_control(&ProtocolControlMessage::WindowAckSize(WindowAckSize {
            size,
        }))
    }

    pub fn write_set_peer_bandwidth(
        &mut self,
        size: u32,
        limit_type: SetPeerBandwidthLimitType,
    ) -> ChunkMessageResult<()> {
        self.write_protocol_control(&ProtocolControlMessage::SetPeerBandwidth(SetPeerBandwidth {
            size,
            limit_type,
        }))
    }

    pub fn write_user_control(&mut self, event: &UserControlEvent) -> ChunkMessageResult<()> {
        let mut payload = Vec::with_capacity(10);
        event.write_to(&mut payload)?;
        self.write_message(
            csid::USER_CONTROL.into(),
            &MessageHeader {
                message_type: USER_CONTROL_MESSAGE_TYPE,
                payload_length: payload.len() as u32,
                timestamp: 0,
                timestamp_delta: 0,
                stream_id: USER_CONTROL_MESSAGE_STREAM_ID.into(),
            },
            &payload,
        )
    }

    pub fn write_stream_begin(&mut self, stream_id: u32) -> ChunkMessageResult<()> {
        self.write_user_control(&UserControlEvent::StreamBegin { stream_id })
    }

    fn write_command(
        &mut self,
        command: RtmpS2CCommands,
        stream_id: u32,
    ) -> ChunkMessageResult<()> {
        let mut payload = Vec::with_capacity(command.get_packet_bytes_count());
        command.write_to(&mut payload)?;
        self.write_message(
            command.preferred_csid(),
            &MessageHeader {
                message_type: command.message_type_id(),
                payload_length: payload.len() as u32,
                timestamp: 0,
                timestamp_delta: 0,
                stream_id,
            },
            &payload,
        )
    }

    pub fn write_connect_response(
        &mut self,
        response: ConnectCommandResponse,
    ) -> ChunkMessageResult<()> {
        self.write_command(RtmpS2CCommands::Connect(response), 0)
    }

    pub fn write_create_stream_response(
        &mut self,
        response: CreateStreamCommandResponse,
    ) -> ChunkMessageResult<()> {
        self.write_command(RtmpS2CCommands::CreateStream(response), 0)
    }

    pub fn write_fmle_start_response(
        &mut self,
        response: FmleStartCommandResponse,
    ) -> ChunkMessageResult<()> {
        self.write_command(RtmpS2CCommands::FmleStart(response), 0)
    }

    pub fn write_on_status(
        &mut self,
        command: OnStatusCallCommand,
        stream_id: u32,
    ) -> ChunkMessageResult<()> {
        self.write_command(RtmpS2CCommands::OnStatus(command), stream_id)
    }

    pub fn write_on_bw_done(&mut self) -> ChunkMessageResult<()> {
        self.write_command(RtmpS2CCommands::OnBwDone(OnBwDoneCommand {}), 0)
    }

    pub fn write_on_status_data(
        &mut self,
        message: OnStatusDataMessage,
        stream_id: u32,
    ) -> ChunkMessageResult<()> {
        let mut payload = Vec::with_capacity(message.get_packet_bytes_count());
        message.write_to(&mut payload)?;
        self.write_message(
            message.preferred_csid(),
            &MessageHeader {
                message_type: message.message_type_id(),
                payload_length: payload.len() as u32,
                timestamp: 0,
                timestamp_delta: 0,
                stream_id,
            },
            &payload,
        )
    }

    pub fn write_sample_access(
        &mut self,
        message: SampleAccessMessage,
        stream_id: u32,
    ) -> ChunkMessageResult<()> {
        let mut payload = Vec::with_capacity(message.get_packet_bytes_count());
        message.write_to(&mut payload)?;
        self.write_message(
            message.preferred_csid(),
            &MessageHeader {
                message_type: message.message_type_id(),
                payload_length: payload.len() as u32,
                timestamp: 0,
                timestamp_delta: 0,
                stream_id,
            },
            &payload,
        )
    }

    pub fn write_audio(
        &mut self,
        payload: &[u8],
        timestamp: u32,
        stream_id: u32,
    ) -> ChunkMessageResult<()> {
        self.write_message(
            csid::AUDIO.into(),
            &MessageHeader {
                message_type: RtmpMessageType::Audio.into(),
                payload_length: payload.len() as u32,
                timestamp,
                timestamp_delta: 0,
                stream_id,
            },
            payload,
        )
    }

    pub fn write_video(
        &mut self,
        payload: &[u8],
        timestamp: u32,
        stream_id: u32,
    ) -> ChunkMessageResult<()> {
        self.write_message(
            csid::VIDEO.into(),
            &MessageHeader {
                message_type: RtmpMessageType::Video.into(),
                payload_length: payload.len() as u32,
                timestamp,
                timestamp_delta: 0,
                stream_id,
            },
            payload,
        )
    }

    pub fn write_meta(
        &mut self,
        payload: &[u8],
        timestamp: u32,
        stream_id: u32,
    ) -> ChunkMessageResult<()> {
        self.write_message(
            csid::NET_CONNECTION_COMMAND2.into(),
            &MessageHeader {
                message_type: RtmpMessageType::AMF0Data.into(),
                payload_length: payload.len() as u32,
                timestamp,
                timestamp_delta: 0,
                stream_id,
            },
            payload,
        )
    }
}
