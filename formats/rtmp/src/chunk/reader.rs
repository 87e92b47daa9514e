use byteorder::{BigEndian, LittleEndian, ReadBytesExt};
use std::{
    cmp::min,
    collections::HashMap,
    io::{Cursor, Read},
};
use tokio_util::bytes::{Buf, BytesMut};

use crate::{
    message::RtmpUserMessageBody, protocol_control::ProtocolControlMessage,
    user_control::UserControlEvent,
};

use super::{
    CSID, ChunkBasicHeader, ChunkMessage, ChunkMessageType, MessageHeader, RtmpChunkMessageBody,
    consts::{INIT_CHUNK_SIZE, MAX_MESSAGE_PAYLOAD, MAX_TIMESTAMP, MIN_CHUNK_SIZE},
    errors::{ChunkMessageError, ChunkMessageResult},
};

#[derive(Debug)]
struct PartialPayload {
    payload: BytesMut,
    total_length: usize,
}

#[derive(Debug, Default)]
struct ReadContext {
    header: MessageHeader,
    extended_timestamp_enabled: bool,
    incomplete: Option<PartialPayload>,
    message_count: u64,
}

enum ChunkProgress {
    NeedMoreData,
    MessagePending,
    MessageComplete(ChunkMessage),
}

/// Incremental chunk-stream reader.
///
/// `read` consumes whole chunks from the cursor. When the buffered bytes
/// end in the middle of a chunk the cursor rewinds to that chunk's start
/// and no per-stream state is touched, so the same bytes parse again once
/// the socket delivers the rest.
#[derive(Debug)]
pub struct Reader {
    context: HashMap<CSID, ReadContext>,
    chunk_size: usize,
}

impl Default for Reader {
    fn default() -> Self {
        Self::new()
    }
}

impl Reader {
    pub fn new() -> Self {
        Self {
            context: HashMap::new(),
            chunk_size: INIT_CHUNK_SIZE,
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn set_chunk_size(&mut self, size: usize) -> ChunkMessageResult<usize> {
        if size < MIN_CHUNK_SIZE {
            return Err(ChunkMessageError::InvalidChunkSize(size));
        }
        let old_size = self.chunk_size;
        self.chunk_size = size;
        Ok(old_size)
    }

    /// Drops an in-flight message assembly (Abort protocol message).
    pub fn abort(&mut self, csid: CSID) {
        if let Some(ctx) = self.context.get_mut(&csid) {
            ctx.incomplete = None;
        }
    }

    pub fn read(&mut self, reader: &mut Cursor<&[u8]>) -> ChunkMessageResult<Option<ChunkMessage>> {
        loop {
            let chunk_start = reader.position();
            match self.read_one_chunk(reader)? {
                ChunkProgress::NeedMoreData => {
                    reader.set_position(chunk_start);
                    return Ok(None);
                }
                ChunkProgress::MessagePending => continue,
                ChunkProgress::MessageComplete(message) => return Ok(Some(message)),
            }
        }
    }

    fn read_one_chunk(&mut self, reader: &mut Cursor<&[u8]>) -> ChunkMessageResult<ChunkProgress> {
        let basic_header = match self.read_basic_header(reader)? {
            None => return Ok(ChunkProgress::NeedMoreData),
            Some(header) => header,
        };
        let fmt = basic_header.fmt;
        let csid = basic_header.chunk_stream_id;

        let (mut header, mut extended, in_progress) = match self.context.get(&csid) {
            None => (MessageHeader::default(), false, false),
            Some(ctx) => (
                ctx.header.clone(),
                ctx.extended_timestamp_enabled,
                ctx.incomplete.is_some(),
            ),
        };
        let message_count = self.context.get(&csid).map_or(0, |ctx| ctx.message_count);

        if message_count == 0 && fmt != 0 {
            return Err(ChunkMessageError::ChunkStreamStart(format!(
                "first chunk of csid {} must carry a type 0 header, got fmt {}",
                csid, fmt
            )));
        }
        if in_progress && fmt == 0 {
            return Err(ChunkMessageError::ChunkStreamStart(format!(
                "csid {} got a type 0 header while a message is still assembling",
                csid
            )));
        }

        // All header fields are decoded into locals first; per-stream state
        // commits only after the chunk body bytes are known to be buffered.
        match fmt {
            0 => {
                if reader.remaining() < 11 {
                    return Ok(ChunkProgress::NeedMoreData);
                }
                let timestamp_field = reader.read_u24::<BigEndian>()?;
                let payload_length = reader.read_u24::<BigEndian>()?;
                if payload_length > MAX_MESSAGE_PAYLOAD {
                    return Err(ChunkMessageError::InvalidMessagePayloadSize(payload_length));
                }
                header.payload_length = payload_length;
                header.message_type = reader.read_u8()?;
                header.stream_id = reader.read_u32::<LittleEndian>()?;
                header.timestamp_delta = 0;
                extended = timestamp_field >= MAX_TIMESTAMP;
                header.timestamp = if extended {
                    if reader.remaining() < 4 {
                        return Ok(ChunkProgress::NeedMoreData);
                    }
                    reader.read_u32::<BigEndian>()?
                } else {
                    timestamp_field
                };
            }
            1 => {
                if reader.remaining() < 7 {
                    return Ok(ChunkProgress::NeedMoreData);
                }
                let delta_field = reader.read_u24::<BigEndian>()?;
                let payload_length = reader.read_u24::<BigEndian>()?;
                if payload_length > MAX_MESSAGE_PAYLOAD {
                    return Err(ChunkMessageError::InvalidMessagePayloadSize(payload_length));
                }
                header.payload_length = payload_length;
                header.message_type = reader.read_u8()?;
                header.timestamp_delta = delta_field;
                extended = delta_field >= MAX_TIMESTAMP;
                if extended {
                    if reader.remaining() < 4 {
                        return Ok(ChunkProgress::NeedMoreData);
                    }
                    header.timestamp = reader.read_u32::<BigEndian>()?;
                } else {
                    header.timestamp = header.timestamp.wrapping_add(delta_field);
                }
            }
            2 => {
                if reader.remaining() < 3 {
                    return Ok(ChunkProgress::NeedMoreData);
                }
                let delta_field = reader.read_u24::<BigEndian>()?;
                header.timestamp_delta = delta_field;
                extended = delta_field >= MAX_TIMESTAMP;
                if extended {
                    if reader.remaining() < 4 {
                        return Ok(ChunkProgress::NeedMoreData);
                    }
                    header.timestamp = reader.read_u32::<BigEndian>()?;
                } else {
                    header.timestamp = header.timestamp.wrapping_add(delta_field);
                }
            }
            3 => {
                // a type 3 chunk either continues the assembling message or
                // opens a new one inheriting the previous header; only the
                // latter advances the timestamp by the inherited delta
                if extended {
                    if reader.remaining() < 4 {
                        return Ok(ChunkProgress::NeedMoreData);
                    }
                    let timestamp = reader.read_u32::<BigEndian>()?;
                    if !in_progress {
                        header.timestamp = timestamp;
                    }
                } else if !in_progress {
                    header.timestamp = header.timestamp.wrapping_add(header.timestamp_delta);
                }
            }
            fmt => return Err(ChunkMessageError::UnexpectedFmt(fmt)),
        }

        let total_length = match self.context.get(&csid).and_then(|ctx| ctx.incomplete.as_ref()) {
            Some(partial) => partial.total_length,
            None => header.payload_length as usize,
        };
        let assembled = self
            .context
            .get(&csid)
            .and_then(|ctx| ctx.incomplete.as_ref())
            .map_or(0, |partial| partial.payload.len());
        let bytes_need = min(total_length - assembled, self.chunk_size);
        if reader.remaining() < bytes_need {
            return Ok(ChunkProgress::NeedMoreData);
        }

        // the whole chunk is buffered, commit
        let ctx = self.context.entry(csid).or_default();
        ctx.header = header;
        ctx.extended_timestamp_enabled = extended;
        ctx.message_count += 1;

        let mut partial = match ctx.incomplete.take() {
            Some(partial) => partial,
            None => PartialPayload {
                payload: BytesMut::with_capacity(total_length),
                total_length,
            },
        };
        let filled = partial.payload.len();
        partial.payload.resize(filled + bytes_need, 0);
        reader.read_exact(&mut partial.payload[filled..])?;

        if partial.payload.len() < partial.total_length {
            ctx.incomplete = Some(partial);
            return Ok(ChunkProgress::MessagePending);
        }

        let header = ctx.header.clone();
        let body = Self::decode_message_body(&header, partial.payload)?;
        Ok(ChunkProgress::MessageComplete(ChunkMessage {
            csid,
            header,
            body,
        }))
    }

    fn read_basic_header(
        &mut self,
        reader: &mut Cursor<&[u8]>,
    ) -> ChunkMessageResult<Option<ChunkBasicHeader>> {
        if !reader.has_remaining() {
            return Ok(None);
        }
        let first_byte = reader.read_u8()?;
        let fmt = first_byte >> 6;
        match (first_byte & 0b0011_1111) as u32 {
            0 => {
                if !reader.has_remaining() {
                    return Ok(None);
                }
                let csid = 64 + reader.read_u8()? as u32;
                Ok(Some(ChunkBasicHeader {
                    fmt,
                    chunk_stream_id: csid,
                }))
            }
            1 => {
                if reader.remaining() < 2 {
                    return Ok(None);
                }
                let csid = 64 + reader.read_u8()? as u32 + reader.read_u8()? as u32 * 256;
                Ok(Some(ChunkBasicHeader {
                    fmt,
                    chunk_stream_id: csid,
                }))
            }
            csid => Ok(Some(ChunkBasicHeader {
                fmt,
                chunk_stream_id: csid,
            })),
        }
    }

    fn decode_message_body(
        header: &MessageHeader,
        payload: BytesMut,
    ) -> ChunkMessageResult<RtmpChunkMessageBody> {
        match header.message_type.try_into()? {
            ChunkMessageType::ProtocolControl(message_type) => {
                let mut bytes: &[u8] = &payload;
                Ok(RtmpChunkMessageBody::ProtocolControl(
                    ProtocolControlMessage::read_from(&mut bytes, message_type)?,
                ))
            }
            ChunkMessageType::UserControl => {
                let mut bytes: &[u8] = &payload;
                Ok(RtmpChunkMessageBody::UserControl(
                    UserControlEvent::read_from(&mut bytes)?,
                ))
            }
            ChunkMessageType::RtmpUserMessage(message_type) => {
                Ok(RtmpChunkMessageBody::RtmpUserMessage(
                    RtmpUserMessageBody::read_c2s_from(payload.freeze(), message_type)?,
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use crate::chunk::{RtmpChunkMessageBody, errors::ChunkMessageError, writer::Writer};
    use crate::message::RtmpUserMessageBody;

    use super::Reader;

    fn audio_frame_bytes(payload: &[u8], timestamp: u32, chunk_size: usize) -> Vec<u8> {
        let mut writer = Writer::new();
        writer.set_chunk_size(chunk_size).unwrap();
        writer.write_audio(payload, timestamp, 1).unwrap();
        writer.take_bytes().to_vec()
    }

    #[test]
    fn first_chunk_must_be_fmt0() {
        let mut reader = Reader::new();
        // fmt 3, csid 5 with nothing before it
        let bytes = [0xC5u8];
        let mut cursor = Cursor::new(&bytes[..]);
        assert!(matches!(
            reader.read(&mut cursor),
            Err(ChunkMessageError::ChunkStreamStart(_))
        ));
    }

    #[test]
    fn fmt0_mid_message_is_rejected() {
        let payload = vec![0x55u8; 200];
        let bytes = audio_frame_bytes(&payload, 0, 128);
        // keep the fmt 0 chunk only: 1 + 11 + 128 bytes
        let first_chunk = &bytes[..140];

        let mut reader = Reader::new();
        let mut cursor = Cursor::new(first_chunk);
        assert!(reader.read(&mut cursor).unwrap().is_none());

        // replay the same fmt 0 header while the message is assembling
        let mut cursor = Cursor::new(&bytes[..12]);
        assert!(matches!(
            reader.read(&mut cursor),
            Err(ChunkMessageError::ChunkStreamStart(_))
        ));
    }

    #[test]
    fn byte_by_byte_feeding_reassembles_the_message() {
        let payload: Vec<u8> = (0..300u32).map(|i| i as u8).collect();
        let bytes = audio_frame_bytes(&payload, 77, 128);

        let mut reader = Reader::new();
        let mut buffered = Vec::new();
        let mut consumed = 0usize;
        let mut decoded = None;
        for byte in &bytes {
            buffered.push(*byte);
            let mut cursor = Cursor::new(&buffered[..]);
            if let Some(message) = reader.read(&mut cursor).unwrap() {
                decoded = Some(message);
            }
            let position = cursor.position() as usize;
            buffered.drain(..position);
            consumed += position;
        }
        assert_eq!(consumed, bytes.len());

        let message = decoded.expect("the message must complete on the last byte");
        assert_eq!(message.header.timestamp, 77);
        match message.body {
            RtmpChunkMessageBody::RtmpUserMessage(RtmpUserMessageBody::Audio {
                payload: audio,
            }) => assert_eq!(&audio[..], &payload[..]),
            body => panic!("expected audio, got {:?}", body),
        }
    }

    #[test]
    fn interleaved_chunk_streams_reassemble_independently() {
        let audio_payload = vec![0xAAu8; 200];
        let video_payload = vec![0xBBu8; 200];
        let mut writer = Writer::new();
        writer.write_audio(&audio_payload, 10, 1).unwrap();
        writer.write_video(&video_payload, 20, 1).unwrap();
        let bytes = writer.take_bytes();

        // audio goes out on csid 7, video on csid 6; feed everything at once
        let mut reader = Reader::new();
        let mut cursor = Cursor::new(&bytes[..]);
        let first = reader.read(&mut cursor).unwrap().unwrap();
        let second = reader.read(&mut cursor).unwrap().unwrap();
        assert_eq!(first.csid, 7);
        assert_eq!(second.csid, 6);
        assert_eq!(first.header.timestamp, 10);
        assert_eq!(second.header.timestamp, 20);
    }

    #[test]
    fn chunk_size_below_minimum_is_rejected() {
        let mut reader = Reader::new();
        assert!(matches!(
            reader.set_chunk_size(1),
            Err(ChunkMessageError::InvalidChunkSize(1))
        ));
        assert!(reader.set_chunk_size(2).is_ok());
    }
}
