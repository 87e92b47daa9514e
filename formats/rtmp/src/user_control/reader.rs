use std::io;

use byteorder::{BigEndian, ReadBytesExt};

use crate::chunk::errors::ChunkMessageResult;

use super::{UserControlEvent, UserControlEventType};

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

    pub fn read(&mut self) -> ChunkMessageResult<UserControlEvent> {
        let event_type: UserControlEventType = self.inner.read_u16::<BigEndian>()?.try_into()?;
        let event_data = self.inner.read_u32::<BigEndian>()?;
        let event = match event_type {
            UserControlEventType::StreamBegin => UserControlEvent::StreamBegin {
                stream_id: event_data,
            },
            UserControlEventType::StreamEof => UserControlEvent::StreamEof {
                stream_id: event_data,
            },
            UserControlEventType::StreamDry => UserControlEvent::StreamDry {
                stream_id: event_data,
            },
            UserControlEventType::SetBufferLength => UserControlEvent::SetBufferLength {
                stream_id: event_data,
                buffer_length: self.inner.read_u32::<BigEndian>()?,
            },
            UserControlEventType::StreamIsRecorded => UserControlEvent::StreamIsRecorded {
                stream_id: event_data,
            },
            UserControlEventType::PingRequest => UserControlEvent::PingRequest {
                timestamp: event_data,
            },
            UserControlEventType::PingResponse => UserControlEvent::PingResponse {
                timestamp: event_data,
            },
        };
        Ok(event)
    }
}
