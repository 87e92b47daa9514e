use std::io;

use byteorder::{BigEndian, WriteBytesExt};

use crate::chunk::errors::ChunkMessageResult;

use super::UserControlEvent;

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

    pub fn write(&mut self, event: &UserControlEvent) -> ChunkMessageResult<()> {
        self.inner.write_u16::<BigEndian>(event.event_type().into())?;
        match event {
            UserControlEvent::StreamBegin { stream_id }
            | UserControlEvent::StreamEof { stream_id }
            | UserControlEvent::StreamDry { stream_id }
            | UserControlEvent::StreamIsRecorded { stream_id } => {
                self.inner.write_u32::<BigEndian>(*stream_id)?;
            }
            UserControlEvent::SetBufferLength {
                stream_id,
                buffer_length,
            } => {
                self.inner.write_u32::<BigEndian>(*stream_id)?;
                self.inner.write_u32::<BigEndian>(*buffer_length)?;
            }
            UserControlEvent::PingRequest { timestamp }
            | UserControlEvent::PingResponse { timestamp } => {
                self.inner.write_u32::<BigEndian>(*timestamp)?;
            }
        }
        Ok(())
    }
}
