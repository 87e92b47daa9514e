use std::{
    fmt::Debug,
    io::{self, Cursor},
    time::Duration,
};

use rtmp_formats::{
    chunk::{self, ChunkMessage},
    handshake,
};
use stream_center::frame::MediaFrame;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};
use tokio_util::bytes::{Buf, BytesMut};

use crate::errors::RtmpServerResult;

/// The socket end of a session: a chunk reader fed from a buffered read
/// loop and a chunk writer flushed under the write timeout.
#[derive(Debug)]
pub struct RtmpChunkStream<T> {
    chunk_reader: chunk::reader::Reader,
    chunk_writer: chunk::writer::Writer,
    read_buffer: BytesMut,
    stream: BufWriter<T>,
    read_timeout_ms: u64,
    write_timeout_ms: u64,
}

impl<T> RtmpChunkStream<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Debug + Send,
{
    pub fn new(io: T, read_timeout_ms: u64, write_timeout_ms: u64) -> Self {
        Self {
            chunk_reader: chunk::reader::Reader::new(),
            chunk_writer: chunk::writer::Writer::new(),
            read_buffer: BytesMut::with_capacity(4096),
            stream: BufWriter::new(io),
            read_timeout_ms,
            write_timeout_ms,
        }
    }

    pub fn chunk_reader(&mut self) -> &mut chunk::reader::Reader {
        &mut self.chunk_reader
    }

    pub fn chunk_writer(&mut self) -> &mut chunk::writer::Writer {
        &mut self.chunk_writer
    }

    pub async fn handshake(&mut self) -> RtmpServerResult<()> {
        handshake::server::HandshakeServer::new(&mut self.stream)
            .handshake()
            .await?;
        Ok(())
    }

    /// Reads one complete message. `Ok(None)` means the peer closed the
    /// connection cleanly; a read timeout surfaces as
    /// `io::ErrorKind::TimedOut`.
    pub async fn read_chunk(&mut self) -> RtmpServerResult<Option<ChunkMessage>> {
        loop {
            {
                let mut cursor = Cursor::new(&self.read_buffer[..]);
                let parsed = self.chunk_reader.read(&mut cursor)?;
                let consumed = cursor.position() as usize;
                self.read_buffer.advance(consumed);
                if let Some(message) = parsed {
                    return Ok(Some(message));
                }
            }

            match tokio::time::timeout(
                Duration::from_millis(self.read_timeout_ms),
                self.stream.read_buf(&mut self.read_buffer),
            )
            .await
            {
                Ok(Ok(0)) => {
                    if self.read_buffer.is_empty() {
                        return Ok(None);
                    }
                    return Err(io::Error::new(
                        io::ErrorKind::ConnectionReset,
                        "connection reset by peer",
                    )
                    .into());
                }
                Ok(Ok(_len)) => {}
                Ok(Err(err)) => return Err(err.into()),
                Err(_elapsed) => {
                    return Err(io::Error::new(
                        io::ErrorKind::TimedOut,
                        "read chunk data timeout",
                    )
                    .into());
                }
            }
        }
    }

    /// Flushes everything the chunk writer queued.
    pub async fn flush_chunk(&mut self) -> RtmpServerResult<()> {
        let bytes = self.chunk_writer.take_bytes();
        if bytes.is_empty() {
            return Ok(());
        }
        tokio::time::timeout(Duration::from_millis(self.write_timeout_ms), async {
            self.stream.write_all(&bytes).await?;
            self.stream.flush().await?;
            Ok::<(), io::Error>(())
        })
        .await
        .map_err(|_elapsed| {
            io::Error::new(io::ErrorKind::TimedOut, "write chunk data timeout")
        })??;
        Ok(())
    }

    /// Queues one shared media frame for the given message stream.
    pub fn write_media(&mut self, frame: &MediaFrame, stream_id: u32) -> RtmpServerResult<()> {
        match frame {
            MediaFrame::Audio { pts, payload } => {
                self.chunk_writer.write_audio(payload, *pts, stream_id)?
            }
            MediaFrame::Video { pts, payload } => {
                self.chunk_writer.write_video(payload, *pts, stream_id)?
            }
            MediaFrame::Script { pts, payload } => {
                self.chunk_writer.write_meta(payload, *pts, stream_id)?
            }
        }
        Ok(())
    }
}
