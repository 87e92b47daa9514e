use std::fmt::Debug;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::{
    HandshakeServerState,
    consts::{RTMP_HANDSHAKE_SIZE, RTMP_VERSION},
    errors::{HandshakeError, HandshakeResult},
};

/// Server side of the plain (non-digest) handshake.
///
/// C1/C2 content is read and discarded; S1 and S2 go out zero filled.
#[derive(Debug)]
pub struct HandshakeServer<'a, T> {
    io: &'a mut T,
    state: HandshakeServerState,
}

impl<'a, T> HandshakeServer<'a, T>
where
    T: AsyncRead + AsyncWrite + Unpin + Debug + Send,
{
    pub fn new(io: &'a mut T) -> Self {
        Self {
            io,
            state: HandshakeServerState::Uninitialized,
        }
    }

    pub async fn handshake(&mut self) -> HandshakeResult<()> {
        loop {
            tracing::trace!("handshake with state: {:?}", self.state);
            match self.state {
                HandshakeServerState::Uninitialized => {
                    self.read_c0().await?;
                    self.read_c1().await?;
                    self.state = HandshakeServerState::C0C1Received;
                }
                HandshakeServerState::C0C1Received => {
                    self.write_s0s1s2().await?;
                    self.state = HandshakeServerState::S0S1S2Sent;
                }
                HandshakeServerState::S0S1S2Sent => {
                    self.read_c2().await?;
                    self.state = HandshakeServerState::Done;
                }
                HandshakeServerState::Done => break,
            }
        }
        tracing::debug!("handshake done");
        Ok(())
    }

    async fn read_c0(&mut self) -> HandshakeResult<()> {
        let version = self.io.read_u8().await?;
        if version != RTMP_VERSION {
            return Err(HandshakeError::PlainRequired(version));
        }
        Ok(())
    }

    async fn read_c1(&mut self) -> HandshakeResult<()> {
        let mut buf = [0u8; RTMP_HANDSHAKE_SIZE];
        self.io.read_exact(&mut buf).await?;
        tracing::trace!("read c1");
        Ok(())
    }

    async fn read_c2(&mut self) -> HandshakeResult<()> {
        let mut buf = [0u8; RTMP_HANDSHAKE_SIZE];
        self.io.read_exact(&mut buf).await?;
        tracing::trace!("read c2");
        Ok(())
    }

    async fn write_s0s1s2(&mut self) -> HandshakeResult<()> {
        let mut bytes = [0u8; 1 + RTMP_HANDSHAKE_SIZE * 2];
        bytes[0] = RTMP_VERSION;
        self.io.write_all(&bytes).await?;
        self.io.flush().await?;
        tracing::trace!("s0 s1 s2 sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt, duplex};

    use crate::handshake::{
        consts::{RTMP_HANDSHAKE_SIZE, RTMP_VERSION},
        errors::HandshakeError,
    };

    use super::HandshakeServer;

    #[tokio::test]
    async fn plain_handshake_completes() {
        let (mut client, mut server) = duplex(8192);

        let server_task = tokio::spawn(async move {
            HandshakeServer::new(&mut server).handshake().await?;
            Ok::<(), HandshakeError>(())
        });

        client.write_u8(RTMP_VERSION).await.unwrap();
        client.write_all(&[7u8; RTMP_HANDSHAKE_SIZE]).await.unwrap();

        let s0 = client.read_u8().await.unwrap();
        assert_eq!(s0, RTMP_VERSION);
        let mut s1s2 = vec![0u8; RTMP_HANDSHAKE_SIZE * 2];
        client.read_exact(&mut s1s2).await.unwrap();
        assert!(s1s2.iter().all(|b| *b == 0));

        client.write_all(&[9u8; RTMP_HANDSHAKE_SIZE]).await.unwrap();

        server_task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn non_plain_c0_is_rejected() {
        let (mut client, mut server) = duplex(8192);

        let server_task = tokio::spawn(async move {
            HandshakeServer::new(&mut server).handshake().await
        });

        client.write_u8(0x00).await.unwrap();
        client.write_all(&[0u8; RTMP_HANDSHAKE_SIZE]).await.unwrap();

        match server_task.await.unwrap() {
            Err(HandshakeError::PlainRequired(version)) => assert_eq!(version, 0),
            other => panic!("expected PlainRequired, got {:?}", other),
        }
    }
}
