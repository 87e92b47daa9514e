use std::{fmt::Debug, io, io::Cursor, time::Duration};

use amf::{ObjectPairs, Value as AmfValue};
use rtmp_formats::{
    chunk::RtmpChunkMessageBody,
    commands::{
        ConnectCommandRequest, ConnectCommandResponse, CreateStreamCommandResponse,
        FmleStartCommandResponse, OnStatusCallCommand, OnStatusDataMessage, PlayCommandRequest,
        RtmpC2SCommands, SampleAccessMessage, TcUrl,
        consts::{RESPONSE_STREAM_ID, c2s_command_names, data_message_names, s2c_command_names},
    },
    message::RtmpUserMessageBody,
    protocol_control::{ProtocolControlMessage, SetPeerBandwidthLimitType},
};
use stream_center::{
    consts as product,
    events::StreamCenterEvent,
    frame::MediaFrame,
    stream_center::StreamCenter,
    stream_source::StreamIdentifier,
};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    sync::mpsc,
};
use tokio_util::bytes::Bytes;
use uuid::Uuid;

use crate::{
    chunk_stream::RtmpChunkStream,
    config::RtmpSessionConfig,
    consts::{
        FMS_CAPABILITIES, FMS_MODE, FMS_VERSION, PEER_BANDWIDTH, PLAY_PULSE_MS, SIG_CLIENT_ID,
        WINDOW_ACK_SIZE, response_code, response_level, status_keys,
    },
    errors::{RtmpServerError, RtmpServerResult},
};

#[derive(Debug)]
enum SessionRuntime {
    Unknown,
    Play {
        stream_id: StreamIdentifier,
        subscribe_id: Uuid,
    },
    Publish {
        stream_id: StreamIdentifier,
    },
}

#[derive(Debug)]
enum IdentifiedClient {
    Play(PlayCommandRequest),
    FmlePublish { stream_name: String },
}

/// Per-connection state machine: handshake, connect, identify, then the
/// play or publish loop.
#[derive(Debug)]
pub struct RtmpSession<T> {
    chunk_stream: RtmpChunkStream<T>,
    stream_center_event_sender: mpsc::UnboundedSender<StreamCenterEvent>,
    config: RtmpSessionConfig,
    session_id: Uuid,
    app: String,
    object_encoding: f64,
    runtime: SessionRuntime,
}

impl<T> RtmpSession<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Debug + Send,
{
    pub fn new(
        io: T,
        stream_center_event_sender: mpsc::UnboundedSender<StreamCenterEvent>,
        config: RtmpSessionConfig,
    ) -> Self {
        Self {
            chunk_stream: RtmpChunkStream::new(io, config.read_timeout_ms, config.write_timeout_ms),
            stream_center_event_sender,
            config,
            session_id: Uuid::now_v7(),
            app: String::new(),
            object_encoding: 0.0,
            runtime: SessionRuntime::Unknown,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub async fn run(&mut self) -> RtmpServerResult<()> {
        self.chunk_stream.handshake().await?;

        let connect = self.expect_connect().await?;
        let tc_url = TcUrl::parse(connect.tc_url().unwrap_or_default())?;
        self.app = tc_url.app.clone();
        self.object_encoding = connect.object_encoding();
        tracing::info!(
            "connect: app={}, vhost={}, objectEncoding={}",
            tc_url.app,
            tc_url.vhost,
            self.object_encoding
        );

        self.negotiate(connect.transaction_id).await?;

        let identified = self.identify().await?;

        // raise the outgoing chunk size now that the client is known
        self.chunk_stream
            .chunk_writer()
            .write_set_chunk_size(self.config.chunk_size)?;
        self.chunk_stream.flush_chunk().await?;
        self.chunk_stream
            .chunk_writer()
            .set_chunk_size(self.config.chunk_size as usize)?;

        match identified {
            IdentifiedClient::Play(request) => self.start_play(request).await,
            IdentifiedClient::FmlePublish { stream_name } => {
                tracing::info!("fmle publish preamble done for stream {}", stream_name);
                self.start_fmle_publish().await
            }
        }
    }

    /// Detaches from the stream center. Always called when the session
    /// task ends, whatever the reason.
    pub async fn clean_up(&mut self) -> RtmpServerResult<()> {
        match &self.runtime {
            SessionRuntime::Play {
                stream_id,
                subscribe_id,
            } => {
                StreamCenter::unsubscribe(
                    &self.stream_center_event_sender,
                    stream_id,
                    *subscribe_id,
                )
                .await?
            }
            SessionRuntime::Publish { stream_id } => {
                StreamCenter::unpublish(&self.stream_center_event_sender, stream_id).await?
            }
            SessionRuntime::Unknown => {}
        }
        Ok(())
    }

    async fn expect_connect(&mut self) -> RtmpServerResult<ConnectCommandRequest> {
        match self.read_command().await? {
            None => Err(RtmpServerError::ConnectRequired(
                "connection closed before connect".to_string(),
            )),
            Some(RtmpC2SCommands::Connect(request)) => Ok(request),
            Some(command) => Err(RtmpServerError::ConnectRequired(
                command_name(&command).to_string(),
            )),
        }
    }

    async fn negotiate(&mut self, transaction_id: f64) -> RtmpServerResult<()> {
        let writer = self.chunk_stream.chunk_writer();
        writer.write_window_ack_size(WINDOW_ACK_SIZE)?;
        writer.write_set_peer_bandwidth(PEER_BANDWIDTH, SetPeerBandwidthLimitType::Dynamic)?;
        self.chunk_stream.flush_chunk().await?;

        let mut properties = ObjectPairs::new();
        properties.set("fmsVer", amf::string(FMS_VERSION));
        properties.set("capabilities", AmfValue::Number(FMS_CAPABILITIES));
        properties.set("mode", AmfValue::Number(FMS_MODE));

        let mut information = ObjectPairs::new();
        information.set(status_keys::LEVEL, amf::string(response_level::STATUS));
        information.set(
            status_keys::CODE,
            amf::string(response_code::NET_CONNECTION_CONNECT_SUCCESS),
        );
        information.set(status_keys::DESCRIPTION, amf::string("Connection succeeded."));
        information.set("objectEncoding", AmfValue::Number(self.object_encoding));

        let mut data = ObjectPairs::new();
        data.set("version", amf::string(FMS_VERSION));
        data.set("server", amf::string(product::SERVER_NAME));
        data.set("server_url", amf::string(product::SERVER_URL));
        data.set("server_version", amf::string(product::SERVER_VERSION));
        information.set("data", amf::ecma_array(data));

        let writer = self.chunk_stream.chunk_writer();
        writer.write_connect_response(ConnectCommandResponse {
            transaction_id,
            properties,
            information,
        })?;
        writer.write_on_bw_done()?;
        self.chunk_stream.flush_chunk().await?;
        Ok(())
    }

    async fn identify(&mut self) -> RtmpServerResult<IdentifiedClient> {
        loop {
            let command = match self.read_command().await? {
                None => {
                    return Err(RtmpServerError::InvalidClient(
                        "connection closed during identify".to_string(),
                    ));
                }
                Some(command) => command,
            };
            match command {
                RtmpC2SCommands::CreateStream(request) => {
                    self.chunk_stream.chunk_writer().write_create_stream_response(
                        CreateStreamCommandResponse {
                            transaction_id: request.transaction_id,
                            stream_id: RESPONSE_STREAM_ID.into(),
                        },
                    )?;
                    self.chunk_stream.flush_chunk().await?;
                    return self.identify_play_client().await;
                }
                RtmpC2SCommands::FmleStart(request) => {
                    self.chunk_stream
                        .chunk_writer()
                        .write_fmle_start_response(FmleStartCommandResponse {
                            transaction_id: request.transaction_id,
                        })?;
                    self.chunk_stream.flush_chunk().await?;
                    return Ok(IdentifiedClient::FmlePublish {
                        stream_name: request.stream_name,
                    });
                }
                command => {
                    tracing::trace!("ignore command during identify: {:?}", command);
                }
            }
        }
    }

    async fn identify_play_client(&mut self) -> RtmpServerResult<IdentifiedClient> {
        loop {
            match self.read_command().await? {
                None => {
                    return Err(RtmpServerError::InvalidClient(
                        "connection closed while waiting for play".to_string(),
                    ));
                }
                Some(RtmpC2SCommands::Play(request)) => {
                    return Ok(IdentifiedClient::Play(request));
                }
                Some(command) => {
                    tracing::trace!("ignore command while waiting for play: {:?}", command);
                }
            }
        }
    }

    async fn start_play(&mut self, request: PlayCommandRequest) -> RtmpServerResult<()> {
        let stream_id = StreamIdentifier {
            app: self.app.clone(),
            stream_name: request.stream_name.clone(),
        };
        let response =
            StreamCenter::subscribe(&self.stream_center_event_sender, &stream_id).await?;
        tracing::info!(
            "play attached to {} as {}",
            stream_id,
            response.subscribe_id
        );

        let message_stream_id: u32 = RESPONSE_STREAM_ID.into();
        let writer = self.chunk_stream.chunk_writer();
        writer.write_stream_begin(message_stream_id)?;
        writer.write_on_status(
            OnStatusCallCommand {
                command_name: s2c_command_names::ON_STATUS.to_string(),
                transaction_id: 0.0,
                info: status_info(
                    response_code::NET_STREAM_PLAY_RESET,
                    "Playing and resetting stream.",
                ),
            },
            message_stream_id,
        )?;
        writer.write_on_status(
            OnStatusCallCommand {
                command_name: s2c_command_names::ON_STATUS.to_string(),
                transaction_id: 0.0,
                info: status_info(
                    response_code::NET_STREAM_PLAY_START,
                    "Started playing stream.",
                ),
            },
            message_stream_id,
        )?;
        writer.write_sample_access(
            SampleAccessMessage {
                video_access: false,
                audio_access: false,
            },
            message_stream_id,
        )?;
        let mut data_info = ObjectPairs::new();
        data_info.set(
            status_keys::CODE,
            amf::string(response_code::NET_STREAM_DATA_START),
        );
        writer.write_on_status_data(OnStatusDataMessage { info: data_info }, message_stream_id)?;
        self.chunk_stream.flush_chunk().await?;

        self.runtime = SessionRuntime::Play {
            stream_id,
            subscribe_id: response.subscribe_id,
        };
        let mut receiver = response.media_receiver;
        self.playing(&mut receiver, message_stream_id).await
    }

    async fn playing(
        &mut self,
        receiver: &mut mpsc::UnboundedReceiver<MediaFrame>,
        message_stream_id: u32,
    ) -> RtmpServerResult<()> {
        loop {
            // pulse the socket; an idle tick is not an error, inbound
            // messages during play are read and discarded for now
            match tokio::time::timeout(
                Duration::from_millis(PLAY_PULSE_MS),
                self.chunk_stream.read_chunk(),
            )
            .await
            {
                Err(_elapsed) => {}
                Ok(Ok(Some(message))) => {
                    tracing::trace!("discard message during play: {:?}", message.header);
                }
                Ok(Ok(None)) => {
                    tracing::info!("play session closed by peer");
                    return Ok(());
                }
                Ok(Err(RtmpServerError::Io(err))) if err.kind() == io::ErrorKind::TimedOut => {}
                Ok(Err(err)) => return Err(err),
            }

            loop {
                match receiver.try_recv() {
                    Ok(frame) => {
                        self.chunk_stream.write_media(&frame, message_stream_id)?;
                    }
                    Err(mpsc::error::TryRecvError::Empty) => break,
                    Err(mpsc::error::TryRecvError::Disconnected) => {
                        tracing::info!("player queue detached from its source");
                        return Ok(());
                    }
                }
            }
            self.chunk_stream.flush_chunk().await?;
        }
    }

    async fn start_fmle_publish(&mut self) -> RtmpServerResult<()> {
        // FCPublish
        loop {
            match self.require_command().await? {
                RtmpC2SCommands::FmleStart(request) => {
                    self.chunk_stream
                        .chunk_writer()
                        .write_fmle_start_response(FmleStartCommandResponse {
                            transaction_id: request.transaction_id,
                        })?;
                    self.chunk_stream.flush_chunk().await?;
                    break;
                }
                command => tracing::trace!("ignore while expecting FCPublish: {:?}", command),
            }
        }
        // createStream
        loop {
            match self.require_command().await? {
                RtmpC2SCommands::CreateStream(request) => {
                    self.chunk_stream.chunk_writer().write_create_stream_response(
                        CreateStreamCommandResponse {
                            transaction_id: request.transaction_id,
                            stream_id: RESPONSE_STREAM_ID.into(),
                        },
                    )?;
                    self.chunk_stream.flush_chunk().await?;
                    break;
                }
                command => tracing::trace!("ignore while expecting createStream: {:?}", command),
            }
        }
        // publish
        let publish = loop {
            match self.require_command().await? {
                RtmpC2SCommands::Publish(request) => break request,
                command => tracing::trace!("ignore while expecting publish: {:?}", command),
            }
        };
        tracing::info!(
            "publish requested: stream={}, type={}",
            publish.stream_name,
            publish.publish_type
        );

        let stream_id = StreamIdentifier {
            app: self.app.clone(),
            stream_name: publish.stream_name.clone(),
        };
        let producer =
            StreamCenter::publish(&self.stream_center_event_sender, &stream_id).await?;
        self.runtime = SessionRuntime::Publish {
            stream_id: stream_id.clone(),
        };

        let message_stream_id: u32 = RESPONSE_STREAM_ID.into();
        let writer = self.chunk_stream.chunk_writer();
        let mut fc_info = ObjectPairs::new();
        fc_info.set(
            status_keys::CODE,
            amf::string(response_code::NET_STREAM_PUBLISH_START),
        );
        fc_info.set(
            status_keys::DESCRIPTION,
            amf::string("Started publishing stream."),
        );
        writer.write_on_status(
            OnStatusCallCommand {
                command_name: s2c_command_names::ON_FC_PUBLISH.to_string(),
                transaction_id: 0.0,
                info: fc_info,
            },
            0,
        )?;
        writer.write_on_status(
            OnStatusCallCommand {
                command_name: s2c_command_names::ON_STATUS.to_string(),
                transaction_id: 0.0,
                info: status_info(
                    response_code::NET_STREAM_PUBLISH_START,
                    "Started publishing stream.",
                ),
            },
            message_stream_id,
        )?;
        self.chunk_stream.flush_chunk().await?;

        self.publishing(producer).await
    }

    async fn publishing(
        &mut self,
        producer: mpsc::UnboundedSender<MediaFrame>,
    ) -> RtmpServerResult<()> {
        loop {
            let message = match self.chunk_stream.read_chunk().await? {
                None => {
                    tracing::info!("publish session closed by peer");
                    return Ok(());
                }
                Some(message) => message,
            };
            let timestamp = message.header.timestamp;
            match message.body {
                RtmpChunkMessageBody::ProtocolControl(control) => {
                    self.process_protocol_control(control)?
                }
                RtmpChunkMessageBody::UserControl(event) => {
                    tracing::trace!("ignore user control during publish: {:?}", event);
                }
                RtmpChunkMessageBody::RtmpUserMessage(body) => match body {
                    RtmpUserMessageBody::Audio { payload } => {
                        send_frame(&producer, MediaFrame::Audio { pts: timestamp, payload })?
                    }
                    RtmpUserMessageBody::Video { payload } => {
                        send_frame(&producer, MediaFrame::Video { pts: timestamp, payload })?
                    }
                    RtmpUserMessageBody::MetaData { payload } => {
                        if is_meta_data(&payload) {
                            send_frame(
                                &producer,
                                MediaFrame::Script { pts: timestamp, payload },
                            )?
                        } else {
                            tracing::trace!("drop data message, length: {}", payload.len());
                        }
                    }
                    RtmpUserMessageBody::C2SCommand(RtmpC2SCommands::FmleStart(request))
                        if request.is_unpublish() =>
                    {
                        tracing::info!("unpublish requested, tid={}", request.transaction_id);
                        self.finish_unpublish(request.transaction_id).await?;
                        return Ok(());
                    }
                    RtmpUserMessageBody::C2SCommand(command) => {
                        tracing::trace!("ignore command during publish: {:?}", command);
                    }
                    RtmpUserMessageBody::S2Command(command) => {
                        tracing::warn!("unexpected s2c command from peer: {:?}", command);
                    }
                },
            }
        }
    }

    /// onFCUnpublish, then the FMLE result, then onStatus.
    /// Attached players stay up, they just stop receiving.
    async fn finish_unpublish(&mut self, transaction_id: f64) -> RtmpServerResult<()> {
        let writer = self.chunk_stream.chunk_writer();
        let mut fc_info = ObjectPairs::new();
        fc_info.set(
            status_keys::CODE,
            amf::string(response_code::NET_STREAM_UNPUBLISH_SUCCESS),
        );
        fc_info.set(
            status_keys::DESCRIPTION,
            amf::string("Stopped publishing stream."),
        );
        writer.write_on_status(
            OnStatusCallCommand {
                command_name: s2c_command_names::ON_FC_UNPUBLISH.to_string(),
                transaction_id: 0.0,
                info: fc_info,
            },
            0,
        )?;
        writer.write_fmle_start_response(FmleStartCommandResponse { transaction_id })?;
        writer.write_on_status(
            OnStatusCallCommand {
                command_name: s2c_command_names::ON_STATUS.to_string(),
                transaction_id: 0.0,
                info: status_info(
                    response_code::NET_STREAM_UNPUBLISH_SUCCESS,
                    "Stopped publishing stream.",
                ),
            },
            RESPONSE_STREAM_ID.into(),
        )?;
        self.chunk_stream.flush_chunk().await?;
        Ok(())
    }

    /// Next AMF command; control messages are handled in place, other
    /// message kinds are skipped. `None` on clean close.
    async fn read_command(&mut self) -> RtmpServerResult<Option<RtmpC2SCommands>> {
        loop {
            let message = match self.chunk_stream.read_chunk().await? {
                None => return Ok(None),
                Some(message) => message,
            };
            match message.body {
                RtmpChunkMessageBody::ProtocolControl(control) => {
                    self.process_protocol_control(control)?
                }
                RtmpChunkMessageBody::UserControl(event) => {
                    tracing::trace!("ignore user control event: {:?}", event);
                }
                RtmpChunkMessageBody::RtmpUserMessage(RtmpUserMessageBody::C2SCommand(
                    command,
                )) => return Ok(Some(command)),
                RtmpChunkMessageBody::RtmpUserMessage(body) => {
                    tracing::trace!("skip message while expecting a command: {:?}", body);
                }
            }
        }
    }

    async fn require_command(&mut self) -> RtmpServerResult<RtmpC2SCommands> {
        match self.read_command().await? {
            Some(command) => Ok(command),
            None => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed while expecting a command",
            )
            .into()),
        }
    }

    fn process_protocol_control(
        &mut self,
        message: ProtocolControlMessage,
    ) -> RtmpServerResult<()> {
        match message {
            ProtocolControlMessage::SetChunkSize(message) => {
                let old_size = self
                    .chunk_stream
                    .chunk_reader()
                    .set_chunk_size(message.chunk_size as usize)?;
                tracing::info!(
                    "peer chunk size changed: {} -> {}",
                    old_size,
                    message.chunk_size
                );
            }
            ProtocolControlMessage::WindowAckSize(message) => {
                tracing::info!("peer window ack size {} noted, not enforced", message.size);
            }
            ProtocolControlMessage::Ack(message) => {
                tracing::trace!("acknowledgement: {}", message.sequence_number);
            }
            ProtocolControlMessage::Abort(message) => {
                self.chunk_stream.chunk_reader().abort(message.chunk_stream_id);
                tracing::info!("abort chunk stream {}", message.chunk_stream_id);
            }
            ProtocolControlMessage::SetPeerBandwidth(message) => {
                tracing::trace!("peer bandwidth from client ignored: {:?}", message);
            }
        }
        Ok(())
    }
}

fn command_name(command: &RtmpC2SCommands) -> &str {
    match command {
        RtmpC2SCommands::Connect(_) => c2s_command_names::CONNECT,
        RtmpC2SCommands::CreateStream(_) => c2s_command_names::CREATE_STREAM,
        RtmpC2SCommands::Play(_) => c2s_command_names::PLAY,
        RtmpC2SCommands::Publish(_) => c2s_command_names::PUBLISH,
        RtmpC2SCommands::FmleStart(request) => request.command_name.as_str(),
        RtmpC2SCommands::Call(request) => request.command_name.as_str(),
    }
}

fn status_info(code: &str, description: &str) -> ObjectPairs {
    let mut info = ObjectPairs::new();
    info.set(status_keys::LEVEL, amf::string(response_level::STATUS));
    info.set(status_keys::CODE, amf::string(code));
    info.set(status_keys::DESCRIPTION, amf::string(description));
    info.set(status_keys::DETAILS, amf::string("stream"));
    info.set(status_keys::CLIENT_ID, amf::string(SIG_CLIENT_ID));
    info
}

fn send_frame(
    producer: &mpsc::UnboundedSender<MediaFrame>,
    frame: MediaFrame,
) -> RtmpServerResult<()> {
    producer.send(frame).map_err(|err| {
        tracing::error!("send frame to stream source failed: {:?}", err);
        RtmpServerError::ChannelSendFailed {
            backtrace: std::backtrace::Backtrace::capture(),
        }
    })
}

fn is_meta_data(payload: &Bytes) -> bool {
    let mut cursor = Cursor::new(payload.as_ref());
    matches!(
        AmfValue::read_from(&mut cursor),
        Ok(Some(AmfValue::String(name)))
            if name == data_message_names::ON_META_DATA
                || name == data_message_names::SET_DATA_FRAME
    )
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use rtmp_formats::{
        chunk::{self, ChunkMessage, MessageHeader, RtmpChunkMessageBody},
        commands::{
            ConnectCommandRequest, CreateStreamCommandRequest, FmleStartCommandRequest,
            PlayCommandRequest, PublishCommandRequest, RtmpC2SCommands,
        },
        handshake::consts::{RTMP_HANDSHAKE_SIZE, RTMP_VERSION},
        message::{RtmpMessageType, RtmpUserMessageBody},
        protocol_control::ProtocolControlMessage,
        user_control::UserControlEvent,
    };
    use stream_center::{
        events::StreamCenterEvent,
        frame::MediaFrame,
        stream_center::StreamCenter,
        stream_source::StreamIdentifier,
    };
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt, DuplexStream, duplex},
        sync::mpsc::UnboundedSender,
    };
    use tokio_util::bytes::{Buf, Bytes, BytesMut};
    use utils::traits::writer::WriteTo;

    use crate::config::RtmpSessionConfig;

    use super::RtmpSession;

    struct TestClient {
        stream: DuplexStream,
        reader: chunk::reader::Reader,
        writer: chunk::writer::Writer,
        buffer: BytesMut,
    }

    impl TestClient {
        fn new(stream: DuplexStream) -> Self {
            Self {
                stream,
                reader: chunk::reader::Reader::new(),
                writer: chunk::writer::Writer::new(),
                buffer: BytesMut::new(),
            }
        }

        async fn handshake(&mut self) {
            self.stream.write_u8(RTMP_VERSION).await.unwrap();
            self.stream
                .write_all(&[1u8; RTMP_HANDSHAKE_SIZE])
                .await
                .unwrap();
            let mut s0s1s2 = vec![0u8; 1 + RTMP_HANDSHAKE_SIZE * 2];
            self.stream.read_exact(&mut s0s1s2).await.unwrap();
            assert_eq!(s0s1s2[0], RTMP_VERSION);
            self.stream
                .write_all(&[2u8; RTMP_HANDSHAKE_SIZE])
                .await
                .unwrap();
        }

        async fn flush_writer(&mut self) {
            let bytes = self.writer.take_bytes();
            self.stream.write_all(&bytes).await.unwrap();
            self.stream.flush().await.unwrap();
        }

        async fn send_command(&mut self, command: RtmpC2SCommands) {
            let mut payload = Vec::new();
            command.write_to(&mut payload).unwrap();
            self.writer
                .write_message(
                    command.preferred_csid(),
                    &MessageHeader {
                        message_type: command.message_type_id(),
                        payload_length: payload.len() as u32,
                        timestamp: 0,
                        timestamp_delta: 0,
                        stream_id: 0,
                    },
                    &payload,
                )
                .unwrap();
            self.flush_writer().await;
        }

        async fn send_data(&mut self, payload: &[u8]) {
            self.writer.write_meta(payload, 0, 1).unwrap();
            self.flush_writer().await;
        }

        async fn send_audio(&mut self, payload: &[u8], timestamp: u32) {
            self.writer.write_audio(payload, timestamp, 1).unwrap();
            self.flush_writer().await;
        }

        async fn send_video(&mut self, payload: &[u8], timestamp: u32) {
            self.writer.write_video(payload, timestamp, 1).unwrap();
            self.flush_writer().await;
        }

        async fn recv_message(&mut self) -> Option<ChunkMessage> {
            loop {
                {
                    let mut cursor = Cursor::new(&self.buffer[..]);
                    let parsed = self.reader.read(&mut cursor).unwrap();
                    let consumed = cursor.position() as usize;
                    self.buffer.advance(consumed);
                    if let Some(message) = parsed {
                        if let RtmpChunkMessageBody::ProtocolControl(
                            ProtocolControlMessage::SetChunkSize(body),
                        ) = &message.body
                        {
                            self.reader.set_chunk_size(body.chunk_size as usize).unwrap();
                        }
                        return Some(message);
                    }
                }
                let mut scratch = [0u8; 4096];
                let n = self.stream.read(&mut scratch).await.unwrap();
                if n == 0 {
                    return None;
                }
                self.buffer.extend_from_slice(&scratch[..n]);
            }
        }

        /// The next message must be an AMF command; returns its name,
        /// transaction id and remaining arguments.
        async fn recv_call(&mut self) -> (String, f64, Vec<amf::Value>) {
            let message = self.recv_message().await.expect("command expected");
            match message.body {
                RtmpChunkMessageBody::RtmpUserMessage(RtmpUserMessageBody::C2SCommand(
                    RtmpC2SCommands::Call(call),
                )) => (call.command_name, call.transaction_id, call.arguments),
                body => panic!("expected a command, got {:?}", body),
            }
        }
    }

    fn start_center() -> UnboundedSender<StreamCenterEvent> {
        let mut center = StreamCenter::new();
        let sender = center.get_event_sender();
        tokio::spawn(async move { center.run().await });
        sender
    }

    fn start_session(center_sender: UnboundedSender<StreamCenterEvent>) -> DuplexStream {
        let (client_end, server_end) = duplex(1 << 20);
        let mut session = RtmpSession::new(
            server_end,
            center_sender,
            RtmpSessionConfig {
                chunk_size: 4096,
                read_timeout_ms: 5_000,
                write_timeout_ms: 5_000,
            },
        );
        tokio::spawn(async move {
            let result = session.run().await;
            let _ = session.clean_up().await;
            if let Err(err) = result {
                tracing::error!("session ended with error: {:?}", err);
            }
        });
        client_end
    }

    fn connect_command(app: &str) -> RtmpC2SCommands {
        let mut object = amf::ObjectPairs::new();
        object.set("tcUrl", amf::string(format!("rtmp://127.0.0.1:1935/{}", app)));
        object.set("objectEncoding", amf::Value::Number(0.0));
        RtmpC2SCommands::Connect(ConnectCommandRequest {
            transaction_id: 1.0,
            command_object: object,
            optional_user_arguments: None,
        })
    }

    fn fmle_start(name: &str, transaction_id: f64, stream_name: &str) -> RtmpC2SCommands {
        RtmpC2SCommands::FmleStart(FmleStartCommandRequest {
            command_name: name.to_string(),
            transaction_id,
            stream_name: stream_name.to_string(),
        })
    }

    fn meta_payload() -> Vec<u8> {
        let mut entries = amf::ObjectPairs::new();
        entries.set("width", amf::Value::Number(1920.0));
        let mut bytes = Vec::new();
        amf::Value::write_string(&mut bytes, "@setDataFrame").unwrap();
        amf::Value::write_string(&mut bytes, "onMetaData").unwrap();
        amf::ecma_array(entries).write_to(&mut bytes).unwrap();
        bytes
    }

    fn status_code(args: &[amf::Value]) -> String {
        for value in args {
            if let amf::Value::Object(pairs) = value {
                if let Some(code) = pairs.get("code").and_then(|v| v.try_as_str()) {
                    return code.to_string();
                }
            }
        }
        panic!("no status object in {:?}", args);
    }

    async fn drive_through_connect(client: &mut TestClient, app: &str) {
        client.send_command(connect_command(app)).await;

        let message = client.recv_message().await.unwrap();
        match message.body {
            RtmpChunkMessageBody::ProtocolControl(ProtocolControlMessage::WindowAckSize(
                body,
            )) => assert_eq!(body.size, 2_500_000),
            body => panic!("expected window ack size, got {:?}", body),
        }
        let message = client.recv_message().await.unwrap();
        match message.body {
            RtmpChunkMessageBody::ProtocolControl(ProtocolControlMessage::SetPeerBandwidth(
                body,
            )) => assert_eq!(body.size, 2_500_000),
            body => panic!("expected set peer bandwidth, got {:?}", body),
        }

        let (name, transaction_id, args) = client.recv_call().await;
        assert_eq!(name, "_result");
        assert_eq!(transaction_id, 1.0);
        assert_eq!(status_code(&args), "NetConnection.Connect.Success");

        let (name, _, _) = client.recv_call().await;
        assert_eq!(name, "onBWDone");
    }

    #[tokio::test]
    async fn fmle_publish_and_unpublish_flow() {
        let center_sender = start_center();
        let mut client = TestClient::new(start_session(center_sender.clone()));
        client.handshake().await;
        drive_through_connect(&mut client, "live").await;

        client.send_command(fmle_start("releaseStream", 2.0, "show")).await;
        let (name, transaction_id, _) = client.recv_call().await;
        assert_eq!((name.as_str(), transaction_id), ("_result", 2.0));

        // identify done, the server raises its outgoing chunk size
        let message = client.recv_message().await.unwrap();
        match message.body {
            RtmpChunkMessageBody::ProtocolControl(ProtocolControlMessage::SetChunkSize(body)) => {
                assert_eq!(body.chunk_size, 4096);
            }
            body => panic!("expected set chunk size, got {:?}", body),
        }

        client.send_command(fmle_start("FCPublish", 3.0, "show")).await;
        let (name, transaction_id, _) = client.recv_call().await;
        assert_eq!((name.as_str(), transaction_id), ("_result", 3.0));

        client
            .send_command(RtmpC2SCommands::CreateStream(CreateStreamCommandRequest {
                transaction_id: 4.0,
            }))
            .await;
        let (name, transaction_id, args) = client.recv_call().await;
        assert_eq!((name.as_str(), transaction_id), ("_result", 4.0));
        assert!(args.contains(&amf::Value::Number(1.0)));

        client
            .send_command(RtmpC2SCommands::Publish(PublishCommandRequest {
                transaction_id: 5.0,
                stream_name: "show".to_string(),
                publish_type: "live".to_string(),
            }))
            .await;
        let (name, _, args) = client.recv_call().await;
        assert_eq!(name, "onFCPublish");
        assert_eq!(status_code(&args), "NetStream.Publish.Start");
        let (name, _, args) = client.recv_call().await;
        assert_eq!(name, "onStatus");
        assert_eq!(status_code(&args), "NetStream.Publish.Start");

        // watch the fan-out directly
        let stream_id = StreamIdentifier {
            app: "live".to_string(),
            stream_name: "show".to_string(),
        };
        let mut probe = StreamCenter::subscribe(&center_sender, &stream_id)
            .await
            .unwrap();

        client.send_data(&meta_payload()).await;
        client.send_audio(&[0xAF, 0x00, 0x12, 0x10], 0).await;
        client.send_video(&[0x17, 0x00, 0x00, 0x00, 0x00], 0).await;

        let script = probe.media_receiver.recv().await.unwrap();
        assert!(script.is_script());
        {
            let mut cursor = Cursor::new(script.payload().as_ref());
            let values = amf::Value::read_all(&mut cursor).unwrap();
            assert_eq!(values[0], amf::Value::String("onMetaData".to_string()));
            let pairs = values[1].clone().try_into_pairs().unwrap();
            assert!(pairs.get("server").is_some());
        }
        let audio = probe.media_receiver.recv().await.unwrap();
        assert_eq!(audio.payload()[..], [0xAF, 0x00, 0x12, 0x10]);
        let video = probe.media_receiver.recv().await.unwrap();
        assert_eq!(video.payload()[..], [0x17, 0x00, 0x00, 0x00, 0x00]);

        // raise the publisher's chunk size and push a frame spanning
        // several chunks through the new setting
        client.writer.write_set_chunk_size(4096).unwrap();
        client.flush_writer().await;
        client.writer.set_chunk_size(4096).unwrap();
        let key_frame: Vec<u8> = (0..5000u32).map(|i| (i % 251) as u8).collect();
        client.send_video(&key_frame, 40).await;
        let relayed = probe.media_receiver.recv().await.unwrap();
        assert_eq!(relayed.pts(), 40);
        assert_eq!(relayed.payload()[..], key_frame[..]);

        client.send_command(fmle_start("FCUnpublish", 6.0, "show")).await;
        let (name, _, args) = client.recv_call().await;
        assert_eq!(name, "onFCUnpublish");
        assert_eq!(status_code(&args), "NetStream.Unpublish.Success");
        let (name, transaction_id, _) = client.recv_call().await;
        assert_eq!((name.as_str(), transaction_id), ("_result", 6.0));
        let (name, _, args) = client.recv_call().await;
        assert_eq!(name, "onStatus");
        assert_eq!(status_code(&args), "NetStream.Unpublish.Success");

        // the publish session terminates, players would stay attached
        assert!(client.recv_message().await.is_none());
    }

    #[tokio::test]
    async fn play_gets_start_sequence_cached_headers_then_live_frames() {
        let center_sender = start_center();
        let stream_id = StreamIdentifier {
            app: "live".to_string(),
            stream_name: "tv".to_string(),
        };
        let producer = StreamCenter::publish(&center_sender, &stream_id)
            .await
            .unwrap();
        producer
            .send(MediaFrame::Script {
                pts: 0,
                payload: Bytes::from(meta_payload()),
            })
            .unwrap();
        producer
            .send(MediaFrame::Audio {
                pts: 0,
                payload: Bytes::from_static(&[0xAF, 0x00, 0x12]),
            })
            .unwrap();
        producer
            .send(MediaFrame::Video {
                pts: 0,
                payload: Bytes::from_static(&[0x17, 0x00, 0x00, 0x00, 0x00]),
            })
            .unwrap();
        // a probe draining three frames proves the source cached them
        let mut probe = StreamCenter::subscribe(&center_sender, &stream_id)
            .await
            .unwrap();
        for _ in 0..3 {
            probe.media_receiver.recv().await.unwrap();
        }

        let mut client = TestClient::new(start_session(center_sender.clone()));
        client.handshake().await;
        drive_through_connect(&mut client, "live").await;

        client
            .send_command(RtmpC2SCommands::CreateStream(CreateStreamCommandRequest {
                transaction_id: 2.0,
            }))
            .await;
        let (name, transaction_id, args) = client.recv_call().await;
        assert_eq!((name.as_str(), transaction_id), ("_result", 2.0));
        assert!(args.contains(&amf::Value::Number(1.0)));

        client
            .send_command(RtmpC2SCommands::Play(PlayCommandRequest {
                transaction_id: 0.0,
                stream_name: "tv".to_string(),
                start: -2.0,
                duration: -1.0,
                reset: true,
            }))
            .await;

        let message = client.recv_message().await.unwrap();
        assert!(matches!(
            message.body,
            RtmpChunkMessageBody::ProtocolControl(ProtocolControlMessage::SetChunkSize(_))
        ));
        let message = client.recv_message().await.unwrap();
        match message.body {
            RtmpChunkMessageBody::UserControl(UserControlEvent::StreamBegin { stream_id }) => {
                assert_eq!(stream_id, 1);
            }
            body => panic!("expected stream begin, got {:?}", body),
        }
        let (name, _, args) = client.recv_call().await;
        assert_eq!(name, "onStatus");
        assert_eq!(status_code(&args), "NetStream.Play.Reset");
        let (name, _, args) = client.recv_call().await;
        assert_eq!(name, "onStatus");
        assert_eq!(status_code(&args), "NetStream.Play.Start");

        // |RtmpSampleAccess rides as a data message
        let message = client.recv_message().await.unwrap();
        match &message.body {
            RtmpChunkMessageBody::RtmpUserMessage(RtmpUserMessageBody::MetaData { payload }) => {
                assert_eq!(&payload[3..20], b"|RtmpSampleAccess");
            }
            body => panic!("expected sample access data, got {:?}", body),
        }
        // NetStream.Data.Start
        let message = client.recv_message().await.unwrap();
        match &message.body {
            RtmpChunkMessageBody::RtmpUserMessage(RtmpUserMessageBody::MetaData { payload }) => {
                let mut cursor = Cursor::new(payload.as_ref());
                let values = amf::Value::read_all(&mut cursor).unwrap();
                assert_eq!(values[0], amf::Value::String("onStatus".to_string()));
            }
            body => panic!("expected data start, got {:?}", body),
        }

        // cached metadata, then the video and audio sequence headers
        let message = client.recv_message().await.unwrap();
        match &message.body {
            RtmpChunkMessageBody::RtmpUserMessage(RtmpUserMessageBody::MetaData { payload }) => {
                let mut cursor = Cursor::new(payload.as_ref());
                let values = amf::Value::read_all(&mut cursor).unwrap();
                assert_eq!(values[0], amf::Value::String("onMetaData".to_string()));
            }
            body => panic!("expected cached metadata, got {:?}", body),
        }
        let message = client.recv_message().await.unwrap();
        assert_eq!(message.header.stream_id, 1);
        match &message.body {
            RtmpChunkMessageBody::RtmpUserMessage(RtmpUserMessageBody::Video { payload }) => {
                assert_eq!(&payload[..], &[0x17, 0x00, 0x00, 0x00, 0x00]);
            }
            body => panic!("expected cached video header, got {:?}", body),
        }
        let message = client.recv_message().await.unwrap();
        match &message.body {
            RtmpChunkMessageBody::RtmpUserMessage(RtmpUserMessageBody::Audio { payload }) => {
                assert_eq!(&payload[..], &[0xAF, 0x00, 0x12]);
            }
            body => panic!("expected cached audio header, got {:?}", body),
        }

        // live frames keep flowing with the publisher's timestamps
        producer
            .send(MediaFrame::Video {
                pts: 50,
                payload: Bytes::from_static(&[0x27, 0x01]),
            })
            .unwrap();
        let message = client.recv_message().await.unwrap();
        assert_eq!(message.header.timestamp, 50);
        assert_eq!(
            message.header.message_type,
            u8::from(RtmpMessageType::Video)
        );
    }
}
