use std::io;

use amf::ObjectPairs;
use url::Url;

use crate::{
    chunk::{
        consts::csid,
        errors::{ChunkMessageError, ChunkMessageResult},
    },
    message::RtmpMessageType,
};

pub mod consts;
pub mod reader;
pub mod writer;

// @see: 7.2.1.1. connect
#[derive(Debug, Clone)]
pub struct ConnectCommandRequest {
    pub transaction_id: f64, // always 1
    pub command_object: ObjectPairs,
    pub optional_user_arguments: Option<ObjectPairs>,
}

impl ConnectCommandRequest {
    pub fn tc_url(&self) -> Option<&str> {
        self.command_object.get("tcUrl").and_then(|v| v.try_as_str())
    }

    pub fn object_encoding(&self) -> f64 {
        self.command_object
            .get("objectEncoding")
            .and_then(|v| v.try_as_f64())
            .unwrap_or(0.0)
    }
}

#[derive(Debug, Clone)]
pub struct ConnectCommandResponse {
    pub transaction_id: f64, // always 1
    pub properties: ObjectPairs,
    pub information: ObjectPairs,
}

#[derive(Debug, Clone)]
pub struct CreateStreamCommandRequest {
    pub transaction_id: f64,
}

#[derive(Debug, Clone)]
pub struct CreateStreamCommandResponse {
    pub transaction_id: f64,
    pub stream_id: f64,
}

/// releaseStream / FCPublish / FCUnpublish, the FMLE publish preamble.
#[derive(Debug, Clone)]
pub struct FmleStartCommandRequest {
    pub command_name: String,
    pub transaction_id: f64,
    pub stream_name: String,
}

impl FmleStartCommandRequest {
    pub fn is_unpublish(&self) -> bool {
        self.command_name == consts::c2s_command_names::FC_UNPUBLISH
    }
}

/// "_result", tid, Null, Undefined
#[derive(Debug, Clone)]
pub struct FmleStartCommandResponse {
    pub transaction_id: f64,
}

#[derive(Debug, Clone)]
pub struct PublishCommandRequest {
    pub transaction_id: f64,
    pub stream_name: String,
    pub publish_type: String, // "live", "record", "append"
}

#[derive(Debug, Clone)]
pub struct PlayCommandRequest {
    pub transaction_id: f64,
    pub stream_name: String,
    pub start: f64,
    pub duration: f64,
    pub reset: bool,
}

/// onStatus-class call: command name is "onStatus", "onFCPublish" or
/// "onFCUnpublish", transaction id 0, Null, then the info object.
#[derive(Debug, Clone)]
pub struct OnStatusCallCommand {
    pub command_name: String,
    pub transaction_id: f64, // 0
    pub info: ObjectPairs,
}

/// onStatus delivered as an AMF0 data message (type 18).
#[derive(Debug, Clone)]
pub struct OnStatusDataMessage {
    pub info: ObjectPairs,
}

#[derive(Debug, Clone)]
pub struct OnBwDoneCommand {}

/// "|RtmpSampleAccess", Bool, Bool, sent as a data message.
#[derive(Debug, Clone)]
pub struct SampleAccessMessage {
    pub video_access: bool,
    pub audio_access: bool,
}

/// Any command this server does not model; kept for logging and skipped.
#[derive(Debug, Clone)]
pub struct CallCommandRequest {
    pub command_name: String,
    pub transaction_id: f64,
    pub arguments: Vec<amf::Value>,
}

#[derive(Debug)]
pub enum RtmpC2SCommands {
    Connect(ConnectCommandRequest),
    CreateStream(CreateStreamCommandRequest),
    Play(PlayCommandRequest),
    Publish(PublishCommandRequest),
    FmleStart(FmleStartCommandRequest),
    Call(CallCommandRequest),
}

impl RtmpC2SCommands {
    pub fn read_from<R>(inner: &mut R) -> ChunkMessageResult<RtmpC2SCommands>
    where
        R: io::Read,
    {
        reader::Reader::new(inner).read_c2s_command()
    }

    pub fn preferred_csid(&self) -> u32 {
        csid::NET_CONNECTION_COMMAND.into()
    }

    pub fn message_type_id(&self) -> u8 {
        RtmpMessageType::AMF0Command.into()
    }
}

#[derive(Debug)]
pub enum RtmpS2CCommands {
    Connect(ConnectCommandResponse),
    CreateStream(CreateStreamCommandResponse),
    FmleStart(FmleStartCommandResponse),
    OnStatus(OnStatusCallCommand),
    OnBwDone(OnBwDoneCommand),
}

#[derive(Debug, Clone, Copy)]
pub enum RtmpS2CCommandsType {
    Connect,
    CreateStream,
    FmleStart,
    OnStatus,
    OnBwDone,
}

impl RtmpS2CCommands {
    pub fn read_from<R>(
        inner: &mut R,
        command_type: RtmpS2CCommandsType,
    ) -> ChunkMessageResult<RtmpS2CCommands>
    where
        R: io::Read,
    {
        reader::Reader::new(inner).read_s2c_command(command_type)
    }

    pub fn preferred_csid(&self) -> u32 {
        match self {
            RtmpS2CCommands::OnStatus(_) => csid::NET_STREAM_COMMAND.into(),
            _ => csid::NET_CONNECTION_COMMAND.into(),
        }
    }

    pub fn message_type_id(&self) -> u8 {
        RtmpMessageType::AMF0Command.into()
    }
}

impl OnStatusDataMessage {
    pub fn preferred_csid(&self) -> u32 {
        csid::NET_STREAM_COMMAND.into()
    }

    pub fn message_type_id(&self) -> u8 {
        RtmpMessageType::AMF0Data.into()
    }
}

impl SampleAccessMessage {
    pub fn preferred_csid(&self) -> u32 {
        csid::NET_STREAM_COMMAND.into()
    }

    pub fn message_type_id(&self) -> u8 {
        RtmpMessageType::AMF0Data.into()
    }
}

/// The connect request's `tcUrl` broken into its four mandatory parts:
/// `schema://vhost[:port]/app`, port defaulting to 1935.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcUrl {
    pub schema: String,
    pub vhost: String,
    pub port: String,
    pub app: String,
}

impl TcUrl {
    pub fn parse(tc_url: &str) -> ChunkMessageResult<Self> {
        let url = Url::parse(tc_url)
            .map_err(|err| ChunkMessageError::InvalidTcUrl(format!("{}: {}", tc_url, err)))?;
        let schema = url.scheme().to_string();
        let vhost = url.host_str().unwrap_or_default().to_string();
        let port = url
            .port()
            .map_or_else(|| consts::DEFAULT_RTMP_PORT.to_string(), |p| p.to_string());
        let app = url
            .path_segments()
            .and_then(|mut segments| segments.next())
            .unwrap_or_default()
            .to_string();

        if schema.is_empty() || vhost.is_empty() || port.is_empty() || app.is_empty() {
            return Err(ChunkMessageError::InvalidTcUrl(format!(
                "tcUrl must carry schema, vhost, port and app: {}",
                tc_url
            )));
        }
        Ok(Self {
            schema,
            vhost,
            port,
            app,
        })
    }
}
