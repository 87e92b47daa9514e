use std::io;

use amf::{ObjectPairs, Value as AmfValue, amf0::reader::Reader as Amf0Reader};

use crate::chunk::errors::{ChunkMessageError, ChunkMessageResult};

use super::{
    CallCommandRequest, ConnectCommandRequest, ConnectCommandResponse, CreateStreamCommandRequest,
    CreateStreamCommandResponse, FmleStartCommandRequest, FmleStartCommandResponse,
    OnStatusCallCommand, PlayCommandRequest, PublishCommandRequest, RtmpC2SCommands,
    RtmpS2CCommands, RtmpS2CCommandsType,
    consts::{CONNECT_TRANSACTION_ID, c2s_command_names, play_defaults, s2c_command_names},
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

    pub fn read_c2s_command(&mut self) -> ChunkMessageResult<RtmpC2SCommands> {
        let command_name = self.read_amf_string()?;
        match command_name.as_str() {
            c2s_command_names::CONNECT => {
                Ok(RtmpC2SCommands::Connect(self.read_connect_request()?))
            }
            c2s_command_names::CREATE_STREAM => Ok(RtmpC2SCommands::CreateStream(
                self.read_create_stream_request()?,
            )),
            c2s_command_names::PLAY => Ok(RtmpC2SCommands::Play(self.read_play_request()?)),
            c2s_command_names::PUBLISH => {
                Ok(RtmpC2SCommands::Publish(self.read_publish_request()?))
            }
            c2s_command_names::RELEASE_STREAM
            | c2s_command_names::FC_PUBLISH
            | c2s_command_names::FC_UNPUBLISH => Ok(RtmpC2SCommands::FmleStart(
                self.read_fmle_start_request(command_name)?,
            )),
            _ => Ok(RtmpC2SCommands::Call(
                self.read_call_request(command_name)?,
            )),
        }
    }

    pub fn read_s2c_command(
        &mut self,
        command_type: RtmpS2CCommandsType,
    ) -> ChunkMessageResult<RtmpS2CCommands> {
        match command_type {
            RtmpS2CCommandsType::Connect => {
                Ok(RtmpS2CCommands::Connect(self.read_connect_response()?))
            }
            RtmpS2CCommandsType::CreateStream => Ok(RtmpS2CCommands::CreateStream(
                self.read_create_stream_response()?,
            )),
            RtmpS2CCommandsType::FmleStart => {
                Ok(RtmpS2CCommands::FmleStart(self.read_fmle_start_response()?))
            }
            RtmpS2CCommandsType::OnStatus => {
                Ok(RtmpS2CCommands::OnStatus(self.read_on_status_command()?))
            }
            RtmpS2CCommandsType::OnBwDone => {
                let command_name = self.read_amf_string()?;
                if command_name != s2c_command_names::ON_BW_DONE {
                    return Err(ChunkMessageError::UnexpectedCommandName(command_name));
                }
                let _transaction_id = self.read_amf_number()?;
                self.read_amf_null()?;
                Ok(RtmpS2CCommands::OnBwDone(super::OnBwDoneCommand {}))
            }
        }
    }

    fn read_connect_request(&mut self) -> ChunkMessageResult<ConnectCommandRequest> {
        let transaction_id = self.read_amf_number()?;
        if transaction_id != CONNECT_TRANSACTION_ID {
            tracing::warn!("connect transaction id should be 1.0, got {}", transaction_id);
        }
        let command_object = self.read_amf_object()?.ok_or_else(|| {
            ChunkMessageError::UnexpectedAmfType(
                "connect command object must be key-value pairs".to_string(),
            )
        })?;
        let optional_user_arguments = self.read_amf_object_opt()?;
        Ok(ConnectCommandRequest {
            transaction_id,
            command_object,
            optional_user_arguments,
        })
    }

    fn read_create_stream_request(&mut self) -> ChunkMessageResult<CreateStreamCommandRequest> {
        let transaction_id = self.read_amf_number()?;
        let _command_object = self.read_amf_object_opt()?;
        Ok(CreateStreamCommandRequest { transaction_id })
    }

    fn read_play_request(&mut self) -> ChunkMessageResult<PlayCommandRequest> {
        let transaction_id = self.read_amf_number()?;
        self.read_amf_null()?;
        let stream_name = self.read_amf_string()?;
        // start, duration and reset are optional trailing arguments
        let start = match self.read_optional()? {
            Some(value) => value
                .try_as_f64()
                .ok_or_else(|| ChunkMessageError::UnexpectedAmfType("play start".to_string()))?,
            None => play_defaults::START,
        };
        let duration = match self.read_optional()? {
            Some(value) => value
                .try_as_f64()
                .ok_or_else(|| ChunkMessageError::UnexpectedAmfType("play duration".to_string()))?,
            None => play_defaults::DURATION,
        };
        let reset = match self.read_optional()? {
            Some(value) => value
                .try_as_bool()
                .ok_or_else(|| ChunkMessageError::UnexpectedAmfType("play reset".to_string()))?,
            None => play_defaults::RESET,
        };
        Ok(PlayCommandRequest {
            transaction_id,
            stream_name,
            start,
            duration,
            reset,
        })
    }

    fn read_publish_request(&mut self) -> ChunkMessageResult<PublishCommandRequest> {
        let transaction_id = self.read_amf_number()?;
        self.read_amf_null()?;
        let stream_name = self.read_amf_string()?;
        let publish_type = self.read_amf_string()?;
        Ok(PublishCommandRequest {
            transaction_id,
            stream_name,
            publish_type,
        })
    }

    fn read_fmle_start_request(
        &mut self,
        command_name: String,
    ) -> ChunkMessageResult<FmleStartCommandRequest> {
        let transaction_id = self.read_amf_number()?;
        self.read_amf_null()?;
        let stream_name = self.read_amf_string()?;
        Ok(FmleStartCommandRequest {
            command_name,
            transaction_id,
            stream_name,
        })
    }

    fn read_call_request(&mut self, command_name: String) -> ChunkMessageResult<CallCommandRequest> {
        let transaction_id = match self.read_optional()? {
            Some(value) => value.try_as_f64().unwrap_or(0.0),
            None => 0.0,
        };
        let mut arguments = Vec::new();
        while let Some(value) = self.read_optional()? {
            arguments.push(value);
        }
        Ok(CallCommandRequest {
            command_name,
            transaction_id,
            arguments,
        })
    }

    fn read_connect_response(&mut self) -> ChunkMessageResult<ConnectCommandResponse> {
        self.expect_result_name()?;
        let transaction_id = self.read_amf_number()?;
        let properties = self.read_amf_object()?.ok_or_else(|| {
            ChunkMessageError::UnexpectedAmfType("connect response properties".to_string())
        })?;
        let information = self.read_amf_object()?.ok_or_else(|| {
            ChunkMessageError::UnexpectedAmfType("connect response information".to_string())
        })?;
        Ok(ConnectCommandResponse {
            transaction_id,
            properties,
            information,
        })
    }

    fn read_create_stream_response(&mut self) -> ChunkMessageResult<CreateStreamCommandResponse> {
        self.expect_result_name()?;
        let transaction_id = self.read_amf_number()?;
        self.read_amf_null()?;
        let stream_id = self.read_amf_number()?;
        Ok(CreateStreamCommandResponse {
            transaction_id,
            stream_id,
        })
    }

    fn read_fmle_start_response(&mut self) -> ChunkMessageResult<FmleStartCommandResponse> {
        self.expect_result_name()?;
        let transaction_id = self.read_amf_number()?;
        self.read_amf_null()?;
        let _undefined = self.read_optional()?;
        Ok(FmleStartCommandResponse { transaction_id })
    }

    fn read_on_status_command(&mut self) -> ChunkMessageResult<OnStatusCallCommand> {
        let command_name = self.read_amf_string()?;
        let transaction_id = self.read_amf_number()?;
        self.read_amf_null()?;
        let info = self.read_amf_object()?.ok_or_else(|| {
            ChunkMessageError::UnexpectedAmfType("onStatus info object".to_string())
        })?;
        Ok(OnStatusCallCommand {
            command_name,
            transaction_id,
            info,
        })
    }

    fn expect_result_name(&mut self) -> ChunkMessageResult<()> {
        let command_name = self.read_amf_string()?;
        if command_name != s2c_command_names::RESULT && command_name != s2c_command_names::ERROR {
            return Err(ChunkMessageError::UnexpectedCommandName(format!(
                "expect _result or _error, got: {}",
                command_name
            )));
        }
        Ok(())
    }

    fn read_optional(&mut self) -> ChunkMessageResult<Option<AmfValue>> {
        Ok(Amf0Reader::new(self.inner).read()?)
    }

    fn read_amf_string(&mut self) -> ChunkMessageResult<String> {
        match self.read_optional()? {
            Some(AmfValue::String(s)) => Ok(s),
            value => Err(ChunkMessageError::UnexpectedAmfType(format!(
                "expect a string, got: {:?}",
                value
            ))),
        }
    }

    fn read_amf_number(&mut self) -> ChunkMessageResult<f64> {
        match self.read_optional()? {
            Some(AmfValue::Number(n)) => Ok(n),
            value => Err(ChunkMessageError::UnexpectedAmfType(format!(
                "expect a number, got: {:?}",
                value
            ))),
        }
    }

    fn read_amf_null(&mut self) -> ChunkMessageResult<()> {
        match self.read_optional()? {
            Some(AmfValue::Null) => Ok(()),
            value => Err(ChunkMessageError::UnexpectedAmfType(format!(
                "expect a null, got: {:?}",
                value
            ))),
        }
    }

    /// Null yields `None`; Object and ECMAArray yield their pairs.
    fn read_amf_object(&mut self) -> ChunkMessageResult<Option<ObjectPairs>> {
        match self.read_optional()? {
            None => Err(ChunkMessageError::UnexpectedAmfType(
                "expect an object, got eof".to_string(),
            )),
            Some(AmfValue::Null) => Ok(None),
            Some(value) => value.try_into_pairs().map(Some).map_err(|value| {
                ChunkMessageError::UnexpectedAmfType(format!(
                    "expect key-value pairs, got: {:?}",
                    value
                ))
            }),
        }
    }

    /// Like `read_amf_object` but tolerates a clean end of the body.
    fn read_amf_object_opt(&mut self) -> ChunkMessageResult<Option<ObjectPairs>> {
        match self.read_optional()? {
            None | Some(AmfValue::Null) => Ok(None),
            Some(value) => value.try_into_pairs().map(Some).map_err(|value| {
                ChunkMessageError::UnexpectedAmfType(format!(
                    "expect key-value pairs, got: {:?}",
                    value
                ))
            }),
        }
    }
}
