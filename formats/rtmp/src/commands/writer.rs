use std::io;

use amf::Value as AmfValue;
use utils::traits::{dynamic_sized_packet::DynamicSizedPacket, writer::WriteTo};

use crate::chunk::errors::ChunkMessageError;

use super::{
    CallCommandRequest, ConnectCommandRequest, ConnectCommandResponse, CreateStreamCommandRequest,
    CreateStreamCommandResponse, FmleStartCommandRequest, FmleStartCommandResponse,
    OnBwDoneCommand, OnStatusCallCommand, OnStatusDataMessage, PlayCommandRequest,
    PublishCommandRequest, RtmpC2SCommands, RtmpS2CCommands, SampleAccessMessage,
    consts::{c2s_command_names, s2c_command_names},
};

const NUMBER_BYTES: usize = 9;
const BOOLEAN_BYTES: usize = 2;
const NULL_BYTES: usize = 1;
const UNDEFINED_BYTES: usize = 1;

fn string_bytes(value: &str) -> usize {
    1 + 2 + value.len()
}

fn object_bytes(pairs: &amf::ObjectPairs) -> usize {
    1 + pairs.wire_bytes_count()
}

impl<W: io::Write> WriteTo<W> for ConnectCommandRequest {
    type Error = ChunkMessageError;
    fn write_to(&self, writer: &mut W) -> Result<(), Self::Error> {
        AmfValue::write_string(writer, c2s_command_names::CONNECT)?;
        AmfValue::write_number(writer, self.transaction_id)?;
        AmfValue::write_object(writer, &self.command_object)?;
        if let Some(arguments) = &self.optional_user_arguments {
            AmfValue::write_object(writer, arguments)?;
        }
        Ok(())
    }
}

impl DynamicSizedPacket for ConnectCommandRequest {
    fn get_packet_bytes_count(&self) -> usize {
        string_bytes(c2s_command_names::CONNECT)
            + NUMBER_BYTES
            + object_bytes(&self.command_object)
            + self
                .optional_user_arguments
                .as_ref()
                .map_or(0, object_bytes)
    }
}

impl<W: io::Write> WriteTo<W> for ConnectCommandResponse {
    type Error = ChunkMessageError;
    fn write_to(&self, writer: &mut W) -> Result<(), Self::Error> {
        AmfValue::write_string(writer, s2c_command_names::RESULT)?;
        AmfValue::write_number(writer, self.transaction_id)?;
        AmfValue::write_object(writer, &self.properties)?;
        AmfValue::write_object(writer, &self.information)?;
        Ok(())
    }
}

impl DynamicSizedPacket for ConnectCommandResponse {
    fn get_packet_bytes_count(&self) -> usize {
        string_bytes(s2c_command_names::RESULT)
            + NUMBER_BYTES
            + object_bytes(&self.properties)
            + object_bytes(&self.information)
    }
}

impl<W: io::Write> WriteTo<W> for CreateStreamCommandRequest {
    type Error = ChunkMessageError;
    fn write_to(&self, writer: &mut W) -> Result<(), Self::Error> {
        AmfValue::write_string(writer, c2s_command_names::CREATE_STREAM)?;
        AmfValue::write_number(writer, self.transaction_id)?;
        AmfValue::write_null(writer)?;
        Ok(())
    }
}

impl DynamicSizedPacket for CreateStreamCommandRequest {
    fn get_packet_bytes_count(&self) -> usize {
        string_bytes(c2s_command_names::CREATE_STREAM) + NUMBER_BYTES + NULL_BYTES
    }
}

impl<W: io::Write> WriteTo<W> for CreateStreamCommandResponse {
    type Error = ChunkMessageError;
    fn write_to(&self, writer: &mut W) -> Result<(), Self::Error> {
        AmfValue::write_string(writer, s2c_command_names::RESULT)?;
        AmfValue::write_number(writer, self.transaction_id)?;
        AmfValue::write_null(writer)?;
        AmfValue::write_number(writer, self.stream_id)?;
        Ok(())
    }
}

impl DynamicSizedPacket for CreateStreamCommandResponse {
    fn get_packet_bytes_count(&self) -> usize {
        string_bytes(s2c_command_names::RESULT) + NUMBER_BYTES + NULL_BYTES + NUMBER_BYTES
    }
}

impl<W: io::Write> WriteTo<W> for FmleStartCommandRequest {
    type Error = ChunkMessageError;
    fn write_to(&self, writer: &mut W) -> Result<(), Self::Error> {
        AmfValue::write_string(writer, &self.command_name)?;
        AmfValue::write_number(writer, self.transaction_id)?;
        AmfValue::write_null(writer)?;
        AmfValue::write_string(writer, &self.stream_name)?;
        Ok(())
    }
}

impl DynamicSizedPacket for FmleStartCommandRequest {
    fn get_packet_bytes_count(&self) -> usize {
        string_bytes(&self.command_name)
            + NUMBER_BYTES
            + NULL_BYTES
            + string_bytes(&self.stream_name)
    }
}

impl<W: io::Write> WriteTo<W> for FmleStartCommandResponse {
    type Error = ChunkMessageError;
    fn write_to(&self, writer: &mut W) -> Result<(), Self::Error> {
        AmfValue::write_string(writer, s2c_command_names::RESULT)?;
        AmfValue::write_number(writer, self.transaction_id)?;
        AmfValue::write_null(writer)?;
        AmfValue::write_undefined(writer)?;
        Ok(())
    }
}

impl DynamicSizedPacket for FmleStartCommandResponse {
    fn get_packet_bytes_count(&self) -> usize {
        string_bytes(s2c_command_names::RESULT) + NUMBER_BYTES + NULL_BYTES + UNDEFINED_BYTES
    }
}

impl<W: io::Write> WriteTo<W> for PublishCommandRequest {
    type Error = ChunkMessageError;
    fn write_to(&self, writer: &mut W) -> Result<(), Self::Error> {
        AmfValue::write_string(writer, c2s_command_names::PUBLISH)?;
        AmfValue::write_number(writer, self.transaction_id)?;
        AmfValue::write_null(writer)?;
        AmfValue::write_string(writer, &self.stream_name)?;
        AmfValue::write_string(writer, &self.publish_type)?;
        Ok(())
    }
}

impl DynamicSizedPacket for PublishCommandRequest {
    fn get_packet_bytes_count(&self) -> usize {
        string_bytes(c2s_command_names::PUBLISH)
            + NUMBER_BYTES
            + NULL_BYTES
            + string_bytes(&self.stream_name)
            + string_bytes(&self.publish_type)
    }
}

impl<W: io::Write> WriteTo<W> for PlayCommandRequest {
    type Error = ChunkMessageError;
    fn write_to(&self, writer: &mut W) -> Result<(), Self::Error> {
        AmfValue::write_string(writer, c2s_command_names::PLAY)?;
        AmfValue::write_number(writer, self.transaction_id)?;
        AmfValue::write_null(writer)?;
        AmfValue::write_string(writer, &self.stream_name)?;
        AmfValue::write_number(writer, self.start)?;
        AmfValue::write_number(writer, self.duration)?;
        AmfValue::write_boolean(writer, self.reset)?;
        Ok(())
    }
}

impl DynamicSizedPacket for PlayCommandRequest {
    fn get_packet_bytes_count(&self) -> usize {
        string_bytes(c2s_command_names::PLAY)
            + NUMBER_BYTES
            + NULL_BYTES
            + string_bytes(&self.stream_name)
            + NUMBER_BYTES
            + NUMBER_BYTES
            + BOOLEAN_BYTES
    }
}

impl<W: io::Write> WriteTo<W> for OnStatusCallCommand {
    type Error = ChunkMessageError;
    fn write_to(&self, writer: &mut W) -> Result<(), Self::Error> {
        AmfValue::write_string(writer, &self.command_name)?;
        AmfValue::write_number(writer, self.transaction_id)?;
        AmfValue::write_null(writer)?;
        AmfValue::write_object(writer, &self.info)?;
        Ok(())
    }
}

impl DynamicSizedPacket for OnStatusCallCommand {
    fn get_packet_bytes_count(&self) -> usize {
        string_bytes(&self.command_name) + NUMBER_BYTES + NULL_BYTES + object_bytes(&self.info)
    }
}

impl<W: io::Write> WriteTo<W> for OnStatusDataMessage {
    type Error = ChunkMessageError;
    fn write_to(&self, writer: &mut W) -> Result<(), Self::Error> {
        AmfValue::write_string(writer, s2c_command_names::ON_STATUS)?;
        AmfValue::write_object(writer, &self.info)?;
        Ok(())
    }
}

impl DynamicSizedPacket for OnStatusDataMessage {
    fn get_packet_bytes_count(&self) -> usize {
        string_bytes(s2c_command_names::ON_STATUS) + object_bytes(&self.info)
    }
}

impl<W: io::Write> WriteTo<W> for OnBwDoneCommand {
    type Error = ChunkMessageError;
    fn write_to(&self, writer: &mut W) -> Result<(), Self::Error> {
        AmfValue::write_string(writer, s2c_command_names::ON_BW_DONE)?;
        AmfValue::write_number(writer, 0.0)?;
        AmfValue::write_null(writer)?;
        Ok(())
    }
}

impl DynamicSizedPacket for OnBwDoneCommand {
    fn get_packet_bytes_count(&self) -> usize {
        string_bytes(s2c_command_names::ON_BW_DONE) + NUMBER_BYTES + NULL_BYTES
    }
}

impl<W: io::Write> WriteTo<W> for SampleAccessMessage {
    type Error = ChunkMessageError;
    fn write_to(&self, writer: &mut W) -> Result<(), Self::Error> {
        AmfValue::write_string(writer, s2c_command_names::SAMPLE_ACCESS)?;
        AmfValue::write_boolean(writer, self.video_access)?;
        AmfValue::write_boolean(writer, self.audio_access)?;
        Ok(())
    }
}

impl DynamicSizedPacket for SampleAccessMessage {
    fn get_packet_bytes_count(&self) -> usize {
        string_bytes(s2c_command_names::SAMPLE_ACCESS) + BOOLEAN_BYTES + BOOLEAN_BYTES
    }
}

impl<W: io::Write> WriteTo<W> for CallCommandRequest {
    type Error = ChunkMessageError;
    fn write_to(&self, writer: &mut W) -> Result<(), Self::Error> {
        AmfValue::write_string(writer, &self.command_name)?;
        AmfValue::write_number(writer, self.transaction_id)?;
        for argument in &self.arguments {
            argument.write_to(writer)?;
        }
        Ok(())
    }
}

impl DynamicSizedPacket for CallCommandRequest {
    fn get_packet_bytes_count(&self) -> usize {
        string_bytes(&self.command_name)
            + NUMBER_BYTES
            + self
                .arguments
                .iter()
                .map(|v| v.get_packet_bytes_count())
                .sum::<usize>()
    }
}

impl<W: io::Write> WriteTo<W> for RtmpC2SCommands {
    type Error = ChunkMessageError;
    fn write_to(&self, writer: &mut W) -> Result<(), Self::Error> {
        match self {
            RtmpC2SCommands::Connect(command) => command.write_to(writer),
            RtmpC2SCommands::CreateStream(command) => command.write_to(writer),
            RtmpC2SCommands::Play(command) => command.write_to(writer),
            RtmpC2SCommands::Publish(command) => command.write_to(writer),
            RtmpC2SCommands::FmleStart(command) => command.write_to(writer),
            RtmpC2SCommands::Call(command) => command.write_to(writer),
        }
    }
}

impl<W: io::Write> WriteTo<W> for RtmpS2CCommands {
    type Error = ChunkMessageError;
    fn write_to(&self, writer: &mut W) -> Result<(), Self::Error> {
        match self {
            RtmpS2CCommands::Connect(command) => command.write_to(writer),
            RtmpS2CCommands::CreateStream(command) => command.write_to(writer),
            RtmpS2CCommands::FmleStart(command) => command.write_to(writer),
            RtmpS2CCommands::OnStatus(command) => command.write_to(writer),
            RtmpS2CCommands::OnBwDone(command) => command.write_to(writer),
        }
    }
}

impl DynamicSizedPacket for RtmpS2CCommands {
    fn get_packet_bytes_count(&self) -> usize {
        match self {
            RtmpS2CCommands::Connect(command) => command.get_packet_bytes_count(),
            RtmpS2CCommands::CreateStream(command) => command.get_packet_bytes_count(),
            RtmpS2CCommands::FmleStart(command) => command.get_packet_bytes_count(),
            RtmpS2CCommands::OnStatus(command) => command.get_packet_bytes_count(),
            RtmpS2CCommands::OnBwDone(command) => command.get_packet_bytes_count(),
        }
    }
}
