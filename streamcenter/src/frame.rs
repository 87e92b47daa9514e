use tokio_util::bytes::Bytes;

use rtmp_formats::{chunk::consts::csid, message::RtmpMessageType};

/// A media message ready for fan-out.
///
/// The payload is shared storage: cloning a frame hands out another
/// handle over the same bytes, and the buffer is released when the last
/// handle drops. The preferred chunk id rides with the variant.
#[derive(Debug, Clone)]
pub enum MediaFrame {
    Audio { pts: u32, payload: Bytes },
    Video { pts: u32, payload: Bytes },
    Script { pts: u32, payload: Bytes },
}

impl MediaFrame {
    #[inline]
    pub fn is_audio(&self) -> bool {
        matches!(self, MediaFrame::Audio { .. })
    }

    #[inline]
    pub fn is_video(&self) -> bool {
        matches!(self, MediaFrame::Video { .. })
    }

    #[inline]
    pub fn is_script(&self) -> bool {
        matches!(self, MediaFrame::Script { .. })
    }

    pub fn pts(&self) -> u32 {
        match self {
            MediaFrame::Audio { pts, .. }
            | MediaFrame::Video { pts, .. }
            | MediaFrame::Script { pts, .. } => *pts,
        }
    }

    pub fn payload(&self) -> &Bytes {
        match self {
            MediaFrame::Audio { payload, .. }
            | MediaFrame::Video { payload, .. }
            | MediaFrame::Script { payload, .. } => payload,
        }
    }

    pub fn preferred_csid(&self) -> u32 {
        match self {
            MediaFrame::Audio { .. } => csid::AUDIO.into(),
            MediaFrame::Video { .. } => csid::VIDEO.into(),
            MediaFrame::Script { .. } => csid::NET_CONNECTION_COMMAND2.into(),
        }
    }

    pub fn message_type_id(&self) -> u8 {
        match self {
            MediaFrame::Audio { .. } => RtmpMessageType::Audio.into(),
            MediaFrame::Video { .. } => RtmpMessageType::Video.into(),
            MediaFrame::Script { .. } => RtmpMessageType::AMF0Data.into(),
        }
    }
}
