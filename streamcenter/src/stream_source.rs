use std::{collections::HashMap, fmt::Display, io::Cursor, sync::Arc};

use amf::{ObjectPairs, Value as AmfValue};
use tokio::sync::{RwLock, mpsc};
use tokio_util::bytes::Bytes;
use uuid::Uuid;

use crate::{
    consts::server_signature,
    errors::{StreamCenterError, StreamCenterResult},
    frame::MediaFrame,
};

#[derive(Debug, Hash, Clone, PartialEq, Eq)]
pub struct StreamIdentifier {
    pub app: String,
    pub stream_name: String,
}

impl StreamIdentifier {
    /// Streams key on app + name only. Two vhosts sharing an app/stream
    /// pair land on the same source.
    pub fn stream_url(&self) -> String {
        format!("/{}/{}", self.app, self.stream_name)
    }
}

impl Display for StreamIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.stream_url())
    }
}

#[derive(Debug, Default)]
pub struct PlayStat {
    pub audio_frames_sent: u64,
    pub video_frames_sent: u64,
    pub script_frames_sent: u64,
    pub frame_send_fail_cnt: u64,
}

/// One attached player: the producer side of its unbounded frame queue.
#[derive(Debug)]
pub struct SubscribeHandler {
    pub data_sender: mpsc::UnboundedSender<MediaFrame>,
    pub stat: PlayStat,
}

/// Cached frames replayed to late joiners: the latest metadata and the
/// first audio/video message of the stream. The sequence-header slots are
/// first-message-wins and never overwritten for the life of the entry, so
/// a publisher re-sending sequence headers after a codec change is not
/// honored.
#[derive(Debug, Default)]
pub struct SourceCache {
    pub metadata: Option<MediaFrame>,
    pub video_sequence_header: Option<MediaFrame>,
    pub audio_sequence_header: Option<MediaFrame>,
}

/// Consumers and caches share one lock so that attaching a player (replay
/// caches, then join the fan-out set) is atomic against frame delivery.
#[derive(Debug, Default)]
pub struct SourceRuntime {
    pub consumers: HashMap<Uuid, SubscribeHandler>,
    pub cache: SourceCache,
}

/// Drains a publisher's frames into every attached player queue.
#[derive(Debug)]
pub struct StreamSource {
    identifier: StreamIdentifier,
    data_receiver: mpsc::UnboundedReceiver<MediaFrame>,
    runtime: Arc<RwLock<SourceRuntime>>,
}

impl StreamSource {
    pub fn new(
        identifier: StreamIdentifier,
        data_receiver: mpsc::UnboundedReceiver<MediaFrame>,
        runtime: Arc<RwLock<SourceRuntime>>,
    ) -> Self {
        Self {
            identifier,
            data_receiver,
            runtime,
        }
    }

    pub async fn run(&mut self) {
        tracing::info!("stream source is running: {}", self.identifier);
        while let Some(frame) = self.data_receiver.recv().await {
            if let Err(err) = self.on_media_frame(frame).await {
                tracing::error!(
                    "process frame on {} failed: {:?}",
                    self.identifier,
                    err
                );
            }
        }
        // all producer handles dropped, the publisher is gone; consumers
        // stay attached and simply stop receiving
        tracing::info!("stream source retired: {}", self.identifier);
    }

    async fn on_media_frame(&mut self, frame: MediaFrame) -> StreamCenterResult<()> {
        let mut runtime = self.runtime.write().await;
        let frame = match frame {
            MediaFrame::Script { pts, payload } => {
                let payload = inject_server_field(&payload)?;
                let frame = MediaFrame::Script { pts, payload };
                runtime.cache.metadata = Some(frame.clone());
                frame
            }
            frame @ MediaFrame::Audio { .. } => {
                if runtime.cache.audio_sequence_header.is_none() {
                    runtime.cache.audio_sequence_header = Some(frame.clone());
                }
                frame
            }
            frame @ MediaFrame::Video { .. } => {
                if runtime.cache.video_sequence_header.is_none() {
                    runtime.cache.video_sequence_header = Some(frame.clone());
                }
                frame
            }
        };

        for (key, handler) in runtime.consumers.iter_mut() {
            let res = handler.data_sender.send(frame.clone());
            if res.is_err() {
                handler.stat.frame_send_fail_cnt += 1;
                tracing::error!("distribute frame to {} failed", key);
                continue;
            }
            match &frame {
                MediaFrame::Audio { .. } => handler.stat.audio_frames_sent += 1,
                MediaFrame::Video { .. } => handler.stat.video_frames_sent += 1,
                MediaFrame::Script { .. } => handler.stat.script_frames_sent += 1,
            }
        }
        Ok(())
    }
}

/// Re-encodes an onMetaData payload with this server's signature added.
///
/// Accepts both `onMetaData` and FMLE's `@setDataFrame` envelope; the
/// metadata aggregate may arrive as an Object or an ECMAArray and always
/// leaves as `onMetaData` + Object.
pub fn inject_server_field(payload: &Bytes) -> StreamCenterResult<Bytes> {
    let mut cursor = Cursor::new(payload.as_ref());
    let values = AmfValue::read_all(&mut cursor)?;

    let mut pairs: Option<ObjectPairs> = None;
    for value in values {
        match value {
            AmfValue::String(_) => continue,
            value => {
                if let Ok(found) = value.try_into_pairs() {
                    pairs = Some(found);
                    break;
                }
            }
        }
    }
    let mut pairs = pairs.ok_or_else(|| {
        StreamCenterError::InvalidMetaData("no metadata object in data message".to_string())
    })?;
    pairs.set("server", amf::string(server_signature()));

    let mut bytes = Vec::new();
    AmfValue::write_string(&mut bytes, "onMetaData")?;
    AmfValue::write_object(&mut bytes, &pairs)?;
    Ok(Bytes::from(bytes))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use amf::{ObjectPairs, Value as AmfValue};
    use tokio_util::bytes::Bytes;
    use utils::traits::writer::WriteTo;

    use super::inject_server_field;

    #[test]
    fn set_data_frame_is_coerced_to_on_meta_data_object() {
        let mut entries = ObjectPairs::new();
        entries.set("width", AmfValue::Number(1280.0));
        entries.set("height", AmfValue::Number(720.0));

        let mut payload = Vec::new();
        AmfValue::write_string(&mut payload, "@setDataFrame").unwrap();
        AmfValue::write_string(&mut payload, "onMetaData").unwrap();
        amf::ecma_array(entries).write_to(&mut payload).unwrap();

        let injected = inject_server_field(&Bytes::from(payload)).unwrap();
        let mut cursor = Cursor::new(injected.as_ref());
        let values = AmfValue::read_all(&mut cursor).unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(values[0], AmfValue::String("onMetaData".to_string()));

        let pairs = values[1].clone().try_into_pairs().unwrap();
        let keys: Vec<&str> = pairs.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["width", "height", "server"]);
        assert!(matches!(values[1], AmfValue::Object(_)));
    }

    #[test]
    fn data_message_without_object_is_rejected() {
        let mut payload = Vec::new();
        AmfValue::write_string(&mut payload, "onMetaData").unwrap();
        assert!(inject_server_field(&Bytes::from(payload)).is_err());
    }
}
