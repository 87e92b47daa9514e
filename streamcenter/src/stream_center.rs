use std::{backtrace::Backtrace, collections::HashMap, sync::Arc};

use tokio::sync::{
    RwLock,
    mpsc::{self, UnboundedSender},
    oneshot,
};
use uuid::Uuid;

use crate::{
    errors::{StreamCenterError, StreamCenterResult},
    events::{StreamCenterEvent, SubscribeResponse},
    frame::MediaFrame,
    stream_source::{PlayStat, SourceRuntime, StreamIdentifier, StreamSource, SubscribeHandler},
};

#[derive(Debug, Default)]
struct StreamSourceHandles {
    /// Producer side of the live publisher, if one is attached.
    source_sender: Option<mpsc::UnboundedSender<MediaFrame>>,
    runtime: Arc<RwLock<SourceRuntime>>,
}

/// Process-wide registry mapping stream urls to live sources.
///
/// Entries are created lazily on the first publish or subscribe and stay
/// for the life of the process; their caches leak per historical stream
/// url, which is accepted for now.
#[derive(Debug)]
pub struct StreamCenter {
    streams: HashMap<StreamIdentifier, StreamSourceHandles>,
    event_receiver: mpsc::UnboundedReceiver<StreamCenterEvent>,
    event_sender: mpsc::UnboundedSender<StreamCenterEvent>,
}

impl StreamCenter {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            streams: HashMap::new(),
            event_receiver: rx,
            event_sender: tx,
        }
    }

    pub fn get_event_sender(&self) -> mpsc::UnboundedSender<StreamCenterEvent> {
        self.event_sender.clone()
    }

    pub async fn run(&mut self) {
        tracing::info!("stream center is running");
        while let Some(event) = self.event_receiver.recv().await {
            if let Err(err) = self.process_event(event).await {
                tracing::error!("process stream center event failed: {:?}", err);
            }
        }
    }

    async fn process_event(&mut self, event: StreamCenterEvent) -> StreamCenterResult<()> {
        match event {
            StreamCenterEvent::Publish {
                stream_id,
                result_sender,
            } => self.process_publish_event(stream_id, result_sender)?,
            StreamCenterEvent::Unpublish {
                stream_id,
                result_sender,
            } => self.process_unpublish_event(stream_id, result_sender)?,
            StreamCenterEvent::Subscribe {
                stream_id,
                result_sender,
            } => {
                self.process_subscribe_event(stream_id, result_sender)
                    .await?
            }
            StreamCenterEvent::Unsubscribe {
                stream_id,
                uuid,
                result_sender,
            } => {
                self.process_unsubscribe_event(uuid, stream_id, result_sender)
                    .await?
            }
        }
        Ok(())
    }

    fn process_publish_event(
        &mut self,
        stream_id: StreamIdentifier,
        result_sender: oneshot::Sender<StreamCenterResult<mpsc::UnboundedSender<MediaFrame>>>,
    ) -> StreamCenterResult<()> {
        let handles = self.streams.entry(stream_id.clone()).or_default();

        let publisher_live = handles
            .source_sender
            .as_ref()
            .is_some_and(|sender| !sender.is_closed());
        if publisher_live {
            return result_sender
                .send(Err(StreamCenterError::DuplicateStream(stream_id.clone())))
                .map_err(|_| StreamCenterError::ChannelSendFailed {
                    backtrace: Backtrace::capture(),
                });
        }

        let (frame_sender, frame_receiver) = mpsc::unbounded_channel();
        let mut source = StreamSource::new(
            stream_id.clone(),
            frame_receiver,
            Arc::clone(&handles.runtime),
        );
        tokio::spawn(async move { source.run().await });
        handles.source_sender = Some(frame_sender.clone());

        result_sender
            .send(Ok(frame_sender))
            .map_err(|_| StreamCenterError::ChannelSendFailed {
                backtrace: Backtrace::capture(),
            })?;

        tracing::info!(
            "publish stream success: {}, total stream count: {}",
            stream_id,
            self.streams.len()
        );
        Ok(())
    }

    fn process_unpublish_event(
        &mut self,
        stream_id: StreamIdentifier,
        result_sender: oneshot::Sender<StreamCenterResult<()>>,
    ) -> StreamCenterResult<()> {
        let result = match self.streams.get_mut(&stream_id) {
            None => Err(StreamCenterError::StreamNotFound(stream_id.clone())),
            Some(handles) => {
                // dropping the registry's producer lets the source task end
                // once the publisher session drops its own clone; consumers
                // and caches stay
                handles.source_sender = None;
                Ok(())
            }
        };
        let succeeded = result.is_ok();
        result_sender
            .send(result)
            .map_err(|_| StreamCenterError::ChannelSendFailed {
                backtrace: Backtrace::capture(),
            })?;
        if succeeded {
            tracing::info!("unpublish stream success: {}", stream_id);
        }
        Ok(())
    }

    async fn process_subscribe_event(
        &mut self,
        stream_id: StreamIdentifier,
        result_sender: oneshot::Sender<StreamCenterResult<SubscribeResponse>>,
    ) -> StreamCenterResult<()> {
        let handles = self.streams.entry(stream_id.clone()).or_default();
        let uuid = Uuid::now_v7();
        let (tx, rx) = mpsc::unbounded_channel();

        {
            // replay caches into the queue before the consumer joins the
            // fan-out set: metadata first, then video and audio sequence
            // headers
            let mut runtime = handles.runtime.write().await;
            for cached in [
                runtime.cache.metadata.clone(),
                runtime.cache.video_sequence_header.clone(),
                runtime.cache.audio_sequence_header.clone(),
            ]
            .into_iter()
            .flatten()
            {
                let _ = tx.send(cached);
            }
            runtime.consumers.insert(
                uuid,
                SubscribeHandler {
                    data_sender: tx,
                    stat: PlayStat::default(),
                },
            );
        }

        result_sender
            .send(Ok(SubscribeResponse {
                subscribe_id: uuid,
                media_receiver: rx,
            }))
            .map_err(|_| StreamCenterError::ChannelSendFailed {
                backtrace: Backtrace::capture(),
            })?;
        tracing::info!("subscribe stream success: {}, uuid: {}", stream_id, uuid);
        Ok(())
    }

    async fn process_unsubscribe_event(
        &mut self,
        uuid: Uuid,
        stream_id: StreamIdentifier,
        result_sender: oneshot::Sender<StreamCenterResult<()>>,
    ) -> StreamCenterResult<()> {
        let result = match self.streams.get_mut(&stream_id) {
            None => Err(StreamCenterError::StreamNotFound(stream_id.clone())),
            Some(handles) => {
                let removed = handles.runtime.write().await.consumers.remove(&uuid);
                match removed {
                    None => Err(StreamCenterError::StreamNotFound(stream_id.clone())),
                    Some(handler) => {
                        tracing::info!("unsubscribe done, stat: {:?}", handler.stat);
                        Ok(())
                    }
                }
            }
        };
        result_sender
            .send(result)
            .map_err(|_| StreamCenterError::ChannelSendFailed {
                backtrace: Backtrace::capture(),
            })?;
        Ok(())
    }

    pub async fn publish(
        event_sender: &UnboundedSender<StreamCenterEvent>,
        stream_id: &StreamIdentifier,
    ) -> StreamCenterResult<mpsc::UnboundedSender<MediaFrame>> {
        let (tx, rx) = oneshot::channel();
        event_sender
            .send(StreamCenterEvent::Publish {
                stream_id: stream_id.clone(),
                result_sender: tx,
            })
            .map_err(|err| {
                tracing::error!("send publish event to stream center failed: {:?}", err);
                StreamCenterError::ChannelSendFailed {
                    backtrace: Backtrace::capture(),
                }
            })?;
        match rx.await {
            Err(_) => {
                tracing::error!("channel closed while waiting for the publish result");
                Err(StreamCenterError::ChannelSendFailed {
                    backtrace: Backtrace::capture(),
                })
            }
            Ok(result) => result,
        }
    }

    pub async fn unpublish(
        event_sender: &UnboundedSender<StreamCenterEvent>,
        stream_id: &StreamIdentifier,
    ) -> StreamCenterResult<()> {
        let (tx, rx) = oneshot::channel();
        event_sender
            .send(StreamCenterEvent::Unpublish {
                stream_id: stream_id.clone(),
                result_sender: tx,
            })
            .map_err(|err| {
                tracing::error!("send unpublish event to stream center failed: {:?}", err);
                StreamCenterError::ChannelSendFailed {
                    backtrace: Backtrace::capture(),
                }
            })?;
        match rx.await {
            Err(_) => {
                tracing::error!("channel closed while waiting for the unpublish result");
                Err(StreamCenterError::ChannelSendFailed {
                    backtrace: Backtrace::capture(),
                })
            }
            Ok(result) => result,
        }
    }

    pub async fn subscribe(
        event_sender: &UnboundedSender<StreamCenterEvent>,
        stream_id: &StreamIdentifier,
    ) -> StreamCenterResult<SubscribeResponse> {
        let (tx, rx) = oneshot::channel();
        event_sender
            .send(StreamCenterEvent::Subscribe {
                stream_id: stream_id.clone(),
                result_sender: tx,
            })
            .map_err(|err| {
                tracing::error!("send subscribe event to stream center failed: {:?}", err);
                StreamCenterError::ChannelSendFailed {
                    backtrace: Backtrace::capture(),
                }
            })?;
        match rx.await {
            Err(_) => {
                tracing::error!("channel closed while waiting for the subscribe result");
                Err(StreamCenterError::ChannelSendFailed {
                    backtrace: Backtrace::capture(),
                })
            }
            Ok(result) => result,
        }
    }

    pub async fn unsubscribe(
        event_sender: &UnboundedSender<StreamCenterEvent>,
        stream_id: &StreamIdentifier,
        uuid: Uuid,
    ) -> StreamCenterResult<()> {
        let (tx, rx) = oneshot::channel();
        event_sender
            .send(StreamCenterEvent::Unsubscribe {
                stream_id: stream_id.clone(),
                uuid,
                result_sender: tx,
            })
            .map_err(|err| {
                tracing::error!("send unsubscribe event to stream center failed: {:?}", err);
                StreamCenterError::ChannelSendFailed {
                    backtrace: Backtrace::capture(),
                }
            })?;
        match rx.await {
            Err(_) => {
                tracing::error!("channel closed while waiting for the unsubscribe result");
                Err(StreamCenterError::ChannelSendFailed {
                    backtrace: Backtrace::capture(),
                })
            }
            Ok(result) => result,
        }
    }
}

impl Default for StreamCenter {
    fn default() -> Self {
        Self::new()
    }
}
