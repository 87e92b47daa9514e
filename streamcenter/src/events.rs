use std::fmt::Debug;

use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::{errors::StreamCenterResult, frame::MediaFrame, stream_source::StreamIdentifier};

#[derive(Debug)]
pub enum StreamCenterEvent {
    Publish {
        stream_id: StreamIdentifier,
        result_sender: oneshot::Sender<StreamCenterResult<mpsc::UnboundedSender<MediaFrame>>>,
    },
    Unpublish {
        stream_id: StreamIdentifier,
        result_sender: oneshot::Sender<StreamCenterResult<()>>,
    },
    Subscribe {
        stream_id: StreamIdentifier,
        result_sender: oneshot::Sender<StreamCenterResult<SubscribeResponse>>,
    },
    Unsubscribe {
        stream_id: StreamIdentifier,
        uuid: Uuid,
        result_sender: oneshot::Sender<StreamCenterResult<()>>,
    },
}

pub struct SubscribeResponse {
    pub subscribe_id: Uuid,
    pub media_receiver: mpsc::UnboundedReceiver<MediaFrame>,
}

impl Debug for SubscribeResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SubscribeResponse {{ subscribe_id: {} }}", self.subscribe_id)
    }
}
