use std::sync::{Arc, Mutex, PoisonError};

use crossbeam_channel::Sender;
use tandem_engine::coords::Geometry;

use crate::frame::{FrameOutcome, PresentedFrame};

/// Requests processed FIFO by the render worker.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum WorkerRequest {
    Init,
    Render { serial: u64 },
    Resize,
    Stop,
}

/// Messages processed by the UI thread.
#[derive(Debug)]
pub(crate) enum UiMessage<S> {
    FrameFinished {
        serial: u64,
        outcome: FrameOutcome,
        frame: Option<PresentedFrame<S>>,
    },
    /// The worker thread left its loop, normally or by panicking.
    WorkerExited,
    /// Deferred update posted by `request_update`.
    Update,
    /// Host resize queued through `queue_resize`.
    Resize(Geometry),
    /// The presentation target became available after `set_source`.
    ResolveTarget,
    /// The scene engine finished loading.
    SceneStatus,
}

impl<S> UiMessage<S> {
    /// Messages that settle an in-flight frame.
    pub(crate) fn is_frame_event(&self) -> bool {
        matches!(self, UiMessage::FrameFinished { .. } | UiMessage::WorkerExited)
    }
}

pub(crate) type Waker = Arc<dyn Fn() + Send + Sync>;

/// Sending half of the UI mailbox plus the host's wake-up hook.
pub(crate) struct UiPost<S> {
    tx: Sender<UiMessage<S>>,
    waker: Arc<Mutex<Option<Waker>>>,
}

impl<S> Clone for UiPost<S> {
    fn clone(&self) -> Self {
        Self { tx: self.tx.clone(), waker: Arc::clone(&self.waker) }
    }
}

impl<S> UiPost<S> {
    pub(crate) fn new(tx: Sender<UiMessage<S>>) -> Self {
        Self { tx, waker: Arc::new(Mutex::new(None)) }
    }

    pub(crate) fn set_waker(&self, waker: Option<Waker>) {
        *self.waker.lock().unwrap_or_else(PoisonError::into_inner) = waker;
    }

    /// Posts `msg` and wakes the host loop. Returns false once the UI side is gone.
    pub(crate) fn post(&self, msg: UiMessage<S>) -> bool {
        if self.tx.send(msg).is_err() {
            return false;
        }
        let waker = self.waker.lock().unwrap_or_else(PoisonError::into_inner).clone();
        if let Some(wake) = waker {
            wake();
        }
        true
    }
}
