//! Ordered, single-consumer progress channel for one run.
//!
//! The orchestrator writes [`ProgressEvent`]s and keepalive frames through
//! a [`ProgressEmitter`]; the transport reads them from the matching
//! [`ProgressStream`]. Writing a terminal event closes the channel, so the
//! consumer sees exactly one `complete` or `error` and then end-of-stream.

use futures_core::Stream;
use tokio::sync::mpsc;

use reso_domain::event::ProgressEvent;

/// One item on the progress channel.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Event(ProgressEvent),
    /// Content-free; transports may drop it.
    Keepalive,
}

impl Frame {
    pub fn event(&self) -> Option<&ProgressEvent> {
        match self {
            Self::Event(e) => Some(e),
            Self::Keepalive => None,
        }
    }
}

pub fn channel() -> (ProgressEmitter, ProgressStream) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ProgressEmitter { tx: Some(tx) }, ProgressStream { rx })
}

pub struct ProgressEmitter {
    tx: Option<mpsc::UnboundedSender<Frame>>,
}

impl ProgressEmitter {
    /// Write an event. After a terminal event the emitter is closed and
    /// further writes are dropped.
    pub fn emit(&mut self, event: ProgressEvent) {
        let Some(tx) = &self.tx else {
            tracing::debug!(event = event.name(), "event after terminal dropped");
            return;
        };
        let terminal = event.is_terminal();
        if tx.send(Frame::Event(event)).is_err() {
            tracing::debug!("progress consumer went away");
        }
        if terminal {
            self.tx = None;
        }
    }

    pub fn keepalive(&mut self) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(Frame::Keepalive);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_none()
    }
}

pub struct ProgressStream {
    rx: mpsc::UnboundedReceiver<Frame>,
}

impl ProgressStream {
    pub async fn next(&mut self) -> Option<Frame> {
        self.rx.recv().await
    }

    /// Next event, skipping keepalives.
    pub async fn next_event(&mut self) -> Option<ProgressEvent> {
        loop {
            match self.rx.recv().await? {
                Frame::Event(e) => return Some(e),
                Frame::Keepalive => continue,
            }
        }
    }

    /// Drain every event until the stream closes.
    pub async fn collect_events(mut self) -> Vec<ProgressEvent> {
        let mut out = Vec::new();
        while let Some(e) = self.next_event().await {
            out.push(e);
        }
        out
    }

    pub fn into_stream(mut self) -> impl Stream<Item = Frame> + Send {
        async_stream::stream! {
            while let Some(frame) = self.rx.recv().await {
                yield frame;
            }
        }
    }
}
