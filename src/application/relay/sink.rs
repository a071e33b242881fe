//! Bounded per-request event channel.

use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::domain::stream::StreamEvent;

/// Sending half of a request's event stream.
///
/// Owns the request's cancellation token: when the receiver is dropped
/// (client disconnect) the token is cancelled. At most one terminal event
/// is ever delivered; anything emitted after it is dropped.
pub struct EventSink {
    tx: mpsc::Sender<StreamEvent>,
    cancel: CancellationToken,
    terminal_sent: bool,
    _watcher: DropGuard,
}

impl EventSink {
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<StreamEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let cancel = CancellationToken::new();
        let finished = CancellationToken::new();

        let watched = tx.clone();
        let client_gone = cancel.clone();
        let done = finished.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = watched.closed() => client_gone.cancel(),
                _ = done.cancelled() => {}
            }
        });

        let sink = Self {
            tx,
            cancel,
            terminal_sent: false,
            _watcher: finished.drop_guard(),
        };
        (sink, rx)
    }

    /// Sends one event. Returns `false` if it was not delivered.
    pub async fn emit(&mut self, event: StreamEvent) -> bool {
        if self.terminal_sent {
            tracing::debug!(event = event.name(), "dropping event after terminal");
            return false;
        }
        let terminal = event.is_terminal();
        if self.tx.send(event).await.is_err() {
            self.cancel.cancel();
            return false;
        }
        if terminal {
            self.terminal_sent = true;
        }
        true
    }

    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn terminal_sent(&self) -> bool {
        self.terminal_sent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn events_arrive_in_order() {
        let (mut sink, mut rx) = EventSink::channel(8);
        assert!(sink.emit(StreamEvent::Start).await);
        assert!(sink.emit(StreamEvent::status("thinking")).await);
        drop(sink);

        assert_eq!(rx.recv().await, Some(StreamEvent::Start));
        assert_eq!(rx.recv().await, Some(StreamEvent::status("thinking")));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn only_one_terminal_event_is_delivered() {
        let (mut sink, mut rx) = EventSink::channel(8);
        assert!(sink.emit(StreamEvent::error("first", 10)).await);
        assert!(!sink.emit(StreamEvent::error("second", 20)).await);
        assert!(sink.terminal_sent());
        drop(sink);

        assert_eq!(rx.recv().await, Some(StreamEvent::error("first", 10)));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn dropping_receiver_cancels_request() {
        let (sink, rx) = EventSink::channel(8);
        let token = sink.cancellation();
        drop(rx);

        tokio::time::timeout(Duration::from_secs(1), token.cancelled())
            .await
            .unwrap();
        assert!(sink.is_cancelled());
    }

    #[tokio::test]
    async fn emit_after_disconnect_fails() {
        let (mut sink, rx) = EventSink::channel(8);
        drop(rx);
        assert!(!sink.emit(StreamEvent::Start).await);
        assert!(sink.is_cancelled());
    }
}
