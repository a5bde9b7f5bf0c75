use std::convert::Infallible;

use axum::{
    extract::Extension,
    response::sse::{Event, KeepAlive, Sse},
};
use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use serde::Serialize;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub emitted_at: DateTime<Utc>,
}

/// key: notifications -> fire-and-forget user messages
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}

/// Fans notifications out to every live subscriber; messages sent with no subscriber are dropped.
#[derive(Clone)]
pub struct BroadcastNotifier {
    sender: broadcast::Sender<Notification>,
}

impl BroadcastNotifier {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for BroadcastNotifier {
    fn notify(&self, message: &str) {
        tracing::info!(%message, "user notification");
        let _ = self.sender.send(Notification {
            message: message.to_string(),
            emitted_at: Utc::now(),
        });
    }
}

/// key: notifications-api -> server-sent stream of user notifications
pub async fn stream_notifications(
    Extension(notifier): Extension<BroadcastNotifier>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let stream = BroadcastStream::new(notifier.subscribe()).filter_map(|res| async move {
        match res {
            Ok(notification) => match serde_json::to_string(&notification) {
                Ok(data) => Some(Ok(Event::default().event("notification").data(data))),
                Err(err) => {
                    tracing::error!(?err, "notification serialization failed");
                    None
                }
            },
            Err(err) => {
                tracing::warn!(?err, "notification subscriber lagged");
                None
            }
        }
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_messages_in_order() {
        let notifier = BroadcastNotifier::new();
        let mut first = notifier.subscribe();
        let mut second = notifier.subscribe();

        notifier.notify("one");
        notifier.notify("two");

        assert_eq!(first.recv().await.unwrap().message, "one");
        assert_eq!(first.recv().await.unwrap().message, "two");
        assert_eq!(second.recv().await.unwrap().message, "one");
    }

    #[test]
    fn notify_without_subscribers_is_a_no_op() {
        BroadcastNotifier::new().notify("nobody listening");
    }
}
