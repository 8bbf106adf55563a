//! Streaming adapter (spec §4.8 mode 2). Wraps a hub subscription in a
//! `Stream` the wire layer can forward directly (gRPC server-streaming,
//! SSE, or a WebSocket write loop), closing on client disconnect (the
//! stream's consumer drops it) or hub shutdown (the channel closes).

use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::Stream;

use substrate_contracts::{CoreError, Notification, NotificationFilter};

use crate::notify::{NotificationHubHandle, SubscriberId};

/// Holds the subscriber id alive so `Drop` can unsubscribe from the hub;
/// the wire adapter just polls this as a `Stream<Item = Notification>`.
pub struct NotificationStream {
    id: SubscriberId,
    hub: NotificationHubHandle,
    inner: ReceiverStream<Notification>,
}

impl Stream for NotificationStream {
    type Item = Notification;

    fn poll_next(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<Self::Item>> {
        let this = self.get_mut();
        std::pin::Pin::new(&mut this.inner).poll_next(cx)
    }
}

impl Drop for NotificationStream {
    fn drop(&mut self) {
        let hub = self.hub.clone();
        let id = self.id;
        tokio::spawn(async move {
            let _ = hub.unsubscribe(id).await;
        });
    }
}

pub async fn subscribe_stream(
    hub: &NotificationHubHandle,
    filter: NotificationFilter,
) -> Result<NotificationStream, CoreError> {
    let (id, rx) = hub.subscribe(filter).await?;
    Ok(NotificationStream {
        id,
        hub: hub.clone(),
        inner: ReceiverStream::new(rx),
    })
}
