use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::extract::State;
use axum::response::sse::{Event, Sse};
use futures::stream::{self, Stream, StreamExt};
use tokio_stream::wrappers::ReceiverStream;

use crate::client::{ClientId, ClientRegistry};
use crate::server::AppState;

/// Long-lived subscription endpoint. The connection stays open until the
/// peer closes it or the process shuts down; each frame is one
/// `data: <summary JSON>` event.
///
/// The client is registered before the response starts, so it can only
/// miss frames published strictly before this request. The current summary
/// is pushed as the first frame when the store is reachable; if that
/// initial compute fails the stream still opens and the client waits for
/// the next change.
pub async fn stream_handler(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (client_id, rx) = state.registry.register();
    tracing::info!(
        client_id = %client_id,
        clients = state.registry.count(),
        "stream client connected"
    );

    let initial = match state.repo.status_counts() {
        Ok(summary) => serde_json::to_string(&summary).ok(),
        Err(e) => {
            tracing::warn!(error = %e, "initial summary unavailable, client waits for next change");
            None
        }
    };

    let live = ClientStream {
        frames: ReceiverStream::new(rx),
        registry: Arc::clone(&state.registry),
        client_id,
    };

    let stream = stream::iter(initial)
        .chain(live)
        .map(|frame| Ok::<_, Infallible>(Event::default().data(frame)));

    Sse::new(stream)
}

/// Stream of outbound frames for one client. Unregisters the client when
/// axum drops the response body, which is how a peer-initiated close is
/// observed.
struct ClientStream {
    frames: ReceiverStream<String>,
    registry: Arc<ClientRegistry>,
    client_id: ClientId,
}

impl Stream for ClientStream {
    type Item = String;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.frames).poll_next(cx)
    }
}

impl Drop for ClientStream {
    fn drop(&mut self) {
        self.registry.unregister(&self.client_id);
        tracing::info!(
            client_id = %self.client_id,
            clients = self.registry.count(),
            "stream client disconnected"
        );
    }
}
