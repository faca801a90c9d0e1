//! `/stream-resource`: one timer session per request

use std::convert::Infallible;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::state::AppState;

/// Open a timer session and stream it as server-sent events
///
/// Ticks go out as `event: time`, the terminal event as `event: exit`, after
/// which the response ends. When the client goes away the body (and with it
/// the session's drop guard) is dropped, which cancels the session.
pub async fn stream_resource(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = state.producer.open(CancellationToken::new());
    info!(session = %stream.session_id(), "Client subscribed to timer stream");

    let keep_alive = state.producer.config().keep_alive;
    let events = stream.map(|event| {
        Ok(Event::default()
            .event(event.kind.event_name())
            .data(event.payload))
    });

    Sse::new(events).keep_alive(KeepAlive::new().interval(keep_alive).text("keep-alive"))
}
