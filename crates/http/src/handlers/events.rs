//! Server-sent event streams mirroring both transports for remote clients.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures_util::stream::Stream;

use crate::AppState;

pub async fn broadcast_events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut subscription = state.channel.subscribe();
    let stream = async_stream::stream! {
        while let Some(event) = subscription.recv().await {
            match Event::default().event(event.name()).json_data(&event) {
                Ok(sse) => yield Ok(sse),
                Err(e) => {
                    tracing::warn!(error = %e, id = %event.call_id(), "event not encoded");
                },
            }
        }
    };
    Sse::new(stream).keep_alive(KeepAlive::default())
}

pub async fn change_events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut feed = state.store.subscribe_changes();
    let stream = async_stream::stream! {
        while let Some(change) = feed.recv().await {
            let name = match change.transition {
                tablecall_core::Transition::Appear => "appear",
                tablecall_core::Transition::Update => "update",
                tablecall_core::Transition::Disappear => "disappear",
            };
            match Event::default().event(name).json_data(&change) {
                Ok(sse) => yield Ok(sse),
                Err(e) => {
                    tracing::warn!(error = %e, id = %change.call.id, "change event not encoded");
                },
            }
        }
    };
    Sse::new(stream).keep_alive(KeepAlive::default())
}
