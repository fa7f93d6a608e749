//! `GET /accounts/:account_id/events` — `streamEvents`.
//!
//! An `Sse<impl Stream<Item = ...>>` response built from an
//! `async_stream::stream!` body reading the broadcast channel in
//! `repurposer_pipeline::EventStream` directly: no persistence, no replay —
//! there is no `Last-Event-ID` to resume from, only the frames still live on
//! the bus.

use axum::extract::{Path, State};
use axum::response::sse::{Event, Sse};
use futures_core::Stream;
use repurposer_pipeline::EventStream;
use std::convert::Infallible;
use std::time::Duration;
use uuid::Uuid;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

pub async fn stream_events(
    State(events): State<EventStream>,
    Path(account_id): Path<Uuid>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut rx = events.subscribe();

    let stream = async_stream::stream! {
        yield Ok(Event::default().event("connected").data("{}"));

        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await; // first tick fires immediately; skip it

        loop {
            tokio::select! {
                received = rx.recv() => {
                    match received {
                        Ok(event) => {
                            if !EventStream::matches(account_id, &event) {
                                continue;
                            }
                            let data = serde_json::to_string(&event.payload).unwrap_or_else(|_| "{}".to_string());
                            yield Ok(Event::default().event(event.event_type.clone()).data(data));
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => {
                            // "drop frames to slow subscribers": resync
                            // silently.
                            continue;
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    }
                }
                _ = heartbeat.tick() => {
                    // "Keepalive": a `: heartbeat` comment, not a typed
                    // event.
                    yield Ok(Event::default().comment("heartbeat"));
                }
            }
        }
    };

    Sse::new(stream)
}
