use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::{
    broadcast::{self, error::RecvError},
    mpsc,
};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info};

use crate::{
    dto::sse::{SensorChangedEvent, ServerEvent},
    state::{SharedState, sensors::EVENT_SENSOR_CHANGED},
};

/// Subscribe to sensor transitions, returning the current states to replay first.
pub fn subscribe_sensors(
    state: &SharedState,
) -> (broadcast::Receiver<ServerEvent>, Vec<ServerEvent>) {
    // Subscribe before snapshotting so no transition falls between the two.
    let receiver = state.sensors().events().subscribe();
    let initial = state
        .sensors()
        .snapshot()
        .into_iter()
        .filter_map(|(endpoint_id, detection)| {
            ServerEvent::json(
                Some(EVENT_SENSOR_CHANGED.to_string()),
                &SensorChangedEvent {
                    endpoint_id,
                    state: detection,
                },
            )
            .ok()
        })
        .collect();
    (receiver, initial)
}

fn to_event(payload: ServerEvent) -> Event {
    let mut event = Event::default().data(payload.data);
    if let Some(name) = payload.event {
        event = event.event(name);
    }
    event
}

/// Convert a broadcast receiver into an SSE response, forwarding events until the client leaves.
pub fn to_sse_stream(
    mut receiver: broadcast::Receiver<ServerEvent>,
    initial: Vec<ServerEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    tokio::spawn(async move {
        for payload in initial {
            if tx.send(Ok(to_event(payload))).await.is_err() {
                return;
            }
        }

        loop {
            tokio::select! {
                _ = tx.closed() => break,
                recv_result = receiver.recv() => {
                    match recv_result {
                        Ok(payload) => {
                            if tx.send(Ok(to_event(payload))).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(skipped)) => {
                            debug!(skipped, "sensor SSE subscriber lagged");
                            continue;
                        }
                    }
                }
            }
        }

        info!("sensor SSE stream disconnected");
    });

    Sse::new(ReceiverStream::new(rx)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
