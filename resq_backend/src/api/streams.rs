use super::auth::AuthedUser;
use super::{ApiError, AppState};
use crate::events::ChangeEvent;
use crate::locations::LocationService;
use crate::posts::PostService;
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::stream::{self, Stream, StreamExt};
use std::convert::Infallible;
use tokio::sync::broadcast::error::RecvError;

/// Pushes a fresh feed snapshot on connect and again after every feed
/// write. Consumers replace their whole list; there is no delta format.
pub(crate) async fn feed_stream_handler(
    State(state): State<AppState>,
    _user: AuthedUser,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let service = PostService::new(state.store.clone(), state.events.clone());
    let rx = state.events.subscribe();
    let initial = json_event("snapshot", &service.list_feed()?);
    let updates = stream::unfold((rx, service), |(mut rx, service)| async move {
        loop {
            match rx.recv().await {
                Ok(ChangeEvent::FeedChanged) => {
                    return feed_snapshot(&service)
                        .map(|event| (Ok::<_, Infallible>(event), (rx, service)));
                }
                Ok(_) => continue,
                // dropped events are fine, the next snapshot catches up
                Err(RecvError::Lagged(_)) => {
                    return feed_snapshot(&service).map(|event| (Ok(event), (rx, service)));
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });
    let stream = stream::once(async move { Ok::<_, Infallible>(initial) }).chain(updates);
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// Location snapshots plus proximity alerts addressed to this user.
pub(crate) async fn locations_stream_handler(
    State(state): State<AppState>,
    user: AuthedUser,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let service = LocationService::new(state.store.clone(), state.events.clone());
    let rx = state.events.subscribe();
    let user_id = user.id;
    let initial = json_event("snapshot", &service.list_others(&user_id)?);
    let updates = stream::unfold(
        (rx, service, user_id),
        |(mut rx, service, user_id)| async move {
            loop {
                match rx.recv().await {
                    Ok(ChangeEvent::LocationsChanged) => {
                        return locations_snapshot(&service, &user_id)
                            .map(|event| (Ok::<_, Infallible>(event), (rx, service, user_id)));
                    }
                    Ok(ChangeEvent::ProximityAlert(alert)) if alert.user_id == user_id => {
                        let event = json_event("alert", &alert);
                        return Some((Ok(event), (rx, service, user_id)));
                    }
                    Ok(_) => continue,
                    Err(RecvError::Lagged(_)) => {
                        return locations_snapshot(&service, &user_id)
                            .map(|event| (Ok(event), (rx, service, user_id)));
                    }
                    Err(RecvError::Closed) => return None,
                }
            }
        },
    );
    let stream = stream::once(async move { Ok::<_, Infallible>(initial) }).chain(updates);
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// Fresh full-feed snapshot event. A store failure yields `None`, which ends
/// the stream; the client reconnects and starts from a clean snapshot.
fn feed_snapshot(service: &PostService) -> Option<Event> {
    match service.list_feed() {
        Ok(posts) => Some(json_event("snapshot", &posts)),
        Err(err) => {
            tracing::error!(error = %err, "feed snapshot failed, closing stream");
            None
        }
    }
}

fn locations_snapshot(service: &LocationService, user_id: &str) -> Option<Event> {
    match service.list_others(user_id) {
        Ok(locations) => Some(json_event("snapshot", &locations)),
        Err(err) => {
            tracing::error!(error = %err, "locations snapshot failed, closing stream");
            None
        }
    }
}

fn json_event<T: serde::Serialize>(name: &'static str, payload: &T) -> Event {
    match Event::default().event(name).json_data(payload) {
        Ok(event) => event,
        Err(err) => {
            tracing::warn!(error = %err, "failed to encode stream event");
            Event::default().event(name).data("null")
        }
    }
}
