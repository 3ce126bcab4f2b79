// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Optional HTTP + SSE bridge.
//!
//! Mirrors the Unix-socket RPC surface over `POST /rpc` and adds a
//! streaming `GET /events` endpoint that relays the event bus to remote
//! subscribers. Both routes require a bearer token when one is configured;
//! this bridge is a secondary subscriber of the one in-process bus, never
//! a parallel source of truth (see `EventBus`).

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::middleware::{self, Next};
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures_util::stream::{self, Stream};
use serde::Deserialize;

use crate::dispatcher::Dispatcher;
use crate::event_bus::EventBus;
use crate::protocol::{Request, Response as RpcResponse};

#[derive(Clone)]
struct HttpState {
    dispatcher: Arc<Dispatcher>,
    bus: EventBus,
    token: Option<Arc<str>>,
}

/// Builds the router. `token` mirrors `BEADS_DAEMON_TOKEN`; when absent,
/// every request is accepted -- callers are expected to only bind this
/// endpoint on a loopback address in that case.
pub fn router(dispatcher: Arc<Dispatcher>, bus: EventBus, token: Option<String>) -> Router {
    let state = HttpState {
        dispatcher,
        bus,
        token: token.map(Arc::from),
    };

    Router::new()
        .route("/rpc", post(rpc_handler))
        .route("/events", get(events_handler))
        .layer(middleware::from_fn_with_state(state.clone(), auth_layer))
        .with_state(state)
}

async fn auth_layer(
    State(state): State<HttpState>,
    req: axum::extract::Request,
    next: Next,
) -> Response {
    let Some(expected) = state.token.as_deref() else {
        return next.run(req).await;
    };

    let provided = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match provided {
        Some(token) if token == expected => next.run(req).await,
        _ => (StatusCode::UNAUTHORIZED, "missing or invalid bearer token").into_response(),
    }
}

async fn rpc_handler(State(state): State<HttpState>, Json(request): Json<Request>) -> Json<RpcResponse> {
    let dispatcher = Arc::clone(&state.dispatcher);
    let response = tokio::task::spawn_blocking(move || dispatcher.dispatch(&request))
        .await
        .unwrap_or_else(|err| RpcResponse {
            success: false,
            payload: None,
            error: Some(format!("dispatcher task panicked: {err}")),
            error_family: Some("system_error".to_string()),
        });
    Json(response)
}

#[derive(Debug, Deserialize, Default)]
struct EventsQuery {
    /// Only events published at or after this RFC3339 timestamp. Best-effort:
    /// the bus has no history buffer, so this only affects events arriving
    /// after the subscription is established relative to wall-clock skew.
    since: Option<String>,
    /// `issue:<id>` or `type:<mutation-kind>`; unset streams everything.
    filter: Option<String>,
}

async fn events_handler(
    State(state): State<HttpState>,
    Query(query): Query<EventsQuery>,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    let since = query
        .since
        .as_deref()
        .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&chrono::Utc));
    let filter = query.filter;

    let subscription = state.bus.subscribe();
    let subscribed_at = chrono::Utc::now();

    let stream = stream::unfold(
        (subscription, since, subscribed_at, filter),
        |(mut subscription, since, subscribed_at, filter)| async move {
            loop {
                let event = subscription.recv().await?;
                if let Some(since) = since {
                    if subscribed_at < since {
                        continue;
                    }
                }
                if !matches_filter(&event, filter.as_deref()) {
                    continue;
                }
                let payload = serde_json::to_string(&*event).unwrap_or_else(|_| "{}".to_string());
                let sse_event = SseEvent::default().event(event.name()).data(payload);
                return Some((Ok(sse_event), (subscription, since, subscribed_at, filter)));
            }
        },
    );

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}

fn matches_filter(event: &bd_core::Event, filter: Option<&str>) -> bool {
    let Some(filter) = filter else {
        return true;
    };
    if let Some(id) = filter.strip_prefix("issue:") {
        return event.issue_id().map(|i| i.as_str()) == Some(id);
    }
    if let Some(kind) = filter.strip_prefix("type:") {
        return event.name() == kind;
    }
    false
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
