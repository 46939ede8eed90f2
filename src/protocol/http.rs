// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! HTTP API, web UI and push channel.
//!
//! | Route | Response |
//! |-------|----------|
//! | `GET /api/status` | status document |
//! | `GET /api/command?cmd=<line>` | command reply |
//! | `GET /?cmd=<line>` | command reply (legacy form) |
//! | `GET /`, `GET /index.html` | web UI |
//! | `GET /ws` | push channel (WebSocket) |
//!
//! Command replies are JSON. Parse, validation and commit errors map to
//! `400`, unknown commands to `404` and an unavailable State Owner to `503`.

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{RawQuery, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};

use crate::dispatcher::{Dispatcher, Outcome};
use crate::error::{CommitFailure, Error, ErrorKind, ParseError, TransportError};
use crate::event::{CommandSource, DeviceEvent};
use crate::state::{DeviceState, StatusReport};

/// Default bound on waiting for the State Owner per request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

const WEB_UI: &str = include_str!("web_ui.html");

/// JSON reply to a command, shared by the HTTP API and the push channel.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CommandReply {
    /// The command was accepted.
    Ok {
        /// The command line.
        command: String,
        /// What it did.
        outcome: Outcome,
    },
    /// The command was rejected.
    Error {
        /// The command line.
        command: String,
        /// Error class.
        error: ErrorKind,
        /// Human-readable description.
        message: String,
        /// Failing entries of an aborted configuration commit.
        #[serde(skip_serializing_if = "Vec::is_empty")]
        failures: Vec<CommitFailure>,
    },
}

impl CommandReply {
    fn from_result(command: String, result: Result<Outcome, Error>) -> Self {
        match result {
            Ok(outcome) => Self::Ok { command, outcome },
            Err(e) => Self::error(command, &e),
        }
    }

    fn error(command: String, error: &Error) -> Self {
        let failures = match error {
            Error::Commit(commit) => commit.failures().to_vec(),
            _ => Vec::new(),
        };
        Self::Error {
            command,
            error: error.kind(),
            message: error.to_string(),
            failures,
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::Ok { .. } => StatusCode::OK,
            Self::Error { error, .. } => status_for(*error),
        }
    }
}

impl IntoResponse for CommandReply {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self)).into_response()
    }
}

const fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Parse | ErrorKind::Validation | ErrorKind::Commit => StatusCode::BAD_REQUEST,
        ErrorKind::UnknownCommand => StatusCode::NOT_FOUND,
        ErrorKind::Transport | ErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// Push channel frame carrying the full status document.
#[derive(Debug, Serialize)]
struct StatusFrame {
    #[serde(rename = "type")]
    kind: &'static str,
    revision: u64,
    data: StatusReport,
}

impl StatusFrame {
    fn new(state: &DeviceState) -> Self {
        Self {
            kind: "status",
            revision: state.revision(),
            data: StatusReport::from(state),
        }
    }
}

#[derive(Clone)]
struct AppState {
    dispatcher: Dispatcher,
    request_timeout: Duration,
}

/// A bound HTTP server, not yet serving.
#[derive(Debug)]
pub struct HttpServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    request_timeout: Duration,
}

impl HttpServer {
    /// Binds the server.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the address cannot be bound.
    pub async fn bind(addr: SocketAddr) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| TransportError::from_bind("HTTP", addr, e))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| TransportError::from_bind("HTTP", addr, e))?;
        tracing::info!(addr = %local_addr, "HTTP server bound");
        Ok(Self {
            listener,
            local_addr,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }

    /// Sets how long a request waits for the State Owner (default: 5 seconds).
    #[must_use]
    pub const fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Returns the bound address.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Starts serving until `shutdown` completes.
    pub fn spawn<F>(self, dispatcher: Dispatcher, shutdown: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = router(dispatcher, self.request_timeout);
        let addr = self.local_addr;
        tokio::spawn(async move {
            if let Err(e) = axum::serve(self.listener, app)
                .with_graceful_shutdown(shutdown)
                .await
            {
                tracing::error!(addr = %addr, error = %e, "HTTP server failed");
            }
            tracing::info!(addr = %addr, "HTTP server stopped");
        })
    }
}

/// Builds the HTTP router.
pub fn router(dispatcher: Dispatcher, request_timeout: Duration) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    Router::new()
        .route("/", get(root_handler))
        .route("/index.html", get(web_ui_handler))
        .route("/api/status", get(status_handler))
        .route("/api/command", get(command_handler))
        .route("/ws", get(ws_handler))
        .fallback(not_found)
        .layer(cors)
        .with_state(AppState {
            dispatcher,
            request_timeout,
        })
}

async fn status_handler(State(state): State<AppState>) -> Json<StatusReport> {
    tracing::debug!("Status requested");
    Json(state.dispatcher.status())
}

async fn command_handler(State(state): State<AppState>, RawQuery(query): RawQuery) -> CommandReply {
    run_query(&state, query.as_deref()).await
}

async fn root_handler(State(state): State<AppState>, RawQuery(query): RawQuery) -> Response {
    match query.as_deref() {
        Some(query) if query.starts_with("cmd") => {
            run_query(&state, Some(query)).await.into_response()
        }
        _ => Html(WEB_UI).into_response(),
    }
}

async fn web_ui_handler() -> Html<&'static str> {
    Html(WEB_UI)
}

async fn not_found() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({
            "status": "error",
            "error": "not_found",
            "message": "file not found",
        })),
    )
}

async fn run_query(state: &AppState, query: Option<&str>) -> CommandReply {
    let command = match command_from_query(query) {
        Ok(Some(command)) => command,
        Ok(None) => {
            let error = Error::Parse(ParseError::Empty);
            return CommandReply::error(String::new(), &error);
        }
        Err(e) => return CommandReply::error(String::new(), &Error::Parse(e)),
    };
    let result = execute(state, &command, CommandSource::Http).await;
    CommandReply::from_result(command, result)
}

async fn execute(state: &AppState, line: &str, source: CommandSource) -> Result<Outcome, Error> {
    match tokio::time::timeout(state.request_timeout, state.dispatcher.execute(line, source)).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(%source, line = %line, "Timed out waiting for State Owner");
            Err(Error::ChannelClosed)
        }
    }
}

/// Extracts the command from a raw query string.
///
/// Everything after the first `cmd=` is the command, so unescaped `&` in
/// text stays part of it. `+` decodes to a space. Returns `None` when there
/// is no `cmd` or it is blank.
///
/// # Errors
///
/// Returns [`ParseError::InvalidEncoding`] for bad percent-escapes.
pub fn command_from_query(query: Option<&str>) -> Result<Option<String>, ParseError> {
    let Some(raw) = query.and_then(|q| q.split_once("cmd=")).map(|(_, rest)| rest) else {
        return Ok(None);
    };
    let spaced = raw.replace('+', " ");
    let decoded = urlencoding::decode(&spaced).map_err(|_| ParseError::InvalidEncoding)?;
    Ok(Some(decoded.into_owned()).filter(|command| !command.trim().is_empty()))
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| push_session(socket, state))
}

async fn push_session(socket: WebSocket, state: AppState) {
    let (mut sink, mut stream) = socket.split();
    let mut events = state.dispatcher.subscribe();
    tracing::debug!("Push client connected");

    if send_json(&mut sink, &StatusFrame::new(&state.dispatcher.snapshot()))
        .await
        .is_err()
    {
        return;
    }

    loop {
        tokio::select! {
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    let line = text.as_str().trim_end_matches(['\r', '\n']).to_string();
                    let result = execute(&state, &line, CommandSource::WebSocket).await;
                    let reply = CommandReply::from_result(line, result);
                    if send_json(&mut sink, &ResultFrame { kind: "result", reply }).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
            event = events.recv() => {
                let frame = match event {
                    Ok(DeviceEvent::StateChanged { snapshot, .. }) => StatusFrame::new(&snapshot),
                    Ok(DeviceEvent::SystemRequested { .. }) => continue,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "Push client lagged, resending latest status");
                        StatusFrame::new(&state.dispatcher.snapshot())
                    }
                    Err(RecvError::Closed) => break,
                };
                if send_json(&mut sink, &frame).await.is_err() {
                    break;
                }
            }
        }
    }
    tracing::debug!("Push client disconnected");
}

#[derive(Serialize)]
struct ResultFrame {
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(flatten)]
    reply: CommandReply,
}

async fn send_json<S, T>(sink: &mut S, frame: &T) -> Result<(), ()>
where
    S: SinkExt<Message> + Unpin,
    T: Serialize,
{
    let text = serde_json::to_string(frame).map_err(|e| {
        tracing::error!(error = %e, "Failed to serialize push frame");
    })?;
    sink.send(Message::Text(text.into())).await.map_err(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CommitError;

    #[test]
    fn query_takes_everything_after_cmd() {
        assert_eq!(
            command_from_query(Some("cmd=NOW:Tom+%26+Jerry")).unwrap(),
            Some("NOW:Tom & Jerry".to_string())
        );
        assert_eq!(
            command_from_query(Some("cmd=NOW:Rock&Roll")).unwrap(),
            Some("NOW:Rock&Roll".to_string())
        );
        assert_eq!(
            command_from_query(Some("x=1&cmd=LED1%3AON")).unwrap(),
            Some("LED1:ON".to_string())
        );
    }

    #[test]
    fn missing_or_empty_cmd_is_none() {
        assert_eq!(command_from_query(None).unwrap(), None);
        assert_eq!(command_from_query(Some("foo=bar")).unwrap(), None);
        assert_eq!(command_from_query(Some("cmd=")).unwrap(), None);
    }

    #[test]
    fn invalid_percent_encoding_is_rejected() {
        assert_eq!(
            command_from_query(Some("cmd=NOW:%FF%FE")),
            Err(ParseError::InvalidEncoding)
        );
    }

    #[test]
    fn error_kinds_map_to_status_codes() {
        assert_eq!(status_for(ErrorKind::Parse), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(ErrorKind::Validation), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(ErrorKind::Commit), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(ErrorKind::UnknownCommand), StatusCode::NOT_FOUND);
        assert_eq!(
            status_for(ErrorKind::Unavailable),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn commit_reply_lists_failing_keys() {
        let error = Error::Commit(CommitError::Invalid(vec![CommitFailure {
            section: "Network".into(),
            key: "udpport".into(),
            value: "0".into(),
            reason: "udpport 0 is outside 1-65535".into(),
        }]));
        let reply = CommandReply::error("CONF:CONF:APPLY=TRUE".into(), &error);
        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["error"], "commit");
        assert_eq!(json["failures"][0]["key"], "udpport");
    }

    #[test]
    fn result_frame_is_flat() {
        let frame = ResultFrame {
            kind: "result",
            reply: CommandReply::Ok {
                command: "LED1:ON".into(),
                outcome: Outcome::Applied { revision: 3 },
            },
        };
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["type"], "result");
        assert_eq!(json["status"], "ok");
        assert_eq!(json["outcome"]["result"], "applied");
        assert_eq!(json["outcome"]["revision"], 3);
    }
}
