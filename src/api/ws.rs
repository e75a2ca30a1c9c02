//! WebSocket endpoints
//!
//! - GET /api/v1/chats/ws - Authenticated chat socket (token in the
//!   `Authorization` header or the `token` query parameter)
//! - GET /ws - Echo socket

use std::pin::Pin;

use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
        FromRequestParts, State,
    },
    http::request::Parts,
    response::Response,
};
use futures::{future, Sink, SinkExt, Stream, StreamExt};

use crate::api::middleware::{bearer_token, query_token, ApiError, AppState};
use crate::realtime::Frame;

type FrameStream = Pin<Box<dyn Stream<Item = Result<Frame, axum::Error>> + Send>>;
type FrameSink = Pin<Box<dyn Sink<Frame, Error = axum::Error> + Send>>;

/// Principal bound to a socket before the upgrade.
///
/// `None` only when the gateway runs without authentication.
#[derive(Debug, Clone, Copy)]
pub struct SocketPrincipal(pub Option<i64>);

impl FromRequestParts<AppState> for SocketPrincipal {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if !state.gateway.settings().require_auth {
            return Ok(Self(None));
        }

        let token = bearer_token(&parts.headers)
            .or_else(|| query_token(&parts.uri))
            .ok_or_else(|| ApiError::unauthorized("Missing authentication token"))?;

        match state.tokens.validate(&token).await {
            Ok(user_id) => Ok(Self(Some(user_id))),
            Err(err) => {
                tracing::info!(reason = err.code(), "Rejected socket handshake");
                Err(err.into())
            }
        }
    }
}

/// Upgrade an authenticated chat socket and hand it to the gateway
pub async fn chat_socket(
    State(state): State<AppState>,
    SocketPrincipal(principal): SocketPrincipal,
    ws: WebSocketUpgrade,
) -> Response {
    let gateway = state.gateway.clone();
    ws.on_upgrade(move |socket| async move {
        let (writer, reader) = frames(socket);
        gateway.run_connection(principal, reader, writer).await;
    })
}

/// Upgrade an echo socket
pub async fn echo_socket(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    let gateway = state.gateway.clone();
    ws.on_upgrade(move |socket| async move {
        let (writer, reader) = frames(socket);
        gateway.run_echo(reader, writer).await;
    })
}

/// Adapt a socket to frame halves. A close frame ends the stream; control
/// frames are answered by the transport and never surface.
fn frames(socket: WebSocket) -> (FrameSink, FrameStream) {
    let (sink, stream) = socket.split();

    let reader = stream
        .take_while(|msg| future::ready(!matches!(msg, Ok(WsMessage::Close(_)))))
        .filter_map(|msg| {
            future::ready(match msg {
                Ok(WsMessage::Text(text)) => Some(Ok(Frame::Text(text.as_str().to_string()))),
                Ok(WsMessage::Binary(data)) => Some(Ok(Frame::Binary(data.to_vec()))),
                Ok(_) => None,
                Err(e) => Some(Err(e)),
            })
        });

    let writer = sink.with(|frame: Frame| {
        future::ready(Ok::<_, axum::Error>(match frame {
            Frame::Text(text) => WsMessage::Text(text.into()),
            Frame::Binary(data) => WsMessage::Binary(data.into()),
        }))
    });

    (Box::pin(writer), Box::pin(reader))
}
