//! WebSocket connection handlers.
//!
//! Each admitted connection runs two tasks: the read pump decodes and
//! dispatches inbound frames, the write pump drains the outbound queue onto
//! the socket. The write pump is the only one that closes the socket.

use std::sync::Arc;

use axum::{
    extract::{
        Path, Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use futures_util::{
    sink::SinkExt,
    stream::{SplitSink, Stream, StreamExt},
};
use tokio::sync::{mpsc, oneshot};

use crate::{
    domain::{ConnectionId, Credentials, Frame, Identity, RoomId},
    ui::state::{AppState, ConnectQuery},
    usecase::{AdmitConnectionUseCase, DispatchSignalUseCase, EvictConnectionUseCase},
};

/// `GET /ws`
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConnectQuery>,
    headers: HeaderMap,
) -> Result<Response, StatusCode> {
    upgrade(ws, state, query, &headers, None).await
}

/// `GET /ws/{room_id}`: a join-room with an empty room_id joins this room
pub async fn room_websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
    Query(query): Query<ConnectQuery>,
    headers: HeaderMap,
) -> Result<Response, StatusCode> {
    let room_id = match RoomId::try_from(room_id) {
        Ok(room_id) => room_id,
        Err(e) => {
            tracing::warn!("Invalid room id in upgrade path: {}", e);
            return Err(StatusCode::BAD_REQUEST);
        }
    };
    upgrade(ws, state, query, &headers, Some(room_id)).await
}

async fn upgrade(
    ws: WebSocketUpgrade,
    state: Arc<AppState>,
    query: ConnectQuery,
    headers: &HeaderMap,
    default_room: Option<RoomId>,
) -> Result<Response, StatusCode> {
    let identity = authorize(&state, query, headers).await?;

    Ok(ws
        .on_upgrade(move |socket| handle_socket(socket, state, identity, default_room))
        .into_response())
}

/// Origin check and authentication, both before the upgrade.
async fn authorize(
    state: &AppState,
    query: ConnectQuery,
    headers: &HeaderMap,
) -> Result<Option<Identity>, StatusCode> {
    let origin = headers
        .get(header::ORIGIN)
        .and_then(|value| value.to_str().ok());
    if !state.config.is_origin_allowed(origin) {
        tracing::warn!("Rejected upgrade from origin {:?}", origin);
        return Err(StatusCode::FORBIDDEN);
    }

    let credentials = Credentials {
        bearer_token: bearer_token(headers).or(query.token),
        user_id: query.user_id,
        name: query.name,
    };
    state
        .authenticator
        .authenticate(&credentials)
        .await
        .map_err(|e| {
            tracing::warn!("Rejected upgrade: {}", e);
            StatusCode::UNAUTHORIZED
        })
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
}

async fn handle_socket(
    socket: WebSocket,
    state: Arc<AppState>,
    identity: Option<Identity>,
    default_room: Option<RoomId>,
) {
    let admit = AdmitConnectionUseCase::new(state.repository.clone(), state.config.queue_capacity);
    let (connection, outbound) = match admit.execute(identity).await {
        Ok(admitted) => admitted,
        Err(e) => {
            tracing::error!("Failed to admit connection: {}", e);
            return;
        }
    };
    let connection_id = connection.id().clone();
    tracing::info!("Client {} connected", connection_id);

    let (sink, stream) = socket.split();

    let (stop_tx, stop_rx) = oneshot::channel();
    let mut send_task = tokio::spawn(write_pump(sink, outbound, connection_id.clone()));
    let mut recv_task = tokio::spawn(read_pump(
        stream,
        stop_rx,
        DispatchSignalUseCase::new(state.repository.clone()),
        connection_id.clone(),
        default_room,
    ));

    let evict = EvictConnectionUseCase::new(state.repository.clone());

    // Whichever pump ends first tears the other down
    tokio::select! {
        _ = &mut recv_task => {
            // closes the queue, the write pump drains it and closes the socket
            evict.execute(&connection_id).await;
            let _ = send_task.await;
        }
        _ = &mut send_task => {
            // never abort mid-dispatch, the read pump stops between frames
            let _ = stop_tx.send(());
            let _ = recv_task.await;
            evict.execute(&connection_id).await;
        }
    };

    tracing::info!("Client {} disconnected", connection_id);
}

/// Read frames one at a time and dispatch them until the peer goes away
/// or `stop` fires. `stop` is only observed between frames.
async fn read_pump<S>(
    mut stream: S,
    mut stop: oneshot::Receiver<()>,
    dispatch: DispatchSignalUseCase,
    connection_id: ConnectionId,
    default_room: Option<RoomId>,
) where
    S: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    loop {
        let msg = tokio::select! {
            biased;
            _ = &mut stop => {
                tracing::debug!("Read pump of {} stopped", connection_id);
                break;
            }
            msg = stream.next() => msg,
        };
        let Some(msg) = msg else {
            break;
        };
        let msg = match msg {
            Ok(msg) => msg,
            Err(e) => {
                tracing::warn!("WebSocket error on {}: {}", connection_id, e);
                break;
            }
        };

        match msg {
            Message::Text(text) => {
                tracing::debug!("Received from {}: {}", connection_id, text.as_str());
                dispatch
                    .execute(&connection_id, text.as_str(), default_room.as_ref())
                    .await;
            }
            Message::Binary(_) => {
                tracing::debug!("Ignoring binary frame from {}", connection_id);
            }
            Message::Ping(_) | Message::Pong(_) => {
                // Ping/pong is handled automatically by the WebSocket protocol
            }
            Message::Close(_) => {
                tracing::info!("Client {} requested close", connection_id);
                break;
            }
        }
    }
}

/// Write queued frames in order; close the socket once the queue is closed.
async fn write_pump(
    mut sink: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::Receiver<Frame>,
    connection_id: ConnectionId,
) {
    while let Some(frame) = outbound.recv().await {
        if let Err(e) = sink.send(Message::Text(frame.to_string().into())).await {
            tracing::warn!("Failed to write to {}: {}", connection_id, e);
            return;
        }
    }

    if let Err(e) = sink.close().await {
        tracing::debug!("Failed to close socket of {}: {}", connection_id, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::ServerConfig,
        domain::{AuthError, DisplayName, SignalingRepository, UserId, auth::MockAuthenticator},
        infrastructure::repository::InMemorySignalingRepository,
    };
    use axum::http::HeaderValue;
    use futures_util::stream;
    use std::time::Duration;

    fn state(authenticator: MockAuthenticator, config: ServerConfig) -> AppState {
        AppState::new(
            Arc::new(InMemorySignalingRepository::new()),
            Arc::new(authenticator),
            config,
        )
    }

    #[tokio::test]
    async fn test_authorize_passes_credentials_to_authenticator() {
        // テスト項目: クエリと Authorization ヘッダーの内容が Authenticator に渡され、その結果が返る
        // given (前提条件):
        let mut authenticator = MockAuthenticator::new();
        authenticator
            .expect_authenticate()
            .withf(|credentials| {
                credentials.bearer_token.as_deref() == Some("secret")
                    && credentials.user_id.as_deref() == Some("u1")
                    && credentials.name.as_deref() == Some("Alice")
            })
            .times(1)
            .returning(|_| {
                Ok(Some(Identity::new(
                    UserId::new("u1".to_string()).unwrap(),
                    DisplayName::new("Alice".to_string()).unwrap(),
                )))
            });
        let state = state(authenticator, ServerConfig::default());
        let query = ConnectQuery {
            user_id: Some("u1".to_string()),
            name: Some("Alice".to_string()),
            token: None,
        };
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer secret"),
        );

        // when (操作):
        let identity = authorize(&state, query, &headers).await.unwrap();

        // then (期待する結果):
        assert_eq!(identity.unwrap().user_id.as_str(), "u1");
    }

    #[tokio::test]
    async fn test_authorize_rejects_failed_authentication() {
        // テスト項目: 認証に失敗した場合は 401 でアップグレードしない
        // given (前提条件):
        let mut authenticator = MockAuthenticator::new();
        authenticator
            .expect_authenticate()
            .times(1)
            .returning(|_| Err(AuthError::MissingCredentials));
        let state = state(authenticator, ServerConfig::default());

        // when (操作):
        let result = authorize(&state, ConnectQuery::default(), &HeaderMap::new()).await;

        // then (期待する結果):
        assert_eq!(result, Err(StatusCode::UNAUTHORIZED));
    }

    #[tokio::test]
    async fn test_authorize_rejects_foreign_origin() {
        // テスト項目: 許可されていない Origin は認証の前に 403 で拒否される
        // given (前提条件):
        let mut authenticator = MockAuthenticator::new();
        authenticator.expect_authenticate().times(0);
        let config = ServerConfig {
            allowed_origins: vec!["https://app.example".to_string()],
            ..Default::default()
        };
        let state = state(authenticator, config);
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ORIGIN,
            HeaderValue::from_static("https://evil.example"),
        );

        // when (操作):
        let result = authorize(&state, ConnectQuery::default(), &headers).await;

        // then (期待する結果):
        assert_eq!(result, Err(StatusCode::FORBIDDEN));
    }

    #[tokio::test]
    async fn test_authorize_uses_query_token_without_header() {
        // テスト項目: Authorization ヘッダーがない場合はクエリの token が使われる
        // given (前提条件):
        let mut authenticator = MockAuthenticator::new();
        authenticator
            .expect_authenticate()
            .withf(|credentials| credentials.bearer_token.as_deref() == Some("from-query"))
            .times(1)
            .returning(|_| Ok(None));
        let state = state(authenticator, ServerConfig::default());
        let query = ConnectQuery {
            token: Some("from-query".to_string()),
            ..Default::default()
        };

        // when (操作):
        let identity = authorize(&state, query, &HeaderMap::new()).await;

        // then (期待する結果):
        assert_eq!(identity, Ok(None));
    }

    #[tokio::test]
    async fn test_read_pump_stops_between_frames() {
        // テスト項目: 停止指示を受けた読み取りタスクは処理中のフレームを最後まで処理してから終了する
        // given (前提条件):
        let repository = Arc::new(InMemorySignalingRepository::new());
        let admit = AdmitConnectionUseCase::new(repository.clone(), 16);
        let (connection, _outbound) = admit.execute(None).await.unwrap();
        let join = r#"{"type":"join-room","data":{"room_id":"r1","user_id":"u1","name":"Alice"}}"#;
        let frames = stream::iter(vec![Ok::<_, axum::Error>(Message::Text(join.into()))])
            .chain(stream::pending());
        let (stop_tx, stop_rx) = oneshot::channel();
        let pump = tokio::spawn(read_pump(
            frames,
            stop_rx,
            DispatchSignalUseCase::new(repository.clone()),
            connection.id().clone(),
            None,
        ));
        let r1 = RoomId::new("r1".to_string()).unwrap();
        tokio::time::timeout(Duration::from_secs(1), async {
            while repository.find_room(&r1).await.is_none() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("join-room was not dispatched");

        // when (操作):
        stop_tx.send(()).unwrap();

        // then (期待する結果):
        tokio::time::timeout(Duration::from_secs(1), pump)
            .await
            .expect("read pump did not stop")
            .unwrap();
        let binding = repository.binding(connection.id()).await.unwrap();
        assert_eq!(binding.room_id, Some(r1));
    }
}
