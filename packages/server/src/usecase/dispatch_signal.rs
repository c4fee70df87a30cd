//! UseCase: 受信メッセージの振り分け処理
//!
//! 読み込みポンプが受け取ったテキストフレームを 1 つずつデコードし、
//! 入室・中継のユースケースに振り分けます。デコードに失敗したフレームは
//! ログに残して読み飛ばし、接続は維持します。
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - DispatchSignalUseCase::execute() メソッド
//! - join-room / offer / answer / ice-candidate の振り分けと、不正なメッセージの破棄
//!
//! ### なぜこのテストが必要か
//! - 不正な join-room には error が返り、それ以外の不正なメッセージは黙って破棄されることを保証
//! - クライアントから送られたハブ専用の種別（user-joined など）が他の参加者に流れないことを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：2 人の入室と offer の中継
//! - 異常系：壊れた JSON、不正な join-room、未知の種別、ハブ専用の種別

use std::sync::Arc;

use crate::{
    domain::{
        ConnectionId, DisplayName, EnqueueOutcome, Identity, RoomId, SignalingRepository, UserId,
    },
    infrastructure::dto::websocket::{
        JoinRoomData, MessageType, RelaySignal, SignalCommand, decode, encode_error,
    },
};

use super::{
    error::{JoinRoomError, RelayError},
    join_room::JoinRoomUseCase,
    relay_signal::RelaySignalUseCase,
};

/// Error reply for a join-room whose data cannot be used
pub const INVALID_JOIN_DATA: &str = "Invalid join room data";

/// Error reply for a join-room naming someone other than the authenticated user
pub const IDENTITY_MISMATCH: &str = "User id does not match the authenticated identity";

/// Error reply for a join-room the registry refused
pub const JOIN_FAILED: &str = "Failed to join room";

/// What happened to one inbound frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Joined { room_id: RoomId, created: bool },
    Relayed { kind: MessageType, delivered: bool },
    Dropped,
}

/// 受信メッセージ振り分けのユースケース
pub struct DispatchSignalUseCase {
    /// Repository（データアクセス層の抽象化）
    repository: Arc<dyn SignalingRepository>,
    join_room: JoinRoomUseCase,
    relay_signal: RelaySignalUseCase,
}

impl DispatchSignalUseCase {
    /// 新しい DispatchSignalUseCase を作成
    pub fn new(repository: Arc<dyn SignalingRepository>) -> Self {
        Self {
            join_room: JoinRoomUseCase::new(Arc::clone(&repository)),
            relay_signal: RelaySignalUseCase::new(Arc::clone(&repository)),
            repository,
        }
    }

    /// 1 フレーム分の振り分けを実行
    ///
    /// # Arguments
    ///
    /// * `connection_id` - 送信者の接続 ID
    /// * `text` - 受信したテキストフレーム
    /// * `default_room` - join-room の room_id が空の場合に使うルーム（`/ws/{room_id}` で接続した場合）
    pub async fn execute(
        &self,
        connection_id: &ConnectionId,
        text: &str,
        default_room: Option<&RoomId>,
    ) -> DispatchOutcome {
        let command = match decode(text) {
            Ok(command) => command,
            Err(e) => {
                tracing::warn!("Dropping malformed message from {}: {}", connection_id, e);
                if e.kind() == Some(MessageType::JoinRoom) {
                    self.reply_error(connection_id, INVALID_JOIN_DATA).await;
                }
                return DispatchOutcome::Dropped;
            }
        };

        match command {
            SignalCommand::JoinRoom(data) => self.join(connection_id, data, default_room).await,
            SignalCommand::Relay(signal) => self.relay(connection_id, signal).await,
            SignalCommand::Unsupported(kind) => {
                tracing::warn!(
                    "Dropping {} from {}: only the hub sends this type",
                    kind.as_str(),
                    connection_id
                );
                DispatchOutcome::Dropped
            }
            SignalCommand::Unknown(kind) => {
                tracing::warn!(
                    "Dropping message of unknown type '{}' from {}",
                    kind,
                    connection_id
                );
                DispatchOutcome::Dropped
            }
        }
    }

    async fn join(
        &self,
        connection_id: &ConnectionId,
        data: JoinRoomData,
        default_room: Option<&RoomId>,
    ) -> DispatchOutcome {
        let result = match join_request(data, default_room) {
            Ok((room_id, identity)) => self
                .join_room
                .execute(connection_id, room_id.clone(), identity)
                .await
                .map(|outcome| (room_id, outcome)),
            Err(e) => Err(e),
        };

        match result {
            Ok((room_id, outcome)) => DispatchOutcome::Joined {
                room_id,
                created: outcome.created,
            },
            Err(e @ JoinRoomError::InvalidData(_)) => {
                tracing::warn!("Rejected join-room from {}: {}", connection_id, e);
                self.reply_error(connection_id, INVALID_JOIN_DATA).await;
                DispatchOutcome::Dropped
            }
            Err(e @ JoinRoomError::IdentityMismatch { .. }) => {
                tracing::warn!("Rejected join-room from {}: {}", connection_id, e);
                self.reply_error(connection_id, IDENTITY_MISMATCH).await;
                DispatchOutcome::Dropped
            }
            Err(e @ JoinRoomError::Repository(_)) => {
                tracing::error!("Failed to join room for {}: {}", connection_id, e);
                self.reply_error(connection_id, JOIN_FAILED).await;
                DispatchOutcome::Dropped
            }
        }
    }

    async fn relay(&self, connection_id: &ConnectionId, signal: RelaySignal) -> DispatchOutcome {
        let kind = signal.kind;
        let result = self
            .relay_signal
            .execute(connection_id, kind, &signal.target, &signal.data)
            .await;

        let delivered = match result {
            Ok(_) => true,
            Err(
                e @ (RelayError::NotInRoom
                | RelayError::RoomNotFound(_)
                | RelayError::InvalidTarget(_)
                | RelayError::TargetNotFound(_)),
            ) => {
                tracing::debug!("Dropped {} from {}: {}", kind.as_str(), connection_id, e);
                false
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to relay {} from {}: {}",
                    kind.as_str(),
                    connection_id,
                    e
                );
                false
            }
        };
        DispatchOutcome::Relayed { kind, delivered }
    }

    /// Offer an `error` envelope to the sender without waiting.
    async fn reply_error(&self, connection_id: &ConnectionId, message: &str) {
        let Ok(binding) = self.repository.binding(connection_id).await else {
            return;
        };
        let frame = match encode_error(message) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!("Failed to encode error reply: {}", e);
                return;
            }
        };
        match binding.connection.try_enqueue(frame) {
            EnqueueOutcome::Queued => {}
            EnqueueOutcome::Full => {
                tracing::warn!(
                    "Outbound queue of {} is full, closing connection",
                    connection_id
                );
                binding.connection.close();
            }
            EnqueueOutcome::Closed => {}
        }
    }
}

/// Turn a join-room payload into a room id and identity.
fn join_request(
    data: JoinRoomData,
    default_room: Option<&RoomId>,
) -> Result<(RoomId, Identity), JoinRoomError> {
    let room_id = match default_room {
        Some(room_id) if data.room_id.is_empty() => room_id.clone(),
        _ => RoomId::new(data.room_id)?,
    };
    let identity = Identity::new(UserId::new(data.user_id)?, DisplayName::new(data.name)?);
    Ok((room_id, identity))
}
