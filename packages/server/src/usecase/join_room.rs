//! UseCase: 入室処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - JoinRoomUseCase::execute() メソッド
//! - identity の紐付け、ルームの遅延生成、既存メンバーへの user-joined 通知
//!
//! ### なぜこのテストが必要か
//! - 参加者本人には user-joined が届かないことを保証
//! - 後から入室した参加者に既存メンバーの一覧が送られない（非対称な通知）ことを確認
//! - 接続時に認証された user_id を join-room で別人に書き換えられないことを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：新規ルームへの入室、既存ルームへの入室、認証済みと同じ user_id での入室
//! - 異常系：登録されていない接続からの入室、認証済みと異なる user_id での入室

use std::sync::Arc;

use crate::domain::{ConnectionId, Identity, JoinOutcome, RoomId, SignalingRepository};

use super::error::JoinRoomError;

/// 入室のユースケース
pub struct JoinRoomUseCase {
    /// Repository（データアクセス層の抽象化）
    repository: Arc<dyn SignalingRepository>,
}

impl JoinRoomUseCase {
    /// 新しい JoinRoomUseCase を作成
    pub fn new(repository: Arc<dyn SignalingRepository>) -> Self {
        Self { repository }
    }

    /// 入室を実行
    ///
    /// # Arguments
    ///
    /// * `connection_id` - 入室する接続の ID
    /// * `room_id` - 入室先のルーム ID（存在しなければ作成される）
    /// * `identity` - 接続に紐付ける user_id と表示名。接続時に認証されていれば
    ///   user_id はそれと一致しなければならない
    ///
    /// # Returns
    ///
    /// * `Ok(JoinOutcome)` - 入室成功
    /// * `Err(JoinRoomError)` - 入室失敗
    pub async fn execute(
        &self,
        connection_id: &ConnectionId,
        room_id: RoomId,
        identity: Identity,
    ) -> Result<JoinOutcome, JoinRoomError> {
        let binding = self.repository.binding(connection_id).await?;
        if let Some(authenticated) = binding.authenticated
            && authenticated.user_id != identity.user_id
        {
            return Err(JoinRoomError::IdentityMismatch {
                authenticated: authenticated.user_id.into_string(),
                requested: identity.user_id.into_string(),
            });
        }

        let user_id = identity.user_id.clone();
        let outcome = self
            .repository
            .join_room(connection_id, room_id.clone(), identity)
            .await?;

        tracing::info!(
            "Client '{}' ({}) joined room '{}' (notified {} member(s))",
            user_id,
            connection_id,
            room_id,
            outcome.delivery.delivered
        );
        Ok(outcome)
    }
}
