//! UseCase: ネゴシエーションメッセージの中継処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - RelaySignalUseCase::execute() メソッド
//! - offer / answer / ice-candidate を送信者のルーム内の target ユーザーへ転送する処理
//!
//! ### なぜこのテストが必要か
//! - 転送される data が入力とバイト単位で一致し、送信者の user_id だけが付与されることを保証
//! - target が見つからない場合やルーム未入室の場合に黙って破棄されることを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：同じルームの target への転送
//! - 異常系：未入室の送信者、存在しない target、別ルームの target
//! - 異常系：キューが溢れてルームから除かれた送信者

use std::sync::Arc;

use serde_json::value::RawValue;

use crate::{
    domain::{ConnectionId, Delivery, SignalingRepository, UserId},
    infrastructure::dto::websocket::{MessageType, encode_relay},
};

use super::error::RelayError;

/// 中継のユースケース
pub struct RelaySignalUseCase {
    /// Repository（データアクセス層の抽象化）
    repository: Arc<dyn SignalingRepository>,
}

impl RelaySignalUseCase {
    /// 新しい RelaySignalUseCase を作成
    pub fn new(repository: Arc<dyn SignalingRepository>) -> Self {
        Self { repository }
    }

    /// 中継を実行
    ///
    /// # Arguments
    ///
    /// * `sender` - 送信者の接続 ID
    /// * `kind` - メッセージ種別（offer / answer / ice-candidate）
    /// * `target` - 転送先のユーザー ID
    /// * `data` - 元のペイロード（そのまま転送される）
    ///
    /// # Returns
    ///
    /// * `Ok(Delivery)` - 転送成功
    /// * `Err(RelayError)` - 転送先なし・未入室など（送信者には通知しない）
    pub async fn execute(
        &self,
        sender: &ConnectionId,
        kind: MessageType,
        target: &str,
        data: &RawValue,
    ) -> Result<Delivery, RelayError> {
        let binding = self.repository.binding(sender).await?;
        let (Some(room_id), Some(identity)) = (binding.room_id, binding.identity) else {
            return Err(RelayError::NotInRoom);
        };
        let room = self
            .repository
            .find_room(&room_id)
            .await
            .ok_or_else(|| RelayError::RoomNotFound(room_id.to_string()))?;
        // Dropped for being unresponsive, the binding just has not caught up
        if !room.contains(sender).await {
            return Err(RelayError::NotInRoom);
        }
        let target = UserId::new(target.to_string()).map_err(RelayError::InvalidTarget)?;

        let frame = encode_relay(kind, &room_id, &identity.user_id, data)?;
        let delivery = room.send_to_user(&target, frame).await;

        if !delivery.evicted.is_empty() {
            self.repository
                .detach_evicted(&room_id, &delivery.evicted)
                .await;
        }
        if delivery.delivered == 0 {
            return Err(RelayError::TargetNotFound(target.into_string()));
        }

        tracing::debug!(
            "Relayed {} from '{}' to '{}' in room '{}'",
            kind.as_str(),
            identity.user_id,
            target,
            room_id
        );
        Ok(delivery)
    }
}
