//! UseCase: 切断処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - EvictConnectionUseCase::execute() メソッド
//! - ルームからの退出、残りのメンバーへの user-left 通知、空になったルームの削除
//!
//! ### なぜこのテストが必要か
//! - 読み込みポンプと書き込みポンプのどちらが先に終了しても、退出処理が 1 度だけ行われることを保証
//! - 「ルームはメンバーがいる間だけ存在する」ことを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：メンバーが残るルームからの退出、最後のメンバーの退出
//! - エッジケース：2 回目の呼び出し、入室前の切断

use std::sync::Arc;

use crate::domain::{ConnectionId, Eviction, SignalingRepository};

/// 切断のユースケース
pub struct EvictConnectionUseCase {
    /// Repository（データアクセス層の抽象化）
    repository: Arc<dyn SignalingRepository>,
}

impl EvictConnectionUseCase {
    /// 新しい EvictConnectionUseCase を作成
    pub fn new(repository: Arc<dyn SignalingRepository>) -> Self {
        Self { repository }
    }

    /// 切断を実行
    ///
    /// 2 回目以降の呼び出しは何もせず `None` を返します。
    pub async fn execute(&self, connection_id: &ConnectionId) -> Option<Eviction> {
        let eviction = self.repository.evict(connection_id).await?;

        match (&eviction.room_id, &eviction.identity) {
            (Some(room_id), Some(identity)) => {
                tracing::info!(
                    "Client '{}' ({}) left room '{}'{}",
                    identity.user_id,
                    connection_id,
                    room_id,
                    if eviction.room_deleted {
                        ", room deleted"
                    } else {
                        ""
                    }
                );
            }
            _ => {
                tracing::info!("Client {} disconnected before joining a room", connection_id);
            }
        }
        Some(eviction)
    }
}
