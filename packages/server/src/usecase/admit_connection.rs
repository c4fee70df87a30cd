//! UseCase: 接続受付処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - AdmitConnectionUseCase::execute() メソッド
//! - 接続 ID の払い出しとレジストリへの登録
//!
//! ### なぜこのテストが必要か
//! - 受付直後から接続がレジストリに見えること（まだどのルームにも属さない）を保証
//! - 接続 ID が推測できない値で毎回異なることを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：匿名接続、認証済み identity 付きの接続

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::domain::{
    Connection, ConnectionIdFactory, Frame, Identity, SignalingRepository, Timestamp,
};

use super::error::AdmitError;

/// 接続受付のユースケース
pub struct AdmitConnectionUseCase {
    /// Repository（データアクセス層の抽象化）
    repository: Arc<dyn SignalingRepository>,
    /// 送信キューの容量
    queue_capacity: usize,
}

impl AdmitConnectionUseCase {
    /// 新しい AdmitConnectionUseCase を作成
    pub fn new(repository: Arc<dyn SignalingRepository>, queue_capacity: usize) -> Self {
        Self {
            repository,
            queue_capacity,
        }
    }

    /// 接続受付を実行
    ///
    /// # Arguments
    ///
    /// * `identity` - 認証済みの identity（匿名接続の場合は None）
    ///
    /// # Returns
    ///
    /// * `Ok((Arc<Connection>, Receiver))` - 登録済みの接続と、書き込みポンプに渡す送信キューの受信側
    /// * `Err(AdmitError)` - 受付失敗
    pub async fn execute(
        &self,
        identity: Option<Identity>,
    ) -> Result<(Arc<Connection>, mpsc::Receiver<Frame>), AdmitError> {
        let connection_id = ConnectionIdFactory::generate()?;
        let (connection, outbound) =
            Connection::open(connection_id, Timestamp::now(), self.queue_capacity);

        self.repository
            .register(Arc::clone(&connection), identity)
            .await?;

        Ok((connection, outbound))
    }
}
