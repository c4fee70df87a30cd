//! UseCase 層のエラー定義

use thiserror::Error;

use crate::domain::{RepositoryError, ValueObjectError};

/// 接続受付時のエラー
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AdmitError {
    #[error("failed to generate connection id: {0}")]
    ConnectionId(#[from] ValueObjectError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// 入室処理のエラー
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JoinRoomError {
    /// join-room の内容が不正（ルーム ID やユーザー ID が空など）
    #[error("invalid join-room data: {0}")]
    InvalidData(#[from] ValueObjectError),

    /// 接続時に認証された user_id と join-room の user_id が異なる
    #[error("user id '{requested}' does not match authenticated user '{authenticated}'")]
    IdentityMismatch {
        authenticated: String,
        requested: String,
    },

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// 中継処理のエラー
///
/// どれも送信者には通知されず、ログに残すだけです。
#[derive(Debug, Error)]
pub enum RelayError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// 送信者がまだどのルームにも入室していない
    #[error("sender has not joined a room")]
    NotInRoom,

    /// 送信者のルームが既に存在しない
    #[error("room '{0}' no longer exists")]
    RoomNotFound(String),

    #[error("invalid target: {0}")]
    InvalidTarget(ValueObjectError),

    /// ルーム内に target のユーザーがいない
    #[error("target '{0}' is not in the room")]
    TargetNotFound(String),

    #[error("failed to encode relayed message: {0}")]
    Encode(#[from] serde_json::Error),
}
