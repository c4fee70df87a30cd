//! UseCase 層
//!
//! ハブの操作（接続受付・メッセージ振り分け・入室・中継・切断）を実装するレイヤー。
//! UI 層から呼び出され、Domain 層を操作します。

pub mod admit_connection;
pub mod dispatch_signal;
pub mod error;
pub mod evict_connection;
pub mod join_room;
pub mod relay_signal;

pub use admit_connection::AdmitConnectionUseCase;
pub use dispatch_signal::{DispatchOutcome, DispatchSignalUseCase};
pub use error::{AdmitError, JoinRoomError, RelayError};
pub use evict_connection::EvictConnectionUseCase;
pub use join_room::JoinRoomUseCase;
pub use relay_signal::RelaySignalUseCase;
