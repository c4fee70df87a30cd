//! Value Objects for domain models.
//!
//! Value Objects are immutable objects that represent values in the domain.
//! They are compared by their value, not by identity.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::ValueObjectError;

/// Maximum length (bytes) of user and room identifiers.
pub const MAX_ID_LEN: usize = 256;

/// Maximum length (bytes) of a display name.
pub const MAX_DISPLAY_NAME_LEN: usize = 100;

/// Connection identifier value object.
///
/// Opaque, process-unique identifier assigned at admission. Use
/// [`ConnectionIdFactory`](super::factory::ConnectionIdFactory) to mint new ones.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(String);

impl ConnectionId {
    /// Wrap an existing connection identifier.
    pub fn new(id: String) -> Result<Self, ValueObjectError> {
        if id.is_empty() {
            return Err(ValueObjectError::ConnectionIdEmpty);
        }
        Ok(Self(id))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// User identifier value object.
///
/// Supplied by the authenticating collaborator or by the `join-room` payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    /// Create a new UserId.
    ///
    /// # Arguments
    ///
    /// * `id` - The user identifier string
    ///
    /// # Returns
    ///
    /// A Result containing the UserId or an error if validation fails
    pub fn new(id: String) -> Result<Self, ValueObjectError> {
        if id.is_empty() {
            return Err(ValueObjectError::UserIdEmpty);
        }
        let len = id.len();
        if len > MAX_ID_LEN {
            return Err(ValueObjectError::UserIdTooLong {
                max: MAX_ID_LEN,
                actual: len,
            });
        }
        Ok(Self(id))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert to owned String.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for UserId {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Display name value object.
///
/// May be empty; only the length is bounded.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DisplayName(String);

impl DisplayName {
    /// Create a new DisplayName.
    pub fn new(name: String) -> Result<Self, ValueObjectError> {
        let len = name.len();
        if len > MAX_DISPLAY_NAME_LEN {
            return Err(ValueObjectError::DisplayNameTooLong {
                max: MAX_DISPLAY_NAME_LEN,
                actual: len,
            });
        }
        Ok(Self(name))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for DisplayName {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for DisplayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Room identifier value object.
///
/// Chosen by the joining client. The relay does not check it against any
/// meeting registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoomId(String);

impl RoomId {
    /// Create a new RoomId.
    ///
    /// # Arguments
    ///
    /// * `id` - The room identifier string
    ///
    /// # Returns
    ///
    /// A Result containing the RoomId or an error if validation fails
    pub fn new(id: String) -> Result<Self, ValueObjectError> {
        if id.is_empty() {
            return Err(ValueObjectError::RoomIdEmpty);
        }
        let len = id.len();
        if len > MAX_ID_LEN {
            return Err(ValueObjectError::RoomIdTooLong {
                max: MAX_ID_LEN,
                actual: len,
            });
        }
        Ok(Self(id))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RoomId {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Timestamp value object.
///
/// Represents a Unix timestamp in milliseconds (JST).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Create a new Timestamp from Unix milliseconds.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Current time.
    pub fn now() -> Self {
        Self(kairo_shared::time::get_jst_timestamp())
    }

    /// Get the inner i64 value.
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_new_success() {
        // テスト項目: 有効なユーザー ID を作成できる
        // given (前提条件):
        let id = "u1".to_string();

        // when (操作):
        let result = UserId::new(id);

        // then (期待する結果):
        assert!(result.is_ok());
        assert_eq!(result.unwrap().as_str(), "u1");
    }

    #[test]
    fn test_user_id_new_empty_fails() {
        // テスト項目: 空のユーザー ID は作成できない
        // when (操作):
        let result = UserId::new(String::new());

        // then (期待する結果):
        assert_eq!(result.unwrap_err(), ValueObjectError::UserIdEmpty);
    }

    #[test]
    fn test_user_id_new_too_long_fails() {
        // テスト項目: 上限を超える長さのユーザー ID は作成できない
        // given (前提条件):
        let id = "a".repeat(MAX_ID_LEN + 1);

        // when (操作):
        let result = UserId::new(id);

        // then (期待する結果):
        assert_eq!(
            result.unwrap_err(),
            ValueObjectError::UserIdTooLong {
                max: MAX_ID_LEN,
                actual: MAX_ID_LEN + 1
            }
        );
    }

    #[test]
    fn test_display_name_allows_empty() {
        // テスト項目: 表示名は空文字列でも作成できる
        // when (操作):
        let result = DisplayName::new(String::new());

        // then (期待する結果):
        assert!(result.is_ok());
        assert_eq!(result.unwrap().as_str(), "");
    }

    #[test]
    fn test_display_name_too_long_fails() {
        // テスト項目: 上限を超える長さの表示名は作成できない
        // given (前提条件):
        let name = "a".repeat(MAX_DISPLAY_NAME_LEN + 1);

        // when (操作):
        let result = DisplayName::new(name);

        // then (期待する結果):
        assert!(matches!(
            result,
            Err(ValueObjectError::DisplayNameTooLong { .. })
        ));
    }

    #[test]
    fn test_room_id_new_success() {
        // テスト項目: 有効なルーム ID を作成できる
        // when (操作):
        let result = RoomId::try_from("r1".to_string());

        // then (期待する結果):
        assert_eq!(result.unwrap().as_str(), "r1");
    }

    #[test]
    fn test_room_id_new_empty_fails() {
        // テスト項目: 空のルーム ID は作成できない
        // when (操作):
        let result = RoomId::new(String::new());

        // then (期待する結果):
        assert_eq!(result.unwrap_err(), ValueObjectError::RoomIdEmpty);
    }

    #[test]
    fn test_room_id_equality() {
        // テスト項目: 同じ値を持つ RoomId は等価
        // given (前提条件):
        let id1 = RoomId::new("r1".to_string()).unwrap();
        let id2 = RoomId::new("r1".to_string()).unwrap();
        let id3 = RoomId::new("r2".to_string()).unwrap();

        // then (期待する結果):
        assert_eq!(id1, id2);
        assert_ne!(id1, id3);
    }

    #[test]
    fn test_connection_id_new_empty_fails() {
        // テスト項目: 空の接続 ID は作成できない
        // when (操作):
        let result = ConnectionId::new(String::new());

        // then (期待する結果):
        assert_eq!(result.unwrap_err(), ValueObjectError::ConnectionIdEmpty);
    }

    #[test]
    fn test_timestamp_ordering() {
        // テスト項目: タイムスタンプは順序付けできる
        // given (前提条件):
        let ts1 = Timestamp::new(1000);
        let ts2 = Timestamp::new(2000);

        // then (期待する結果):
        assert!(ts1 < ts2);
        assert_eq!(ts1.value(), 1000);
    }
}
