//! Command results returned to the HTTP layer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Validation outcome codes. The serialized names are echoed verbatim to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    SelfRequest,
    AlreadyRequested,
    UndefinedRequest,
    UndefinedUser,
    AlreadyFriend,
    NotFriend,
    #[serde(rename = "TOO_SHORT")]
    TooShort,
    #[serde(rename = "TOO_LONG")]
    TooLong,
    #[serde(rename = "INVALID_CHARACTERS")]
    InvalidCharacters,
    #[serde(rename = "MUST_CONTAIN_LETTERS")]
    MustContainLetters,
    #[serde(rename = "ALREADY_TAKEN")]
    AlreadyTaken,
    #[serde(rename = "DOES_NOT_EXIST")]
    DoesNotExist,
    #[serde(rename = "USER_ALREADY_EXISTS")]
    UserAlreadyExists,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SelfRequest => "SelfRequest",
            Self::AlreadyRequested => "AlreadyRequested",
            Self::UndefinedRequest => "UndefinedRequest",
            Self::UndefinedUser => "UndefinedUser",
            Self::AlreadyFriend => "AlreadyFriend",
            Self::NotFriend => "NotFriend",
            Self::TooShort => "TOO_SHORT",
            Self::TooLong => "TOO_LONG",
            Self::InvalidCharacters => "INVALID_CHARACTERS",
            Self::MustContainLetters => "MUST_CONTAIN_LETTERS",
            Self::AlreadyTaken => "ALREADY_TAKEN",
            Self::DoesNotExist => "DOES_NOT_EXIST",
            Self::UserAlreadyExists => "USER_ALREADY_EXISTS",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a command: validation failures are data, not errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandResult<T = ()> {
    pub success: bool,
    pub errors: Vec<ErrorCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> CommandResult<T> {
    pub fn ok() -> Self {
        Self {
            success: true,
            errors: Vec::new(),
            data: None,
        }
    }

    pub fn with_data(data: T) -> Self {
        Self {
            success: true,
            errors: Vec::new(),
            data: Some(data),
        }
    }

    pub fn fail(code: ErrorCode) -> Self {
        Self::fail_many(vec![code])
    }

    pub fn fail_many(errors: Vec<ErrorCode>) -> Self {
        Self {
            success: false,
            errors,
            data: None,
        }
    }
}

/// Relationship between the caller and another user, from the caller's side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FriendshipState {
    Friends,
    Incoming,
    Outgoing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FriendshipStateData {
    pub state: FriendshipState,
}
