//! 房间命名
//!
//! 每个会话只有两个逻辑受众：全体参与者 `session:{id}` 和仅教师 `session:{id}:instructors`。
//! 房间成员关系由实时传输层维护，这里只负责命名。

use std::{fmt, str::FromStr};

use uuid::Uuid;

use crate::errors::DomainError;
use crate::question::Visibility;
use crate::value_objects::SessionId;

const ROOM_PREFIX: &str = "session:";
const INSTRUCTORS_SUFFIX: &str = ":instructors";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Room {
    /// 会话内全体参与者
    Session(SessionId),
    /// 会话内的教师和助教
    Instructors(SessionId),
}

impl Room {
    /// 根据可见性选出唯一的目标房间
    pub fn for_visibility(session_id: SessionId, visibility: Visibility) -> Self {
        match visibility {
            Visibility::InstructorOnly => Room::Instructors(session_id),
            Visibility::Public => Room::Session(session_id),
        }
    }

    pub fn session_id(&self) -> SessionId {
        match self {
            Room::Session(id) | Room::Instructors(id) => *id,
        }
    }
}

impl fmt::Display for Room {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Room::Session(id) => write!(f, "{ROOM_PREFIX}{id}"),
            Room::Instructors(id) => write!(f, "{ROOM_PREFIX}{id}{INSTRUCTORS_SUFFIX}"),
        }
    }
}

impl FromStr for Room {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let rest = value
            .strip_prefix(ROOM_PREFIX)
            .ok_or_else(|| DomainError::invalid_argument("room", "missing session prefix"))?;
        let (raw_id, instructors) = match rest.strip_suffix(INSTRUCTORS_SUFFIX) {
            Some(raw_id) => (raw_id, true),
            None => (rest, false),
        };
        let id = Uuid::parse_str(raw_id)
            .map(SessionId::from)
            .map_err(|err| DomainError::invalid_argument("room", err.to_string()))?;
        Ok(if instructors {
            Room::Instructors(id)
        } else {
            Room::Session(id)
        })
    }
}
