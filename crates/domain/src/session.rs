use serde::{Deserialize, Serialize};

use crate::value_objects::{CourseId, SessionId, Timestamp};

/// 课堂会话
///
/// 由会话管理流程创建，提问链路只读取它；唯一会被修改的是提交开关。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub course_id: CourseId,
    pub title: String,
    pub is_submissions_enabled: bool,
    pub created_at: Timestamp,
}

impl Session {
    pub fn new(
        id: SessionId,
        course_id: CourseId,
        title: impl Into<String>,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            course_id,
            title: title.into(),
            is_submissions_enabled: true,
            created_at,
        }
    }

    pub fn accepts_submissions(&self) -> bool {
        self.is_submissions_enabled
    }

    pub fn disable_submissions(&mut self) {
        self.is_submissions_enabled = false;
    }

    pub fn enable_submissions(&mut self) {
        self.is_submissions_enabled = true;
    }
}
