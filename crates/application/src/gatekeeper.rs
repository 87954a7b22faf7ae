use std::sync::Arc;
use std::time::Duration;

use domain::{Session, SessionId};

use crate::deadline::bounded;
use crate::error::ApplicationError;
use crate::repository::SessionRepository;

/// 会话准入检查的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAdmission {
    Submittable(Session),
    NotFound,
    SubmissionsDisabled,
}

impl SessionAdmission {
    pub fn into_result(self) -> Result<Session, ApplicationError> {
        match self {
            SessionAdmission::Submittable(session) => Ok(session),
            SessionAdmission::NotFound => Err(ApplicationError::SessionNotFound),
            SessionAdmission::SubmissionsDisabled => Err(ApplicationError::SubmissionsDisabled),
        }
    }
}

pub struct SessionGatekeeper {
    sessions: Arc<dyn SessionRepository>,
    call_timeout: Duration,
}

impl SessionGatekeeper {
    pub fn new(sessions: Arc<dyn SessionRepository>, call_timeout: Duration) -> Self {
        Self {
            sessions,
            call_timeout,
        }
    }

    pub async fn check_submittable(
        &self,
        session_id: SessionId,
    ) -> Result<SessionAdmission, ApplicationError> {
        let session = bounded(
            "session_lookup",
            self.call_timeout,
            self.sessions.find_by_id(session_id),
        )
        .await?;

        Ok(match session {
            None => SessionAdmission::NotFound,
            Some(session) if !session.accepts_submissions() => SessionAdmission::SubmissionsDisabled,
            Some(session) => SessionAdmission::Submittable(session),
        })
    }
}
