//! Agent — an addressable participant in the messaging core.

#[cfg(feature = "chrono")]
use chrono::{DateTime, Utc};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::ids::{AgentId, SessionId};

/// An addressable participant: an autonomous coding agent, or the human
/// user, who sends and receives mail. Created on first registration; the
/// `name` becomes immutable the moment it is used as a sender.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Agent {
    pub id: AgentId,
    pub name: String,
    pub project_key: Option<String>,
    pub git_branch: Option<String>,
    pub current_session: Option<SessionId>,
    pub purpose: Option<String>,
    pub working_dir: Option<String>,
    pub hostname: Option<String>,
    #[cfg(feature = "chrono")]
    pub created_at: DateTime<Utc>,
    #[cfg(feature = "chrono")]
    pub last_active_at: DateTime<Utc>,
}

impl Agent {
    pub fn new(id: AgentId, name: impl Into<String>) -> Self {
        #[cfg(feature = "chrono")]
        let now = Utc::now();
        Self {
            id,
            name: name.into(),
            project_key: None,
            git_branch: None,
            current_session: None,
            purpose: None,
            working_dir: None,
            hostname: None,
            #[cfg(feature = "chrono")]
            created_at: now,
            #[cfg(feature = "chrono")]
            last_active_at: now,
        }
    }
}
