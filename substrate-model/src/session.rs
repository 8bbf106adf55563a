//! SessionIdentity — external session id to agent binding.

#[cfg(feature = "chrono")]
use chrono::{DateTime, Utc};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::ids::{AgentId, SessionId};

/// Binds an external collaborator's session id (`SESSION_ID`) to an agent,
/// along with the project/branch context observed when the binding was
/// established. Upserted on identity establishment.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SessionIdentity {
    pub session_id: SessionId,
    pub agent_id: AgentId,
    pub project_dir: Option<String>,
    pub git_branch: Option<String>,
    pub task_list_id: Option<String>,
    #[cfg(feature = "chrono")]
    pub last_active_at: DateTime<Utc>,
    #[cfg(not(feature = "chrono"))]
    pub last_active_at: i64,
}
