//! Code-review and plan-review workflow rows.
//!
//! The state *types* live here; the transition logic (what edges are legal,
//! what each orchestrator event does) lives in `substrate-core::review::fsm`
//! so that this crate stays a plain data model with no behaviour.

#[cfg(feature = "chrono")]
use chrono::{DateTime, Utc};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::ids::{AgentId, ReviewId, ThreadId};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ReviewType {
    Full,
    Incremental,
    Security,
    Performance,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ReviewPriority {
    Low,
    Normal,
    Urgent,
}

/// Code-review workflow state. `New` is the state on creation, before the
/// orchestrator has claimed a reviewer; terminal states are `Approved`,
/// `Rejected`, `Cancelled`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ReviewState {
    New,
    PendingReview,
    UnderReview,
    ChangesRequested,
    ReReview,
    Approved,
    Rejected,
    Cancelled,
}

impl ReviewState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ReviewState::Approved | ReviewState::Rejected | ReviewState::Cancelled
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReviewState::New => "new",
            ReviewState::PendingReview => "pending_review",
            ReviewState::UnderReview => "under_review",
            ReviewState::ChangesRequested => "changes_requested",
            ReviewState::ReReview => "re_review",
            ReviewState::Approved => "approved",
            ReviewState::Rejected => "rejected",
            ReviewState::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Some(match value {
            "new" => ReviewState::New,
            "pending_review" => ReviewState::PendingReview,
            "under_review" => ReviewState::UnderReview,
            "changes_requested" => ReviewState::ChangesRequested,
            "re_review" => ReviewState::ReReview,
            "approved" => ReviewState::Approved,
            "rejected" => ReviewState::Rejected,
            "cancelled" => ReviewState::Cancelled,
            _ => return None,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Review {
    pub review_id: ReviewId,
    pub thread_id: ThreadId,
    pub requester_id: AgentId,
    pub branch: Option<String>,
    pub review_type: ReviewType,
    pub priority: ReviewPriority,
    pub state: ReviewState,
    #[cfg(feature = "chrono")]
    pub created_at: DateTime<Utc>,
    #[cfg(not(feature = "chrono"))]
    pub created_at: i64,
    #[cfg(feature = "chrono")]
    pub updated_at: DateTime<Utc>,
    #[cfg(not(feature = "chrono"))]
    pub updated_at: i64,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ReviewDecision {
    Approve,
    RequestChanges,
    Comment,
}

impl ReviewDecision {
    pub fn as_str(self) -> &'static str {
        match self {
            ReviewDecision::Approve => "approve",
            ReviewDecision::RequestChanges => "request_changes",
            ReviewDecision::Comment => "comment",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Some(match value {
            "approve" => ReviewDecision::Approve,
            "request_changes" => ReviewDecision::RequestChanges,
            "comment" => ReviewDecision::Comment,
            _ => return None,
        })
    }
}

/// One reviewer pass over a `Review`.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ReviewIteration {
    pub id: i64,
    pub review_id: ReviewId,
    pub decision: Option<ReviewDecision>,
    pub summary: Option<String>,
    pub issues: Option<Vec<u8>>,
    pub suggestions: Option<Vec<u8>>,
    pub files_changed: Option<i64>,
    pub lines_changed: Option<i64>,
    pub duration_ms: Option<i64>,
    pub cost_usd: Option<f64>,
    #[cfg(feature = "chrono")]
    pub started_at: DateTime<Utc>,
    #[cfg(not(feature = "chrono"))]
    pub started_at: i64,
    #[cfg(feature = "chrono")]
    pub completed_at: Option<DateTime<Utc>>,
    #[cfg(not(feature = "chrono"))]
    pub completed_at: Option<i64>,
}

/// Denormalized issue extracted from an iteration, with resolution tracking.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ReviewIssue {
    pub id: i64,
    pub iteration_id: i64,
    pub review_id: ReviewId,
    pub description: String,
    pub severity: Option<String>,
    pub file_path: Option<String>,
    pub line: Option<i64>,
    pub resolved: bool,
}

/// Single-shot plan-review workflow state.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PlanReviewState {
    Pending,
    Approved,
    Rejected,
    ChangesRequested,
}

impl PlanReviewState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, PlanReviewState::Pending)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PlanReviewState::Pending => "pending",
            PlanReviewState::Approved => "approved",
            PlanReviewState::Rejected => "rejected",
            PlanReviewState::ChangesRequested => "changes_requested",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Some(match value {
            "pending" => PlanReviewState::Pending,
            "approved" => PlanReviewState::Approved,
            "rejected" => PlanReviewState::Rejected,
            "changes_requested" => PlanReviewState::ChangesRequested,
            _ => return None,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PlanReview {
    pub review_id: ReviewId,
    pub thread_id: ThreadId,
    pub requester_id: AgentId,
    pub plan: String,
    pub state: PlanReviewState,
    #[cfg(feature = "chrono")]
    pub created_at: DateTime<Utc>,
    #[cfg(not(feature = "chrono"))]
    pub created_at: i64,
    #[cfg(feature = "chrono")]
    pub updated_at: DateTime<Utc>,
    #[cfg(not(feature = "chrono"))]
    pub updated_at: i64,
}
