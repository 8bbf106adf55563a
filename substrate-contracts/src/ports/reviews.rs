//! Repository port for code-review and plan-review workflow state.

use async_trait::async_trait;

use substrate_model::{
    AgentId, PlanReview, PlanReviewState, Review, ReviewDecision, ReviewId, ReviewIssue,
    ReviewIteration, ReviewPriority, ReviewState, ReviewType, ThreadId,
};

use crate::error::StoreError;

#[async_trait]
pub trait ReviewStore: Send + Sync {
    async fn create_review(
        &self,
        thread_id: ThreadId,
        requester_id: AgentId,
        branch: Option<String>,
        review_type: ReviewType,
        priority: ReviewPriority,
    ) -> Result<Review, StoreError>;

    async fn get_review(&self, id: ReviewId) -> Result<Option<Review>, StoreError>;

    /// Every review not in a terminal state, oldest first — consulted by
    /// the orchestrator on startup to resume in-flight reviews.
    async fn list_non_terminal_reviews(&self) -> Result<Vec<Review>, StoreError>;

    async fn update_review_state(
        &self,
        id: ReviewId,
        new_state: ReviewState,
    ) -> Result<Review, StoreError>;

    async fn add_iteration(
        &self,
        review_id: ReviewId,
        decision: Option<ReviewDecision>,
        summary: Option<String>,
        issues: Option<Vec<u8>>,
        suggestions: Option<Vec<u8>>,
        files_changed: Option<i64>,
        lines_changed: Option<i64>,
        duration_ms: Option<i64>,
        cost_usd: Option<f64>,
    ) -> Result<ReviewIteration, StoreError>;

    async fn list_iterations(&self, review_id: ReviewId) -> Result<Vec<ReviewIteration>, StoreError>;

    async fn add_issue(
        &self,
        iteration_id: i64,
        review_id: ReviewId,
        description: &str,
        severity: Option<String>,
        file_path: Option<String>,
        line: Option<i64>,
    ) -> Result<ReviewIssue, StoreError>;

    async fn resolve_issue(&self, issue_id: i64) -> Result<ReviewIssue, StoreError>;

    async fn list_issues(&self, review_id: ReviewId) -> Result<Vec<ReviewIssue>, StoreError>;

    async fn create_plan_review(
        &self,
        thread_id: ThreadId,
        requester_id: AgentId,
        plan: &str,
    ) -> Result<PlanReview, StoreError>;

    async fn get_plan_review(&self, id: ReviewId) -> Result<Option<PlanReview>, StoreError>;

    async fn update_plan_review_state(
        &self,
        id: ReviewId,
        new_state: PlanReviewState,
    ) -> Result<PlanReview, StoreError>;
}
