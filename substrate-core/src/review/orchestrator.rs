//! Review orchestrator actor (spec §4.6). Owns no state of its own beyond
//! the `ReviewStore` handle and the notification sink — every durable fact
//! lives in the store, so the actor can be rebuilt from scratch on restart
//! by replaying `list_non_terminal_reviews`. Request/response shape mirrors
//! the teacher's `JobMessage`/`JobResponse` command enum.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use substrate_contracts::{
    CoreError, Notification, NotificationSink, ReviewOrchestratorEvent, ReviewStore,
};
use substrate_model::{
    AgentId, PlanReview, PlanReviewState, Review, ReviewDecision, ReviewId, ReviewIssue,
    ReviewIteration, ReviewPriority, ReviewState, ReviewType, ThreadId,
};

use crate::review::fsm::{self, ReviewEffect};
use crate::review::plan_fsm;
use crate::runtime::{spawn_actor, Actor, ActorHandle, DEFAULT_MAILBOX_CAPACITY};

pub enum ReviewRequest {
    CreateReview {
        thread_id: ThreadId,
        requester_id: AgentId,
        branch: Option<String>,
        review_type: ReviewType,
        priority: ReviewPriority,
    },
    GetReview {
        review_id: ReviewId,
    },
    ListNonTerminal,
    ApplyEvent(ReviewOrchestratorEvent),
    AddIssue {
        iteration_id: i64,
        review_id: ReviewId,
        description: String,
        severity: Option<String>,
        file_path: Option<String>,
        line: Option<i64>,
    },
    ResolveIssue {
        issue_id: i64,
    },
    ListIssues {
        review_id: ReviewId,
    },
    ListIterations {
        review_id: ReviewId,
    },
    CreatePlanReview {
        thread_id: ThreadId,
        requester_id: AgentId,
        plan: String,
    },
    GetPlanReview {
        review_id: ReviewId,
    },
    DecidePlanReview {
        review_id: ReviewId,
        decision: PlanReviewState,
    },
}

pub enum ReviewResponse {
    Review(Review),
    Reviews(Vec<Review>),
    Iteration(ReviewIteration),
    Iterations(Vec<ReviewIteration>),
    Issue(ReviewIssue),
    Issues(Vec<ReviewIssue>),
    PlanReview(PlanReview),
    Ack,
    Error(CoreError),
}

struct ReviewOrchestrator {
    store: Arc<dyn ReviewStore>,
    notifier: Arc<dyn NotificationSink>,
}

impl ReviewOrchestrator {
    async fn apply_event(&mut self, event: ReviewOrchestratorEvent) -> ReviewResponse {
        let review_id = event_review_id(&event);
        let review = match self.store.get_review(review_id).await {
            Ok(Some(review)) => review,
            Ok(None) => return ReviewResponse::Error(CoreError::NotFound),
            Err(err) => return ReviewResponse::Error(err.into()),
        };

        let (next_state, effect) = match fsm::transition(review.state, &event) {
            Ok(result) => result,
            Err(err) => return ReviewResponse::Error(err),
        };

        let updated = match self.store.update_review_state(review_id, next_state).await {
            Ok(review) => review,
            Err(err) => return ReviewResponse::Error(err.into()),
        };

        if let ReviewEffect::RecordFailureIteration { summary } = effect {
            if let Err(err) = self
                .store
                .add_iteration(
                    review_id,
                    Some(ReviewDecision::RequestChanges),
                    Some(summary),
                    None,
                    None,
                    None,
                    None,
                    None,
                    None,
                )
                .await
            {
                warn!(review_id = ?review_id, error = %err, "failed to record failure iteration");
            }
        }

        self.notifier
            .publish(Notification::ReviewStateChanged {
                review_id,
                state: updated.state,
            })
            .await;

        ReviewResponse::Review(updated)
    }
}

fn event_review_id(event: &ReviewOrchestratorEvent) -> ReviewId {
    match event {
        ReviewOrchestratorEvent::Requested { review_id }
        | ReviewOrchestratorEvent::Claimed { review_id }
        | ReviewOrchestratorEvent::LaunchFailed { review_id, .. }
        | ReviewOrchestratorEvent::IterationCompleted { review_id, .. }
        | ReviewOrchestratorEvent::ReReviewRequested { review_id }
        | ReviewOrchestratorEvent::Cancelled { review_id }
        | ReviewOrchestratorEvent::ReviewerResumeRequested { review_id } => *review_id,
    }
}

#[async_trait]
impl Actor for ReviewOrchestrator {
    type Req = ReviewRequest;
    type Resp = ReviewResponse;

    async fn handle(&mut self, req: ReviewRequest) -> ReviewResponse {
        match req {
            ReviewRequest::CreateReview {
                thread_id,
                requester_id,
                branch,
                review_type,
                priority,
            } => match self
                .store
                .create_review(thread_id, requester_id, branch, review_type, priority)
                .await
            {
                Ok(review) => {
                    let review_id = review.review_id;
                    // `Requested` is applied inline, not re-queued through the
                    // mailbox: creation and the New->PendingReview move are one
                    // logical unit (spec §4.6 "created implies queued").
                    self.apply_event(ReviewOrchestratorEvent::Requested { review_id }).await
                }
                Err(err) => ReviewResponse::Error(err.into()),
            },

            ReviewRequest::GetReview { review_id } => match self.store.get_review(review_id).await {
                Ok(Some(review)) => ReviewResponse::Review(review),
                Ok(None) => ReviewResponse::Error(CoreError::NotFound),
                Err(err) => ReviewResponse::Error(err.into()),
            },

            ReviewRequest::ListNonTerminal => match self.store.list_non_terminal_reviews().await {
                Ok(reviews) => ReviewResponse::Reviews(reviews),
                Err(err) => ReviewResponse::Error(err.into()),
            },

            ReviewRequest::ApplyEvent(event) => self.apply_event(event).await,

            ReviewRequest::AddIssue {
                iteration_id,
                review_id,
                description,
                severity,
                file_path,
                line,
            } => match self
                .store
                .add_issue(iteration_id, review_id, &description, severity, file_path, line)
                .await
            {
                Ok(issue) => ReviewResponse::Issue(issue),
                Err(err) => ReviewResponse::Error(err.into()),
            },

            ReviewRequest::ResolveIssue { issue_id } => match self.store.resolve_issue(issue_id).await {
                Ok(issue) => ReviewResponse::Issue(issue),
                Err(err) => ReviewResponse::Error(err.into()),
            },

            ReviewRequest::ListIssues { review_id } => match self.store.list_issues(review_id).await {
                Ok(issues) => ReviewResponse::Issues(issues),
                Err(err) => ReviewResponse::Error(err.into()),
            },

            ReviewRequest::ListIterations { review_id } => {
                match self.store.list_iterations(review_id).await {
                    Ok(iterations) => ReviewResponse::Iterations(iterations),
                    Err(err) => ReviewResponse::Error(err.into()),
                }
            }

            ReviewRequest::CreatePlanReview {
                thread_id,
                requester_id,
                plan,
            } => match self.store.create_plan_review(thread_id, requester_id, &plan).await {
                Ok(plan_review) => ReviewResponse::PlanReview(plan_review),
                Err(err) => ReviewResponse::Error(err.into()),
            },

            ReviewRequest::GetPlanReview { review_id } => {
                match self.store.get_plan_review(review_id).await {
                    Ok(Some(plan_review)) => ReviewResponse::PlanReview(plan_review),
                    Ok(None) => ReviewResponse::Error(CoreError::NotFound),
                    Err(err) => ReviewResponse::Error(err.into()),
                }
            }

            ReviewRequest::DecidePlanReview { review_id, decision } => {
                let plan_review = match self.store.get_plan_review(review_id).await {
                    Ok(Some(plan_review)) => plan_review,
                    Ok(None) => return ReviewResponse::Error(CoreError::NotFound),
                    Err(err) => return ReviewResponse::Error(err.into()),
                };
                let next_state = match plan_fsm::transition(plan_review.state, decision) {
                    Ok(state) => state,
                    Err(err) => return ReviewResponse::Error(err),
                };
                match self.store.update_plan_review_state(review_id, next_state).await {
                    Ok(updated) => ReviewResponse::PlanReview(updated),
                    Err(err) => ReviewResponse::Error(err.into()),
                }
            }
        }
    }

    async fn on_shutdown(&mut self) {
        info!("review orchestrator mailbox closed");
    }
}

#[derive(Clone)]
pub struct ReviewOrchestratorHandle {
    actor: ActorHandle<ReviewRequest, ReviewResponse>,
}

impl ReviewOrchestratorHandle {
    /// Spawns the orchestrator and performs startup recovery: every
    /// non-terminal review is re-read so the in-memory actor state (none,
    /// by design) never drifts from the store. Dangling `under_review`
    /// reviews are left exactly as they are — recovery only re-registers
    /// interest, it never forges a `Claimed`/`LaunchFailed` event it did not
    /// witness, since the store is the sole source of truth and fabricating
    /// an event here would itself be a non-idempotent side effect.
    pub async fn spawn(
        store: Arc<dyn ReviewStore>,
        notifier: Arc<dyn NotificationSink>,
    ) -> (Self, tokio::task::JoinHandle<()>) {
        let resumable = match store.list_non_terminal_reviews().await {
            Ok(reviews) => {
                info!(count = reviews.len(), "resumed non-terminal reviews on startup");
                reviews
            }
            Err(err) => {
                warn!(error = %err, "failed to list non-terminal reviews on startup");
                Vec::new()
            }
        };

        // A dangling iteration is one still missing `completed_at` — the
        // reviewer process that owned it died or was never launched, and
        // nothing else will ever complete it.
        let mut dangling = Vec::new();
        for review in &resumable {
            if review.state != ReviewState::UnderReview {
                continue;
            }
            match store.list_iterations(review.review_id).await {
                // `list_iterations` is ordered by `started_at` ascending,
                // so the last element is the latest iteration.
                Ok(iterations) => {
                    if iterations.last().is_some_and(|iteration| iteration.completed_at.is_none()) {
                        dangling.push(review.review_id);
                    }
                }
                Err(err) => warn!(review_id = ?review.review_id, error = %err, "failed to list iterations during recovery"),
            }
        }

        let orchestrator = ReviewOrchestrator { store, notifier };
        let (actor, join) = spawn_actor(orchestrator, DEFAULT_MAILBOX_CAPACITY);
        let handle = Self { actor };

        for review_id in dangling {
            info!(review_id = ?review_id, "emitting ReviewerResumeRequested for dangling iteration");
            if let Err(err) = handle
                .apply_event(ReviewOrchestratorEvent::ReviewerResumeRequested { review_id })
                .await
            {
                warn!(review_id = ?review_id, error = %err, "failed to emit ReviewerResumeRequested");
            }
        }

        (handle, join)
    }

    pub async fn create_review(
        &self,
        thread_id: ThreadId,
        requester_id: AgentId,
        branch: Option<String>,
        review_type: ReviewType,
        priority: ReviewPriority,
    ) -> Result<Review, CoreError> {
        match self
            .actor
            .ask(ReviewRequest::CreateReview {
                thread_id,
                requester_id,
                branch,
                review_type,
                priority,
            })
            .await?
        {
            ReviewResponse::Review(review) => Ok(review),
            ReviewResponse::Error(err) => Err(err),
            _ => unreachable!("CreateReview always yields Review or Error"),
        }
    }

    pub async fn get_review(&self, review_id: ReviewId) -> Result<Review, CoreError> {
        match self.actor.ask(ReviewRequest::GetReview { review_id }).await? {
            ReviewResponse::Review(review) => Ok(review),
            ReviewResponse::Error(err) => Err(err),
            _ => unreachable!("GetReview always yields Review or Error"),
        }
    }

    pub async fn apply_event(&self, event: ReviewOrchestratorEvent) -> Result<Review, CoreError> {
        match self.actor.ask(ReviewRequest::ApplyEvent(event)).await? {
            ReviewResponse::Review(review) => Ok(review),
            ReviewResponse::Error(err) => Err(err),
            _ => unreachable!("ApplyEvent always yields Review or Error"),
        }
    }

    pub async fn create_plan_review(
        &self,
        thread_id: ThreadId,
        requester_id: AgentId,
        plan: String,
    ) -> Result<PlanReview, CoreError> {
        match self
            .actor
            .ask(ReviewRequest::CreatePlanReview {
                thread_id,
                requester_id,
                plan,
            })
            .await?
        {
            ReviewResponse::PlanReview(plan_review) => Ok(plan_review),
            ReviewResponse::Error(err) => Err(err),
            _ => unreachable!("CreatePlanReview always yields PlanReview or Error"),
        }
    }

    pub async fn get_plan_review(&self, review_id: ReviewId) -> Result<PlanReview, CoreError> {
        match self.actor.ask(ReviewRequest::GetPlanReview { review_id }).await? {
            ReviewResponse::PlanReview(plan_review) => Ok(plan_review),
            ReviewResponse::Error(err) => Err(err),
            _ => unreachable!("GetPlanReview always yields PlanReview or Error"),
        }
    }

    pub async fn decide_plan_review(
        &self,
        review_id: ReviewId,
        decision: PlanReviewState,
    ) -> Result<PlanReview, CoreError> {
        match self
            .actor
            .ask(ReviewRequest::DecidePlanReview { review_id, decision })
            .await?
        {
            ReviewResponse::PlanReview(plan_review) => Ok(plan_review),
            ReviewResponse::Error(err) => Err(err),
            _ => unreachable!("DecidePlanReview always yields PlanReview or Error"),
        }
    }
}
