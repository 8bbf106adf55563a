use async_trait::async_trait;
use chrono::Utc;
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use substrate_contracts::{ReviewStore, StoreError};
use substrate_model::{
    AgentId, PlanReview, PlanReviewState, Review, ReviewDecision, ReviewId, ReviewIssue,
    ReviewIteration, ReviewPriority, ReviewState, ReviewType, ThreadId,
};

use super::{from_epoch, map_sqlx_err, to_epoch};

fn parse_review_id(value: &str) -> Result<ReviewId, StoreError> {
    Uuid::parse_str(value)
        .map(ReviewId)
        .map_err(|_| StoreError::Io("malformed review_id in storage".to_string()))
}

#[derive(FromRow)]
struct ReviewRow {
    review_id: String,
    thread_id: String,
    requester_id: i64,
    branch: Option<String>,
    review_type: String,
    priority: String,
    state: String,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<ReviewRow> for Review {
    type Error = StoreError;

    fn try_from(row: ReviewRow) -> Result<Self, Self::Error> {
        Ok(Review {
            review_id: parse_review_id(&row.review_id)?,
            thread_id: ThreadId(row.thread_id),
            requester_id: AgentId(row.requester_id),
            branch: row.branch,
            review_type: parse_review_type(&row.review_type)?,
            priority: parse_review_priority(&row.priority)?,
            state: ReviewState::parse(&row.state)
                .ok_or_else(|| StoreError::Io("unrecognized review state in storage".to_string()))?,
            created_at: from_epoch(row.created_at),
            updated_at: from_epoch(row.updated_at),
        })
    }
}

fn review_type_str(t: ReviewType) -> &'static str {
    match t {
        ReviewType::Full => "full",
        ReviewType::Incremental => "incremental",
        ReviewType::Security => "security",
        ReviewType::Performance => "performance",
    }
}

fn parse_review_type(value: &str) -> Result<ReviewType, StoreError> {
    Ok(match value {
        "full" => ReviewType::Full,
        "incremental" => ReviewType::Incremental,
        "security" => ReviewType::Security,
        "performance" => ReviewType::Performance,
        _ => return Err(StoreError::Io("unrecognized review_type in storage".to_string())),
    })
}

fn review_priority_str(p: ReviewPriority) -> &'static str {
    match p {
        ReviewPriority::Low => "low",
        ReviewPriority::Normal => "normal",
        ReviewPriority::Urgent => "urgent",
    }
}

fn parse_review_priority(value: &str) -> Result<ReviewPriority, StoreError> {
    Ok(match value {
        "low" => ReviewPriority::Low,
        "normal" => ReviewPriority::Normal,
        "urgent" => ReviewPriority::Urgent,
        _ => return Err(StoreError::Io("unrecognized review priority in storage".to_string())),
    })
}

#[derive(FromRow)]
struct IterationRow {
    id: i64,
    review_id: String,
    decision: Option<String>,
    summary: Option<String>,
    issues: Option<Vec<u8>>,
    suggestions: Option<Vec<u8>>,
    files_changed: Option<i64>,
    lines_changed: Option<i64>,
    duration_ms: Option<i64>,
    cost_usd: Option<f64>,
    started_at: i64,
    completed_at: Option<i64>,
}

impl TryFrom<IterationRow> for ReviewIteration {
    type Error = StoreError;

    fn try_from(row: IterationRow) -> Result<Self, Self::Error> {
        Ok(ReviewIteration {
            id: row.id,
            review_id: parse_review_id(&row.review_id)?,
            decision: row.decision.as_deref().map(ReviewDecision::parse).flatten(),
            summary: row.summary,
            issues: row.issues,
            suggestions: row.suggestions,
            files_changed: row.files_changed,
            lines_changed: row.lines_changed,
            duration_ms: row.duration_ms,
            cost_usd: row.cost_usd,
            started_at: from_epoch(row.started_at),
            completed_at: row.completed_at.map(from_epoch),
        })
    }
}

#[derive(FromRow)]
struct IssueRow {
    id: i64,
    iteration_id: i64,
    review_id: String,
    description: String,
    severity: Option<String>,
    file_path: Option<String>,
    line: Option<i64>,
    resolved: i64,
}

impl TryFrom<IssueRow> for ReviewIssue {
    type Error = StoreError;

    fn try_from(row: IssueRow) -> Result<Self, Self::Error> {
        Ok(ReviewIssue {
            id: row.id,
            iteration_id: row.iteration_id,
            review_id: parse_review_id(&row.review_id)?,
            description: row.description,
            severity: row.severity,
            file_path: row.file_path,
            line: row.line,
            resolved: row.resolved != 0,
        })
    }
}

#[derive(FromRow)]
struct PlanReviewRow {
    review_id: String,
    thread_id: String,
    requester_id: i64,
    plan: String,
    state: String,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<PlanReviewRow> for PlanReview {
    type Error = StoreError;

    fn try_from(row: PlanReviewRow) -> Result<Self, Self::Error> {
        Ok(PlanReview {
            review_id: parse_review_id(&row.review_id)?,
            thread_id: ThreadId(row.thread_id),
            requester_id: AgentId(row.requester_id),
            plan: row.plan,
            state: PlanReviewState::parse(&row.state).ok_or_else(|| {
                StoreError::Io("unrecognized plan_review state in storage".to_string())
            })?,
            created_at: from_epoch(row.created_at),
            updated_at: from_epoch(row.updated_at),
        })
    }
}

pub struct SqliteReviewStore {
    pool: SqlitePool,
}

impl SqliteReviewStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReviewStore for SqliteReviewStore {
    async fn create_review(
        &self,
        thread_id: ThreadId,
        requester_id: AgentId,
        branch: Option<String>,
        review_type: ReviewType,
        priority: ReviewPriority,
    ) -> Result<Review, StoreError> {
        let id = ReviewId::new();
        let now = to_epoch(Utc::now());
        sqlx::query(
            "INSERT INTO reviews \
             (review_id, thread_id, requester_id, branch, review_type, priority, state, \
              created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(id.0.to_string())
        .bind(&thread_id.0)
        .bind(requester_id.get())
        .bind(&branch)
        .bind(review_type_str(review_type))
        .bind(review_priority_str(priority))
        .bind(ReviewState::New.as_str())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        self.get_review(id).await?.ok_or(StoreError::NotFound)
    }

    async fn get_review(&self, id: ReviewId) -> Result<Option<Review>, StoreError> {
        let row = sqlx::query_as::<_, ReviewRow>("SELECT * FROM reviews WHERE review_id = ?")
            .bind(id.0.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        row.map(Review::try_from).transpose()
    }

    async fn list_non_terminal_reviews(&self) -> Result<Vec<Review>, StoreError> {
        let rows = sqlx::query_as::<_, ReviewRow>(
            "SELECT * FROM reviews WHERE state NOT IN ('approved', 'rejected', 'cancelled') \
             ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        rows.into_iter().map(Review::try_from).collect()
    }

    async fn update_review_state(
        &self,
        id: ReviewId,
        new_state: ReviewState,
    ) -> Result<Review, StoreError> {
        let now = to_epoch(Utc::now());
        let result = sqlx::query("UPDATE reviews SET state = ?, updated_at = ? WHERE review_id = ?")
            .bind(new_state.as_str())
            .bind(now)
            .bind(id.0.to_string())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        self.get_review(id).await?.ok_or(StoreError::NotFound)
    }

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
    ) -> Result<ReviewIteration, StoreError> {
        let now = to_epoch(Utc::now());
        let result = sqlx::query(
            "INSERT INTO review_iterations \
             (review_id, decision, summary, issues, suggestions, files_changed, lines_changed, \
              duration_ms, cost_usd, started_at, completed_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(review_id.0.to_string())
        .bind(decision.map(|d| d.as_str()))
        .bind(&summary)
        .bind(&issues)
        .bind(&suggestions)
        .bind(files_changed)
        .bind(lines_changed)
        .bind(duration_ms)
        .bind(cost_usd)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        let row = sqlx::query_as::<_, IterationRow>(
            "SELECT * FROM review_iterations WHERE id = ?",
        )
        .bind(result.last_insert_rowid())
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        ReviewIteration::try_from(row)
    }

    async fn list_iterations(&self, review_id: ReviewId) -> Result<Vec<ReviewIteration>, StoreError> {
        let rows = sqlx::query_as::<_, IterationRow>(
            "SELECT * FROM review_iterations WHERE review_id = ? ORDER BY started_at",
        )
        .bind(review_id.0.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        rows.into_iter().map(ReviewIteration::try_from).collect()
    }

    async fn add_issue(
        &self,
        iteration_id: i64,
        review_id: ReviewId,
        description: &str,
        severity: Option<String>,
        file_path: Option<String>,
        line: Option<i64>,
    ) -> Result<ReviewIssue, StoreError> {
        let result = sqlx::query(
            "INSERT INTO review_issues \
             (iteration_id, review_id, description, severity, file_path, line, resolved) \
             VALUES (?, ?, ?, ?, ?, ?, 0)",
        )
        .bind(iteration_id)
        .bind(review_id.0.to_string())
        .bind(description)
        .bind(&severity)
        .bind(&file_path)
        .bind(line)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        let row = sqlx::query_as::<_, IssueRow>("SELECT * FROM review_issues WHERE id = ?")
            .bind(result.last_insert_rowid())
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        ReviewIssue::try_from(row)
    }

    async fn resolve_issue(&self, issue_id: i64) -> Result<ReviewIssue, StoreError> {
        let result = sqlx::query("UPDATE review_issues SET resolved = 1 WHERE id = ?")
            .bind(issue_id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        let row = sqlx::query_as::<_, IssueRow>("SELECT * FROM review_issues WHERE id = ?")
            .bind(issue_id)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        ReviewIssue::try_from(row)
    }

    async fn list_issues(&self, review_id: ReviewId) -> Result<Vec<ReviewIssue>, StoreError> {
        let rows = sqlx::query_as::<_, IssueRow>(
            "SELECT * FROM review_issues WHERE review_id = ? ORDER BY id",
        )
        .bind(review_id.0.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        rows.into_iter().map(ReviewIssue::try_from).collect()
    }

    async fn create_plan_review(
        &self,
        thread_id: ThreadId,
        requester_id: AgentId,
        plan: &str,
    ) -> Result<PlanReview, StoreError> {
        let id = ReviewId::new();
        let now = to_epoch(Utc::now());
        sqlx::query(
            "INSERT INTO plan_reviews \
             (review_id, thread_id, requester_id, plan, state, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(id.0.to_string())
        .bind(&thread_id.0)
        .bind(requester_id.get())
        .bind(plan)
        .bind(PlanReviewState::Pending.as_str())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        self.get_plan_review(id).await?.ok_or(StoreError::NotFound)
    }

    async fn get_plan_review(&self, id: ReviewId) -> Result<Option<PlanReview>, StoreError> {
        let row =
            sqlx::query_as::<_, PlanReviewRow>("SELECT * FROM plan_reviews WHERE review_id = ?")
                .bind(id.0.to_string())
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_err)?;
        row.map(PlanReview::try_from).transpose()
    }

    async fn update_plan_review_state(
        &self,
        id: ReviewId,
        new_state: PlanReviewState,
    ) -> Result<PlanReview, StoreError> {
        let now = to_epoch(Utc::now());
        let result = sqlx::query(
            "UPDATE plan_reviews SET state = ?, updated_at = ? WHERE review_id = ?",
        )
        .bind(new_state.as_str())
        .bind(now)
        .bind(id.0.to_string())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        self.get_plan_review(id).await?.ok_or(StoreError::NotFound)
    }
}
