use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, Row, SqlitePool};

use substrate_contracts::{AgentStatus, InsertedMessage, MessageStore, NewMessage, StoreError};
use substrate_model::{
    AgentId, InboxFilter, Message, MessageId, MessageRecipient, Priority, RecipientState, ThreadId,
    TopicId,
};

use super::{from_epoch, map_sqlx_err, to_epoch};

#[derive(FromRow)]
struct MessageRow {
    id: i64,
    thread_id: String,
    topic_id: i64,
    log_offset: i64,
    sender_id: i64,
    subject: String,
    body: String,
    priority: String,
    deadline: Option<i64>,
    attachments: Option<Vec<u8>>,
    created_at: i64,
    idempotency_key: Option<String>,
    deleted_by_sender: i64,
}

impl TryFrom<MessageRow> for Message {
    type Error = StoreError;

    fn try_from(row: MessageRow) -> Result<Self, Self::Error> {
        Ok(Message {
            id: MessageId(row.id),
            thread_id: ThreadId(row.thread_id),
            topic_id: TopicId(row.topic_id),
            log_offset: row.log_offset,
            sender_id: AgentId(row.sender_id),
            subject: row.subject,
            body: row.body,
            priority: Priority::parse(&row.priority)
                .ok_or_else(|| StoreError::Io("unrecognized priority in storage".to_string()))?,
            deadline: row.deadline.map(from_epoch),
            attachments: row.attachments,
            created_at: from_epoch(row.created_at),
            idempotency_key: row.idempotency_key,
            deleted_by_sender: row.deleted_by_sender != 0,
        })
    }
}

#[derive(FromRow)]
struct RecipientRow {
    message_id: i64,
    agent_id: i64,
    state: String,
    snoozed_until: Option<i64>,
    read_at: Option<i64>,
    acked_at: Option<i64>,
}

impl TryFrom<RecipientRow> for MessageRecipient {
    type Error = StoreError;

    fn try_from(row: RecipientRow) -> Result<Self, Self::Error> {
        Ok(MessageRecipient {
            message_id: MessageId(row.message_id),
            agent_id: AgentId(row.agent_id),
            state: RecipientState::parse(&row.state)
                .ok_or_else(|| StoreError::Io("unrecognized state in storage".to_string()))?,
            snoozed_until: row.snoozed_until.map(from_epoch),
            read_at: row.read_at.map(from_epoch),
            acked_at: row.acked_at.map(from_epoch),
        })
    }
}

pub struct SqliteMessageStore {
    pool: SqlitePool,
}

impl SqliteMessageStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn recipients_of(&self, message_id: MessageId) -> Result<Vec<MessageRecipient>, StoreError> {
        let rows = sqlx::query_as::<_, RecipientRow>(
            "SELECT * FROM message_recipients WHERE message_id = ?",
        )
        .bind(message_id.get())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        rows.into_iter().map(MessageRecipient::try_from).collect()
    }
}

#[async_trait]
impl MessageStore for SqliteMessageStore {
    async fn insert_message(
        &self,
        draft: NewMessage,
        recipients: &[AgentId],
    ) -> Result<InsertedMessage, StoreError> {
        if let Some(key) = draft.idempotency_key.as_deref() {
            if let Some(existing_id) = self.find_by_idempotency_key(key).await? {
                let message = self.get_message(existing_id).await?.ok_or(StoreError::NotFound)?;
                let recipients = self.recipients_of(existing_id).await?;
                return Ok(InsertedMessage { message, recipients, was_new: false });
            }
        }

        let mut tx = self.pool.begin().await.map_err(map_sqlx_err)?;

        let next_offset: i64 = sqlx::query(
            "SELECT COALESCE(MAX(log_offset), 0) + 1 AS next_offset FROM messages WHERE topic_id = ?",
        )
        .bind(draft.topic_id.get())
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_err)?
        .try_get("next_offset")
        .map_err(map_sqlx_err)?;

        let now = to_epoch(Utc::now());
        let insert = sqlx::query(
            "INSERT INTO messages \
             (thread_id, topic_id, log_offset, sender_id, subject, body, priority, deadline, \
              attachments, created_at, idempotency_key, deleted_by_sender) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0)",
        )
        .bind(&draft.thread_id.0)
        .bind(draft.topic_id.get())
        .bind(next_offset)
        .bind(draft.sender_id.get())
        .bind(&draft.subject)
        .bind(&draft.body)
        .bind(draft.priority.as_str())
        .bind(draft.deadline.map(to_epoch))
        .bind(&draft.attachments)
        .bind(now)
        .bind(&draft.idempotency_key)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;

        let message_id = MessageId(insert.last_insert_rowid());

        let mut recipient_rows = Vec::with_capacity(recipients.len());
        for agent_id in recipients {
            sqlx::query(
                "INSERT INTO message_recipients (message_id, agent_id, state) VALUES (?, ?, ?)",
            )
            .bind(message_id.get())
            .bind(agent_id.get())
            .bind(RecipientState::Unread.as_str())
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_err)?;
            recipient_rows.push(MessageRecipient::new(message_id, *agent_id));
        }

        tx.commit().await.map_err(map_sqlx_err)?;

        let message = self.get_message(message_id).await?.ok_or(StoreError::NotFound)?;
        Ok(InsertedMessage {
            message,
            recipients: recipient_rows,
            was_new: true,
        })
    }

    async fn find_by_idempotency_key(&self, key: &str) -> Result<Option<MessageId>, StoreError> {
        let row = sqlx::query("SELECT id FROM messages WHERE idempotency_key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        row.map(|row| row.try_get("id").map(MessageId).map_err(map_sqlx_err))
            .transpose()
    }

    async fn get_message(&self, id: MessageId) -> Result<Option<Message>, StoreError> {
        let row = sqlx::query_as::<_, MessageRow>("SELECT * FROM messages WHERE id = ?")
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        row.map(Message::try_from).transpose()
    }

    async fn get_recipient(
        &self,
        message_id: MessageId,
        agent_id: AgentId,
    ) -> Result<Option<MessageRecipient>, StoreError> {
        let row = sqlx::query_as::<_, RecipientRow>(
            "SELECT * FROM message_recipients WHERE message_id = ? AND agent_id = ?",
        )
        .bind(message_id.get())
        .bind(agent_id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        row.map(MessageRecipient::try_from).transpose()
    }

    async fn get_thread(&self, thread_id: &ThreadId) -> Result<Vec<Message>, StoreError> {
        let rows = sqlx::query_as::<_, MessageRow>(
            "SELECT * FROM messages WHERE thread_id = ? ORDER BY topic_id, log_offset",
        )
        .bind(&thread_id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        rows.into_iter().map(Message::try_from).collect()
    }

    async fn fetch_inbox(
        &self,
        agent_id: AgentId,
        filter: InboxFilter,
        limit: i64,
    ) -> Result<Vec<(Message, Option<MessageRecipient>)>, StoreError> {
        if filter == InboxFilter::Sent {
            let rows = sqlx::query_as::<_, MessageRow>(
                "SELECT * FROM messages WHERE sender_id = ? AND deleted_by_sender = 0 \
                 ORDER BY created_at DESC LIMIT ?",
            )
            .bind(agent_id.get())
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
            return rows
                .into_iter()
                .map(|row| Message::try_from(row).map(|m| (m, None)))
                .collect();
        }

        let state_clause = match filter {
            InboxFilter::Inbox => Some("r.state NOT IN ('archived', 'trash')"),
            InboxFilter::Unread => Some("r.state = 'unread'"),
            InboxFilter::Starred => Some("r.state = 'starred'"),
            InboxFilter::Snoozed => Some("r.state = 'snoozed'"),
            InboxFilter::Archived => Some("r.state = 'archived'"),
            InboxFilter::Trash => Some("r.state = 'trash'"),
            InboxFilter::All => None,
            InboxFilter::Sent => unreachable!("handled above"),
        };

        let order_by = if filter == InboxFilter::Snoozed {
            "r.snoozed_until ASC"
        } else {
            "m.created_at DESC"
        };

        let sql = format!(
            "SELECT m.*, r.message_id AS r_message_id, r.agent_id AS r_agent_id, r.state AS r_state, \
             r.snoozed_until AS r_snoozed_until, r.read_at AS r_read_at, r.acked_at AS r_acked_at \
             FROM messages m JOIN message_recipients r ON r.message_id = m.id \
             WHERE r.agent_id = ? {} \
             ORDER BY {} LIMIT ?",
            state_clause
                .map(|c| format!("AND {c}"))
                .unwrap_or_default(),
            order_by,
        );

        let rows = sqlx::query(&sql)
            .bind(agent_id.get())
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let message = Message::try_from(MessageRow {
                id: row.try_get("id").map_err(map_sqlx_err)?,
                thread_id: row.try_get("thread_id").map_err(map_sqlx_err)?,
                topic_id: row.try_get("topic_id").map_err(map_sqlx_err)?,
                log_offset: row.try_get("log_offset").map_err(map_sqlx_err)?,
                sender_id: row.try_get("sender_id").map_err(map_sqlx_err)?,
                subject: row.try_get("subject").map_err(map_sqlx_err)?,
                body: row.try_get("body").map_err(map_sqlx_err)?,
                priority: row.try_get("priority").map_err(map_sqlx_err)?,
                deadline: row.try_get("deadline").map_err(map_sqlx_err)?,
                attachments: row.try_get("attachments").map_err(map_sqlx_err)?,
                created_at: row.try_get("created_at").map_err(map_sqlx_err)?,
                idempotency_key: row.try_get("idempotency_key").map_err(map_sqlx_err)?,
                deleted_by_sender: row.try_get("deleted_by_sender").map_err(map_sqlx_err)?,
            })?;
            let recipient = MessageRecipient::try_from(RecipientRow {
                message_id: row.try_get("r_message_id").map_err(map_sqlx_err)?,
                agent_id: row.try_get("r_agent_id").map_err(map_sqlx_err)?,
                state: row.try_get("r_state").map_err(map_sqlx_err)?,
                snoozed_until: row.try_get("r_snoozed_until").map_err(map_sqlx_err)?,
                read_at: row.try_get("r_read_at").map_err(map_sqlx_err)?,
                acked_at: row.try_get("r_acked_at").map_err(map_sqlx_err)?,
            })?;
            out.push((message, Some(recipient)));
        }
        Ok(out)
    }

    async fn set_recipient_state(
        &self,
        message_id: MessageId,
        agent_id: AgentId,
        new_state: RecipientState,
        snoozed_until: Option<DateTime<Utc>>,
    ) -> Result<MessageRecipient, StoreError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_err)?;

        let existing = sqlx::query_as::<_, RecipientRow>(
            "SELECT * FROM message_recipients WHERE message_id = ? AND agent_id = ?",
        )
        .bind(message_id.get())
        .bind(agent_id.get())
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_err)?
        .ok_or(StoreError::NotFound)?;

        let read_at = if new_state == RecipientState::Read && existing.read_at.is_none() {
            Some(to_epoch(Utc::now()))
        } else {
            existing.read_at
        };

        sqlx::query(
            "UPDATE message_recipients SET state = ?, snoozed_until = ?, read_at = ? \
             WHERE message_id = ? AND agent_id = ?",
        )
        .bind(new_state.as_str())
        .bind(snoozed_until.map(to_epoch))
        .bind(read_at)
        .bind(message_id.get())
        .bind(agent_id.get())
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;

        tx.commit().await.map_err(map_sqlx_err)?;

        self.get_recipient(message_id, agent_id)
            .await?
            .ok_or(StoreError::NotFound)
    }

    async fn ack_message(
        &self,
        message_id: MessageId,
        agent_id: AgentId,
    ) -> Result<MessageRecipient, StoreError> {
        let now = to_epoch(Utc::now());
        let result = sqlx::query(
            "UPDATE message_recipients SET acked_at = COALESCE(acked_at, ?) \
             WHERE message_id = ? AND agent_id = ?",
        )
        .bind(now)
        .bind(message_id.get())
        .bind(agent_id.get())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        self.get_recipient(message_id, agent_id)
            .await?
            .ok_or(StoreError::NotFound)
    }

    async fn poll_changes(
        &self,
        agent_id: AgentId,
        since: &HashMap<TopicId, i64>,
    ) -> Result<(Vec<Message>, HashMap<TopicId, i64>), StoreError> {
        let mut all_messages = Vec::new();
        let mut advanced = since.clone();

        for (topic_id, since_offset) in since {
            let rows = sqlx::query_as::<_, MessageRow>(
                "SELECT * FROM messages WHERE topic_id = ? AND log_offset > ? ORDER BY log_offset",
            )
            .bind(topic_id.get())
            .bind(since_offset)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

            if let Some(max_offset) = rows.iter().map(|r| r.log_offset).max() {
                advanced.insert(*topic_id, max_offset);
            }
            for row in rows {
                all_messages.push(Message::try_from(row)?);
            }
        }

        for (topic_id, offset) in &advanced {
            sqlx::query(
                "INSERT INTO consumer_offsets (agent_id, topic_id, last_offset) VALUES (?, ?, ?) \
                 ON CONFLICT(agent_id, topic_id) DO UPDATE SET \
                 last_offset = MAX(consumer_offsets.last_offset, excluded.last_offset)",
            )
            .bind(agent_id.get())
            .bind(topic_id.get())
            .bind(offset)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        }

        all_messages.sort_by_key(|m| m.created_at);
        Ok((all_messages, advanced))
    }

    async fn agent_status(&self, agent_id: AgentId) -> Result<AgentStatus, StoreError> {
        let row = sqlx::query(
            "SELECT \
               SUM(CASE WHEN r.state = 'unread' THEN 1 ELSE 0 END) AS unread_count, \
               SUM(CASE WHEN r.state = 'unread' AND m.priority = 'urgent' THEN 1 ELSE 0 END) AS urgent_unread_count, \
               SUM(CASE WHEN r.state = 'snoozed' THEN 1 ELSE 0 END) AS snoozed_count \
             FROM message_recipients r JOIN messages m ON m.id = r.message_id \
             WHERE r.agent_id = ?",
        )
        .bind(agent_id.get())
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(AgentStatus {
            unread_count: row.try_get::<Option<i64>, _>("unread_count").map_err(map_sqlx_err)?.unwrap_or(0),
            urgent_unread_count: row
                .try_get::<Option<i64>, _>("urgent_unread_count")
                .map_err(map_sqlx_err)?
                .unwrap_or(0),
            snoozed_count: row.try_get::<Option<i64>, _>("snoozed_count").map_err(map_sqlx_err)?.unwrap_or(0),
        })
    }

    async fn sweep_snoozed(&self, now: DateTime<Utc>) -> Result<Vec<MessageRecipient>, StoreError> {
        let epoch_now = to_epoch(now);
        let mut tx = self.pool.begin().await.map_err(map_sqlx_err)?;

        let due = sqlx::query_as::<_, RecipientRow>(
            "SELECT * FROM message_recipients WHERE state = 'snoozed' AND snoozed_until <= ?",
        )
        .bind(epoch_now)
        .fetch_all(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;

        for row in &due {
            sqlx::query(
                "UPDATE message_recipients SET state = 'unread', snoozed_until = NULL \
                 WHERE message_id = ? AND agent_id = ?",
            )
            .bind(row.message_id)
            .bind(row.agent_id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_err)?;
        }

        tx.commit().await.map_err(map_sqlx_err)?;

        due.into_iter()
            .map(|row| {
                MessageRecipient::try_from(RecipientRow {
                    state: "unread".to_string(),
                    snoozed_until: None,
                    ..row
                })
            })
            .collect()
    }

    async fn sweep_expired_messages(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let epoch_now = to_epoch(now);
        let result = sqlx::query(
            "DELETE FROM messages WHERE id IN ( \
               SELECT m.id FROM messages m JOIN topics t ON t.id = m.topic_id \
               WHERE m.created_at + t.retention_seconds < ?)",
        )
        .bind(epoch_now)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        Ok(result.rows_affected())
    }

    async fn search_messages(&self, query: &str, limit: i64) -> Result<Vec<Message>, StoreError> {
        let sanitized = sanitize_fts_query(query);
        let rows = sqlx::query_as::<_, MessageRow>(
            "SELECT m.* FROM message_fts f JOIN messages m ON m.id = f.rowid \
             WHERE message_fts MATCH ? ORDER BY rank LIMIT ?",
        )
        .bind(sanitized)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        rows.into_iter().map(Message::try_from).collect()
    }
}

/// Escape FTS5 special characters so user-supplied search text cannot be
/// interpreted as query syntax (the store is the sole owner of ranking and
/// tokenizer internals — callers pass raw text).
fn sanitize_fts_query(query: &str) -> String {
    let escaped = query.replace('"', "\"\"");
    format!("\"{escaped}\"")
}
