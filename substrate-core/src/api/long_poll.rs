//! Long-poll adapter (spec §4.8 mode 1). Wraps `PollChanges` with a
//! caller-bounded wait: subscribes to the hub first so a notification that
//! lands during the wait is never missed between the initial `PollChanges`
//! and the subscribe call, then polls again once something arrives (or the
//! deadline passes, whichever is first).

use std::collections::HashMap;
use std::time::Duration;

use substrate_contracts::{CoreError, NotificationFilter};
use substrate_model::{AgentId, Message, TopicId};

use crate::mail::MailServiceHandle;
use crate::notify::NotificationHubHandle;

pub async fn long_poll(
    mail: &MailServiceHandle,
    hub: &NotificationHubHandle,
    agent_id: AgentId,
    since: HashMap<TopicId, i64>,
    timeout: Duration,
) -> Result<(Vec<Message>, HashMap<TopicId, i64>), CoreError> {
    let (messages, advanced) = mail.poll_changes(agent_id, since.clone()).await?;
    if !messages.is_empty() {
        return Ok((messages, advanced));
    }

    let (subscriber_id, mut rx) = hub.subscribe(NotificationFilter::AgentInbox(agent_id)).await?;
    let woke = tokio::time::timeout(timeout, rx.recv()).await.is_ok();
    let _ = hub.unsubscribe(subscriber_id).await;

    if !woke {
        return Ok((Vec::new(), HashMap::new()));
    }

    mail.poll_changes(agent_id, since).await
}
