//! End-to-end scenarios against a real `System` over a temp-directory
//! SQLite pair, one test per literal scenario in the specification's
//! testable-properties section (S1-S6).

use std::collections::HashMap;
use std::time::Duration;

use substrate_config::Config;
use substrate_contracts::ReviewOrchestratorEvent;
use substrate_core::mail::{PublishInput, SendMailInput};
use substrate_core::System;
use substrate_model::{
    AgentId, InboxFilter, OperationType, PlanReviewState, Priority, RecipientState, ReviewDecision,
    ReviewPriority, ReviewType, ThreadId,
};

async fn test_system(dir: &tempfile::TempDir) -> (System, substrate_core::runtime::Supervisor) {
    let mut config = Config::default();
    config.db.path = dir.path().join("substrate.db");
    config.queue.path = dir.path().join("queue.db");
    config.retention.snooze_sweep_interval = Duration::from_millis(30);
    config.retention.retention_sweep_interval = Duration::from_millis(50);
    config.queue.drain_interval = Duration::from_millis(30);
    System::start(&config).await.expect("system starts")
}

async fn agent(system: &System, name: &str) -> AgentId {
    system.agents.get_or_create_agent(name).await.unwrap().id
}

/// S1: Send/read. A direct send lands unread in the recipient's inbox;
/// reading it transitions the recipient row to `read` and stamps
/// `read_at`.
#[tokio::test]
async fn s1_send_and_read() {
    let dir = tempfile::tempdir().unwrap();
    let (system, _sup) = test_system(&dir).await;

    let alice = agent(&system, "alice").await;
    let bob = agent(&system, "bob").await;

    let message = system
        .mail
        .send_mail(SendMailInput {
            thread_id: ThreadId("thread-1".to_string()),
            sender_id: alice,
            topic_name: None,
            recipients: vec![bob],
            subject: "hello".to_string(),
            body: "body".to_string(),
            priority: Priority::Normal,
            deadline: None,
            attachments: None,
            idempotency_key: None,
        })
        .await
        .unwrap();

    let inbox = system.mail.fetch_inbox(bob, InboxFilter::Inbox, 50).await.unwrap();
    assert_eq!(inbox.len(), 1);
    let (_, recipient) = &inbox[0];
    assert_eq!(recipient.as_ref().unwrap().state, RecipientState::Unread);

    let (_, recipient) = system.mail.read_message(bob, message.id).await.unwrap();
    assert_eq!(recipient.state, RecipientState::Read);
    assert!(recipient.read_at.is_some());
}

/// S2: Idempotent send. Two `SendMail` calls carrying the same
/// `(sender, idempotency_key)` resolve to the same stored message rather
/// than inserting a duplicate.
#[tokio::test]
async fn s2_idempotent_send_does_not_duplicate() {
    let dir = tempfile::tempdir().unwrap();
    let (system, _sup) = test_system(&dir).await;

    let alice = agent(&system, "alice").await;
    let bob = agent(&system, "bob").await;

    let input = || SendMailInput {
        thread_id: ThreadId("thread-2".to_string()),
        sender_id: alice,
        topic_name: None,
        recipients: vec![bob],
        subject: "hello".to_string(),
        body: "body".to_string(),
        priority: Priority::Normal,
        deadline: None,
        attachments: None,
        idempotency_key: Some("retry-key".to_string()),
    };

    let first = system.mail.send_mail(input()).await.unwrap();
    let second = system.mail.send_mail(input()).await.unwrap();
    assert_eq!(first.id, second.id);

    let inbox = system.mail.fetch_inbox(bob, InboxFilter::Inbox, 50).await.unwrap();
    assert_eq!(inbox.len(), 1);
}

/// S3: Snooze, then wake. Snoozing with a near-future deadline hides the
/// message from the default inbox filter; once the deadline passes the
/// background sweeper restores it to unread without any caller action.
#[tokio::test]
async fn s3_snooze_then_sweeper_wakes() {
    let dir = tempfile::tempdir().unwrap();
    let (system, _sup) = test_system(&dir).await;

    let alice = agent(&system, "alice").await;
    let bob = agent(&system, "bob").await;

    let message = system
        .mail
        .send_mail(SendMailInput {
            thread_id: ThreadId("thread-3".to_string()),
            sender_id: alice,
            topic_name: None,
            recipients: vec![bob],
            subject: "snoozeme".to_string(),
            body: "body".to_string(),
            priority: Priority::Normal,
            deadline: None,
            attachments: None,
            idempotency_key: None,
        })
        .await
        .unwrap();

    let wake_at = chrono::Utc::now() + chrono::Duration::milliseconds(80);
    system
        .mail
        .update_message_state(bob, message.id, RecipientState::Snoozed, Some(wake_at))
        .await
        .unwrap();

    let inbox = system.mail.fetch_inbox(bob, InboxFilter::Inbox, 50).await.unwrap();
    assert!(inbox.is_empty(), "snoozed message must not show in the default inbox filter");

    tokio::time::sleep(Duration::from_millis(300)).await;

    let inbox = system.mail.fetch_inbox(bob, InboxFilter::Inbox, 50).await.unwrap();
    assert_eq!(inbox.len(), 1, "sweeper should have woken the snoozed message by now");
    let (_, recipient) = &inbox[0];
    assert_eq!(recipient.as_ref().unwrap().state, RecipientState::Unread);
}

/// S4: Broadcast with sender-skip. Publishing to a topic with three
/// subscribers, one of whom is the sender, yields exactly two
/// `MessageRecipient` rows — the sender never receives its own broadcast.
#[tokio::test]
async fn s4_broadcast_skips_sender() {
    let dir = tempfile::tempdir().unwrap();
    let (system, _sup) = test_system(&dir).await;

    let alice = agent(&system, "alice").await;
    let bob = agent(&system, "bob").await;
    let carol = agent(&system, "carol").await;

    let topic = system
        .topics
        .get_or_create_topic("broadcast/all", substrate_model::TopicType::Broadcast, None)
        .await
        .unwrap();
    for a in [alice, bob, carol] {
        system.topics.subscribe(a, topic.id).await.unwrap();
    }

    let message = system
        .mail
        .publish(PublishInput {
            thread_id: ThreadId("thread-4".to_string()),
            sender_id: alice,
            topic_name: "broadcast/all".to_string(),
            subject: "announcement".to_string(),
            body: "body".to_string(),
            priority: Priority::Normal,
            deadline: None,
            attachments: None,
            idempotency_key: None,
        })
        .await
        .unwrap();

    assert_eq!(message.log_offset, 1);

    let bob_inbox = system.mail.fetch_inbox(bob, InboxFilter::Inbox, 50).await.unwrap();
    let carol_inbox = system.mail.fetch_inbox(carol, InboxFilter::Inbox, 50).await.unwrap();
    let alice_inbox = system.mail.fetch_inbox(alice, InboxFilter::Inbox, 50).await.unwrap();

    assert_eq!(bob_inbox.len(), 1);
    assert_eq!(carol_inbox.len(), 1);
    assert!(alice_inbox.is_empty(), "sender must not receive its own broadcast");
}

/// S5: Offline replay. A queued write that fails delivery returns to
/// `pending` (never a terminal failure state) so a later drain attempt
/// can retry and succeed.
#[tokio::test]
async fn s5_offline_replay_retries_after_failure() {
    let dir = tempfile::tempdir().unwrap();
    let (system, _sup) = test_system(&dir).await;

    let op = system
        .offline_queue
        .enqueue(
            "queued-send-1".to_string(),
            OperationType::Send,
            b"payload".to_vec(),
            "alice".to_string(),
            None,
            chrono::Utc::now() + chrono::Duration::seconds(60),
        )
        .await
        .unwrap();

    let retried = system
        .offline_queue
        .mark_failed(op.id, "recipient store briefly unavailable".to_string())
        .await
        .unwrap();
    assert_eq!(retried.status, substrate_model::QueueStatus::Pending);
    assert_eq!(retried.attempts, 1);

    let drained = system.offline_queue.drain_batch(10).await.unwrap();
    assert!(drained.iter().any(|row| row.id == op.id));

    system.offline_queue.mark_delivered(op.id).await.unwrap();
}

/// S6: Plan-review blocking. A plan review blocks the requester's
/// `plan_wait` until a decision lands, and a separate review blocks on its
/// own wait until its own timeout elapses with no decision.
#[tokio::test]
async fn s6_plan_review_approval_unblocks_wait() {
    let dir = tempfile::tempdir().unwrap();
    let (system, _sup) = test_system(&dir).await;

    let alice = agent(&system, "alice").await;

    let plan_review = system
        .reviews
        .create_plan_review(ThreadId("thread-6".to_string()), alice, "do the thing".to_string())
        .await
        .unwrap();
    assert_eq!(plan_review.state, PlanReviewState::Pending);

    let review_id = plan_review.review_id;
    let waiter = tokio::spawn({
        let reviews = system.reviews.clone();
        async move {
            substrate_core::api::wait_for_plan_review_decision(&reviews, review_id, Duration::from_secs(5)).await
        }
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    let decided = system.reviews.decide_plan_review(review_id, PlanReviewState::Approved).await.unwrap();
    assert_eq!(decided.state, PlanReviewState::Approved);

    let waited = waiter.await.unwrap().unwrap();
    assert_eq!(waited.state, PlanReviewState::Approved);
}

/// S6 (timeout path): a plan review that never gets decided returns
/// whatever state it was actually in (`Pending`) when the wait's own
/// deadline elapses, rather than erroring.
#[tokio::test]
async fn s6_plan_review_wait_times_out_in_pending_state() {
    let dir = tempfile::tempdir().unwrap();
    let (system, _sup) = test_system(&dir).await;

    let alice = agent(&system, "alice").await;
    let plan_review = system
        .reviews
        .create_plan_review(ThreadId("thread-6b".to_string()), alice, "do another thing".to_string())
        .await
        .unwrap();

    let waited = substrate_core::api::wait_for_plan_review_decision(
        &system.reviews,
        plan_review.review_id,
        Duration::from_millis(100),
    )
    .await
    .unwrap();
    assert_eq!(waited.state, PlanReviewState::Pending);
}

/// Full code-review FSM: Requested -> Claimed -> IterationCompleted(Approve)
/// reaches a terminal approved state and fires one notification per
/// transition (covered indirectly through `apply_event`'s returned state).
#[tokio::test]
async fn full_review_iteration_reaches_approved() {
    let dir = tempfile::tempdir().unwrap();
    let (system, _sup) = test_system(&dir).await;

    let alice = agent(&system, "alice").await;
    let review = system
        .reviews
        .create_review(
            ThreadId("thread-7".to_string()),
            alice,
            Some("feature-branch".to_string()),
            ReviewType::Full,
            ReviewPriority::Normal,
        )
        .await
        .unwrap();

    let review = system
        .reviews
        .apply_event(ReviewOrchestratorEvent::Claimed { review_id: review.review_id })
        .await
        .unwrap();
    assert_eq!(review.state.as_str(), "under_review");

    let review = system
        .reviews
        .apply_event(ReviewOrchestratorEvent::IterationCompleted {
            review_id: review.review_id,
            decision: ReviewDecision::Approve,
        })
        .await
        .unwrap();
    assert_eq!(review.state.as_str(), "approved");
}

/// Long-poll wakes as soon as a matching notification is published,
/// instead of waiting out its full timeout.
#[tokio::test]
async fn long_poll_wakes_on_notification_before_timeout() {
    let dir = tempfile::tempdir().unwrap();
    let (system, _sup) = test_system(&dir).await;

    let alice = agent(&system, "alice").await;
    let bob = agent(&system, "bob").await;

    let waiter = tokio::spawn({
        let mail = system.mail.clone();
        let hub = system.notifications.clone();
        async move { substrate_core::api::long_poll(&mail, &hub, bob, HashMap::new(), Duration::from_secs(10)).await }
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    system
        .mail
        .send_mail(SendMailInput {
            thread_id: ThreadId("thread-8".to_string()),
            sender_id: alice,
            topic_name: None,
            recipients: vec![bob],
            subject: "ping".to_string(),
            body: "body".to_string(),
            priority: Priority::Normal,
            deadline: None,
            attachments: None,
            idempotency_key: None,
        })
        .await
        .unwrap();

    let started = std::time::Instant::now();
    let (messages, _advanced) = waiter.await.unwrap().unwrap();
    assert_eq!(messages.len(), 1);
    assert!(started.elapsed() < Duration::from_secs(5), "long_poll should have woken early");
}
