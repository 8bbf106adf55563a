//! Thin async adapters over the Mail/Notification/Review services (spec
//! §4.8). Not wire implementations — `substrate-server` adapts these to
//! RPC/REST/stdio.

mod decision;
mod long_poll;
mod stream;

pub use decision::{wait_for_plan_review_decision, wait_for_review_decision};
pub use long_poll::long_poll;
pub use stream::{subscribe_stream, NotificationStream};
