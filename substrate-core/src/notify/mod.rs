//! Real-time notification fan-out hub (spec §4.4).

pub mod hub;

pub use hub::{NotificationHubHandle, SubscriberId, SUBSCRIBER_CHANNEL_CAPACITY};
