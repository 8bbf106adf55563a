//! Mail service: the single mutable path into message storage, plus its
//! background sweepers (spec §4.3).

mod service;
mod sweeper;

pub use service::{
    MailRequest, MailResponse, MailService, MailServiceHandle, PublishInput, SendMailInput,
};
pub use sweeper::{spawn_retention_sweeper, spawn_snooze_sweeper};
