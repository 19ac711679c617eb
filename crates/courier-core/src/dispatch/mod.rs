//! Campaign dispatch - lifecycle orchestration and the bulk send pass

mod bulk_sender;
mod orchestrator;
mod sender;

pub use bulk_sender::{BulkSender, SendFailure, SendReport};
pub use orchestrator::{DispatchOrchestrator, DispatchRequest, DispatchResult};
pub use sender::{CampaignSender, DirectSender, DispatchOutcome, QueuedSender};

use thiserror::Error;

/// Dispatch errors
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Campaign not found")]
    NotFound,

    #[error("Campaign has already been sent")]
    AlreadySent,

    #[error("Campaign is in a terminal state")]
    Terminal,

    #[error("Invalid recipient list: {0}")]
    InvalidRecipients(String),

    #[error("Campaign was modified concurrently")]
    Conflict,

    #[error("Queue hand-off failed: {0}")]
    Queue(String),

    #[error("Storage error: {0}")]
    Storage(#[from] courier_common::Error),
}
