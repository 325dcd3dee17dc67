//! Client-side review-intelligence workflow: discover listings, pick one per
//! store, run review extraction and analysis, then chat about the selection.

pub mod backend;
pub mod chat;
pub mod config;
pub mod error;
pub mod reducer;
pub mod workflow;

pub use backend::{HttpBackend, MissingBackend, ReviewBackend};
pub use chat::ChatTurn;
pub use config::{load_settings, ClientSettings, ConfigError};
pub use error::ClientError;
pub use reducer::{reduce, WorkflowEvent, WorkflowState};
pub use workflow::{ContractRevision, WorkflowController};
