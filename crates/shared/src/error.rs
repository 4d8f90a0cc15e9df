use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Conditions that end an edit session before it ever reaches EDITING.
///
/// These are terminal for the session and not retryable from inside the
/// editor; re-opening the editor is the caller's recourse.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FatalSessionError {
    #[error("no writable accounts available for group creation")]
    NoWritableAccounts,
    #[error("group {0} not found or deleted")]
    GroupNotFound(i64),
}
