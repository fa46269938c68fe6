//! Errors raised while verifying users against the external directory.

use thiserror::Error;

use super::CoreError;

#[derive(Error, Debug)]
pub enum UserDirectoryError {
    /// The directory did not answer within the configured timeout
    #[error("User lookup timed out after {0} ms")]
    Timeout(u64),

    /// The request never produced a response
    #[error("User directory request failed: {0}")]
    Transport(String),

    /// The directory answered with something other than found / not found
    #[error("User directory returned unexpected status {0}")]
    UnexpectedStatus(u16),

    /// The user id is not known to the directory
    #[error("User {0} not found")]
    UnknownUser(String),
}

impl From<UserDirectoryError> for CoreError {
    fn from(err: UserDirectoryError) -> Self {
        let message = err.to_string();
        match &err {
            UserDirectoryError::UnknownUser(id) => {
                let id = id.clone();
                CoreError::not_found("User", id).with_source(err)
            }
            _ => CoreError::unavailable(message).with_source(err),
        }
    }
}
