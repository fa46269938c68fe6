//! Error types shared by every service.
//!
//! All operations return [`CoreResult`]. The kind of a [`CoreError`] decides how
//! callers react:
//!
//! - **NotFound**: a referenced issue, sprint, backlog or project does not exist
//!   (soft-deleted issues count as missing)
//! - **Conflict**: the change would break a state invariant (duplicate
//!   membership, sprint already started, issue owned by another open sprint,
//!   concurrent writer won the race)
//! - **PreconditionFailed**: the entities are valid but a business rule blocks
//!   the transition, such as moving work out of a started sprint
//! - **Validation**: malformed input
//! - **Unavailable**: an external collaborator or the database did not answer
//! - **Internal**: anything unexpected; details stay in the logs
//!
//! ```rust
//! use sprintline::errors::{CoreError, CoreErrorKind};
//!
//! let err = CoreError::conflict("Sprint 3 is already started");
//! assert_eq!(err.kind(), CoreErrorKind::Conflict);
//! ```

mod core_error;
mod user_directory;

pub use core_error::{CoreError, CoreErrorKind};
pub use user_directory::UserDirectoryError;

/// Result type alias used across services
pub type CoreResult<T> = Result<T, CoreError>;
