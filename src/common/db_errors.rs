//! Database error categorisation
//!
//! Sorts `sea_orm::DbErr` values into a handful of kinds so services can turn
//! storage failures into the right `CoreError` without string matching at
//! every call site.
//!
//! ```
//! use sprintline::common::db_errors::DbErrorKind;
//! use sea_orm::DbErr;
//!
//! let err = DbErr::RecordNotFound("sprint".to_string());
//! assert_eq!(DbErrorKind::from_db_err(&err), DbErrorKind::NotFound);
//! ```

use sea_orm::{DbErr, SqlErr};

/// Categories of database errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbErrorKind {
    /// Query returned no results where one was required
    NotFound,

    /// Unique constraint violation
    UniqueViolation,

    /// Foreign key constraint violation
    ForeignKeyViolation,

    /// Database connection error
    ConnectionError,

    /// Query or pool acquisition timeout
    Timeout,

    /// Busy or locked database: another writer holds the lock
    Deadlock,

    /// Anything else
    Unknown,
}

impl DbErrorKind {
    pub fn from_db_err(err: &DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => return Self::UniqueViolation,
            Some(SqlErr::ForeignKeyConstraintViolation(_)) => return Self::ForeignKeyViolation,
            _ => {}
        }

        match err {
            DbErr::RecordNotFound(_) => Self::NotFound,
            DbErr::Conn(msg) if is_lock_message(&msg.to_string()) => Self::Deadlock,
            DbErr::Conn(msg) if msg.to_string().to_lowercase().contains("timeout") => {
                Self::Timeout
            }
            DbErr::Conn(_) | DbErr::ConnectionAcquire(_) => Self::ConnectionError,
            DbErr::Exec(msg) | DbErr::Query(msg) => {
                let msg_lower = msg.to_string().to_lowercase();
                if msg_lower.contains("unique") || msg_lower.contains("duplicate") {
                    Self::UniqueViolation
                } else if msg_lower.contains("foreign key") {
                    Self::ForeignKeyViolation
                } else if is_lock_message(&msg_lower) {
                    Self::Deadlock
                } else if msg_lower.contains("timeout") {
                    Self::Timeout
                } else {
                    Self::Unknown
                }
            }
            _ => Self::Unknown,
        }
    }
}

/// `SQLITE_BUSY` reads "database is locked", `SQLITE_LOCKED` "database table
/// is locked".
fn is_lock_message(msg: &str) -> bool {
    let msg = msg.to_lowercase();
    msg.contains("database is locked")
        || msg.contains("database table is locked")
        || msg.contains("deadlock")
}
