use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::fmt;

use sea_orm::DbErr;

use crate::common::db_errors::DbErrorKind;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CoreErrorKind {
    NotFound,
    Validation,
    Conflict,
    PreconditionFailed,
    Unavailable,
    Internal,
}

impl CoreErrorKind {
    /// Stable machine-readable code used in API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound => "NOT_FOUND",
            Self::Validation => "VALIDATION_FAILED",
            Self::Conflict => "CONFLICT",
            Self::PreconditionFailed => "PRECONDITION_FAILED",
            Self::Unavailable => "SERVICE_UNAVAILABLE",
            Self::Internal => "INTERNAL_ERROR",
        }
    }

    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::NotFound => 404,
            Self::Validation => 400,
            Self::Conflict => 409,
            Self::PreconditionFailed => 412,
            Self::Unavailable => 503,
            Self::Internal => 500,
        }
    }
}

#[derive(Debug)]
pub struct CoreError {
    kind: CoreErrorKind,
    message: String,
    fields: Option<BTreeMap<String, String>>,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl CoreError {
    pub fn new(kind: CoreErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            fields: None,
            source: None,
        }
    }

    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        let entity = entity.into();
        let id = id.to_string();
        let mut fields = BTreeMap::new();
        fields.insert("entity".to_string(), entity.clone());
        fields.insert("id".to_string(), id.clone());

        Self {
            kind: CoreErrorKind::NotFound,
            message: format!("{} {} not found", entity, id),
            fields: Some(fields),
            source: None,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(CoreErrorKind::Validation, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(CoreErrorKind::Conflict, message)
    }

    pub fn precondition_failed(message: impl Into<String>) -> Self {
        Self::new(CoreErrorKind::PreconditionFailed, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(CoreErrorKind::Unavailable, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(CoreErrorKind::Internal, message)
    }

    pub fn with_fields(mut self, fields: BTreeMap<String, String>) -> Self {
        self.fields = Some(fields);
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.fields
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.to_string());
        self
    }

    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn kind(&self) -> CoreErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn fields(&self) -> Option<&BTreeMap<String, String>> {
        self.fields.as_ref()
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == CoreErrorKind::NotFound
    }

    pub fn is_conflict(&self) -> bool {
        self.kind == CoreErrorKind::Conflict
    }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl StdError for CoreError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|source| source.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<anyhow::Error> for CoreError {
    fn from(err: anyhow::Error) -> Self {
        let boxed: Box<dyn StdError + Send + Sync> = err.into();
        Self {
            kind: CoreErrorKind::Internal,
            message: "Unhandled error".to_string(),
            fields: None,
            source: Some(boxed),
        }
    }
}

impl From<DbErr> for CoreError {
    fn from(err: DbErr) -> Self {
        match DbErrorKind::from_db_err(&err) {
            DbErrorKind::NotFound => CoreError::new(CoreErrorKind::NotFound, "Record not found")
                .with_source(err),
            DbErrorKind::UniqueViolation => {
                CoreError::conflict("Record conflicts with an existing one").with_source(err)
            }
            DbErrorKind::ForeignKeyViolation => {
                CoreError::validation("Record references a missing entity").with_source(err)
            }
            DbErrorKind::Deadlock => {
                CoreError::conflict("Another write to the same data is in progress")
                    .with_source(err)
            }
            DbErrorKind::ConnectionError | DbErrorKind::Timeout => {
                CoreError::unavailable("Database temporarily unavailable").with_source(err)
            }
            DbErrorKind::Unknown => CoreError::internal("Database error").with_source(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_carries_entity_and_id() {
        let err = CoreError::not_found("Sprint", 7);
        assert_eq!(err.kind(), CoreErrorKind::NotFound);
        assert_eq!(err.message(), "Sprint 7 not found");
        let fields = err.fields().unwrap();
        assert_eq!(fields.get("entity").map(String::as_str), Some("Sprint"));
        assert_eq!(fields.get("id").map(String::as_str), Some("7"));
    }

    #[test]
    fn unique_violation_maps_to_conflict() {
        let err: CoreError =
            DbErr::Exec(sea_orm::RuntimeErr::Internal("UNIQUE constraint failed: issues.code".into()))
                .into();
        assert_eq!(err.kind(), CoreErrorKind::Conflict);
        assert!(err.source().is_some());
    }

    #[test]
    fn busy_database_maps_to_conflict() {
        let err: CoreError =
            DbErr::Exec(sea_orm::RuntimeErr::Internal("database is locked".into())).into();
        assert_eq!(err.kind(), CoreErrorKind::Conflict);

        let err: CoreError = DbErr::ConnectionAcquire(sea_orm::ConnAcquireErr::Timeout).into();
        assert_eq!(err.kind(), CoreErrorKind::Unavailable);
    }

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(CoreErrorKind::NotFound.http_status_code(), 404);
        assert_eq!(CoreErrorKind::Conflict.http_status_code(), 409);
        assert_eq!(CoreErrorKind::PreconditionFailed.http_status_code(), 412);
        assert_eq!(CoreErrorKind::Internal.code(), "INTERNAL_ERROR");
    }
}
