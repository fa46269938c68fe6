use chrono::Utc;
use regex::Regex;
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, EntityTrait, QueryOrder, Set, TransactionTrait,
};
use serde::Deserialize;
use std::sync::OnceLock;
use tracing::info;

use crate::common::db_errors::DbErrorKind;
use crate::database::entities::{product_backlogs, projects};
use crate::errors::{CoreError, CoreResult};

fn project_key_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Z0-9]{2,10}$").expect("valid project key regex"))
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProject {
    pub name: String,
    pub key: String,
    pub description: Option<String>,
}

pub struct ProjectService {
    db: DatabaseConnection,
}

impl ProjectService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates the project together with its product backlog.
    pub async fn create_project(
        &self,
        input: CreateProject,
    ) -> CoreResult<(projects::Model, product_backlogs::Model)> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(CoreError::validation("Project name must not be empty"));
        }
        if !project_key_pattern().is_match(&input.key) {
            return Err(CoreError::validation(
                "Project key must be 2-10 uppercase letters or digits",
            )
            .with_field("key", &input.key));
        }

        let txn = self.db.begin().await?;

        let now = Utc::now();
        let key = input.key;
        let project = projects::ActiveModel {
            name: Set(name),
            key: Set(key.clone()),
            description: Set(input.description),
            next_issue_number: Set(1),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| {
            if DbErrorKind::from_db_err(&e) == DbErrorKind::UniqueViolation {
                CoreError::conflict(format!("Project key {} is already in use", key))
                    .with_field("key", &key)
                    .with_source(e)
            } else {
                e.into()
            }
        })?;

        let backlog = product_backlogs::ActiveModel {
            project_id: Set(project.id),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        info!(
            "Created project {} ({}) with backlog {}",
            project.id, project.key, backlog.id
        );
        Ok((project, backlog))
    }

    pub async fn get_project(&self, id: i32) -> CoreResult<projects::Model> {
        projects::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| CoreError::not_found("Project", id))
    }

    pub async fn list_projects(&self) -> CoreResult<Vec<projects::Model>> {
        Ok(projects::Entity::find()
            .order_by_asc(projects::Column::Id)
            .all(&self.db)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_keys() {
        assert!(project_key_pattern().is_match("ABC"));
        assert!(project_key_pattern().is_match("OPS2"));
        assert!(!project_key_pattern().is_match("A"));
        assert!(!project_key_pattern().is_match("abc"));
        assert!(!project_key_pattern().is_match("ABCDEFGHIJK"));
    }
}
