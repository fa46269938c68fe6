use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::Deserialize;
use tracing::info;

use crate::common::db_errors::DbErrorKind;
use crate::database::entities::{epics, issues, product_backlogs, IssueStatus};
use crate::errors::{CoreError, CoreResult};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEpic {
    pub product_backlog_id: i32,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub status: Option<IssueStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpicPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<IssueStatus>,
}

pub struct EpicService {
    db: DatabaseConnection,
}

impl EpicService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn create_epic(&self, input: CreateEpic) -> CoreResult<epics::Model> {
        let name = validate_name(&input.name)?;

        let txn = self.db.begin().await?;

        let claimed = product_backlogs::Entity::update_many()
            .col_expr(product_backlogs::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(product_backlogs::Column::Id.eq(input.product_backlog_id))
            .exec(&txn)
            .await?;
        if claimed.rows_affected == 0 {
            return Err(CoreError::not_found(
                "ProductBacklog",
                input.product_backlog_id,
            ));
        }

        ensure_name_free(&txn, input.product_backlog_id, &name, None).await?;

        let now = Utc::now();
        let epic = epics::ActiveModel {
            product_backlog_id: Set(input.product_backlog_id),
            name: Set(name.clone()),
            description: Set(input.description),
            status: Set(input.status.unwrap_or(IssueStatus::ToDo).to_string()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| name_taken(e, &name))?;

        txn.commit().await?;
        info!(
            "Created epic {} '{}' in backlog {}",
            epic.id, epic.name, epic.product_backlog_id
        );
        Ok(epic)
    }

    pub async fn get_epic(&self, id: i32) -> CoreResult<epics::Model> {
        epics::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| CoreError::not_found("Epic", id))
    }

    /// Epics of a product backlog, newest first.
    pub async fn get_backlog_epics(&self, backlog_id: i32) -> CoreResult<Vec<epics::Model>> {
        product_backlogs::Entity::find_by_id(backlog_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| CoreError::not_found("ProductBacklog", backlog_id))?;

        Ok(epics::Entity::find()
            .filter(epics::Column::ProductBacklogId.eq(backlog_id))
            .order_by_desc(epics::Column::CreatedAt)
            .order_by_desc(epics::Column::Id)
            .all(&self.db)
            .await?)
    }

    pub async fn update_epic(&self, id: i32, patch: EpicPatch) -> CoreResult<epics::Model> {
        let name = patch.name.as_deref().map(validate_name).transpose()?;

        let txn = self.db.begin().await?;
        let now = Utc::now();

        let claimed = epics::Entity::update_many()
            .col_expr(epics::Column::UpdatedAt, Expr::value(now))
            .filter(epics::Column::Id.eq(id))
            .exec(&txn)
            .await?;
        if claimed.rows_affected == 0 {
            return Err(CoreError::not_found("Epic", id));
        }
        let epic = epics::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| CoreError::not_found("Epic", id))?;

        let backlog_id = epic.product_backlog_id;
        let mut changes: epics::ActiveModel = epic.into();
        if let Some(name) = &name {
            ensure_name_free(&txn, backlog_id, name, Some(id)).await?;
            changes.name = Set(name.clone());
        }
        if let Some(description) = patch.description {
            changes.description = Set(description);
        }
        if let Some(status) = patch.status {
            changes.status = Set(status.to_string());
        }
        changes.updated_at = Set(now);

        let updated = changes.update(&txn).await.map_err(|e| match &name {
            Some(name) => name_taken(e, name),
            None => e.into(),
        })?;

        txn.commit().await?;
        Ok(updated)
    }

    /// Removes the epic. Its issues stay where they are with no epic.
    pub async fn delete_epic(&self, id: i32) -> CoreResult<()> {
        let txn = self.db.begin().await?;
        let now = Utc::now();

        let detached = issues::Entity::update_many()
            .col_expr(issues::Column::EpicId, Expr::value(Option::<i32>::None))
            .col_expr(issues::Column::Version, Expr::col(issues::Column::Version).add(1))
            .col_expr(issues::Column::UpdatedAt, Expr::value(now))
            .filter(issues::Column::EpicId.eq(id))
            .exec(&txn)
            .await?;

        let result = epics::Entity::delete_by_id(id).exec(&txn).await?;
        if result.rows_affected == 0 {
            return Err(CoreError::not_found("Epic", id));
        }

        txn.commit().await?;
        info!(
            "Deleted epic {} and detached {} issues",
            id, detached.rows_affected
        );
        Ok(())
    }
}

fn validate_name(name: &str) -> CoreResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CoreError::validation("Epic name must not be empty"));
    }
    Ok(name.to_string())
}

async fn ensure_name_free<C: ConnectionTrait>(
    conn: &C,
    backlog_id: i32,
    name: &str,
    except: Option<i32>,
) -> CoreResult<()> {
    let mut query = epics::Entity::find()
        .filter(epics::Column::ProductBacklogId.eq(backlog_id))
        .filter(epics::Column::Name.eq(name));
    if let Some(id) = except {
        query = query.filter(epics::Column::Id.ne(id));
    }
    if query.one(conn).await?.is_some() {
        return Err(duplicate_name(name));
    }
    Ok(())
}

fn duplicate_name(name: &str) -> CoreError {
    CoreError::conflict(format!("An epic named '{}' already exists in this backlog", name))
        .with_field("name", name)
}

fn name_taken(err: sea_orm::DbErr, name: &str) -> CoreError {
    if DbErrorKind::from_db_err(&err) == DbErrorKind::UniqueViolation {
        duplicate_name(name).with_source(err)
    } else {
        err.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_trimmed() {
        assert_eq!(validate_name("  Checkout  ").unwrap(), "Checkout");
        assert!(validate_name("   ").is_err());
    }

    #[test]
    fn create_reads_camel_case_json() {
        let input: CreateEpic = serde_json::from_str(
            r#"{"productBacklogId": 4, "name": "Billing", "status": "in-progress"}"#,
        )
        .unwrap();
        assert_eq!(input.product_backlog_id, 4);
        assert_eq!(input.description, "");
        assert_eq!(input.status, Some(IssueStatus::InProgress));
    }
}
