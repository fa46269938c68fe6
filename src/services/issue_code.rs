//! Per-project issue code sequence (`ABC-1`, `ABC-2`, ...).

use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QuerySelect};
use tracing::debug;

use crate::database::entities::{issues, projects};
use crate::errors::{CoreError, CoreResult};

/// Numeric suffix of `code` when it carries the `{key}-` prefix.
pub fn parse_code_number(key: &str, code: &str) -> Option<i32> {
    code.strip_prefix(key)?
        .strip_prefix('-')?
        .parse::<i32>()
        .ok()
        .filter(|n| *n > 0)
}

pub fn format_code(key: &str, number: i32) -> String {
    format!("{}-{}", key, number)
}

/// Reserves the next code for `project_id`.
///
/// Reads the project's counter, takes the larger of it and one past the
/// highest code ever issued (deleted issues included), and advances the
/// counter with a compare-and-set. A lost race surfaces as a conflict so the
/// caller can retry its transaction.
pub async fn next_issue_code<C: ConnectionTrait>(conn: &C, project_id: i32) -> CoreResult<String> {
    let project = projects::Entity::find_by_id(project_id)
        .one(conn)
        .await?
        .ok_or_else(|| CoreError::not_found("Project", project_id))?;

    let prefix = format!("{}-", project.key);
    let codes: Vec<String> = issues::Entity::find()
        .select_only()
        .column(issues::Column::Code)
        .filter(issues::Column::ProjectId.eq(project_id))
        .filter(issues::Column::Code.starts_with(&prefix))
        .into_tuple()
        .all(conn)
        .await?;

    let highest = codes
        .iter()
        .filter_map(|code| parse_code_number(&project.key, code))
        .max()
        .unwrap_or(0);
    let number = project.next_issue_number.max(highest + 1);

    let result = projects::Entity::update_many()
        .col_expr(projects::Column::NextIssueNumber, Expr::value(number + 1))
        .filter(projects::Column::Id.eq(project_id))
        .filter(projects::Column::NextIssueNumber.eq(project.next_issue_number))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        return Err(CoreError::conflict(format!(
            "Issue sequence for project {} changed concurrently",
            project.key
        )));
    }

    let code = format_code(&project.key, number);
    debug!("Reserved issue code {}", code);
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_numeric_suffix() {
        assert_eq!(parse_code_number("ABC", "ABC-17"), Some(17));
        assert_eq!(parse_code_number("ABC", "ABC-0"), None);
        assert_eq!(parse_code_number("ABC", "ABCD-3"), None);
        assert_eq!(parse_code_number("ABC", "XYZ-3"), None);
        assert_eq!(parse_code_number("ABC", "ABC-x"), None);
    }

    #[test]
    fn formats_codes() {
        assert_eq!(format_code("OPS", 4), "OPS-4");
    }
}
