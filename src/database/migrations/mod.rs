use sea_orm_migration::prelude::*;

mod m20260101_000001_create_projects_and_backlogs;
mod m20260101_000002_create_sprints_epics_and_issues;
mod m20260101_000003_create_transitions_and_metrics;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260101_000001_create_projects_and_backlogs::Migration),
            Box::new(m20260101_000002_create_sprints_epics_and_issues::Migration),
            Box::new(m20260101_000003_create_transitions_and_metrics::Migration),
        ]
    }
}
