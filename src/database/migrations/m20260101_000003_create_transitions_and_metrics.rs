use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(IssueTransitions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(IssueTransitions::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(IssueTransitions::IssueId).integer().not_null())
                    .col(ColumnDef::new(IssueTransitions::FromSprintId).integer())
                    .col(ColumnDef::new(IssueTransitions::ToSprintId).integer())
                    .col(ColumnDef::new(IssueTransitions::Status).string().not_null())
                    .col(ColumnDef::new(IssueTransitions::StoryPoints).integer())
                    .col(
                        ColumnDef::new(IssueTransitions::TransitionDate)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(IssueTransitions::Notes).text())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-issue_transitions-issue_id")
                            .from(IssueTransitions::Table, IssueTransitions::IssueId)
                            .to(Issues::Table, Issues::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-issue_transitions-from_sprint_id")
                            .from(IssueTransitions::Table, IssueTransitions::FromSprintId)
                            .to(Sprints::Table, Sprints::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-issue_transitions-to_sprint_id")
                            .from(IssueTransitions::Table, IssueTransitions::ToSprintId)
                            .to(Sprints::Table, Sprints::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SprintMetrics::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SprintMetrics::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SprintMetrics::SprintId).integer().not_null())
                    .col(ColumnDef::new(SprintMetrics::MetricType).string().not_null())
                    .col(ColumnDef::new(SprintMetrics::Value).double().not_null())
                    .col(ColumnDef::new(SprintMetrics::RecordedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(SprintMetrics::AdditionalData).text())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-sprint_metrics-sprint_id")
                            .from(SprintMetrics::Table, SprintMetrics::SprintId)
                            .to(Sprints::Table, Sprints::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ProjectMetrics::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProjectMetrics::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ProjectMetrics::ProjectId).integer().not_null())
                    .col(ColumnDef::new(ProjectMetrics::MetricType).string().not_null())
                    .col(ColumnDef::new(ProjectMetrics::Value).double().not_null())
                    .col(ColumnDef::new(ProjectMetrics::RecordedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(ProjectMetrics::AdditionalData).text())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-project_metrics-project_id")
                            .from(ProjectMetrics::Table, ProjectMetrics::ProjectId)
                            .to(Projects::Table, Projects::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(IssueMetrics::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(IssueMetrics::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(IssueMetrics::IssueId).integer().not_null())
                    .col(ColumnDef::new(IssueMetrics::MetricType).string().not_null())
                    .col(ColumnDef::new(IssueMetrics::Value).double().not_null())
                    .col(ColumnDef::new(IssueMetrics::RecordedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(IssueMetrics::AdditionalData).text())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-issue_metrics-issue_id")
                            .from(IssueMetrics::Table, IssueMetrics::IssueId)
                            .to(Issues::Table, Issues::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-issue_transitions-issue_id")
                    .table(IssueTransitions::Table)
                    .col(IssueTransitions::IssueId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-issue_transitions-sprints")
                    .table(IssueTransitions::Table)
                    .col(IssueTransitions::FromSprintId)
                    .col(IssueTransitions::ToSprintId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-sprint_metrics-sprint_id-type")
                    .table(SprintMetrics::Table)
                    .col(SprintMetrics::SprintId)
                    .col(SprintMetrics::MetricType)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-project_metrics-project_id-type")
                    .table(ProjectMetrics::Table)
                    .col(ProjectMetrics::ProjectId)
                    .col(ProjectMetrics::MetricType)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-issue_metrics-issue_id-type")
                    .table(IssueMetrics::Table)
                    .col(IssueMetrics::IssueId)
                    .col(IssueMetrics::MetricType)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for index in [
            "idx-issue_metrics-issue_id-type",
            "idx-project_metrics-project_id-type",
            "idx-sprint_metrics-sprint_id-type",
            "idx-issue_transitions-sprints",
            "idx-issue_transitions-issue_id",
        ] {
            manager
                .drop_index(Index::drop().name(index).to_owned())
                .await?;
        }

        manager
            .drop_table(Table::drop().table(IssueMetrics::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ProjectMetrics::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SprintMetrics::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(IssueTransitions::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(Iden)]
enum Projects {
    Table,
    Id,
}

#[derive(Iden)]
enum Sprints {
    Table,
    Id,
}

#[derive(Iden)]
enum Issues {
    Table,
    Id,
}

#[derive(Iden)]
enum IssueTransitions {
    Table,
    Id,
    IssueId,
    FromSprintId,
    ToSprintId,
    Status,
    StoryPoints,
    TransitionDate,
    Notes,
}

#[derive(Iden)]
enum SprintMetrics {
    Table,
    Id,
    SprintId,
    MetricType,
    Value,
    RecordedAt,
    AdditionalData,
}

#[derive(Iden)]
enum ProjectMetrics {
    Table,
    Id,
    ProjectId,
    MetricType,
    Value,
    RecordedAt,
    AdditionalData,
}

#[derive(Iden)]
enum IssueMetrics {
    Table,
    Id,
    IssueId,
    MetricType,
    Value,
    RecordedAt,
    AdditionalData,
}
