use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Sprints::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Sprints::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Sprints::ProjectId).integer().not_null())
                    .col(ColumnDef::new(Sprints::Name).string().not_null())
                    .col(ColumnDef::new(Sprints::Goal).text().not_null())
                    .col(ColumnDef::new(Sprints::IsStarted).boolean().not_null().default(false))
                    .col(ColumnDef::new(Sprints::IsFinished).boolean().not_null().default(false))
                    .col(ColumnDef::new(Sprints::StartedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Sprints::FinishedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Sprints::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Sprints::UpdatedAt).timestamp_with_time_zone().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-sprints-project_id")
                            .from(Sprints::Table, Sprints::ProjectId)
                            .to(Projects::Table, Projects::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One sprint backlog per sprint; lazy creation relies on this index
        manager
            .create_table(
                Table::create()
                    .table(SprintBacklogs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SprintBacklogs::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(SprintBacklogs::SprintId)
                            .integer()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(SprintBacklogs::ProjectId).integer().not_null())
                    .col(ColumnDef::new(SprintBacklogs::CreatedAt).timestamp_with_time_zone().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-sprint_backlogs-sprint_id")
                            .from(SprintBacklogs::Table, SprintBacklogs::SprintId)
                            .to(Sprints::Table, Sprints::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Epic names are unique within a product backlog
        manager
            .create_table(
                Table::create()
                    .table(Epics::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Epics::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Epics::ProductBacklogId).integer().not_null())
                    .col(ColumnDef::new(Epics::Name).string().not_null())
                    .col(ColumnDef::new(Epics::Description).text().not_null())
                    .col(ColumnDef::new(Epics::Status).string().not_null().default("to-do"))
                    .col(ColumnDef::new(Epics::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Epics::UpdatedAt).timestamp_with_time_zone().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-epics-product_backlog_id")
                            .from(Epics::Table, Epics::ProductBacklogId)
                            .to(ProductBacklogs::Table, ProductBacklogs::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-epics-product_backlog_id-name")
                    .table(Epics::Table)
                    .col(Epics::ProductBacklogId)
                    .col(Epics::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Issues::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Issues::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Issues::ProjectId).integer().not_null())
                    .col(ColumnDef::new(Issues::Code).string().not_null())
                    .col(ColumnDef::new(Issues::Title).string().not_null())
                    .col(ColumnDef::new(Issues::Description).text().not_null())
                    .col(ColumnDef::new(Issues::Status).string().not_null().default("to-do"))
                    .col(ColumnDef::new(Issues::IssueType).string().not_null().default("task"))
                    .col(ColumnDef::new(Issues::Priority).string().not_null().default("medium"))
                    .col(ColumnDef::new(Issues::StoryPoints).integer())
                    .col(ColumnDef::new(Issues::AcceptanceCriteria).text())
                    .col(ColumnDef::new(Issues::CreatedBy).string().not_null())
                    .col(ColumnDef::new(Issues::AssignedTo).string())
                    .col(ColumnDef::new(Issues::InBacklog).boolean().not_null().default(false))
                    .col(ColumnDef::new(Issues::InSprint).boolean().not_null().default(false))
                    .col(ColumnDef::new(Issues::ProductBacklogId).integer())
                    .col(ColumnDef::new(Issues::SprintId).integer())
                    .col(ColumnDef::new(Issues::SprintBacklogId).integer())
                    .col(ColumnDef::new(Issues::EpicId).integer())
                    .col(ColumnDef::new(Issues::DeletedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Issues::Version).integer().not_null().default(1))
                    .col(ColumnDef::new(Issues::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Issues::UpdatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Issues::ResolvedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-issues-project_id")
                            .from(Issues::Table, Issues::ProjectId)
                            .to(Projects::Table, Projects::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-issues-product_backlog_id")
                            .from(Issues::Table, Issues::ProductBacklogId)
                            .to(ProductBacklogs::Table, ProductBacklogs::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-issues-sprint_id")
                            .from(Issues::Table, Issues::SprintId)
                            .to(Sprints::Table, Sprints::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-issues-sprint_backlog_id")
                            .from(Issues::Table, Issues::SprintBacklogId)
                            .to(SprintBacklogs::Table, SprintBacklogs::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-issues-epic_id")
                            .from(Issues::Table, Issues::EpicId)
                            .to(Epics::Table, Epics::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-issues-project_id-code")
                    .table(Issues::Table)
                    .col(Issues::ProjectId)
                    .col(Issues::Code)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-issues-product_backlog_id")
                    .table(Issues::Table)
                    .col(Issues::ProductBacklogId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-issues-sprint_id")
                    .table(Issues::Table)
                    .col(Issues::SprintId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-sprints-project_id")
                    .table(Sprints::Table)
                    .col(Sprints::ProjectId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx-sprints-project_id").to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx-issues-sprint_id").to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx-issues-product_backlog_id").to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx-issues-project_id-code").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Issues::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx-epics-product_backlog_id-name").to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Epics::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SprintBacklogs::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Sprints::Table).to_owned())
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
enum ProductBacklogs {
    Table,
    Id,
}

#[derive(Iden)]
enum Sprints {
    Table,
    Id,
    ProjectId,
    Name,
    Goal,
    IsStarted,
    IsFinished,
    StartedAt,
    FinishedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum SprintBacklogs {
    Table,
    Id,
    SprintId,
    ProjectId,
    CreatedAt,
}

#[derive(Iden)]
enum Epics {
    Table,
    Id,
    ProductBacklogId,
    Name,
    Description,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Issues {
    Table,
    Id,
    ProjectId,
    Code,
    Title,
    Description,
    Status,
    IssueType,
    Priority,
    StoryPoints,
    AcceptanceCriteria,
    CreatedBy,
    AssignedTo,
    InBacklog,
    InSprint,
    ProductBacklogId,
    SprintId,
    SprintBacklogId,
    EpicId,
    DeletedAt,
    Version,
    CreatedAt,
    UpdatedAt,
    ResolvedAt,
}
