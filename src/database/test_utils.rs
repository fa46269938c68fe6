use sea_orm::{Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;

/// In-memory SQLite database with the full schema applied.
///
/// The in-memory URL gives every pooled connection its own database, so the
/// pool is pinned to a single connection.
pub async fn setup_test_db() -> Result<DatabaseConnection, DbErr> {
    let mut opt = sea_orm::ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1).min_connections(1).sqlx_logging(false);

    let db = Database::connect(opt).await?;
    crate::database::migrations::Migrator::up(&db, None).await?;

    Ok(db)
}
