pub mod burndown;
pub mod epic_service;
pub mod issue_code;
pub mod issue_service;
pub mod lifecycle_service;
pub mod metrics_service;
pub mod product_backlog_service;
pub mod project_service;
pub mod sprint_service;
pub mod user_directory;

pub use epic_service::EpicService;
pub use issue_service::IssueService;
pub use lifecycle_service::LifecycleService;
pub use metrics_service::MetricsService;
pub use product_backlog_service::ProductBacklogService;
pub use project_service::ProjectService;
pub use sprint_service::SprintService;
pub use user_directory::{AllowAllUsers, HttpUserDirectory, StaticUserDirectory, UserDirectory};
