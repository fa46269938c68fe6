pub mod common_types;
pub mod epics;
pub mod issue_metrics;
pub mod issue_transitions;
pub mod issues;
pub mod product_backlogs;
pub mod project_metrics;
pub mod projects;
pub mod sprint_backlogs;
pub mod sprint_metrics;
pub mod sprints;

pub use common_types::*;
