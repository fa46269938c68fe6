pub mod backlogs;
pub mod epics;
pub mod health;
pub mod issues;
pub mod metrics;
pub mod projects;
pub mod sprints;
