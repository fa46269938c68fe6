//! Issue lifecycle and sprint transition engine for Scrum/Kanban boards.
//!
//! Issues live in exactly one place at a time: unassigned, a project's
//! product backlog, or a sprint. The [`services::LifecycleService`] moves them
//! between places and drives sprints through not-started, started and
//! finished, carrying unfinished work into a successor sprint. Velocity,
//! completion rate, duration and burndown figures are derived from the same
//! issue sets.

pub mod app_context;
pub mod common;
pub mod config;
pub mod database;
pub mod errors;
pub mod services;

#[cfg(feature = "server")]
pub mod server;
