//! Enumerations and field types shared by every entity.
//!
//! `Status` and `Priority` are closed sets: anything outside them fails to parse
//! rather than being carried around as a stray string.

use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while parsing closed enumerations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("unknown status '{0}' (expected todo, in_progress or completed)")]
    UnknownStatus(String),
    #[error("unknown priority '{0}' (expected low, medium, high or critical)")]
    UnknownPriority(String),
}

/// Completion status.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Todo,
    InProgress,
    Completed,
}

impl Status {
    pub const ALL: [Status; 3] = [Status::Todo, Status::InProgress, Status::Completed];

    /// Stored wire value.
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Todo => "todo",
            Status::InProgress => "in_progress",
            Status::Completed => "completed",
        }
    }

    /// Presentation label. Only display layers should use this.
    pub fn label(self) -> &'static str {
        match self {
            Status::Todo => "Todo",
            Status::InProgress => "In Progress",
            Status::Completed => "Completed",
        }
    }

    /// Accepts the wire value as well as the display spellings a user might type
    /// ("In Progress", "in-progress").
    pub fn parse_lenient(s: &str) -> Result<Status, FieldError> {
        match s.trim().to_lowercase().as_str() {
            "todo" => Ok(Status::Todo),
            "in_progress" | "in progress" | "in-progress" => Ok(Status::InProgress),
            "completed" => Ok(Status::Completed),
            _ => Err(FieldError::UnknownStatus(s.to_string())),
        }
    }
}

impl FromStr for Status {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Status::ALL
            .into_iter()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| FieldError::UnknownStatus(s.to_string()))
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Priority classification for projects and objectives.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Priority {
    pub const ALL: [Priority; 4] = [
        Priority::Low,
        Priority::Medium,
        Priority::High,
        Priority::Critical,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Critical => "critical",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
            Priority::Critical => "Critical",
        }
    }

    /// High and critical items count as "high priority" on the dashboard.
    pub fn is_high(self) -> bool {
        matches!(self, Priority::High | Priority::Critical)
    }
}

impl FromStr for Priority {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Priority::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| FieldError::UnknownPriority(s.to_string()))
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three entity types the dashboard manages.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Task,
    Project,
    Objective,
}

impl EntityKind {
    pub const ALL: [EntityKind; 3] = [EntityKind::Task, EntityKind::Project, EntityKind::Objective];

    /// Path segment and SQL table name: `tasks`, `projects`, `objectives`.
    pub fn collection(self) -> &'static str {
        match self {
            EntityKind::Task => "tasks",
            EntityKind::Project => "projects",
            EntityKind::Objective => "objectives",
        }
    }

    /// Singular lowercase noun, used in messages ("Failed to add task").
    pub fn noun(self) -> &'static str {
        match self {
            EntityKind::Task => "task",
            EntityKind::Project => "project",
            EntityKind::Objective => "objective",
        }
    }

    /// Section heading.
    pub fn title(self) -> &'static str {
        match self {
            EntityKind::Task => "Tasks",
            EntityKind::Project => "Projects",
            EntityKind::Objective => "Objectives",
        }
    }
}

/// How the server treats DELETE of an id it does not hold.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeletePolicy {
    /// Missing ids delete silently (204).
    #[default]
    Idempotent,
    /// Missing ids are reported as not found (404).
    Strict,
}
