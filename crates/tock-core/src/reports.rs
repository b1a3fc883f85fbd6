//! Time totals over completed entries, grouped by project, task or day.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{Project, ProjectId, Task, TaskId, TimeEntry};
use crate::Error;

const UNKNOWN: &str = "(unknown)";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GroupBy {
    #[default]
    Project,
    Task,
    /// UTC calendar day of the entry start
    Day,
}

impl FromStr for GroupBy {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "project" => Ok(Self::Project),
            "task" => Ok(Self::Task),
            "day" => Ok(Self::Day),
            other => Err(Error::InvalidInput(format!(
                "unknown grouping '{other}', expected project, task or day"
            ))),
        }
    }
}

impl fmt::Display for GroupBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Project => "project",
            Self::Task => "task",
            Self::Day => "day",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRow {
    /// Project id, task id or `YYYY-MM-DD`
    pub key: String,
    pub label: String,
    /// Owning project name for task rows
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    pub total_minutes: i64,
    pub entries: usize,
}

/// Sum completed entries into report rows.
///
/// Running entries are ignored. Each entry contributes its duration in
/// whole minutes, matching the server report. Day rows are in date order,
/// the others by descending total.
pub fn summarize(
    entries: &[TimeEntry],
    projects: &[Project],
    tasks: &[Task],
    group_by: GroupBy,
) -> Vec<ReportRow> {
    let project_names: HashMap<ProjectId, &str> = projects
        .iter()
        .map(|project| (project.id, project.name.as_str()))
        .collect();
    let task_names: HashMap<TaskId, &str> = tasks
        .iter()
        .map(|task| (task.id, task.name.as_str()))
        .collect();

    let mut rows: BTreeMap<String, ReportRow> = BTreeMap::new();
    for entry in entries {
        let Some(duration_ms) = entry.duration_ms() else {
            continue;
        };
        let project_name = project_names
            .get(&entry.project_id)
            .copied()
            .unwrap_or(UNKNOWN);
        let (key, label, owner) = match group_by {
            GroupBy::Project => (entry.project_id.as_str(), project_name.to_string(), None),
            GroupBy::Task => (
                entry.task_id.as_str(),
                task_names
                    .get(&entry.task_id)
                    .copied()
                    .unwrap_or(UNKNOWN)
                    .to_string(),
                Some(project_name.to_string()),
            ),
            GroupBy::Day => {
                let day = utc_day(entry.start_time);
                (day.clone(), day, None)
            }
        };
        let row = rows.entry(key.clone()).or_insert_with(|| ReportRow {
            key,
            label,
            project_name: owner,
            total_minutes: 0,
            entries: 0,
        });
        row.total_minutes += duration_ms / 60_000;
        row.entries += 1;
    }

    let mut rows: Vec<ReportRow> = rows.into_values().collect();
    if group_by != GroupBy::Day {
        rows.sort_by(|a, b| {
            b.total_minutes
                .cmp(&a.total_minutes)
                .then_with(|| a.label.cmp(&b.label))
        });
    }
    rows
}

fn utc_day(timestamp_ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(timestamp_ms)
        .unwrap_or_default()
        .format("%Y-%m-%d")
        .to_string()
}
