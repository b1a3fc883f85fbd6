use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::Serialize;
use tock_core::config::{default_config_path, default_db_path, ClientConfig};
use tock_core::models::{Project, ProjectId, Task, TaskId, TimeEntry};
use tock_core::remote::HttpRemoteService;
use tock_core::reports::ReportRow;
use tock_core::sync::{ConnectivityFlag, SyncEngine, SyncOutcome, SyncTrigger};
use tock_core::timer::{format_duration, TimerController};
use tock_core::LocalStore;

use crate::error::CliError;

const SHORT_ID_LEN: usize = 13;

/// Everything a command needs: the opened store, config, and an optional remote
pub struct AppContext {
    pub store: LocalStore,
    pub config: ClientConfig,
    pub connectivity: ConnectivityFlag,
    remote: Option<HttpRemoteService>,
    auto_sync: bool,
}

impl AppContext {
    pub async fn open(
        db_path: &Path,
        config: ClientConfig,
        offline: bool,
        no_sync: bool,
    ) -> Result<Self, CliError> {
        let store = LocalStore::open_path(db_path).await?;
        let remote = match config.api_endpoint() {
            Some(url) => Some(HttpRemoteService::new(url, config.request_timeout())?),
            None => None,
        };
        let connectivity = ConnectivityFlag::new(!(offline || config.offline));
        let auto_sync = config.auto_sync && !no_sync;
        Ok(Self {
            store,
            config,
            connectivity,
            remote,
            auto_sync,
        })
    }

    pub fn engine(&self) -> Result<SyncEngine<HttpRemoteService, ConnectivityFlag>, CliError> {
        let remote = self.remote.clone().ok_or(CliError::RemoteNotConfigured)?;
        Ok(SyncEngine::new(
            self.store.clone(),
            remote,
            self.connectivity.clone(),
        ))
    }

    pub fn timer(&self) -> Result<TimerController<HttpRemoteService, ConnectivityFlag>, CliError> {
        let remote = self.remote.clone().ok_or(CliError::RemoteNotConfigured)?;
        Ok(TimerController::new(
            self.store.clone(),
            remote,
            self.connectivity.clone(),
        ))
    }

    /// Best-effort sync after a local change; silent when no server is set
    pub async fn sync_after_change(&self) -> Result<(), CliError> {
        if !self.auto_sync || self.remote.is_none() {
            return Ok(());
        }
        match self.engine()?.sync(SyncTrigger::LocalMutation).await? {
            SyncOutcome::Completed(summary) if !summary.push.is_clean() => {
                tracing::warn!("Changes saved locally; some could not reach the server");
            }
            SyncOutcome::Offline => tracing::debug!("Offline, changes kept locally"),
            _ => {}
        }
        Ok(())
    }
}

pub fn resolve_config_path(cli_config: Option<PathBuf>) -> Result<PathBuf, CliError> {
    cli_config
        .or_else(|| std::env::var_os("TOCK_CONFIG").map(PathBuf::from))
        .or_else(default_config_path)
        .ok_or(CliError::NoDefaultDir("config"))
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> Result<PathBuf, CliError> {
    cli_db_path
        .or_else(|| std::env::var_os("TOCK_DB_PATH").map(PathBuf::from))
        .or_else(default_db_path)
        .ok_or(CliError::NoDefaultDir("data"))
}

pub fn normalize_identifier(id: &str, kind: &'static str) -> Result<String, CliError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyId { kind })
    } else {
        Ok(trimmed.to_ascii_lowercase())
    }
}

/// Pick the single item whose id equals or starts with `query`
pub fn resolve_by_prefix<T: Clone>(
    query: &str,
    kind: &'static str,
    items: &[T],
    id_of: impl Fn(&T) -> String,
) -> Result<T, CliError> {
    let query = normalize_identifier(query, kind)?;
    if let Some(exact) = items.iter().find(|item| id_of(*item) == query) {
        return Ok(exact.clone());
    }

    let matches: Vec<&T> = items
        .iter()
        .filter(|item| id_of(*item).starts_with(&query))
        .collect();
    match matches.as_slice() {
        [] => Err(CliError::NotFound { kind, query }),
        [only] => Ok((*only).clone()),
        many => {
            let options = many
                .iter()
                .take(3)
                .map(|item| short_id(&id_of(*item)))
                .collect::<Vec<_>>()
                .join(", ");
            Err(CliError::AmbiguousId(format!(
                "{kind} ID prefix '{query}' is ambiguous; matches: {options}"
            )))
        }
    }
}

pub async fn resolve_project(store: &LocalStore, query: &str) -> Result<Project, CliError> {
    let projects = store.list_projects().await?;
    resolve_by_prefix(query, "Project", &projects, |project| project.id.as_str())
}

pub async fn resolve_task(store: &LocalStore, query: &str) -> Result<Task, CliError> {
    let tasks = store.list_tasks().await?;
    resolve_by_prefix(query, "Task", &tasks, |task| task.id.as_str())
}

pub async fn resolve_time_entry(store: &LocalStore, query: &str) -> Result<TimeEntry, CliError> {
    let entries = store.list_time_entries().await?;
    resolve_by_prefix(query, "Entry", &entries, |entry| entry.id.as_str())
}

pub fn short_id(id: &str) -> String {
    id.chars().take(SHORT_ID_LEN).collect()
}

/// Parse a user-supplied time into Unix milliseconds.
///
/// Dates without an offset are read in the local time zone. With
/// `end_of_day`, a bare date means the last millisecond of that day.
pub fn parse_time(value: &str, now_ms: i64, end_of_day: bool) -> Result<i64, CliError> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("now") {
        return Ok(now_ms);
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.timestamp_millis());
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return local_millis(naive).ok_or_else(|| CliError::InvalidTime(value.to_string()));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        let naive = if end_of_day {
            date.and_hms_milli_opt(23, 59, 59, 999)
        } else {
            date.and_hms_opt(0, 0, 0)
        };
        return naive
            .and_then(local_millis)
            .ok_or_else(|| CliError::InvalidTime(value.to_string()));
    }
    Err(CliError::InvalidTime(value.to_string()))
}

fn local_millis(naive: NaiveDateTime) -> Option<i64> {
    match Local.from_local_datetime(&naive) {
        LocalResult::Single(time) | LocalResult::Ambiguous(time, _) => {
            Some(time.timestamp_millis())
        }
        LocalResult::None => None,
    }
}

pub fn parse_optional_time(
    value: Option<&str>,
    now_ms: i64,
    end_of_day: bool,
) -> Result<Option<i64>, CliError> {
    value
        .map(|value| parse_time(value, now_ms, end_of_day))
        .transpose()
}

/// Local midnight of the day containing `now_ms`
pub fn start_of_local_day(now_ms: i64) -> i64 {
    DateTime::<Utc>::from_timestamp_millis(now_ms)
        .map(|time| time.with_timezone(&Local).date_naive())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .and_then(local_millis)
        .unwrap_or(now_ms)
}

pub fn format_local_time(timestamp_ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |time| time.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string(),
    )
}

pub fn format_minutes(total_minutes: i64) -> String {
    format!("{}h {:02}m", total_minutes / 60, total_minutes % 60)
}

#[derive(Debug, Serialize)]
pub struct EntryListItem {
    pub id: String,
    pub project_id: String,
    pub project: String,
    pub task_id: String,
    pub task: String,
    pub start_time: i64,
    pub end_time: Option<i64>,
    pub duration: Option<String>,
    pub notes: String,
}

/// Name lookups used to render ids as names
pub struct NameIndex {
    projects: HashMap<ProjectId, String>,
    tasks: HashMap<TaskId, String>,
}

impl NameIndex {
    pub fn new(projects: &[Project], tasks: &[Task]) -> Self {
        Self {
            projects: projects
                .iter()
                .map(|project| (project.id, project.name.clone()))
                .collect(),
            tasks: tasks.iter().map(|task| (task.id, task.name.clone())).collect(),
        }
    }

    pub fn project(&self, id: &ProjectId) -> &str {
        self.projects.get(id).map_or("?", String::as_str)
    }

    pub fn task(&self, id: &TaskId) -> &str {
        self.tasks.get(id).map_or("?", String::as_str)
    }
}

pub fn entry_to_list_item(entry: &TimeEntry, names: &NameIndex) -> EntryListItem {
    EntryListItem {
        id: entry.id.to_string(),
        project_id: entry.project_id.to_string(),
        project: names.project(&entry.project_id).to_string(),
        task_id: entry.task_id.to_string(),
        task: names.task(&entry.task_id).to_string(),
        start_time: entry.start_time,
        end_time: entry.end_time,
        duration: entry.duration_ms().map(format_duration),
        notes: entry.notes.clone(),
    }
}

pub fn format_project_lines(projects: &[Project]) -> Vec<String> {
    projects
        .iter()
        .map(|project| {
            let id = short_id(&project.id.as_str());
            if project.subtitle.is_empty() {
                format!("{id:<13}  {}  {}", project.color, project.name)
            } else {
                format!(
                    "{id:<13}  {}  {}  ({})",
                    project.color, project.name, project.subtitle
                )
            }
        })
        .collect()
}

pub fn format_task_lines(tasks: &[Task], names: &NameIndex) -> Vec<String> {
    tasks
        .iter()
        .map(|task| {
            format!(
                "{:<13}  {:<24}  {}",
                short_id(&task.id.as_str()),
                names.project(&task.project_id),
                task.name
            )
        })
        .collect()
}

pub fn format_entry_lines(entries: &[TimeEntry], names: &NameIndex) -> Vec<String> {
    entries
        .iter()
        .map(|entry| {
            let duration = entry
                .duration_ms()
                .map_or_else(|| "running".to_string(), format_duration);
            let label = format!(
                "{} / {}",
                names.project(&entry.project_id),
                names.task(&entry.task_id)
            );
            let line = format!(
                "{:<13}  {}  {duration:>8}  {label}",
                short_id(&entry.id.as_str()),
                format_local_time(entry.start_time),
            );
            if entry.notes.is_empty() {
                line
            } else {
                format!("{line}  - {}", entry.notes)
            }
        })
        .collect()
}

pub fn format_report_lines(rows: &[ReportRow]) -> Vec<String> {
    let mut lines: Vec<String> = rows
        .iter()
        .map(|row| {
            let label = row.project_name.as_ref().map_or_else(
                || row.label.clone(),
                |project| format!("{project} / {}", row.label),
            );
            format!("{:>9}  {label}", format_minutes(row.total_minutes))
        })
        .collect();
    let total: i64 = rows.iter().map(|row| row.total_minutes).sum();
    lines.push(format!("{:>9}  total", format_minutes(total)));
    lines
}
