//! JSON payloads exchanged with the HTTP API.
//!
//! The API speaks camelCase with RFC 3339 timestamps; older deployments
//! return Unix milliseconds instead, so both are accepted on read.

use serde::{Deserialize, Serialize};

use crate::models::{
    Project, ProjectPatch, Task, TaskPatch, TimeEntry, TimeEntryPatch, DEFAULT_PROJECT_COLOR,
};
use crate::util::{format_rfc3339_ms, parse_rfc3339_ms};
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum WireTime {
    Text(String),
    Millis(i64),
}

impl WireTime {
    fn to_millis(&self, field: &str) -> Result<i64> {
        match self {
            Self::Millis(ms) => Ok(*ms),
            Self::Text(text) => parse_rfc3339_ms(text)
                .ok_or_else(|| invalid_payload(&format!("{field} is not a timestamp: {text}"))),
        }
    }
}

fn invalid_payload(message: &str) -> Error {
    Error::RemoteRequestFailed {
        status: None,
        message: format!("invalid response payload: {message}"),
    }
}

fn parse_remote_id<T: std::str::FromStr>(raw: &str, kind: &str) -> Result<T> {
    raw.parse()
        .map_err(|_| invalid_payload(&format!("invalid {kind} id {raw}")))
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDto {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    pub created_at: WireTime,
}

impl TryFrom<ProjectDto> for Project {
    type Error = Error;

    fn try_from(value: ProjectDto) -> Result<Self> {
        Ok(Self {
            id: parse_remote_id(&value.id, "project")?,
            name: value.name,
            subtitle: value.subtitle.unwrap_or_default(),
            color: value
                .color
                .unwrap_or_else(|| DEFAULT_PROJECT_COLOR.to_string()),
            created_at: value.created_at.to_millis("createdAt")?,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDto {
    pub id: String,
    pub project_id: String,
    pub name: String,
    pub created_at: WireTime,
}

impl TryFrom<TaskDto> for Task {
    type Error = Error;

    fn try_from(value: TaskDto) -> Result<Self> {
        Ok(Self {
            id: parse_remote_id(&value.id, "task")?,
            project_id: parse_remote_id(&value.project_id, "project")?,
            name: value.name,
            created_at: value.created_at.to_millis("createdAt")?,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeEntryDto {
    pub id: String,
    pub project_id: String,
    pub task_id: String,
    pub start_time: WireTime,
    #[serde(default)]
    pub end_time: Option<WireTime>,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: WireTime,
    pub updated_at: WireTime,
}

impl TryFrom<TimeEntryDto> for TimeEntry {
    type Error = Error;

    fn try_from(value: TimeEntryDto) -> Result<Self> {
        Ok(Self {
            id: parse_remote_id(&value.id, "time entry")?,
            project_id: parse_remote_id(&value.project_id, "project")?,
            task_id: parse_remote_id(&value.task_id, "task")?,
            start_time: value.start_time.to_millis("startTime")?,
            end_time: value
                .end_time
                .as_ref()
                .map(|end| end.to_millis("endTime"))
                .transpose()?,
            notes: value.notes.unwrap_or_default(),
            created_at: value.created_at.to_millis("createdAt")?,
            updated_at: value.updated_at.to_millis("updatedAt")?,
        })
    }
}

/// Convert a list payload, failing on the first malformed item
pub fn convert_all<D, T>(items: Vec<D>) -> Result<Vec<T>>
where
    T: TryFrom<D, Error = Error>,
{
    items.into_iter().map(T::try_from).collect()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectBody<'a> {
    pub id: String,
    pub name: &'a str,
    pub subtitle: &'a str,
    pub color: &'a str,
    pub created_at: String,
}

impl<'a> From<&'a Project> for CreateProjectBody<'a> {
    fn from(project: &'a Project) -> Self {
        Self {
            id: project.id.as_str(),
            name: &project.name,
            subtitle: &project.subtitle,
            color: &project.color,
            created_at: format_rfc3339_ms(project.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<&'a str>,
}

impl<'a> From<&'a ProjectPatch> for UpdateProjectBody<'a> {
    fn from(patch: &'a ProjectPatch) -> Self {
        Self {
            name: patch.name.as_deref(),
            subtitle: patch.subtitle.as_deref(),
            color: patch.color.as_deref(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskBody<'a> {
    pub id: String,
    pub name: &'a str,
    pub created_at: String,
}

impl<'a> From<&'a Task> for CreateTaskBody<'a> {
    fn from(task: &'a Task) -> Self {
        Self {
            id: task.id.as_str(),
            name: &task.name,
            created_at: format_rfc3339_ms(task.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
}

impl<'a> From<&'a TaskPatch> for UpdateTaskBody<'a> {
    fn from(patch: &'a TaskPatch) -> Self {
        Self {
            name: patch.name.as_deref(),
            project_id: patch.project_id.map(|id| id.as_str()),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTimeEntryBody<'a> {
    pub id: String,
    pub project_id: String,
    pub task_id: String,
    pub start_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    pub notes: &'a str,
}

impl<'a> From<&'a TimeEntry> for CreateTimeEntryBody<'a> {
    fn from(entry: &'a TimeEntry) -> Self {
        Self {
            id: entry.id.as_str(),
            project_id: entry.project_id.as_str(),
            task_id: entry.task_id.as_str(),
            start_time: format_rfc3339_ms(entry.start_time),
            end_time: entry.end_time.map(format_rfc3339_ms),
            notes: &entry.notes,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTimeEntryBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<&'a str>,
}

impl<'a> From<&'a TimeEntryPatch> for UpdateTimeEntryBody<'a> {
    fn from(patch: &'a TimeEntryPatch) -> Self {
        Self {
            project_id: patch.project_id.map(|id| id.as_str()),
            task_id: patch.task_id.map(|id| id.as_str()),
            start_time: patch.start_time.map(format_rfc3339_ms),
            end_time: patch.end_time.map(format_rfc3339_ms),
            notes: patch.notes.as_deref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ProjectId, TaskId};
    use pretty_assertions::assert_eq;

    #[test]
    fn project_payload_fills_defaults() {
        let dto: ProjectDto = serde_json::from_str(
            r#"{"id":"0b5d7f0c-7c1e-4a52-9a57-2f6d2b0c9d11","name":"Web","createdAt":"2024-01-01T00:00:00.000Z"}"#,
        )
        .unwrap();
        let project = Project::try_from(dto).unwrap();
        assert_eq!(project.subtitle, "");
        assert_eq!(project.color, DEFAULT_PROJECT_COLOR);
        assert_eq!(project.created_at, 1_704_067_200_000);
    }

    #[test]
    fn time_entry_payload_accepts_null_end_and_millis() {
        let dto: TimeEntryDto = serde_json::from_str(
            r#"{
                "id":"0b5d7f0c-7c1e-4a52-9a57-2f6d2b0c9d11",
                "projectId":"1b5d7f0c-7c1e-4a52-9a57-2f6d2b0c9d11",
                "taskId":"2b5d7f0c-7c1e-4a52-9a57-2f6d2b0c9d11",
                "startTime":1704099600000,
                "endTime":null,
                "notes":null,
                "createdAt":1704099600000,
                "updatedAt":"2024-01-01T09:00:00Z"
            }"#,
        )
        .unwrap();
        let entry = TimeEntry::try_from(dto).unwrap();
        assert_eq!(entry.end_time, None);
        assert_eq!(entry.notes, "");
        assert_eq!(entry.start_time, entry.updated_at);
        assert!(!entry.is_reconcilable());
    }

    #[test]
    fn malformed_ids_are_rejected() {
        let dto: TaskDto = serde_json::from_str(
            r#"{"id":"nope","projectId":"1b5d7f0c-7c1e-4a52-9a57-2f6d2b0c9d11","name":"x","createdAt":0}"#,
        )
        .unwrap();
        let error = Task::try_from(dto).unwrap_err();
        assert!(error.to_string().contains("invalid task id"));
    }

    #[test]
    fn create_time_entry_body_uses_iso_strings() {
        let mut entry = TimeEntry::completed(
            ProjectId::new(),
            TaskId::new(),
            1_704_099_600_000,
            1_704_103_200_000,
        );
        entry.notes = "review".to_string();
        let json = serde_json::to_value(CreateTimeEntryBody::from(&entry)).unwrap();
        assert_eq!(json["startTime"], "2024-01-01T09:00:00.000Z");
        assert_eq!(json["endTime"], "2024-01-01T10:00:00.000Z");
        assert_eq!(json["notes"], "review");
        assert_eq!(json["id"], entry.id.as_str());
    }

    #[test]
    fn update_bodies_omit_unset_fields() {
        let patch = ProjectPatch {
            color: Some("#112233".to_string()),
            ..ProjectPatch::default()
        };
        let json = serde_json::to_string(&UpdateProjectBody::from(&patch)).unwrap();
        assert_eq!(json, r##"{"color":"#112233"}"##);
    }
}
