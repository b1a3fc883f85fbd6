//! HTTP client for the tock API.
//!
//! Resource layout under `<base>/api/v1`:
//! `projects`, `projects/{id}`, `projects/{id}/tasks`, `tasks/{id}`,
//! `timelogs`, `timelogs/{id}`.

use std::time::Duration;

use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use super::wire::{
    convert_all, CreateProjectBody, CreateTaskBody, CreateTimeEntryBody, ProjectDto, TaskDto,
    TimeEntryDto, UpdateProjectBody, UpdateTaskBody, UpdateTimeEntryBody,
};
use super::{RemoteEntityService, TimeRange};
use crate::models::{
    Project, ProjectId, ProjectPatch, Task, TaskId, TaskPatch, TimeEntry, TimeEntryId,
    TimeEntryPatch,
};
use crate::util::{compact_text, format_rfc3339_ms, is_http_url, normalize_text_option};
use crate::{Error, Result};

const API_PREFIX: &str = "/api/v1";

/// Remote entity service backed by the tock REST API
#[derive(Debug, Clone)]
pub struct HttpRemoteService {
    base_url: String,
    client: reqwest::Client,
}

impl HttpRemoteService {
    /// Build a client for `base_url` (scheme required) with a per-request timeout
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = normalize_base_url(&base_url.into())?;
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { base_url, client })
    }

    /// The API root every resource path is joined onto
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{path}", self.base_url))
            .header(reqwest::header::ACCEPT, "application/json")
    }

    async fn execute(&self, request: RequestBuilder, path: &str) -> Result<Response> {
        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        debug!(path, status = status.as_u16(), "remote response");
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(status_error(status, path, &body))
    }

    async fn fetch<T: DeserializeOwned>(&self, method: Method, path: &str) -> Result<T> {
        let response = self.execute(self.request(method, path), path).await?;
        decode(response).await
    }

    async fn send_json<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let response = self
            .execute(self.request(method, path).json(body), path)
            .await?;
        decode(response).await
    }

    async fn fetch_optional<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        match self.fetch(Method::GET, path).await {
            Ok(value) => Ok(Some(value)),
            Err(Error::RemoteNotFound(_)) => Ok(None),
            Err(error) => Err(error),
        }
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.execute(self.request(Method::DELETE, path), path)
            .await
            .map(drop)
    }
}

impl RemoteEntityService for HttpRemoteService {
    async fn list_projects(&self) -> Result<Vec<Project>> {
        let items: Vec<ProjectDto> = self.fetch(Method::GET, "/projects").await?;
        convert_all(items)
    }

    async fn get_project(&self, id: &ProjectId) -> Result<Option<Project>> {
        let item: Option<ProjectDto> = self.fetch_optional(&format!("/projects/{id}")).await?;
        item.map(Project::try_from).transpose()
    }

    async fn create_project(&self, project: &Project) -> Result<Project> {
        let item: ProjectDto = self
            .send_json(
                Method::POST,
                "/projects",
                &CreateProjectBody::from(project),
            )
            .await?;
        item.try_into()
    }

    async fn update_project(&self, id: &ProjectId, patch: &ProjectPatch) -> Result<Project> {
        let item: ProjectDto = self
            .send_json(
                Method::PUT,
                &format!("/projects/{id}"),
                &UpdateProjectBody::from(patch),
            )
            .await?;
        item.try_into()
    }

    async fn delete_project(&self, id: &ProjectId) -> Result<()> {
        self.delete(&format!("/projects/{id}")).await
    }

    async fn list_tasks(&self, project_id: &ProjectId) -> Result<Vec<Task>> {
        let items: Vec<TaskDto> = self
            .fetch(Method::GET, &format!("/projects/{project_id}/tasks"))
            .await?;
        convert_all(items)
    }

    async fn get_task(&self, id: &TaskId) -> Result<Option<Task>> {
        let item: Option<TaskDto> = self.fetch_optional(&format!("/tasks/{id}")).await?;
        item.map(Task::try_from).transpose()
    }

    async fn create_task(&self, task: &Task) -> Result<Task> {
        let item: TaskDto = self
            .send_json(
                Method::POST,
                &format!("/projects/{}/tasks", task.project_id),
                &CreateTaskBody::from(task),
            )
            .await?;
        item.try_into()
    }

    async fn update_task(&self, id: &TaskId, patch: &TaskPatch) -> Result<Task> {
        let item: TaskDto = self
            .send_json(
                Method::PUT,
                &format!("/tasks/{id}"),
                &UpdateTaskBody::from(patch),
            )
            .await?;
        item.try_into()
    }

    async fn delete_task(&self, id: &TaskId) -> Result<()> {
        self.delete(&format!("/tasks/{id}")).await
    }

    async fn list_time_entries(&self, range: TimeRange) -> Result<Vec<TimeEntry>> {
        let path = "/timelogs";
        let request = self.request(Method::GET, path).query(&range_query(range));
        let items: Vec<TimeEntryDto> = decode(self.execute(request, path).await?).await?;
        convert_all(items)
    }

    async fn get_time_entry(&self, id: &TimeEntryId) -> Result<Option<TimeEntry>> {
        let item: Option<TimeEntryDto> = self.fetch_optional(&format!("/timelogs/{id}")).await?;
        item.map(TimeEntry::try_from).transpose()
    }

    async fn create_time_entry(&self, entry: &TimeEntry) -> Result<TimeEntry> {
        let item: TimeEntryDto = self
            .send_json(
                Method::POST,
                "/timelogs",
                &CreateTimeEntryBody::from(entry),
            )
            .await?;
        item.try_into()
    }

    async fn update_time_entry(
        &self,
        id: &TimeEntryId,
        patch: &TimeEntryPatch,
    ) -> Result<TimeEntry> {
        let item: TimeEntryDto = self
            .send_json(
                Method::PUT,
                &format!("/timelogs/{id}"),
                &UpdateTimeEntryBody::from(patch),
            )
            .await?;
        item.try_into()
    }

    async fn delete_time_entry(&self, id: &TimeEntryId) -> Result<()> {
        self.delete(&format!("/timelogs/{id}")).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let body = response.text().await.map_err(transport_error)?;
    serde_json::from_str(&body).map_err(|error| Error::RemoteRequestFailed {
        status: None,
        message: format!("invalid response payload: {error}"),
    })
}

fn transport_error(error: reqwest::Error) -> Error {
    if error.is_connect() || error.is_timeout() {
        Error::NetworkUnavailable
    } else {
        Error::RemoteRequestFailed {
            status: error.status().map(|status| status.as_u16()),
            message: compact_text(&error.to_string()),
        }
    }
}

/// Map a non-success response; 404 means the record is gone
fn status_error(status: StatusCode, path: &str, body: &str) -> Error {
    if status == StatusCode::NOT_FOUND {
        return Error::RemoteNotFound(path.to_string());
    }
    Error::RemoteRequestFailed {
        status: Some(status.as_u16()),
        message: parse_api_error(status, body),
    }
}

fn range_query(range: TimeRange) -> Vec<(&'static str, String)> {
    let mut query = Vec::new();
    if let Some(from) = range.from {
        query.push(("from", format_rfc3339_ms(from)));
    }
    if let Some(to) = range.to {
        query.push(("to", format_rfc3339_ms(to)));
    }
    query
}

/// Extract a readable message from an API error body.
///
/// Accepts `{"error": "..."}`, `{"error": {"message": "..."}}` and
/// `{"message": "..."}`, falling back to the raw body.
fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<serde_json::Value>(body) {
        let message = payload
            .get("error")
            .and_then(|error| {
                error
                    .as_str()
                    .or_else(|| error.get("message").and_then(|message| message.as_str()))
            })
            .or_else(|| payload.get("message").and_then(|message| message.as_str()));
        if let Some(message) = message {
            return compact_text(message);
        }
    }

    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        trimmed
    }
}

fn normalize_base_url(raw: &str) -> Result<String> {
    let base = normalize_text_option(Some(raw.to_string()))
        .ok_or_else(|| Error::InvalidInput("API URL must not be empty".to_string()))?;
    if !is_http_url(&base) {
        return Err(Error::InvalidInput(
            "API URL must include http:// or https://".to_string(),
        ));
    }
    let base = base.trim_end_matches('/');
    if base.ends_with(API_PREFIX) {
        Ok(base.to_string())
    } else {
        Ok(format!("{base}{API_PREFIX}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn status_errors_split_missing_from_failed() {
        assert!(matches!(
            status_error(StatusCode::NOT_FOUND, "/projects/abc", ""),
            Error::RemoteNotFound(path) if path == "/projects/abc"
        ));

        let error = status_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "/projects",
            r#"{"error":"database offline"}"#,
        );
        assert!(matches!(
            &error,
            Error::RemoteRequestFailed { status: Some(500), message } if message == "database offline"
        ));
        assert!(error.is_remote());

        assert!(matches!(
            status_error(StatusCode::CONFLICT, "/timelogs", ""),
            Error::RemoteRequestFailed { status: Some(409), message } if message == "HTTP 409"
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn refused_connection_is_network_unavailable() {
        let remote = HttpRemoteService::new("http://127.0.0.1:1", Duration::from_secs(2)).unwrap();
        let error = remote.list_projects().await.unwrap_err();
        assert!(matches!(error, Error::NetworkUnavailable), "got {error:?}");
    }

    #[test]
    fn normalize_base_url_appends_api_prefix() {
        assert_eq!(
            normalize_base_url(" https://tock.example.com/ ").unwrap(),
            "https://tock.example.com/api/v1"
        );
        assert_eq!(
            normalize_base_url("http://localhost:3000/api/v1").unwrap(),
            "http://localhost:3000/api/v1"
        );
    }

    #[test]
    fn normalize_base_url_rejects_invalid_values() {
        assert!(normalize_base_url("").is_err());
        assert!(normalize_base_url("tock.example.com").is_err());
    }

    #[test]
    fn parse_api_error_reads_known_shapes() {
        let status = StatusCode::BAD_REQUEST;
        assert_eq!(parse_api_error(status, r#"{"error":"bad name"}"#), "bad name");
        assert_eq!(
            parse_api_error(status, r#"{"error":{"message":"nested"}}"#),
            "nested"
        );
        assert_eq!(parse_api_error(status, r#"{"message":"plain"}"#), "plain");
        assert_eq!(parse_api_error(status, "gateway down"), "gateway down");
        assert_eq!(parse_api_error(status, "  "), "HTTP 400");
    }

    #[test]
    fn range_query_formats_bounds() {
        assert!(range_query(TimeRange::all()).is_empty());
        assert_eq!(
            range_query(TimeRange::between(0, 1_704_099_600_123)),
            vec![
                ("from", "1970-01-01T00:00:00.000Z".to_string()),
                ("to", "2024-01-01T09:00:00.123Z".to_string()),
            ]
        );
    }

    #[test]
    fn client_builds_with_timeout() {
        let service =
            HttpRemoteService::new("https://tock.example.com", Duration::from_secs(5)).unwrap();
        assert_eq!(service.base_url(), "https://tock.example.com/api/v1");
    }
}
