use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde_json::Value;

use crate::core::config::Settings;
use crate::schemas::backend::{
    AttendanceQuery, AttendancePushRow, GradePushRow, GradeSyncRequest, RemoteAttendanceRow,
};

const KNOWN_EXTENSIONS: &[&str] = &[".php", ".html", ".htm", ".asp", ".aspx", ".cgi"];

/// Client for the attendance/grades backend: one POST endpoint, static API
/// key, action-discriminated request bodies.
#[derive(Debug, Clone)]
pub(crate) struct BackendService {
    client: Client,
    endpoint: String,
    api_key: String,
    professor_name: String,
}

impl BackendService {
    pub(crate) fn from_settings(settings: &Settings) -> Result<Self> {
        let timeout = Duration::from_secs(settings.backend().timeout_seconds);
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(20))
            .timeout(timeout)
            .build()
            .context("Failed to build backend HTTP client")?;

        Ok(Self {
            client,
            endpoint: sanitize_endpoint(&settings.backend().endpoint),
            api_key: settings.backend().api_key.clone(),
            professor_name: settings.backend().professor_name.clone(),
        })
    }

    pub(crate) fn professor_name(&self) -> &str {
        &self.professor_name
    }

    /// One read: every remote attendance row for the configured professor.
    /// A 404 or an empty body means the professor has no records yet.
    pub(crate) async fn fetch_attendance(&self) -> Result<Vec<RemoteAttendanceRow>> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("X-Api-Key", &self.api_key)
            .json(&AttendanceQuery::new(&self.professor_name))
            .send()
            .await
            .context("Failed to call the attendance backend")?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }

        let raw_body = response.text().await.context("Failed to read the attendance response")?;
        if !status.is_success() {
            anyhow::bail!(
                "Attendance fetch failed (status {}): {}",
                status,
                extract_error_message(&raw_body)
            );
        }

        if raw_body.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&raw_body).map_err(|err| {
            anyhow::anyhow!("Attendance backend returned an unexpected body: {err}: {raw_body}")
        })
    }

    /// One batched write; the backend upserts row by row and never deletes.
    pub(crate) async fn push_attendance(&self, rows: &[AttendancePushRow]) -> Result<()> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("X-Api-Key", &self.api_key)
            .json(rows)
            .send()
            .await
            .context("Failed to push attendance records")?;

        let status = response.status();
        if !status.is_success() {
            let raw_body = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "Attendance push failed (status {}): {}",
                status,
                extract_error_message(&raw_body)
            );
        }

        Ok(())
    }

    pub(crate) async fn push_grades(&self, rows: Vec<GradePushRow>) -> Result<()> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("X-Api-Key", &self.api_key)
            .json(&GradeSyncRequest::new(rows))
            .send()
            .await
            .context("Failed to push grades")?;

        let status = response.status();
        if !status.is_success() {
            let raw_body = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "Grade push failed (status {}): {}",
                status,
                extract_error_message(&raw_body)
            );
        }

        Ok(())
    }
}

/// Saved endpoint URLs sometimes carry path segments pasted after the script
/// name. The path is truncated after the first segment ending in a known
/// file extension.
pub(crate) fn sanitize_endpoint(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    let Some(scheme_end) = trimmed.find("://") else {
        return trimmed.to_string();
    };

    let Some(path_start) = trimmed[scheme_end + 3..].find('/') else {
        return trimmed.to_string();
    };
    let (scheme_host, path) = trimmed.split_at(scheme_end + 3 + path_start);

    let mut kept: Vec<&str> = Vec::new();
    for segment in path.split('/').filter(|segment| !segment.is_empty()) {
        kept.push(segment);
        let lower = segment.to_ascii_lowercase();
        if KNOWN_EXTENSIONS.iter().any(|extension| lower.ends_with(extension)) {
            return format!("{}/{}", scheme_host, kept.join("/"));
        }
    }

    trimmed.to_string()
}

fn extract_error_message(raw_body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<Value>(raw_body) {
        if let Some(message) = parsed
            .get("message")
            .and_then(Value::as_str)
            .or_else(|| parsed.get("error").and_then(Value::as_str))
        {
            return message.to_string();
        }
    }

    if raw_body.trim().is_empty() {
        "unknown_error".to_string()
    } else {
        raw_body.trim().to_string()
    }
}
