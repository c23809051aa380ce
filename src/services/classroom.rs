use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::core::config::Settings;
use crate::schemas::classroom::{
    Course, CourseListResponse, CourseWork, CourseWorkListResponse, RosterListResponse,
    RosterStudent, StudentSubmission, SubmissionListResponse,
};

const DEFAULT_BASE_URL: &str = "https://classroom.googleapis.com/v1";

/// Read-only slice of the Classroom REST API used by the import. The trait
/// keeps the orchestration testable against an in-memory fake.
#[async_trait]
pub(crate) trait ClassroomApi {
    async fn list_courses(&self, token: &str) -> Result<Vec<Course>>;
    async fn list_course_work(&self, token: &str, course_id: &str) -> Result<Vec<CourseWork>>;
    async fn list_submissions(
        &self,
        token: &str,
        course_id: &str,
        course_work_id: &str,
    ) -> Result<Vec<StudentSubmission>>;
    async fn list_students(&self, token: &str, course_id: &str) -> Result<Vec<RosterStudent>>;
}

#[derive(Debug, Clone)]
pub(crate) struct ClassroomService {
    client: Client,
    base_url: String,
}

impl ClassroomService {
    pub(crate) fn from_settings(settings: &Settings) -> Result<Self> {
        let timeout = Duration::from_secs(settings.google().timeout_seconds);
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(20))
            .timeout(timeout)
            .build()
            .context("Failed to build Classroom HTTP client")?;

        Ok(Self { client, base_url: DEFAULT_BASE_URL.to_string() })
    }

    async fn get_page<T: DeserializeOwned>(
        &self,
        token: &str,
        path: &str,
        params: &[(&str, &str)],
        page_token: Option<&str>,
    ) -> Result<T> {
        let mut request = self
            .client
            .get(format!("{}/{}", self.base_url, path))
            .bearer_auth(token)
            .query(params);
        if let Some(page_token) = page_token {
            request = request.query(&[("pageToken", page_token)]);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to call Classroom API at {path}"))?;

        let status = response.status();
        let raw_body = response.text().await.context("Failed to read Classroom response")?;
        if !status.is_success() {
            anyhow::bail!(
                "Classroom request to {} failed (status {}): {}",
                path,
                status,
                extract_error_message(&raw_body)
            );
        }

        serde_json::from_str(&raw_body).map_err(|err| {
            anyhow::anyhow!("Classroom returned an unexpected body for {path}: {err}")
        })
    }
}

#[async_trait]
impl ClassroomApi for ClassroomService {
    async fn list_courses(&self, token: &str) -> Result<Vec<Course>> {
        let params = [("teacherId", "me"), ("courseStates", "ACTIVE")];
        let mut courses = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let page: CourseListResponse =
                self.get_page(token, "courses", &params, page_token.as_deref()).await?;
            courses.extend(page.courses);
            page_token = page.next_page_token;
            if page_token.is_none() {
                break;
            }
        }
        Ok(courses)
    }

    async fn list_course_work(&self, token: &str, course_id: &str) -> Result<Vec<CourseWork>> {
        let path = format!("courses/{course_id}/courseWork");
        let mut course_work = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let page: CourseWorkListResponse =
                self.get_page(token, &path, &[], page_token.as_deref()).await?;
            course_work.extend(page.course_work);
            page_token = page.next_page_token;
            if page_token.is_none() {
                break;
            }
        }
        Ok(course_work)
    }

    async fn list_submissions(
        &self,
        token: &str,
        course_id: &str,
        course_work_id: &str,
    ) -> Result<Vec<StudentSubmission>> {
        let path = format!("courses/{course_id}/courseWork/{course_work_id}/studentSubmissions");
        let mut submissions = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let page: SubmissionListResponse =
                self.get_page(token, &path, &[], page_token.as_deref()).await?;
            submissions.extend(page.student_submissions);
            page_token = page.next_page_token;
            if page_token.is_none() {
                break;
            }
        }
        Ok(submissions)
    }

    async fn list_students(&self, token: &str, course_id: &str) -> Result<Vec<RosterStudent>> {
        let path = format!("courses/{course_id}/students");
        let mut students = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let page: RosterListResponse =
                self.get_page(token, &path, &[], page_token.as_deref()).await?;
            students.extend(page.students);
            page_token = page.next_page_token;
            if page_token.is_none() {
                break;
            }
        }
        Ok(students)
    }
}

fn extract_error_message(raw_body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<Value>(raw_body) {
        if let Some(message) = parsed
            .get("error")
            .and_then(|error| error.get("message"))
            .and_then(Value::as_str)
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
