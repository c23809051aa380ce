use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::core::config::Settings;
use crate::schemas::schedule::{FsDocument, ListDocumentsResponse, RunQueryResult};
use crate::store::models::Weekday;

const TEACHERS_COLLECTION: &str = "maestros";
const SCHEDULE_COLLECTION: &str = "horarios";
const SUBJECTS_COLLECTION: &str = "materias";
const GROUPS_COLLECTION: &str = "grupos";

#[derive(Debug, Clone)]
pub(crate) struct TeacherRef {
    pub(crate) id: String,
}

#[derive(Debug, Clone)]
pub(crate) struct ScheduleRow {
    pub(crate) weekday: Weekday,
    pub(crate) start_time: String,
    pub(crate) duration_minutes: i64,
    pub(crate) subject_id: String,
    pub(crate) group_id: String,
}

#[derive(Debug, Clone)]
pub(crate) struct ReferenceRow {
    pub(crate) id: String,
    pub(crate) name: String,
}

/// Denormalized schedule data source, joined client-side. The trait keeps the
/// import orchestration testable against an in-memory fake.
#[async_trait]
pub(crate) trait ScheduleSource {
    async fn find_teacher(&self, display_name: &str) -> Result<Option<TeacherRef>>;
    async fn schedule_rows(&self, teacher_id: &str) -> Result<Vec<ScheduleRow>>;
    async fn subjects(&self) -> Result<Vec<ReferenceRow>>;
    async fn groups(&self) -> Result<Vec<ReferenceRow>>;
}

#[derive(Debug, Clone)]
pub(crate) struct FirestoreScheduleSource {
    client: Client,
    base_url: String,
    project_id: String,
    api_key: String,
}

impl FirestoreScheduleSource {
    pub(crate) fn from_settings(settings: &Settings) -> Result<Self> {
        let timeout = Duration::from_secs(settings.schedule().timeout_seconds);
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(20))
            .timeout(timeout)
            .build()
            .context("Failed to build schedule HTTP client")?;

        Ok(Self {
            client,
            base_url: settings.schedule().base_url.clone(),
            project_id: settings.schedule().project_id.clone(),
            api_key: settings.schedule().api_key.clone(),
        })
    }

    fn documents_url(&self) -> String {
        format!(
            "{}/projects/{}/databases/(default)/documents",
            self.base_url, self.project_id
        )
    }

    async fn run_equality_query(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Vec<FsDocument>> {
        let body = json!({
            "structuredQuery": {
                "from": [{"collectionId": collection}],
                "where": {
                    "fieldFilter": {
                        "field": {"fieldPath": field},
                        "op": "EQUAL",
                        "value": {"stringValue": value},
                    }
                }
            }
        });

        let response = self
            .client
            .post(format!("{}:runQuery", self.documents_url()))
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Failed to query the {collection} collection"))?;

        let status = response.status();
        let raw_body = response.text().await.context("Failed to read the schedule response")?;
        if !status.is_success() {
            anyhow::bail!(
                "Schedule query on {} failed (status {}): {}",
                collection,
                status,
                extract_error_message(&raw_body)
            );
        }

        let results: Vec<RunQueryResult> = serde_json::from_str(&raw_body).map_err(|err| {
            anyhow::anyhow!("Schedule source returned an unexpected body: {err}")
        })?;
        Ok(results.into_iter().filter_map(|result| result.document).collect())
    }

    async fn list_collection(&self, collection: &str) -> Result<Vec<FsDocument>> {
        let url = format!("{}/{}", self.documents_url(), collection);
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut request = self
                .client
                .get(&url)
                .query(&[("key", self.api_key.as_str()), ("pageSize", "300")]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let response = request
                .send()
                .await
                .with_context(|| format!("Failed to list the {collection} collection"))?;

            let status = response.status();
            let raw_body =
                response.text().await.context("Failed to read the schedule response")?;
            if !status.is_success() {
                anyhow::bail!(
                    "Listing {} failed (status {}): {}",
                    collection,
                    status,
                    extract_error_message(&raw_body)
                );
            }

            let page: ListDocumentsResponse = serde_json::from_str(&raw_body).map_err(|err| {
                anyhow::anyhow!("Schedule source returned an unexpected body: {err}")
            })?;
            documents.extend(page.documents);
            page_token = page.next_page_token;
            if page_token.is_none() {
                break;
            }
        }
        Ok(documents)
    }
}

#[async_trait]
impl ScheduleSource for FirestoreScheduleSource {
    async fn find_teacher(&self, display_name: &str) -> Result<Option<TeacherRef>> {
        let by_short_name = self
            .run_equality_query(TEACHERS_COLLECTION, "nombre_corto", display_name)
            .await?;
        if let Some(doc) = by_short_name.first() {
            return Ok(Some(TeacherRef { id: doc.doc_id().to_string() }));
        }

        let by_full_name = self
            .run_equality_query(TEACHERS_COLLECTION, "nombre_completo", display_name)
            .await?;
        Ok(by_full_name.first().map(|doc| TeacherRef { id: doc.doc_id().to_string() }))
    }

    async fn schedule_rows(&self, teacher_id: &str) -> Result<Vec<ScheduleRow>> {
        let documents =
            self.run_equality_query(SCHEDULE_COLLECTION, "maestro_id", teacher_id).await?;

        let mut rows = Vec::new();
        for doc in documents {
            let Some(weekday) = doc.int_field("dia").and_then(Weekday::from_number) else {
                tracing::warn!(document = %doc.doc_id(), "schedule entry without a valid day");
                continue;
            };
            rows.push(ScheduleRow {
                weekday,
                start_time: doc.str_field("hora_inicio").unwrap_or_default().to_string(),
                duration_minutes: doc.int_field("duracion").unwrap_or_default(),
                subject_id: doc.str_field("materia_id").unwrap_or_default().to_string(),
                group_id: doc.str_field("grupo_id").unwrap_or_default().to_string(),
            });
        }
        Ok(rows)
    }

    async fn subjects(&self) -> Result<Vec<ReferenceRow>> {
        let documents = self.list_collection(SUBJECTS_COLLECTION).await?;
        Ok(documents.iter().map(reference_row).collect())
    }

    async fn groups(&self) -> Result<Vec<ReferenceRow>> {
        let documents = self.list_collection(GROUPS_COLLECTION).await?;
        Ok(documents.iter().map(reference_row).collect())
    }
}

fn reference_row(doc: &FsDocument) -> ReferenceRow {
    ReferenceRow {
        id: doc.doc_id().to_string(),
        name: doc.str_field("nombre").unwrap_or_default().to_string(),
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
