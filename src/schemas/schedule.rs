use std::collections::HashMap;

use serde::Deserialize;

/// Firestore-style document wire shapes. Values arrive wrapped in typed
/// envelopes (`stringValue`, `integerValue`, ...) and integers are encoded
/// as strings.
#[derive(Debug, Deserialize)]
pub(crate) struct RunQueryResult {
    #[serde(default)]
    pub(crate) document: Option<FsDocument>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ListDocumentsResponse {
    #[serde(default)]
    pub(crate) documents: Vec<FsDocument>,
    #[serde(default)]
    pub(crate) next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FsDocument {
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) fields: HashMap<String, FsValue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FsValue {
    #[serde(default)]
    string_value: Option<String>,
    #[serde(default)]
    integer_value: Option<String>,
    #[serde(default)]
    double_value: Option<f64>,
}

impl FsValue {
    pub(crate) fn as_str(&self) -> Option<&str> {
        self.string_value.as_deref()
    }

    pub(crate) fn as_i64(&self) -> Option<i64> {
        if let Some(raw) = &self.integer_value {
            return raw.parse().ok();
        }
        self.double_value.map(|value| value as i64)
    }
}

impl FsDocument {
    /// Document id is the last segment of the resource name.
    pub(crate) fn doc_id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }

    pub(crate) fn str_field(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(FsValue::as_str)
    }

    pub(crate) fn int_field(&self, field: &str) -> Option<i64> {
        self.fields.get(field).and_then(FsValue::as_i64)
    }
}
