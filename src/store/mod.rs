pub(crate) mod actions;
pub(crate) mod models;

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

pub(crate) use actions::Action;
use models::AppData;

/// The application state and its single mutation point. The state is held in
/// memory and persisted as one JSON document; a missing file means an empty
/// state, not an error.
#[derive(Debug)]
pub(crate) struct Store {
    data: AppData,
    path: PathBuf,
}

impl Store {
    pub(crate) fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let data = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw)
                .with_context(|| format!("Malformed state file {}", path.display()))?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => AppData::default(),
            Err(err) => {
                return Err(err).with_context(|| format!("Failed to read {}", path.display()))
            }
        };

        Ok(Self { data, path })
    }

    pub(crate) fn save(&self) -> Result<()> {
        let raw = serde_json::to_string_pretty(&self.data).context("Failed to encode state")?;
        fs::write(&self.path, raw)
            .with_context(|| format!("Failed to write {}", self.path.display()))
    }

    pub(crate) fn data(&self) -> &AppData {
        &self.data
    }

    pub(crate) fn dispatch(&mut self, action: Action) {
        tracing::debug!(?action, "dispatch");
        self.data.apply(action);
    }

    pub(crate) fn dispatch_all(&mut self, actions: impl IntoIterator<Item = Action>) -> usize {
        let mut count = 0;
        for action in actions {
            self.dispatch(action);
            count += 1;
        }
        count
    }
}
