pub(crate) mod attendance;
pub(crate) mod classroom_import;
pub(crate) mod grades;
pub(crate) mod normalize;
pub(crate) mod progress;
pub(crate) mod schedule;

use thiserror::Error;
use validator::Validate;

use crate::core::config::Settings;
use crate::store::models::{AppData, Group};

/// Configuration problems are caught before any network call; transport
/// problems are terminal for the invocation. Identity-matching misses are
/// neither: they become progress-log lines and processing continues.
#[derive(Debug, Error)]
pub(crate) enum SyncError {
    #[error("{0}")]
    Config(String),
    #[error("transición inválida de {from} a {to}")]
    InvalidTransition { from: &'static str, to: &'static str },
    #[error(transparent)]
    Transport(#[from] anyhow::Error),
}

#[derive(Debug, Validate)]
pub(crate) struct BackendTarget {
    #[validate(length(min = 1))]
    pub(crate) endpoint: String,
    #[validate(length(min = 1))]
    pub(crate) api_key: String,
    #[validate(length(min = 1))]
    pub(crate) professor_name: String,
}

impl BackendTarget {
    pub(crate) fn from_settings(settings: &Settings) -> Result<Self, SyncError> {
        let target = Self {
            endpoint: settings.backend().endpoint.clone(),
            api_key: settings.backend().api_key.clone(),
            professor_name: settings.backend().professor_name.clone(),
        };

        if target.validate().is_err() {
            return Err(SyncError::Config(
                "Configura la dirección del servidor, la clave de API y el nombre del profesor \
                 antes de sincronizar."
                    .to_string(),
            ));
        }

        Ok(target)
    }
}

/// Groups whose tutor of record matches the given professor by normalized
/// name.
pub(crate) fn tutored_groups<'a>(data: &'a AppData, professor_name: &str) -> Vec<&'a Group> {
    data.groups
        .iter()
        .filter(|group| {
            group
                .tutor_name
                .as_deref()
                .is_some_and(|tutor| normalize::names_match(tutor, professor_name))
        })
        .collect()
}
