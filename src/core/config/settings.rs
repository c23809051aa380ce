use super::parsing::{env_optional, env_or_default, parse_bool, parse_environment, parse_u16, parse_u64};
use super::types::{
    BackendSettings, ConfigError, GoogleSettings, RedirectPort, RuntimeSettings, ScheduleSettings,
    Settings, StorageSettings, TelemetrySettings,
};

const DEFAULT_SCHEDULE_BASE_URL: &str = "https://firestore.googleapis.com/v1";

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let environment =
            parse_environment(env_optional("AULASYNC_ENV").or_else(|| env_optional("ENVIRONMENT")));
        let strict_config =
            env_optional("AULASYNC_STRICT_CONFIG").map(|value| parse_bool(&value)).unwrap_or(false)
                || environment.is_production();

        let backend_endpoint = env_or_default("BACKEND_URL", "");
        let backend_api_key = env_or_default("BACKEND_API_KEY", "");
        let professor_name = env_or_default("PROFESSOR_NAME", "");
        let backend_timeout_seconds =
            parse_u64("BACKEND_TIMEOUT_SECONDS", env_or_default("BACKEND_TIMEOUT_SECONDS", "30"))?;

        let google_client_id = env_or_default("GOOGLE_CLIENT_ID", "");
        let google_client_secret = env_or_default("GOOGLE_CLIENT_SECRET", "");
        let google_redirect_port = parse_u16(
            "GOOGLE_REDIRECT_PORT",
            env_or_default("GOOGLE_REDIRECT_PORT", "8475"),
        )?;
        let google_timeout_seconds =
            parse_u64("GOOGLE_TIMEOUT_SECONDS", env_or_default("GOOGLE_TIMEOUT_SECONDS", "30"))?;

        let schedule_project_id = env_or_default("SCHEDULE_PROJECT_ID", "");
        let schedule_api_key = env_or_default("SCHEDULE_API_KEY", "");
        let schedule_base_url = env_or_default("SCHEDULE_BASE_URL", DEFAULT_SCHEDULE_BASE_URL);
        let schedule_timeout_seconds = parse_u64(
            "SCHEDULE_TIMEOUT_SECONDS",
            env_or_default("SCHEDULE_TIMEOUT_SECONDS", "30"),
        )?;

        let state_file = env_or_default("AULASYNC_STATE_FILE", "aulasync_state.json");
        let token_cache_file = env_or_default("AULASYNC_TOKEN_CACHE", "aulasync_tokens.json");

        let log_level = env_or_default("AULASYNC_LOG_LEVEL", "info");
        let json = env_optional("AULASYNC_LOG_JSON").map(|value| parse_bool(&value)).unwrap_or(false);

        let settings = Self {
            runtime: RuntimeSettings { environment, strict_config },
            backend: BackendSettings {
                endpoint: backend_endpoint,
                api_key: backend_api_key,
                professor_name,
                timeout_seconds: backend_timeout_seconds,
            },
            google: GoogleSettings {
                client_id: google_client_id,
                client_secret: google_client_secret,
                redirect_port: RedirectPort::parse(google_redirect_port)?,
                timeout_seconds: google_timeout_seconds,
            },
            schedule: ScheduleSettings {
                project_id: schedule_project_id,
                api_key: schedule_api_key,
                base_url: schedule_base_url.trim_end_matches('/').to_string(),
                timeout_seconds: schedule_timeout_seconds,
            },
            storage: StorageSettings { state_file, token_cache_file },
            telemetry: TelemetrySettings { log_level, json },
        };

        settings.validate()?;
        Ok(settings)
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    pub(crate) fn backend(&self) -> &BackendSettings {
        &self.backend
    }

    pub(crate) fn google(&self) -> &GoogleSettings {
        &self.google
    }

    pub(crate) fn schedule(&self) -> &ScheduleSettings {
        &self.schedule
    }

    pub(crate) fn storage(&self) -> &StorageSettings {
        &self.storage
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !self.backend.endpoint.is_empty()
            && !self.backend.endpoint.starts_with("http://")
            && !self.backend.endpoint.starts_with("https://")
        {
            return Err(ConfigError::InvalidValue {
                field: "BACKEND_URL",
                value: self.backend.endpoint.clone(),
            });
        }

        if !(self.runtime.strict_config || self.runtime.environment.is_production()) {
            return Ok(());
        }

        if self.backend.endpoint.is_empty() {
            return Err(ConfigError::MissingSecret("BACKEND_URL"));
        }
        if self.backend.api_key.is_empty() {
            return Err(ConfigError::MissingSecret("BACKEND_API_KEY"));
        }
        if self.backend.professor_name.is_empty() {
            return Err(ConfigError::MissingSecret("PROFESSOR_NAME"));
        }
        if self.google.client_id.is_empty() {
            return Err(ConfigError::MissingSecret("GOOGLE_CLIENT_ID"));
        }
        if self.schedule.project_id.is_empty() {
            return Err(ConfigError::MissingSecret("SCHEDULE_PROJECT_ID"));
        }
        if self.schedule.api_key.is_empty() {
            return Err(ConfigError::MissingSecret("SCHEDULE_API_KEY"));
        }

        Ok(())
    }
}
