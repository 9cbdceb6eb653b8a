//! HealthBridge configuration.
//!
//! Precedence: defaults < TOML file (`HEALTHBRIDGE_CONFIG`, default `config/healthbridge`)
//! < environment (`HEALTHBRIDGE__<KEY>`). Change storage, model, and timeout behavior
//! without code edits.
//!
//! | Key | Default | Description |
//! |-----|---------|-------------|
//! | storage_path | ./data | Directory for the sled database. |
//! | storage_backend | sled | "sled" or "memory" (nothing survives a restart). |
//! | key_prefix | hb_ | Prefix for the `profile` / `readings` records. |
//! | llm_mode | mock | "mock" (offline canned replies) or "gemini". |
//! | request_timeout_secs | 30 | Upper bound on every AI call. |
//! | retry_attempts | 3 | Total tries for transient AI failures. |
//! | retry_base_delay_ms | 500 | First backoff delay; doubles per retry. |

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

fn default_app_name() -> String {
    "HealthBridge SA".to_string()
}

fn default_storage_path() -> String {
    "./data".to_string()
}

fn default_storage_backend() -> String {
    "sled".to_string()
}

fn default_key_prefix() -> String {
    "hb_".to_string()
}

fn default_llm_mode() -> String {
    "mock".to_string()
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_insights_model() -> String {
    "gemini-3-flash-preview".to_string()
}

fn default_clinics_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_triage_model() -> String {
    "gemini-3-pro-preview".to_string()
}

fn default_plan_model() -> String {
    "gemini-3-flash-preview".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    500
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthBridgeConfig {
    #[serde(default = "default_app_name")]
    pub app_name: String,
    /// Base directory for the sled database.
    #[serde(default = "default_storage_path")]
    pub storage_path: String,
    #[serde(default = "default_storage_backend")]
    pub storage_backend: String,
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    #[serde(default = "default_llm_mode")]
    pub llm_mode: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_insights_model")]
    pub insights_model: String,
    #[serde(default = "default_clinics_model")]
    pub clinics_model: String,
    #[serde(default = "default_triage_model")]
    pub triage_model: String,
    #[serde(default = "default_plan_model")]
    pub plan_model: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    /// Fixed position reported by the terminal geolocator. Unset means "denied".
    #[serde(default)]
    pub default_latitude: Option<f64>,
    #[serde(default)]
    pub default_longitude: Option<f64>,
}

impl Default for HealthBridgeConfig {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
            storage_path: default_storage_path(),
            storage_backend: default_storage_backend(),
            key_prefix: default_key_prefix(),
            llm_mode: default_llm_mode(),
            api_key: None,
            api_base_url: default_api_base_url(),
            insights_model: default_insights_model(),
            clinics_model: default_clinics_model(),
            triage_model: default_triage_model(),
            plan_model: default_plan_model(),
            request_timeout_secs: default_request_timeout_secs(),
            retry_attempts: default_retry_attempts(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            default_latitude: None,
            default_longitude: None,
        }
    }
}

impl HealthBridgeConfig {
    /// Load config from file and environment. Precedence: env `HEALTHBRIDGE_CONFIG` path >
    /// `config/healthbridge.toml` > defaults, then `HEALTHBRIDGE__*` overrides.
    pub fn load() -> Result<Self, ::config::ConfigError> {
        let config_path = std::env::var("HEALTHBRIDGE_CONFIG")
            .unwrap_or_else(|_| "config/healthbridge.toml".to_string());
        Self::load_from(Path::new(&config_path))
    }

    pub fn load_from(path: &Path) -> Result<Self, ::config::ConfigError> {
        let builder = ::config::Config::builder()
            .set_default("app_name", default_app_name())?
            .set_default("storage_path", default_storage_path())?
            .set_default("storage_backend", default_storage_backend())?
            .set_default("key_prefix", default_key_prefix())?
            .set_default("llm_mode", default_llm_mode())?;

        let builder = if path.exists() {
            builder.add_source(::config::File::from(path))
        } else {
            builder
        };

        let built = builder
            .add_source(::config::Environment::with_prefix("HEALTHBRIDGE").separator("__"))
            .build()?;

        built.try_deserialize()
    }

    /// API key with fallback to environment.
    /// Priority: config `api_key` > GEMINI_API_KEY > API_KEY. Blank values are ignored.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|s| !s.trim().is_empty())
            .or_else(|| std::env::var("GEMINI_API_KEY").ok().filter(|s| !s.trim().is_empty()))
            .or_else(|| std::env::var("API_KEY").ok().filter(|s| !s.trim().is_empty()))
            .map(|s| s.trim().to_string())
    }

    /// True when AI calls should go to the remote service rather than the offline mock.
    pub fn uses_remote_ai(&self) -> bool {
        self.llm_mode.trim().eq_ignore_ascii_case("gemini")
    }

    pub fn uses_memory_storage(&self) -> bool {
        self.storage_backend.trim().eq_ignore_ascii_case("memory")
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    /// Configured fixed position, if both coordinates are set.
    pub fn default_position(&self) -> Option<(f64, f64)> {
        self.default_latitude.zip(self.default_longitude)
    }
}
