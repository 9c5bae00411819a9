use clap::{Args, Parser, ValueEnum};

/// Application server (VAPID) public key the CRM backend signs pushes with.
pub const DEFAULT_VAPID_PUBLIC_KEY: &str =
    "BIxMEGY-o1sP7ILLHZU4tfqCVdNqY5GHqhf-HjNqHGcAQi_4Koq-N4wr0QZYaSJG2KX6kxywcMxvLHZnRQM8M7g";

#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Bearer token to seed the simulated client storage with
    #[arg(long, env = "CRM_PUSH_AUTH_TOKEN")]
    pub auth_token: Option<String>,

    #[command(flatten)]
    pub api: ApiConfig,

    #[command(flatten)]
    pub worker: WorkerConfig,

    #[command(flatten)]
    pub telemetry: TelemetryConfig,
}

#[derive(Clone, Debug, Args)]
pub struct ApiConfig {
    /// Base URL of the CRM REST API
    #[arg(long, env = "CRM_PUSH_API_BASE_URL", default_value = "http://localhost:5000")]
    pub base_url: String,

    /// Base64url-encoded VAPID public key of the push sender
    #[arg(long, env = "CRM_PUSH_VAPID_PUBLIC_KEY", default_value = DEFAULT_VAPID_PUBLIC_KEY)]
    pub vapid_public_key: String,

    /// Key under which the auth token is kept in client storage
    #[arg(long, env = "CRM_PUSH_TOKEN_STORAGE_KEY", default_value = "token")]
    pub token_storage_key: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            vapid_public_key: DEFAULT_VAPID_PUBLIC_KEY.to_string(),
            token_storage_key: "token".to_string(),
        }
    }
}

#[derive(Clone, Debug, Args)]
pub struct WorkerConfig {
    /// Path of the background worker script
    #[arg(long, env = "CRM_PUSH_WORKER_SCRIPT", default_value = "/sw.js")]
    pub script_path: String,

    /// Scope the worker is registered for
    #[arg(long, env = "CRM_PUSH_WORKER_SCOPE", default_value = "/")]
    pub scope: String,

    /// Pushes arriving closer together than this are collapsed into one
    #[arg(long, env = "CRM_PUSH_DEDUP_WINDOW_MS", default_value_t = 1000)]
    pub dedup_window_ms: u64,

    /// Icon shown when the payload does not carry one
    #[arg(long, env = "CRM_PUSH_DEFAULT_ICON", default_value = "/1logo_no_bg.png")]
    pub default_icon: String,

    /// Capacity of the worker event queue
    #[arg(long, env = "CRM_PUSH_EVENT_BUFFER_SIZE", default_value_t = 64)]
    pub event_buffer_size: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            script_path: "/sw.js".to_string(),
            scope: "/".to_string(),
            dedup_window_ms: 1000,
            default_icon: "/1logo_no_bg.png".to_string(),
            event_buffer_size: 64,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Clone, Debug, Default, Args)]
pub struct TelemetryConfig {
    /// Log output format
    #[arg(long, env = "CRM_PUSH_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// OTLP collector endpoint; metrics and traces are only exported when set
    #[arg(long, env = "CRM_PUSH_OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,
}

impl Config {
    #[must_use]
    pub fn load() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_fixed_constants() {
        let config = Config::parse_from(["crm-push"]);
        assert_eq!(config.worker.dedup_window_ms, 1000);
        assert_eq!(config.worker.default_icon, "/1logo_no_bg.png");
        assert_eq!(config.worker.scope, "/");
        assert_eq!(config.api.token_storage_key, "token");
        assert_eq!(config.api.vapid_public_key, DEFAULT_VAPID_PUBLIC_KEY);
        assert_eq!(config.telemetry.log_format, LogFormat::Text);
        assert!(config.auth_token.is_none());
    }

    #[test]
    fn test_flags_override_defaults() {
        let config = Config::parse_from([
            "crm-push",
            "--base-url",
            "https://crm.example.com",
            "--dedup-window-ms",
            "250",
            "--log-format",
            "json",
        ]);
        assert_eq!(config.api.base_url, "https://crm.example.com");
        assert_eq!(config.worker.dedup_window_ms, 250);
        assert_eq!(config.telemetry.log_format, LogFormat::Json);
    }
}
