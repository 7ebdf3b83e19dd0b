use crate::types::Identifier;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Resource path templates, relative to the API base URL.
///
/// `{run_id}` is substituted with the simulation run identifier. Templates for
/// per-bot collections get `bot_config_id` appended as a query parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub run: String,
    pub results: String,
    pub daily_results: String,
    pub ticks: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            run: "simulations/{run_id}/".to_string(),
            results: "simulations/{run_id}/results/".to_string(),
            daily_results: "simulations/{run_id}/daily-results/".to_string(),
            ticks: "simulations/{run_id}/ticks/".to_string(),
        }
    }
}

impl Endpoints {
    /// Path of the run resource.
    pub fn run_path(&self, run_id: &Identifier) -> String {
        expand(&self.run, run_id)
    }

    /// Path of the bot result summaries.
    pub fn results_path(&self, run_id: &Identifier) -> String {
        expand(&self.results, run_id)
    }

    /// Path of the per-day results for one bot configuration.
    pub fn daily_results_path(&self, run_id: &Identifier, bot_config_id: &Identifier) -> String {
        with_bot_config(expand(&self.daily_results, run_id), bot_config_id)
    }

    /// Path of the tick records for one bot configuration.
    pub fn ticks_path(&self, run_id: &Identifier, bot_config_id: &Identifier) -> String {
        with_bot_config(expand(&self.ticks, run_id), bot_config_id)
    }
}

fn expand(template: &str, run_id: &Identifier) -> String {
    template.replace("{run_id}", &run_id.to_string())
}

fn with_bot_config(path: String, bot_config_id: &Identifier) -> String {
    let query =
        serde_urlencoded::to_string([("bot_config_id", bot_config_id.to_string())]).unwrap_or_default();
    let sep = if path.contains('?') { '&' } else { '?' };
    format!("{}{}{}", path, sep, query)
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// API base URL, including any version prefix.
    pub api_base: String,
    /// Bearer token attached to every request.
    pub api_token: Option<String>,
    /// Interval between run refreshes while a simulation is active (ms).
    pub poll_interval_ms: u64,
    /// Per-request timeout (ms).
    pub request_timeout_ms: u64,
    /// Upper bound on pages followed in one pagination walk.
    pub max_pages: usize,
    /// Lines kept in the in-memory log buffer.
    pub log_capacity: usize,
    /// Resource path templates.
    pub endpoints: Endpoints,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Endpoints::default();

        Self {
            api_base: env::var("SIMVIEW_API_BASE")
                .unwrap_or_else(|_| "http://localhost:8000/api/v1".to_string()),
            api_token: env::var("SIMVIEW_API_TOKEN").ok().filter(|t| !t.is_empty()),
            poll_interval_ms: parse_var("SIMVIEW_POLL_INTERVAL_MS", 5_000),
            request_timeout_ms: parse_var("SIMVIEW_REQUEST_TIMEOUT_MS", 15_000),
            max_pages: parse_var("SIMVIEW_MAX_PAGES", 1_000),
            log_capacity: parse_var("SIMVIEW_LOG_CAPACITY", 500),
            endpoints: Endpoints {
                run: env::var("SIMVIEW_RUN_PATH").unwrap_or(defaults.run),
                results: env::var("SIMVIEW_RESULTS_PATH").unwrap_or(defaults.results),
                daily_results: env::var("SIMVIEW_DAILY_PATH").unwrap_or(defaults.daily_results),
                ticks: env::var("SIMVIEW_TICKS_PATH").unwrap_or(defaults.ticks),
            },
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(100))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

fn parse_var<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
