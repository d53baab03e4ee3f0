use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Startup fails if a required variable is missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// When unset, notifications are composed from templates only.
    pub anthropic_api_key: Option<String>,
    pub port: u16,
    pub rust_log: String,
    pub health: HealthConfig,
}

/// Tunables for the pod health computation.
#[derive(Debug, Clone, Copy)]
pub struct HealthConfig {
    pub window_weeks: u32,
    pub intervention_threshold: f64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            window_weeks: 4,
            intervention_threshold: 60.0,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let defaults = HealthConfig::default();

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            anthropic_api_key: std::env::var("ANTHROPIC_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            port: optional_env("PORT", 8080).context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            health: HealthConfig {
                window_weeks: optional_env("HEALTH_WINDOW_WEEKS", defaults.window_weeks)
                    .context("HEALTH_WINDOW_WEEKS must be a positive integer")?
                    .max(1),
                intervention_threshold: optional_env(
                    "HEALTH_INTERVENTION_THRESHOLD",
                    defaults.intervention_threshold,
                )
                .context("HEALTH_INTERVENTION_THRESHOLD must be a number")?
                .clamp(0.0, 100.0),
            },
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => Ok(raw.trim().parse::<T>()?),
        Err(_) => Ok(default),
    }
}
