use std::path::Path;
use std::str::FromStr;

use anyhow::Context;
use tracing::{info, warn};

pub const DEFAULT_DATABASE_URL: &str = "sqlite://trackteam.db?mode=rwc";

pub fn load_environment() -> Result<(), Box<dyn std::error::Error>> {
    let is_production =
        dotenvy::var("ROCKET_PROFILE").unwrap_or("development".to_string()) == "production";

    let env_files = if is_production {
        vec!["config/common.env", "config/prod.env", ".secrets.env"]
    } else {
        vec!["config/common.env", "config/dev.env", ".secrets.env"]
    };

    for env_file in env_files {
        load_env_file(env_file)?;
    }

    Ok(())
}

fn load_env_file(path: &str) -> Result<(), Box<dyn std::error::Error>> {
    if !Path::new(path).exists() {
        warn!("Warning: Environment file {} not found, skipping", path);
        return Ok(());
    }

    dotenvy::from_filename_override(path)?;
    info!("Loaded environment from: {}", path);
    Ok(())
}

/// Credentials for the admin seeded into an empty database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapAdmin {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub database_url: String,
    pub session_ttl_hours: i64,
    pub session_cleanup_interval_secs: u64,
    pub otlp_endpoint: Option<String>,
    pub honeycomb_api_key: Option<String>,
    pub deployment_environment: String,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            session_ttl_hours: 24,
            session_cleanup_interval_secs: 3600,
            otlp_endpoint: None,
            honeycomb_api_key: None,
            deployment_environment: "development".to_string(),
            bootstrap_admin: None,
        }
    }
}

fn optional_var(key: &str) -> Option<String> {
    dotenvy::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parsed_var<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_var(key) {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("{} must be a number, got '{}'", key, raw)),
        None => Ok(default),
    }
}

impl Settings {
    /// Reads settings from the process environment, after `load_environment`.
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let session_ttl_hours = parsed_var("SESSION_TTL_HOURS", defaults.session_ttl_hours)?;
        if session_ttl_hours <= 0 {
            anyhow::bail!("SESSION_TTL_HOURS must be positive, got {}", session_ttl_hours);
        }

        let bootstrap_admin = match (
            optional_var("BOOTSTRAP_ADMIN_EMAIL"),
            optional_var("BOOTSTRAP_ADMIN_PASSWORD"),
        ) {
            (Some(email), Some(password)) => Some(BootstrapAdmin {
                email,
                password,
                name: optional_var("BOOTSTRAP_ADMIN_NAME")
                    .unwrap_or_else(|| "Administrator".to_string()),
            }),
            (Some(_), None) | (None, Some(_)) => {
                warn!("BOOTSTRAP_ADMIN_EMAIL and BOOTSTRAP_ADMIN_PASSWORD must both be set; ignoring");
                None
            }
            (None, None) => None,
        };

        Ok(Self {
            database_url: optional_var("DATABASE_URL").unwrap_or(defaults.database_url),
            session_ttl_hours,
            session_cleanup_interval_secs: parsed_var(
                "SESSION_CLEANUP_INTERVAL_SECS",
                defaults.session_cleanup_interval_secs,
            )?,
            otlp_endpoint: optional_var("OTEL_EXPORTER_OTLP_ENDPOINT"),
            honeycomb_api_key: optional_var("HONEYCOMB_API_KEY"),
            deployment_environment: optional_var("DEPLOYMENT_ENVIRONMENT")
                .unwrap_or(defaults.deployment_environment),
            bootstrap_admin,
        })
    }
}
