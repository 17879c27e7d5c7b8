use std::path::PathBuf;

use anyhow::{bail, Context, Result};

/// Service configuration loaded from environment variables.
/// Provider credentials live in `llm_client::BackendSettings`, not here.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    /// Preferred provider name (`LLM_PROVIDER`). Empty counts as unset.
    pub llm_provider: Option<String>,
    /// Directory holding company.json, audience.json and pain_points.json.
    pub leads_config_dir: PathBuf,
    pub batch_concurrency: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            llm_provider: std::env::var("LLM_PROVIDER")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            leads_config_dir: std::env::var("LEADS_CONFIG_DIR")
                .unwrap_or_else(|_| "config".to_string())
                .into(),
            batch_concurrency: parse_concurrency(std::env::var("BATCH_CONCURRENCY").ok())?,
        })
    }
}

fn parse_concurrency(raw: Option<String>) -> Result<usize> {
    let Some(raw) = raw.filter(|v| !v.trim().is_empty()) else {
        return Ok(1);
    };
    let value = raw
        .trim()
        .parse::<usize>()
        .with_context(|| format!("BATCH_CONCURRENCY must be a positive integer, got '{raw}'"))?;
    if value == 0 {
        bail!("BATCH_CONCURRENCY must be at least 1");
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concurrency_defaults_to_sequential() {
        assert_eq!(parse_concurrency(None).unwrap(), 1);
        assert_eq!(parse_concurrency(Some("  ".to_string())).unwrap(), 1);
    }

    #[test]
    fn test_concurrency_parses_positive_values() {
        assert_eq!(parse_concurrency(Some(" 4 ".to_string())).unwrap(), 4);
    }

    #[test]
    fn test_concurrency_rejects_zero_and_garbage() {
        assert!(parse_concurrency(Some("0".to_string())).is_err());
        assert!(parse_concurrency(Some("many".to_string())).is_err());
        assert!(parse_concurrency(Some("-2".to_string())).is_err());
    }
}
