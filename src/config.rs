//! Runtime settings read from the environment (and `.env`, loaded by the binary).

use anyhow::{Context, Result};
use std::time::Duration;

pub const DEFAULT_LOG_FILE_PATH: &str = "logs/grade_rollup.log";
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Environment-driven settings.
///
/// | Variable                    | Meaning                              |
/// |-----------------------------|--------------------------------------|
/// | `GRADES_SOURCE`             | default record source location       |
/// | `GRADES_API_TOKEN`          | bearer token for HTTP record sources |
/// | `GRADES_FETCH_TIMEOUT_SECS` | per-query fetch timeout (30)         |
/// | `LOG_FILE_PATH`             | JSON log file                        |
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub source: Option<String>,
    pub api_token: Option<String>,
    pub fetch_timeout: Duration,
    pub log_file_path: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            source: None,
            api_token: None,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            log_file_path: DEFAULT_LOG_FILE_PATH.to_string(),
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds settings from any variable lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = Settings::default();

        let fetch_timeout = match get("GRADES_FETCH_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = raw
                    .trim()
                    .parse()
                    .with_context(|| format!("GRADES_FETCH_TIMEOUT_SECS must be whole seconds, got '{raw}'"))?;
                Duration::from_secs(secs)
            }
            None => defaults.fetch_timeout,
        };

        Ok(Self {
            source: get("GRADES_SOURCE"),
            api_token: get("GRADES_API_TOKEN"),
            fetch_timeout,
            log_file_path: get("LOG_FILE_PATH").unwrap_or(defaults.log_file_path),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let settings = Settings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_reads_all_variables() {
        let settings = Settings::from_lookup(lookup(&[
            ("GRADES_SOURCE", "s3://grades/all.json"),
            ("GRADES_API_TOKEN", "tok"),
            ("GRADES_FETCH_TIMEOUT_SECS", "5"),
            ("LOG_FILE_PATH", "/tmp/rollup.log"),
        ]))
        .unwrap();

        assert_eq!(settings.source.as_deref(), Some("s3://grades/all.json"));
        assert_eq!(settings.api_token.as_deref(), Some("tok"));
        assert_eq!(settings.fetch_timeout, Duration::from_secs(5));
        assert_eq!(settings.log_file_path, "/tmp/rollup.log");
    }

    #[test]
    fn test_blank_values_are_unset() {
        let settings = Settings::from_lookup(lookup(&[("GRADES_API_TOKEN", "  ")])).unwrap();
        assert_eq!(settings.api_token, None);
    }

    #[test]
    fn test_invalid_timeout() {
        assert!(Settings::from_lookup(lookup(&[("GRADES_FETCH_TIMEOUT_SECS", "soon")])).is_err());
    }
}
