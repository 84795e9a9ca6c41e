// Worker configuration: engine limits and queue polling
use anyhow::{bail, Context, Result};
use fixit_engine::EngineConfig;
use serde::Deserialize;
use std::fs;
use std::path::Path;

pub const DEFAULT_CONFIG_PATH: &str = "config/worker.json";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub engine: EngineConfig,
    /// BLPOP timeout; bounds how long shutdown waits on an idle queue
    pub queue_timeout_secs: f64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            queue_timeout_secs: 5.0,
        }
    }
}

impl WorkerConfig {
    /// Load worker configuration from a JSON file
    pub fn load(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            bail!("Worker config file not found: {}", config_path.display());
        }

        let content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        let config: WorkerConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        if config.queue_timeout_secs <= 0.0 {
            bail!("queue_timeout_secs must be positive");
        }

        Ok(config)
    }

    /// Load from `FIXIT_WORKER_CONFIG`, or config/worker.json
    pub fn load_default() -> Result<Self> {
        let path = std::env::var("FIXIT_WORKER_CONFIG")
            .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load(Path::new(&path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_config() {
        let file = write_config(
            r#"{
                "engine": { "recursion_limit": 256, "loop_iteration_limit": 1000000 },
                "queue_timeout_secs": 2.5
            }"#,
        );
        let config = WorkerConfig::load(file.path()).unwrap();

        assert_eq!(config.engine.recursion_limit, 256);
        assert_eq!(config.engine.loop_iteration_limit, Some(1_000_000));
        // Unset fields keep engine defaults
        assert_eq!(config.engine.stack_size_limit, EngineConfig::default().stack_size_limit);
        assert!(config.engine.capture_console);
        assert_eq!(config.queue_timeout_secs, 2.5);
    }

    #[test]
    fn test_null_loop_limit_means_unbounded() {
        let file = write_config(r#"{ "engine": { "loop_iteration_limit": null } }"#);
        let config = WorkerConfig::load(file.path()).unwrap();
        assert_eq!(config.engine.loop_iteration_limit, None);
    }

    #[test]
    fn test_missing_file() {
        let err = WorkerConfig::load(Path::new("does/not/exist.json")).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_rejects_bad_timeout() {
        let file = write_config(r#"{ "queue_timeout_secs": 0 }"#);
        assert!(WorkerConfig::load(file.path()).is_err());
    }

    #[test]
    fn test_repo_config_parses() {
        let config: WorkerConfig =
            serde_json::from_str(include_str!("../../../config/worker.json")).unwrap();
        assert_eq!(config.engine.loop_iteration_limit, None);
        // Shipped limits match the built-in defaults
        assert_eq!(config.engine, EngineConfig::default());
    }
}
