use crate::engine::{DedupStrategy, EngineOptions, ReportingPolicy};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub warehouse_url: String,
    pub wallets: Vec<String>,
    pub policy: ReportingPolicy,
    pub dedup: DedupStrategy,
    pub chunk_size: usize,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let warehouse_url = env_map
            .get("WAREHOUSE_URL")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("WAREHOUSE_URL".to_string()))?;

        let policy = match env_map
            .get("POLICY")
            .map(|s| s.as_str())
            .unwrap_or("realized_plus_resolved")
        {
            "realized_only" => ReportingPolicy::RealizedOnly,
            "realized_plus_resolved" => ReportingPolicy::RealizedPlusResolved,
            "full" => ReportingPolicy::Full,
            other => {
                return Err(ConfigError::InvalidValue(
                    "POLICY".to_string(),
                    format!(
                        "must be realized_only, realized_plus_resolved, or full, got {}",
                        other
                    ),
                ))
            }
        };

        let dedup = match env_map
            .get("DEDUP_STRATEGY")
            .map(|s| s.as_str())
            .unwrap_or("per_leg")
        {
            "per_leg" => DedupStrategy::PerLeg,
            "per_event" => DedupStrategy::PerEvent,
            other => {
                return Err(ConfigError::InvalidValue(
                    "DEDUP_STRATEGY".to_string(),
                    format!("must be per_leg or per_event, got {}", other),
                ))
            }
        };

        let chunk_size = env_map
            .get("CHUNK_SIZE")
            .map(|s| s.as_str())
            .unwrap_or("50")
            .parse::<usize>()
            .ok()
            .filter(|&n| n > 0)
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "CHUNK_SIZE".to_string(),
                    "must be a positive integer".to_string(),
                )
            })?;

        let wallets = parse_wallets_from_map(&env_map)?;

        Ok(Config {
            warehouse_url,
            wallets,
            policy,
            dedup,
            chunk_size,
        })
    }

    /// The explicit engine configuration this run uses.
    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            policy: self.policy,
            dedup: self.dedup,
        }
    }
}

fn parse_wallets_from_map(env_map: &HashMap<String, String>) -> Result<Vec<String>, ConfigError> {
    if let Some(wallets_str) = env_map.get("WALLETS") {
        Ok(wallets_str
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect())
    } else if let Some(file_path) = env_map.get("WALLETS_FILE") {
        let content = std::fs::read_to_string(file_path).map_err(|_| {
            ConfigError::InvalidValue(
                "WALLETS_FILE".to_string(),
                "file not found or unreadable".to_string(),
            )
        })?;
        Ok(content
            .lines()
            .map(|line| line.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect())
    } else {
        Ok(Vec::new())
    }
}
