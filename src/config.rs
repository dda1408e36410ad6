//! Runtime configuration, sourced from `CANELEDGER_*` environment variables
//! with sensible local-development defaults.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

use crate::pipeline::status::DEFAULT_CONFIDENCE_THRESHOLD;

pub const APP_NAME: &str = "CaneLedger";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value} ({reason})")]
    Invalid {
        var: String,
        value: String,
        reason: String,
    },
}

/// Application data directory, ~/CaneLedger/ on all platforms.
pub fn app_data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join(APP_NAME)
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Address the HTTP API binds to.
    pub bind_addr: SocketAddr,
    /// SQLite database file.
    pub db_path: PathBuf,
    /// Root directory of the filesystem object store.
    pub storage_root: PathBuf,
    /// Base URL prepended to object paths to form public image URLs.
    pub public_base_url: String,
    /// Ollama-compatible inference endpoint.
    pub inference_url: String,
    pub inference_timeout_secs: u64,
    /// Vision model fallback chain, tried in order.
    pub model_chain: Vec<String>,
    /// Completeness score at or above which a receipt auto-completes.
    pub confidence_threshold: u8,
    pub max_upload_bytes: usize,
    /// Bearer token → owner id.
    pub api_tokens: HashMap<String, String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build a config from an arbitrary variable source. Tests inject a
    /// closure instead of mutating the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let data_dir = app_data_dir();

        let bind_addr = parse_var(
            &lookup,
            "CANELEDGER_BIND",
            "127.0.0.1:8470".parse().map_err(|_| ConfigError::Invalid {
                var: "CANELEDGER_BIND".into(),
                value: "127.0.0.1:8470".into(),
                reason: "default bind address failed to parse".into(),
            })?,
        )?;

        let db_path = lookup("CANELEDGER_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("caneledger.db"));

        let storage_root = lookup("CANELEDGER_STORAGE_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("objects"));

        let public_base_url = lookup("CANELEDGER_PUBLIC_BASE_URL")
            .unwrap_or_else(|| "http://127.0.0.1:8470/files".to_string());

        let inference_url = lookup("CANELEDGER_INFERENCE_URL")
            .unwrap_or_else(|| "http://localhost:11434".to_string());

        let inference_timeout_secs =
            parse_var(&lookup, "CANELEDGER_INFERENCE_TIMEOUT_SECS", 120u64)?;

        let model_chain = lookup("CANELEDGER_MODELS")
            .map(|csv| {
                csv.split(',')
                    .map(|m| m.trim().to_string())
                    .filter(|m| !m.is_empty())
                    .collect()
            })
            .unwrap_or_else(default_model_chain);

        let confidence_threshold = parse_var(
            &lookup,
            "CANELEDGER_CONFIDENCE_THRESHOLD",
            DEFAULT_CONFIDENCE_THRESHOLD,
        )?;

        let max_upload_bytes = parse_var(
            &lookup,
            "CANELEDGER_MAX_UPLOAD_BYTES",
            DEFAULT_MAX_UPLOAD_BYTES,
        )?;

        let api_tokens = lookup("CANELEDGER_API_TOKENS")
            .map(|raw| parse_token_map(&raw))
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            bind_addr,
            db_path,
            storage_root,
            public_base_url,
            inference_url,
            inference_timeout_secs,
            model_chain,
            confidence_threshold,
            max_upload_bytes,
            api_tokens,
        })
    }
}

fn default_model_chain() -> Vec<String> {
    vec![
        "qwen2.5vl:7b".to_string(),
        "llava:13b".to_string(),
        "minicpm-v:8b".to_string(),
    ]
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(var) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            var: var.to_string(),
            value: raw,
            reason: format!("expected a {}", std::any::type_name::<T>()),
        }),
        None => Ok(default),
    }
}

/// Parse "token:owner,token:owner" into a token → owner map.
fn parse_token_map(raw: &str) -> Result<HashMap<String, String>, ConfigError> {
    let mut tokens = HashMap::new();
    for pair in raw.split(',').filter(|p| !p.trim().is_empty()) {
        let (token, owner) = pair.trim().split_once(':').ok_or_else(|| ConfigError::Invalid {
            var: "CANELEDGER_API_TOKENS".into(),
            value: pair.to_string(),
            reason: "expected token:owner".into(),
        })?;
        if token.is_empty() || owner.is_empty() {
            return Err(ConfigError::Invalid {
                var: "CANELEDGER_API_TOKENS".into(),
                value: pair.to_string(),
                reason: "empty token or owner".into(),
            });
        }
        tokens.insert(token.to_string(), owner.to_string());
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn defaults_apply_with_empty_environment() {
        let config = AppConfig::from_lookup(empty_env).unwrap();
        assert_eq!(config.bind_addr.port(), 8470);
        assert_eq!(config.inference_url, "http://localhost:11434");
        assert_eq!(config.confidence_threshold, 50);
        assert_eq!(config.max_upload_bytes, 5 * 1024 * 1024);
        assert_eq!(config.model_chain.len(), 3);
        assert!(config.api_tokens.is_empty());
        assert!(config.db_path.ends_with("caneledger.db"));
    }

    #[test]
    fn model_chain_parses_csv_in_order() {
        let config = AppConfig::from_lookup(|var| match var {
            "CANELEDGER_MODELS" => Some(" llava:13b , qwen2.5vl:7b ,".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.model_chain, vec!["llava:13b", "qwen2.5vl:7b"]);
    }

    #[test]
    fn token_map_parses_pairs() {
        let config = AppConfig::from_lookup(|var| match var {
            "CANELEDGER_API_TOKENS" => Some("tok-a:farmer-1,tok-b:farmer-2".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.api_tokens.get("tok-a").map(String::as_str), Some("farmer-1"));
        assert_eq!(config.api_tokens.get("tok-b").map(String::as_str), Some("farmer-2"));
    }

    #[test]
    fn malformed_token_pair_is_rejected() {
        let result = AppConfig::from_lookup(|var| match var {
            "CANELEDGER_API_TOKENS" => Some("no-colon-here".to_string()),
            _ => None,
        });
        assert!(result.is_err());
    }

    #[test]
    fn invalid_threshold_is_rejected() {
        let result = AppConfig::from_lookup(|var| match var {
            "CANELEDGER_CONFIDENCE_THRESHOLD" => Some("not-a-number".to_string()),
            _ => None,
        });
        assert!(result.is_err());
    }

    #[test]
    fn threshold_override_applies() {
        let config = AppConfig::from_lookup(|var| match var {
            "CANELEDGER_CONFIDENCE_THRESHOLD" => Some("75".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.confidence_threshold, 75);
    }

    #[test]
    fn app_data_dir_under_home() {
        let dir = app_data_dir();
        let home = dirs::home_dir().unwrap();
        assert!(dir.starts_with(home));
        assert!(dir.ends_with(APP_NAME));
    }
}
