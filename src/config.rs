use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::encode::EvasionLevel;
use crate::error::{EvasionError, Result};
use crate::payloads::load_payload_file;
use crate::registry::AttackType;
use crate::waf::parse_target;

pub const DEFAULT_TIMEOUT_SECS: u64 = 5;
pub const MAX_TIMEOUT_SECS: u64 = 9;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadSource {
    Inline(Vec<String>),
    File(PathBuf),
}

impl Default for PayloadSource {
    fn default() -> Self {
        PayloadSource::Inline(Vec::new())
    }
}

impl PayloadSource {
    pub async fn load(&self) -> Result<Vec<String>> {
        match self {
            PayloadSource::Inline(payloads) => Ok(payloads.clone()),
            PayloadSource::File(path) => load_payload_file(path).await,
        }
    }
}

/// Run settings handed to the engine. Call `validate` before use.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub attack_type: AttackType,
    pub level: EvasionLevel,
    pub payload_source: PayloadSource,
    pub target: Option<String>,
    pub fingerprint: bool,
    /// Fixed seed for randomized techniques.
    pub seed: Option<u64>,
    pub timeout_secs: u64,
    pub concurrency: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            attack_type: AttackType::default(),
            level: EvasionLevel::default(),
            payload_source: PayloadSource::default(),
            target: None,
            fingerprint: false,
            seed: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            concurrency: 4,
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()
    }

    pub async fn from_json_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| EvasionError::ConfigFile {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_json(&content)
    }

    /// Checks cross-field rules and normalizes the timeout and concurrency.
    pub fn validate(mut self) -> Result<Self> {
        if self.fingerprint && self.target.is_none() {
            return Err(EvasionError::InvalidConfig(
                "fingerprinting requires a target URL".to_string(),
            ));
        }
        if let Some(target) = &self.target {
            parse_target(target)?;
        }
        if let PayloadSource::Inline(payloads) = &self.payload_source {
            if payloads.is_empty() {
                return Err(EvasionError::InvalidConfig(
                    "no payloads given".to_string(),
                ));
            }
        }
        self.timeout_secs = self.timeout_secs.clamp(1, MAX_TIMEOUT_SECS);
        self.concurrency = self.concurrency.max(1);
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inline(p: &[&str]) -> PayloadSource {
        PayloadSource::Inline(p.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_defaults() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.attack_type, AttackType::Generic);
        assert_eq!(cfg.level, EvasionLevel::Basic);
        assert_eq!(cfg.timeout_secs, 5);
    }

    #[test]
    fn test_fingerprint_needs_target() {
        let cfg = EngineConfig {
            payload_source: inline(&["x"]),
            fingerprint: true,
            ..Default::default()
        };
        assert!(cfg.validate().unwrap_err().is_configuration());
    }

    #[test]
    fn test_rejects_non_http_target() {
        let cfg = EngineConfig {
            payload_source: inline(&["x"]),
            target: Some("gopher://example.com".into()),
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(EvasionError::InvalidTarget { .. })));
    }

    #[test]
    fn test_rejects_empty_inline_payloads() {
        assert!(EngineConfig::default().validate().is_err());
    }

    #[test]
    fn test_timeout_is_clamped() {
        let cfg = EngineConfig {
            payload_source: inline(&["x"]),
            timeout_secs: 60,
            concurrency: 0,
            ..Default::default()
        }
        .validate()
        .unwrap();
        assert_eq!(cfg.timeout_secs, MAX_TIMEOUT_SECS);
        assert_eq!(cfg.concurrency, 1);
    }

    #[test]
    fn test_from_json() {
        let cfg = EngineConfig::from_json(
            r#"{
                "attack_type": "xss",
                "level": "medium",
                "payload_source": {"inline": ["<svg onload=alert(1)>"]},
                "target": "https://example.com",
                "fingerprint": true,
                "seed": 7
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.attack_type, AttackType::Xss);
        assert_eq!(cfg.level, EvasionLevel::Medium);
        assert_eq!(cfg.seed, Some(7));
        assert_eq!(cfg.concurrency, 4);
    }

    #[tokio::test]
    async fn test_missing_config_file_names_the_config() {
        let path = Path::new("/nonexistent/waf_evader/run.json");
        let err = EngineConfig::from_json_file(path).await.unwrap_err();
        assert!(matches!(&err, EvasionError::ConfigFile { path: p, .. } if p == path));
        assert!(err.is_configuration());
        assert!(err.to_string().starts_with("Failed to read config file"));
    }

    #[test]
    fn test_from_json_unknown_level() {
        let err = EngineConfig::from_json(r#"{"level": "extreme", "payload_source": {"inline": ["x"]}}"#).unwrap_err();
        assert!(matches!(err, EvasionError::Serialization(_)));
    }
}
