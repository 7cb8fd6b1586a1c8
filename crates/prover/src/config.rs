//! Configuration loading for the notary pipeline.
//!
//! Settings come from a TOML file, fall back to built-in defaults, and can be
//! overridden by environment variables (`MERKLE_TREE_HEIGHT`, `ZERO_VALUE`,
//! `NOTARY_KEYS_DIR`, `NOTARY_BIND`, `NOTARY_MULTISIG`,
//! `NOTARY_PROVER_TIMEOUT_SECS`).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use notary_merkle::{TreeConfig, ZeroValue, DEFAULT_DOCUMENT_HEIGHT};

use crate::address::Address;
use crate::error::NotaryError;

const DEFAULT_PROVER_TIMEOUT_SECS: u64 = 120;
const DEFAULT_BIND: &str = "0.0.0.0:3001";

/// Full notary configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotaryConfig {
    #[serde(default)]
    pub tree: TreeConfig,
    #[serde(default)]
    pub document: DocumentConfig,
    #[serde(default)]
    pub prover: ProverConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentConfig {
    #[serde(default = "default_document_height")]
    pub height: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProverConfig {
    #[serde(default = "default_prover_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_keys_dir")]
    pub keys_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Account allowed to issue and revoke on the local ledger
    #[serde(default)]
    pub multisig: Address,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            height: DEFAULT_DOCUMENT_HEIGHT,
        }
    }
}

impl Default for ProverConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_PROVER_TIMEOUT_SECS,
            keys_dir: default_keys_dir(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            multisig: Address::default(),
        }
    }
}

fn default_document_height() -> usize {
    DEFAULT_DOCUMENT_HEIGHT
}

fn default_prover_timeout_secs() -> u64 {
    DEFAULT_PROVER_TIMEOUT_SECS
}

fn default_keys_dir() -> PathBuf {
    PathBuf::from("keys")
}

fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

impl ProverConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl NotaryConfig {
    pub fn load_from_file(path: &Path) -> Result<Self, NotaryError> {
        let content = std::fs::read_to_string(path)?;
        let config: NotaryConfig = toml::from_str(&content)
            .map_err(|e| NotaryError::Config(format!("{}: {}", path.display(), e)))?;
        config.tree.validate()?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<(), NotaryError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| NotaryError::Serialization(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), NotaryError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from any variable lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), NotaryError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(height) = lookup("MERKLE_TREE_HEIGHT") {
            self.tree.height = height
                .trim()
                .parse()
                .map_err(|_| NotaryError::Config(format!("MERKLE_TREE_HEIGHT={}", height)))?;
        }
        if let Some(zero) = lookup("ZERO_VALUE") {
            self.tree.zero = zero.parse::<ZeroValue>()?;
        }
        if let Some(dir) = lookup("NOTARY_KEYS_DIR") {
            self.prover.keys_dir = PathBuf::from(dir);
        }
        if let Some(bind) = lookup("NOTARY_BIND") {
            self.server.bind = bind;
        }
        if let Some(multisig) = lookup("NOTARY_MULTISIG") {
            self.server.multisig = multisig.trim().parse()?;
        }
        if let Some(secs) = lookup("NOTARY_PROVER_TIMEOUT_SECS") {
            self.prover.timeout_secs = secs.trim().parse().map_err(|_| {
                NotaryError::Config(format!("NOTARY_PROVER_TIMEOUT_SECS={}", secs))
            })?;
        }

        self.tree.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use ark_bn254::Fr;

    #[test]
    fn test_default_config() {
        let config = NotaryConfig::default();
        assert_eq!(config.tree.height, 12);
        assert_eq!(config.tree.zero, ZeroValue::default());
        assert_eq!(config.document.height, 3);
        assert_eq!(config.prover.timeout(), Duration::from_secs(120));
        assert_eq!(config.server.bind, "0.0.0.0:3001");
        assert_eq!(config.server.multisig, Address::default());
    }

    #[test]
    fn test_custom_config() {
        let config_toml = r#"
            [tree]
            height = 20
            zero = "keccak256:tornado"

            [prover]
            keys_dir = "/var/lib/notary/keys"
        "#;
        let config: NotaryConfig = toml::from_str(config_toml).unwrap();

        assert_eq!(config.tree.height, 20);
        assert_eq!(config.tree.zero, ZeroValue::Domain("tornado".to_string()));
        assert_eq!(config.prover.keys_dir, PathBuf::from("/var/lib/notary/keys"));
        assert_eq!(config.prover.timeout_secs, 120);
        assert_eq!(config.document.height, 3);
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> =
            [
                ("MERKLE_TREE_HEIGHT", "20"),
                ("ZERO_VALUE", "0x2a"),
                ("NOTARY_MULTISIG", "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"),
            ]
            .into_iter()
            .collect();
        let mut config = NotaryConfig::default();
        config
            .apply_overrides(|name| vars.get(name).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.tree.height, 20);
        assert_eq!(config.tree.zero, ZeroValue::Literal(Fr::from(42u64)));
        assert_eq!(
            config.server.multisig.to_string(),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );
    }

    #[test]
    fn test_bad_overrides_rejected() {
        let mut config = NotaryConfig::default();
        assert!(matches!(
            config.apply_overrides(|name| (name == "MERKLE_TREE_HEIGHT").then(|| "tall".to_string())),
            Err(NotaryError::Config(_))
        ));

        let mut config = NotaryConfig::default();
        assert!(config
            .apply_overrides(|name| (name == "MERKLE_TREE_HEIGHT").then(|| "0".to_string()))
            .is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf").join("notary.toml");
        let mut config = NotaryConfig::default();
        config.tree.height = 8;
        config.save_to_file(&path).unwrap();

        let loaded = NotaryConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }
}
