//! Configuration management for the Vault CLI
//!
//! Layers, lowest priority first: built-in defaults, the config file, `VAULT_*`
//! environment variables. Command-line flags are applied on top in `meta`.
//! Nothing is read until a command asks for a client.

use anyhow::{Context, Result};
use directories::{BaseDirs, ProjectDirs};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Address used when neither a flag, `VAULT_ADDR` nor the config file set one
pub const DEFAULT_ADDRESS: &str = "https://127.0.0.1:8200";

/// Token file consulted when `VAULT_TOKEN` is unset
const TOKEN_FILE_NAME: &str = ".vault-token";

/// Reads one environment variable
pub type EnvLookup = fn(&str) -> Option<String>;

/// [`EnvLookup`] backed by the process environment
pub fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Vault server address
    pub address: Option<String>,

    /// PEM encoded CA cert file
    pub ca_cert: Option<PathBuf>,

    /// Directory of PEM encoded CA cert files
    pub ca_path: Option<PathBuf>,

    /// Skip TLS certificate verification
    pub tls_skip_verify: Option<bool>,

    /// Where to read the client token from
    pub token_path: Option<PathBuf>,
}

/// Get the config file path
pub fn get_config_path() -> Result<PathBuf> {
    let proj_dirs = ProjectDirs::from("io", "vaultproject", "vault-cli")
        .context("Failed to determine config directory")?;

    Ok(proj_dirs.config_dir().join("config.toml"))
}

/// Load configuration from a file, falling back to defaults when it is absent
pub fn load_config_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;

    // toml's own Display draws a multi-line snippet; keep the cause on one line
    let config: Config = toml::from_str(&content)
        .map_err(|e| {
            let message = e.message().split_whitespace().collect::<Vec<_>>().join(" ");
            let line = e
                .span()
                .and_then(|span| content.get(..span.start))
                .map(|before| before.matches('\n').count() + 1);
            match line {
                Some(line) => anyhow::anyhow!("line {}: {}", line, message),
                None => anyhow::anyhow!("{}", message),
            }
        })
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;

    Ok(config)
}

/// Deferred access to the config file and the environment
#[derive(Clone)]
pub struct ConfigLoader {
    path: Option<PathBuf>,
    env: EnvLookup,
}

impl ConfigLoader {
    /// `path: None` means the platform config directory
    pub fn new(path: Option<PathBuf>, env: EnvLookup) -> Self {
        Self { path, env }
    }

    /// Platform config file and the process environment
    pub fn system() -> Self {
        Self::new(None, process_env)
    }

    /// Read the config file and lay the environment over it
    pub fn load(&self) -> Result<Config> {
        let config = match &self.path {
            Some(path) => load_config_from(path)?,
            None => load_config_from(&get_config_path()?)?,
        };

        config.with_env(self.env)
    }

    /// Resolve the client token for a loaded config
    pub fn token(&self, config: &Config) -> Option<String> {
        config.token_with(self.env)
    }
}

impl Config {
    /// Override settings with non-empty `VAULT_*` variables.
    ///
    /// `VAULT_CACERT` and `VAULT_CAPATH` replace the CA pair as a unit.
    fn with_env(mut self, lookup: EnvLookup) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(address) = var("VAULT_ADDR") {
            self.address = Some(address);
        }

        let (ca_cert, ca_path) = (var("VAULT_CACERT"), var("VAULT_CAPATH"));
        if ca_cert.is_some() || ca_path.is_some() {
            self.ca_cert = ca_cert.map(PathBuf::from);
            self.ca_path = ca_path.map(PathBuf::from);
        }

        if let Some(value) = var("VAULT_SKIP_VERIFY") {
            let skip = parse_bool(value.trim())
                .with_context(|| format!("Invalid VAULT_SKIP_VERIFY value {:?}", value))?;
            self.tls_skip_verify = Some(skip);
        }

        Ok(self)
    }

    /// Resolve the client token.
    ///
    /// `VAULT_TOKEN` wins when non-empty, then `token_path`, then
    /// `~/.vault-token`. A missing token is not an error.
    fn token_with(&self, lookup: EnvLookup) -> Option<String> {
        if let Some(token) = lookup("VAULT_TOKEN").filter(|t| !t.trim().is_empty()) {
            return Some(token.trim().to_string());
        }

        let path = self
            .token_path
            .clone()
            .or_else(|| BaseDirs::new().map(|dirs| dirs.home_dir().join(TOKEN_FILE_NAME)))?;

        read_token_file(&path)
    }
}

/// Boolean spellings accepted in environment variables
fn parse_bool(value: &str) -> Result<bool> {
    match value {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
        _ => anyhow::bail!("expected true or false"),
    }
}

fn read_token_file(path: &Path) -> Option<String> {
    if !path.exists() {
        return None;
    }

    match std::fs::read_to_string(path) {
        Ok(content) => {
            let token = content.trim();
            (!token.is_empty()).then(|| token.to_string())
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), "unable to read token file: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn vault_env(key: &str) -> Option<String> {
        match key {
            "VAULT_ADDR" => Some("https://from-env:8200".to_string()),
            "VAULT_CAPATH" => Some("/etc/vault/ca".to_string()),
            "VAULT_CACERT" => Some("".to_string()),
            "VAULT_SKIP_VERIFY" => Some("1".to_string()),
            _ => None,
        }
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("config.toml")).unwrap();

        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "address = \"https://vault.internal:8200\"\ntls_skip_verify = true\n",
        )
        .unwrap();

        let config = load_config_from(&path).unwrap();

        assert_eq!(config.address.as_deref(), Some("https://vault.internal:8200"));
        assert_eq!(config.tls_skip_verify, Some(true));
        assert!(config.ca_cert.is_none());
        assert!(config.ca_path.is_none());
    }

    #[test]
    fn test_malformed_file_error_is_one_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "tls_skip_verify = true\naddress = [").unwrap();

        let err = load_config_from(&path).unwrap_err();
        let rendered = format!("{:#}", err);

        assert!(rendered.starts_with(&format!(
            "Failed to parse config file {}: ",
            path.display()
        )));
        assert_eq!(rendered.lines().count(), 1);
    }

    #[test]
    fn test_env_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "address = \"https://from-file:8200\"\nca_cert = \"file.pem\"\n",
        )
        .unwrap();

        let config = ConfigLoader::new(Some(path), vault_env).load().unwrap();

        assert_eq!(config.address.as_deref(), Some("https://from-env:8200"));
        assert_eq!(config.ca_cert, None);
        assert_eq!(config.ca_path, Some(PathBuf::from("/etc/vault/ca")));
        assert_eq!(config.tls_skip_verify, Some(true));
    }

    #[test]
    fn test_empty_env_is_ignored() {
        fn blank_env(_: &str) -> Option<String> {
            Some("  ".to_string())
        }

        let dir = tempfile::tempdir().unwrap();
        let config = ConfigLoader::new(Some(dir.path().join("missing.toml")), blank_env)
            .load()
            .unwrap();

        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_bad_skip_verify_env() {
        fn bad_env(key: &str) -> Option<String> {
            (key == "VAULT_SKIP_VERIFY").then(|| "maybe".to_string())
        }

        let dir = tempfile::tempdir().unwrap();
        let err = ConfigLoader::new(Some(dir.path().join("missing.toml")), bad_env)
            .load()
            .unwrap_err();

        assert_eq!(
            format!("{:#}", err),
            "Invalid VAULT_SKIP_VERIFY value \"maybe\": expected true or false"
        );
    }

    #[test]
    fn test_token_from_env_wins() {
        fn token_env(_: &str) -> Option<String> {
            Some("env-token".to_string())
        }

        let dir = tempfile::tempdir().unwrap();
        let token_path = dir.path().join("token");
        std::fs::write(&token_path, "file-token\n").unwrap();

        let config = Config {
            token_path: Some(token_path),
            ..Config::default()
        };

        assert_eq!(config.token_with(token_env).as_deref(), Some("env-token"));
    }

    #[test]
    fn test_token_from_file_is_trimmed() {
        fn blank_env(_: &str) -> Option<String> {
            Some("   ".to_string())
        }

        let dir = tempfile::tempdir().unwrap();
        let token_path = dir.path().join("token");
        std::fs::write(&token_path, "  s.abcdef\n").unwrap();

        let config = Config {
            token_path: Some(token_path),
            ..Config::default()
        };

        assert_eq!(config.token_with(blank_env).as_deref(), Some("s.abcdef"));
    }

    #[test]
    fn test_no_token_anywhere() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            token_path: Some(dir.path().join("missing")),
            ..Config::default()
        };

        assert!(config.token_with(no_env).is_none());
    }
}
