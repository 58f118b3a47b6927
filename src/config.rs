//! Startup configuration.
//!
//! Configuration is loaded from TOML files with the following resolution order:
//! 1. `--config <path>` (CLI flag)
//! 2. `~/.bifrost/config.toml` (user)
//! 3. `/etc/bifrost/config.toml` (system)
//! 4. Built-in defaults
//!
//! Every setting has a default, so the gateway runs with no configuration at
//! all. After the file is read, a few environment variables override it:
//! `AWS_REGION`, `BEDROCK_MODEL_ID` (one-shot generation model) and
//! `BUCKET_NAME` (stream persistence destination; empty means none).
//!
//! Secrets are loaded separately with mandatory permission checks:
//! 1. `~/.bifrost/secrets.toml` (user, must be 0600)
//! 2. `/etc/bifrost/secrets.toml` (system, must be 0600)

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{BifrostError, Result};

/// Gateway configuration. Read once at startup, immutable afterwards.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Region selector substituted into default backend URLs and ARNs.
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub backends: BackendsConfig,
    #[serde(default)]
    pub models: ModelsConfig,
    #[serde(default)]
    pub training: TrainingConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            region: default_region(),
            server: ServerConfig::default(),
            backends: BackendsConfig::default(),
            models: ModelsConfig::default(),
            training: TrainingConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

fn default_region() -> String {
    "us-east-1".to_string()
}

/// Daemon network configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to (default: 127.0.0.1:9742).
    #[serde(default = "default_address")]
    pub address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
        }
    }
}

fn default_address() -> String {
    "127.0.0.1:9742".to_string()
}

/// Base URLs of the remote runtimes. `{region}` is replaced at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendsConfig {
    #[serde(default = "default_model_runtime_url")]
    pub model_runtime_url: String,
    #[serde(default = "default_endpoint_runtime_url")]
    pub endpoint_runtime_url: String,
    #[serde(default = "default_knowledge_runtime_url")]
    pub knowledge_runtime_url: String,
    #[serde(default = "default_training_url")]
    pub training_url: String,
    /// Per-request timeout. Unset means the transport default (none).
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

impl Default for BackendsConfig {
    fn default() -> Self {
        Self {
            model_runtime_url: default_model_runtime_url(),
            endpoint_runtime_url: default_endpoint_runtime_url(),
            knowledge_runtime_url: default_knowledge_runtime_url(),
            training_url: default_training_url(),
            request_timeout_secs: None,
        }
    }
}

fn default_model_runtime_url() -> String {
    "https://bedrock-runtime.{region}.amazonaws.com".to_string()
}

fn default_endpoint_runtime_url() -> String {
    "https://runtime.sagemaker.{region}.amazonaws.com".to_string()
}

fn default_knowledge_runtime_url() -> String {
    "https://bedrock-agent-runtime.{region}.amazonaws.com".to_string()
}

fn default_training_url() -> String {
    "https://api.sagemaker.{region}.amazonaws.com".to_string()
}

/// Model and endpoint identifiers per operation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    pub sentiment_endpoint: String,
    pub sentiment_fallback_model: String,
    pub insights_model: String,
    pub knowledge_base_id: String,
    /// Model used by the knowledge base. Derived from `insights_model` and the
    /// region when unset.
    pub knowledge_model_arn: Option<String>,
    pub generation_model: String,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            sentiment_endpoint: "customer-sentiment-analyzer".to_string(),
            sentiment_fallback_model: "amazon.titan-text-express-v1".to_string(),
            insights_model: "anthropic.claude-3-sonnet-20240229-v1:0".to_string(),
            knowledge_base_id: "default-knowledge-base".to_string(),
            knowledge_model_arn: None,
            generation_model: "amazon.titan-text-lite-v1".to_string(),
        }
    }
}

impl ModelsConfig {
    /// Knowledge-base model ARN, falling back to the insights model in `region`.
    pub fn knowledge_model_arn(&self, region: &str) -> String {
        self.knowledge_model_arn.clone().unwrap_or_else(|| {
            format!(
                "arn:aws:bedrock:{region}::foundation-model/{}",
                self.insights_model
            )
        })
    }
}

/// Fixed parameters of submitted training jobs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Algorithm image; derived from the region when unset.
    pub image: Option<String>,
    pub role_arn: String,
    /// Output prefix; the model name and a trailing slash are appended.
    pub output_prefix: String,
    pub instance_type: String,
    pub instance_count: u32,
    pub volume_size_gb: u32,
    pub max_runtime_secs: u64,
    pub tags: BTreeMap<String, String>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            image: None,
            role_arn: "arn:aws:iam::123456789012:role/TrainingRole".to_string(),
            output_prefix: "s3://ml-artifacts/models".to_string(),
            instance_type: "ml.m5.large".to_string(),
            instance_count: 1,
            volume_size_gb: 10,
            max_runtime_secs: 3600,
            tags: BTreeMap::from([
                ("Environment".to_string(), "Demo".to_string()),
                ("Project".to_string(), "bifrost".to_string()),
            ]),
        }
    }
}

impl TrainingConfig {
    pub fn image(&self, region: &str) -> String {
        self.image.clone().unwrap_or_else(|| {
            format!("382416733822.dkr.ecr.{region}.amazonaws.com/xgboost:latest")
        })
    }
}

/// Where processed stream records are persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Destination bucket. `None` disables persistence.
    pub bucket: Option<String>,
    /// Custom S3 endpoint (MinIO, LocalStack). Unset means AWS.
    pub endpoint_url: Option<String>,
    /// Write buckets as directories below this path instead of to S3.
    pub root: Option<PathBuf>,
}

/// Resolved persistence target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageDestination {
    S3 {
        bucket: String,
        endpoint_url: Option<String>,
    },
    Directory(PathBuf),
}

impl StorageConfig {
    /// Where records go, if a bucket is configured.
    pub fn destination(&self) -> Option<StorageDestination> {
        let bucket = self.bucket.as_ref()?;
        Some(match &self.root {
            Some(root) => StorageDestination::Directory(root.join(bucket)),
            None => StorageDestination::S3 {
                bucket: bucket.clone(),
                endpoint_url: self.endpoint_url.clone(),
            },
        })
    }
}

impl Config {
    /// Load configuration from the standard locations, then apply
    /// environment overrides.
    ///
    /// Resolution order:
    /// 1. Explicit path (if provided; must exist)
    /// 2. `~/.bifrost/config.toml`
    /// 3. `/etc/bifrost/config.toml`
    /// 4. Defaults
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let mut config = match Self::resolve_config_path(explicit_path)? {
            Some(path) => Self::load_from_file(&path)?,
            None => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Parse a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| BifrostError::Configuration(format!("Failed to parse config: {e}")))
    }

    fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            BifrostError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            BifrostError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })
    }

    /// Apply environment overrides through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(region) = lookup("AWS_REGION").filter(|r| !r.is_empty()) {
            self.region = region;
        }
        if let Some(model) = lookup("BEDROCK_MODEL_ID").filter(|m| !m.is_empty()) {
            self.models.generation_model = model;
        }
        if let Some(bucket) = lookup("BUCKET_NAME") {
            self.storage.bucket = (!bucket.is_empty()).then_some(bucket);
        }
    }

    /// Backend base URL with `{region}` substituted.
    pub fn resolve_url(&self, template: &str) -> String {
        template.replace("{region}", &self.region)
    }

    /// Resolve the config file path. `Ok(None)` means use defaults.
    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(BifrostError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        // User config
        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".bifrost").join("config.toml");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        // System config
        let system_config = PathBuf::from("/etc/bifrost/config.toml");
        if system_config.exists() {
            return Ok(Some(system_config));
        }

        Ok(None)
    }
}

/// Backend API keys.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Secrets {
    /// Key used for any backend without its own entry.
    #[serde(default)]
    pub default: Option<ApiKeySecret>,
    #[serde(default)]
    pub model_runtime: Option<ApiKeySecret>,
    #[serde(default)]
    pub endpoint_runtime: Option<ApiKeySecret>,
    #[serde(default)]
    pub knowledge_runtime: Option<ApiKeySecret>,
    #[serde(default)]
    pub training: Option<ApiKeySecret>,
}

/// A single API key secret.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiKeySecret {
    pub api_key: String,
}

/// Environment variable consulted when no secrets file provides a key.
pub const API_KEY_ENV_VAR: &str = "BIFROST_API_KEY";

impl Secrets {
    /// Load secrets from the standard locations with permission checks.
    ///
    /// Returns empty secrets if no file exists (keys may come from the environment).
    pub fn load() -> Result<Self> {
        if let Some(home) = dirs::home_dir() {
            let user_secrets = home.join(".bifrost").join("secrets.toml");
            if user_secrets.exists() {
                Self::check_permissions(&user_secrets)?;
                return Self::load_from_file(&user_secrets);
            }
        }

        let system_secrets = PathBuf::from("/etc/bifrost/secrets.toml");
        if system_secrets.exists() {
            Self::check_permissions(&system_secrets)?;
            return Self::load_from_file(&system_secrets);
        }

        Ok(Secrets::default())
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            BifrostError::Configuration(format!("Failed to read secrets file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            BifrostError::Configuration(format!("Failed to parse secrets file {path:?}: {e}"))
        })
    }

    /// Check that the secrets file has secure permissions (0600 or 0400).
    #[cfg(unix)]
    pub fn check_permissions(path: &Path) -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let metadata = fs::metadata(path).map_err(|e| {
            BifrostError::Configuration(format!("Failed to stat secrets file {path:?}: {e}"))
        })?;

        let mode = metadata.permissions().mode();
        // Reject if group or other bits are set
        if mode & 0o077 != 0 {
            return Err(BifrostError::Configuration(format!(
                "Secrets file {path:?} has insecure permissions {:o}. Must be 0600 or 0400.",
                mode & 0o777
            )));
        }

        Ok(())
    }

    #[cfg(not(unix))]
    pub fn check_permissions(_path: &Path) -> Result<()> {
        Ok(())
    }

    /// API key for a backend: its own entry, then `default`, then the environment.
    pub fn api_key(&self, backend: &str) -> Option<String> {
        self.api_key_with(backend, |name| std::env::var(name).ok())
    }

    fn api_key_with(&self, backend: &str, lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
        let specific = match backend {
            "model_runtime" => self.model_runtime.as_ref(),
            "endpoint_runtime" => self.endpoint_runtime.as_ref(),
            "knowledge_runtime" => self.knowledge_runtime.as_ref(),
            "training" => self.training.as_ref(),
            _ => None,
        };
        specific
            .or(self.default.as_ref())
            .map(|s| s.api_key.clone())
            .or_else(|| lookup(API_KEY_ENV_VAR))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_config_has_expected_values() {
        let config = Config::default();
        assert_eq!(config.region, "us-east-1");
        assert_eq!(config.server.address, "127.0.0.1:9742");
        assert_eq!(config.models.generation_model, "amazon.titan-text-lite-v1");
        assert_eq!(config.models.sentiment_endpoint, "customer-sentiment-analyzer");
        assert!(config.storage.destination().is_none());
    }

    #[test]
    fn parse_minimal_config() {
        let config = Config::from_toml_str("region = \"eu-west-1\"").unwrap();
        assert_eq!(config.region, "eu-west-1");
        assert_eq!(
            config.resolve_url(&config.backends.model_runtime_url),
            "https://bedrock-runtime.eu-west-1.amazonaws.com"
        );
        assert_eq!(
            config.models.knowledge_model_arn(&config.region),
            "arn:aws:bedrock:eu-west-1::foundation-model/anthropic.claude-3-sonnet-20240229-v1:0"
        );
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
            region = "us-west-2"

            [server]
            address = "0.0.0.0:8080"

            [backends]
            model_runtime_url = "http://localhost:9000"
            request_timeout_secs = 20

            [models]
            sentiment_endpoint = "sentiment-v2"
            knowledge_base_id = "kb-123"

            [training]
            instance_count = 2

            [training.tags]
            Owner = "ml-team"

            [storage]
            bucket = "records"
            root = "/var/lib/bifrost"
        "#;
        let config = Config::from_toml_str(toml).unwrap();
        assert_eq!(config.server.address, "0.0.0.0:8080");
        assert_eq!(config.backends.model_runtime_url, "http://localhost:9000");
        assert_eq!(config.backends.request_timeout_secs, Some(20));
        assert_eq!(config.models.sentiment_endpoint, "sentiment-v2");
        // Unset model fields keep defaults
        assert_eq!(config.models.insights_model, "anthropic.claude-3-sonnet-20240229-v1:0");
        assert_eq!(config.training.instance_count, 2);
        assert_eq!(config.training.tags.get("Owner").unwrap(), "ml-team");
        assert_eq!(
            config.storage.destination(),
            Some(StorageDestination::Directory(PathBuf::from(
                "/var/lib/bifrost/records"
            )))
        );
    }

    #[test]
    fn env_overrides_apply() {
        let env = HashMap::from([
            ("AWS_REGION", "ap-south-1"),
            ("BEDROCK_MODEL_ID", "amazon.titan-text-express-v1"),
            ("BUCKET_NAME", "stream-out"),
        ]);
        let mut config = Config::default();
        config.apply_env(|name| env.get(name).map(|v| v.to_string()));
        assert_eq!(config.region, "ap-south-1");
        assert_eq!(config.models.generation_model, "amazon.titan-text-express-v1");
        assert_eq!(config.storage.bucket.as_deref(), Some("stream-out"));
        assert_eq!(
            config.storage.destination(),
            Some(StorageDestination::S3 {
                bucket: "stream-out".to_string(),
                endpoint_url: None,
            })
        );
    }

    #[test]
    fn empty_bucket_disables_persistence() {
        let mut config = Config::from_toml_str("[storage]\nbucket = \"x\"").unwrap();
        config.apply_env(|name| (name == "BUCKET_NAME").then(String::new));
        assert!(config.storage.destination().is_none());
    }

    #[test]
    fn config_not_found_returns_error() {
        let result = Config::load(Some(Path::new("/nonexistent/config.toml")));
        let err = result.unwrap_err().to_string();
        assert!(err.contains("Config file not found"));
    }

    #[test]
    fn api_key_resolution_order() {
        let secrets = Secrets {
            default: Some(ApiKeySecret {
                api_key: "shared".to_string(),
            }),
            training: Some(ApiKeySecret {
                api_key: "train-only".to_string(),
            }),
            ..Default::default()
        };
        let no_env = |_: &str| None;
        assert_eq!(secrets.api_key_with("training", no_env).as_deref(), Some("train-only"));
        assert_eq!(secrets.api_key_with("model_runtime", no_env).as_deref(), Some("shared"));

        let empty = Secrets::default();
        assert_eq!(empty.api_key_with("model_runtime", no_env), None);
        assert_eq!(
            empty
                .api_key_with("model_runtime", |_| Some("from-env".to_string()))
                .as_deref(),
            Some("from-env")
        );
    }

    #[test]
    fn parse_secrets() {
        let secrets: Secrets = toml::from_str(
            r#"
            [default]
            api_key = "k-default"

            [endpoint_runtime]
            api_key = "k-endpoint"
        "#,
        )
        .unwrap();
        assert_eq!(secrets.default.unwrap().api_key, "k-default");
        assert_eq!(secrets.endpoint_runtime.unwrap().api_key, "k-endpoint");
        assert!(secrets.training.is_none());
    }

    #[cfg(unix)]
    #[test]
    fn rejects_world_readable_secrets() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secrets.toml");
        fs::write(&path, "[default]\napi_key = \"k\"\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();
        assert!(Secrets::check_permissions(&path).is_err());

        fs::set_permissions(&path, fs::Permissions::from_mode(0o600)).unwrap();
        assert!(Secrets::check_permissions(&path).is_ok());
    }
}
