//! Object stores for processed stream records.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::{Builder as S3Builder, Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use tokio::sync::{Mutex, OnceCell};

use crate::{BifrostError, Result};

/// Destination for persisted records.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store name for logging.
    fn name(&self) -> &str;

    /// Write `body` under `key`, replacing any existing object.
    async fn put(&self, key: &str, body: Vec<u8>) -> Result<()>;
}

/// Configuration for [`S3ObjectStore`].
#[derive(Clone)]
pub struct S3Config {
    pub region: String,
    pub bucket: String,
    /// Custom endpoint for S3-compatible services.
    pub endpoint_url: Option<String>,
    /// Path-style addressing, needed by MinIO and LocalStack.
    pub force_path_style: bool,
    credentials: Option<(String, String)>,
}

impl S3Config {
    pub fn new(region: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            bucket: bucket.into(),
            endpoint_url: None,
            force_path_style: false,
            credentials: None,
        }
    }

    /// Talk to `url` instead of AWS. Enables path-style addressing.
    pub fn with_endpoint(mut self, url: impl Into<String>) -> Self {
        self.endpoint_url = Some(url.into());
        self.force_path_style = true;
        self
    }

    /// Static credentials instead of the standard AWS credential chain.
    pub fn with_credentials(
        mut self,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        self.credentials = Some((access_key_id.into(), secret_access_key.into()));
        self
    }
}

impl std::fmt::Debug for S3Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Config")
            .field("region", &self.region)
            .field("bucket", &self.bucket)
            .field("endpoint_url", &self.endpoint_url)
            .field("force_path_style", &self.force_path_style)
            .finish_non_exhaustive()
    }
}

/// Stores objects in an S3 bucket.
///
/// The client is created on first write, so building a store never touches
/// the network or the credential chain.
pub struct S3ObjectStore {
    config: S3Config,
    client: OnceCell<Client>,
}

impl S3ObjectStore {
    pub fn new(config: S3Config) -> Self {
        Self {
            config,
            client: OnceCell::new(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.config.bucket
    }

    async fn client(&self) -> &Client {
        self.client.get_or_init(|| connect(&self.config)).await
    }
}

async fn connect(config: &S3Config) -> Client {
    let mut loader = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(config.region.clone()));
    if let Some((access_key_id, secret_access_key)) = &config.credentials {
        loader = loader.credentials_provider(Credentials::new(
            access_key_id,
            secret_access_key,
            None,
            None,
            "bifrost-static",
        ));
    }
    let sdk_config = loader.load().await;

    let mut builder = S3Builder::from(&sdk_config);
    if let Some(endpoint) = &config.endpoint_url {
        builder = builder.endpoint_url(endpoint);
    }
    if config.force_path_style {
        builder = builder.force_path_style(true);
    }
    Client::from_conf(builder.build())
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    fn name(&self) -> &str {
        "s3"
    }

    async fn put(&self, key: &str, body: Vec<u8>) -> Result<()> {
        self.client()
            .await
            .put_object()
            .bucket(&self.config.bucket)
            .key(key)
            .content_type("application/json")
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| {
                BifrostError::Storage(format!(
                    "S3 put failed for key '{key}': {}",
                    DisplayErrorContext(&e)
                ))
            })?;
        Ok(())
    }
}

/// Stores objects as files below a root directory, for local runs.
///
/// Keys map to relative paths; `/` separators become subdirectories.
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path for a key. Rejects keys that would escape the root.
    pub fn path_for(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let escapes = key.is_empty()
            || relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_)));
        if escapes {
            return Err(BifrostError::Storage(format!("invalid object key: {key:?}")));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    fn name(&self) -> &str {
        "fs"
    }

    async fn put(&self, key: &str, body: Vec<u8>) -> Result<()> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| BifrostError::Storage(format!("create {parent:?}: {e}")))?;
        }
        tokio::fs::write(&path, body)
            .await
            .map_err(|e| BifrostError::Storage(format!("write {path:?}: {e}")))
    }
}

/// In-process store, mostly for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().await.get(key).cloned()
    }

    /// All keys, sorted.
    pub async fn keys(&self) -> Vec<String> {
        self.objects.lock().await.keys().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.objects.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.lock().await.is_empty()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn put(&self, key: &str, body: Vec<u8>) -> Result<()> {
        self.objects.lock().await.insert(key.to_string(), body);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fs_store_writes_nested_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(dir.path());
        store
            .put("processed/1-1.json", b"{\"raw\":\"x\"}".to_vec())
            .await
            .unwrap();
        let written = std::fs::read_to_string(dir.path().join("processed/1-1.json")).unwrap();
        assert_eq!(written, "{\"raw\":\"x\"}");
    }

    #[test]
    fn fs_store_rejects_escaping_keys() {
        let store = FsObjectStore::new("/tmp/root");
        assert!(store.path_for("../etc/passwd").is_err());
        assert!(store.path_for("/abs").is_err());
        assert!(store.path_for("").is_err());
        assert!(store.path_for("processed/a.json").is_ok());
    }

    #[test]
    fn s3_config_endpoint_forces_path_style() {
        let config = S3Config::new("eu-west-1", "records").with_endpoint("http://localhost:9000");
        assert!(config.force_path_style);
        let store = S3ObjectStore::new(config.with_credentials("id", "secret"));
        assert_eq!(store.bucket(), "records");
        assert_eq!(store.name(), "s3");
        assert!(!format!("{:?}", store.config).contains("secret"));
    }

    #[tokio::test]
    async fn memory_store_round_trip() {
        let store = MemoryObjectStore::new();
        assert!(store.is_empty().await);
        store.put("k", vec![1, 2]).await.unwrap();
        assert_eq!(store.get("k").await, Some(vec![1, 2]));
        assert_eq!(store.keys().await, vec!["k"]);
    }
}
