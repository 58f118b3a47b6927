//! Configuration loading from files.

use std::fs;

use bifrost::Bifrost;
use bifrost::config::{Config, Secrets, StorageDestination};

#[test]
fn load_explicit_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        r#"
        [server]
        address = "127.0.0.1:18080"

        [backends]
        request_timeout_secs = 15

        [storage]
        bucket = "stream-out"
        endpoint_url = "http://localhost:4566"

        [models]
        insights_model = "anthropic.claude-3-haiku-20240307-v1:0"
        "#,
    )
    .unwrap();

    let config = Config::load(Some(&path)).unwrap();
    assert_eq!(config.server.address, "127.0.0.1:18080");
    assert_eq!(config.backends.request_timeout_secs, Some(15));
    assert_eq!(
        config.storage.destination(),
        Some(StorageDestination::S3 {
            bucket: "stream-out".to_string(),
            endpoint_url: Some("http://localhost:4566".to_string()),
        })
    );
    assert_eq!(
        config.models.insights_model,
        "anthropic.claude-3-haiku-20240307-v1:0"
    );
}

#[test]
fn invalid_toml_is_a_configuration_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "region = [unterminated").unwrap();

    let err = Config::load(Some(&path)).unwrap_err();
    assert_eq!(err.kind(), "configuration");
}

#[test]
fn load_secrets_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("secrets.toml");
    fs::write(&path, "[model_runtime]\napi_key = \"mr-key\"\n").unwrap();

    let secrets = Secrets::load_from_file(&path).unwrap();
    assert_eq!(secrets.api_key("model_runtime").as_deref(), Some("mr-key"));
}

#[test]
fn storage_root_from_file_drives_ingestion() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::from_toml_str(&format!(
        "[storage]\nbucket = \"out\"\nroot = {:?}\n",
        dir.path().display().to_string()
    ))
    .unwrap();
    assert_eq!(
        config.storage.destination(),
        Some(StorageDestination::Directory(dir.path().join("out")))
    );

    let gateway = Bifrost::builder().config(config).build().unwrap();
    assert!(gateway.ingestor().has_destination());
}

#[test]
fn zero_timeout_builds() {
    let mut config = Config::default();
    config.backends.request_timeout_secs = Some(0);
    assert!(Bifrost::builder().config(config).build().is_ok());
}
