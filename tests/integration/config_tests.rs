//! Loading a configuration file and wiring storage from it

use callboard::config::load_config_with_hash;
use callboard::model::{DataSource, SourceKind};
use callboard::storage::{open_storage, SourceCatalog};
use std::fs;
use tempfile::TempDir;

fn write_config(dir: &TempDir) -> std::path::PathBuf {
    let db_path = dir.path().join("calls.db");
    let content = format!(
        r#"
[user-agent]
crawler-name = "Callboard"
crawler-version = "0.1"
contact-url = "https://example.com/about"
contact-email = "crawler@example.com"

[fetch]
max-retries = 1
request-delay-ms = 0
jitter-ms = 0

[scheduler]
purge-at = "03:30"
retention-days = 14

[storage]
database-path = "{}"

[[source]]
id = "demo"
name = "Demo listings"
url = "https://example.com/"
crawler = "demo"
frequency-hours = 6
config = {{ item-delay-ms = 0, seed = 5 }}

[[source]]
id = "harbor"
name = "Harbor Arts feed"
url = "https://harborarts.example.org/calls.json"
kind = "api"
crawler = "json-feed"
frequency-hours = 24
active = false
"#,
        db_path.display()
    );

    let path = dir.path().join("callboard.toml");
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_load_config_and_open_storage() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir);

    let (config, hash) = load_config_with_hash(&path).unwrap();

    assert_eq!(hash.len(), 64);
    assert_eq!(config.fetch.max_retries, 1);
    assert_eq!(config.fetch.timeout_secs, 30);
    assert_eq!(config.scheduler.retention_days, 14);

    let sources: Vec<DataSource> = config
        .sources
        .iter()
        .map(DataSource::try_from)
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(sources.len(), 2);
    assert_eq!(sources[0].kind, SourceKind::Website);
    assert_eq!(sources[0].config["seed"], 5);
    assert_eq!(sources[1].kind, SourceKind::Api);
    assert!(!sources[1].active);

    let mut storage = open_storage(std::path::Path::new(&config.storage.database_path)).unwrap();
    for source in &sources {
        storage.upsert_source(source).unwrap();
    }
    assert_eq!(storage.load_sources().unwrap().len(), 2);
    assert!(dir.path().join("calls.db").exists());
}

#[test]
fn test_hash_changes_with_content() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir);
    let (_, before) = load_config_with_hash(&path).unwrap();

    let mut content = fs::read_to_string(&path).unwrap();
    content.push_str("\n# edited\n");
    fs::write(&path, content).unwrap();
    let (_, after) = load_config_with_hash(&path).unwrap();

    assert_ne!(before, after);
}
