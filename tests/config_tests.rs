use std::io::Write;

use connpool::config::{Config, LoggingConfig, PoolConfig};
use connpool::error::{ConfigError, Error};
use connpool::pool::PoolConnectionFactory;
use connpool::testkit;
use connpool::testkit::connection::MockConnectionFactory;

fn write_temp_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("create temp config");
    file.write_all(contents.as_bytes()).expect("write temp config");
    file
}

#[test]
fn config_loads_every_section() {
    let file = write_temp_config(testkit::config::FULL_TOML);
    let config = Config::load(file.path()).unwrap();

    assert_eq!(
        config.pool,
        PoolConfig {
            client_id: Some("myId".into()),
            reconnect_on_exception: true,
            pool_size: 2,
        }
    );
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.logging.format, "json");
}

#[test]
fn config_defaults_when_sections_missing() {
    let config = Config::parse_toml("").unwrap();

    assert_eq!(config, Config::default());
    assert_eq!(config.pool.pool_size, 1);
    assert_eq!(config.logging, LoggingConfig::default());
}

#[test]
fn config_rejects_zero_pool_size() {
    let toml = r#"
[pool]
pool_size = 0
"#;

    match Config::parse_toml(toml) {
        Err(Error::Config(ConfigError::InvalidValue {
            field: "pool_size",
            ..
        })) => {}
        Err(err) => panic!("Expected invalid pool size error, got {err}"),
        Ok(config) => panic!("Expected pool_size 0 to be rejected, got {config:?}"),
    }
}

#[test]
fn config_rejects_blank_client_id() {
    let toml = r#"
[pool]
client_id = ""
"#;

    assert!(matches!(
        Config::parse_toml(toml),
        Err(Error::Config(ConfigError::InvalidValue {
            field: "client_id",
            ..
        }))
    ));
}

#[test]
fn config_rejects_unknown_log_format() {
    let toml = r#"
[logging]
format = "xml"
"#;

    assert!(matches!(
        Config::parse_toml(toml),
        Err(Error::Config(ConfigError::InvalidValue { field: "format", .. }))
    ));
}

#[test]
fn config_reports_parse_errors() {
    assert!(matches!(
        Config::parse_toml("[pool\npool_size = 1"),
        Err(Error::Config(ConfigError::Parse(_)))
    ));
}

#[test]
fn config_reports_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.toml");

    assert!(matches!(
        Config::load(&missing),
        Err(Error::Config(ConfigError::ReadFile(_)))
    ));
}

#[test]
fn loaded_config_drives_factory() {
    let config = Config::parse_toml(testkit::config::FULL_TOML).unwrap();
    let cf = MockConnectionFactory::new();
    let pool = PoolConnectionFactory::with_config(cf.source(), &config.pool).unwrap();

    let a = pool.create_connection().unwrap();
    let b = pool.create_connection().unwrap();

    assert_ne!(a.id(), b.id());
    assert_eq!(cf.create_count(), 2);
    for con in cf.created() {
        assert_eq!(con.client_ids(), vec!["myId".to_string()]);
        assert!(con.installed_listener().is_some());
    }
}

#[test]
fn logging_try_init_rejects_second_subscriber() {
    let logging = LoggingConfig::default();
    // The first call may already fail if a subscriber is installed.
    let _ = logging.try_init();

    assert!(matches!(
        logging.try_init(),
        Err(Error::Config(ConfigError::Logging(_)))
    ));
}
