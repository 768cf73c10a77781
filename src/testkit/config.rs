//! Canonical test configurations.

use crate::config::PoolConfig;

/// Pool config with the given client ID and reconnection flag, one
/// physical connection.
pub fn pool(client_id: Option<&str>, reconnect_on_exception: bool) -> PoolConfig {
    PoolConfig {
        client_id: client_id.map(str::to_string),
        reconnect_on_exception,
        pool_size: 1,
    }
}

/// Pool config allowing `pool_size` physical connections.
pub fn sized(pool_size: usize) -> PoolConfig {
    PoolConfig {
        pool_size,
        ..PoolConfig::default()
    }
}

/// A complete TOML document exercising every section.
pub const FULL_TOML: &str = r#"
[pool]
client_id = "myId"
reconnect_on_exception = true
pool_size = 2

[logging]
level = "debug"
format = "json"
"#;
