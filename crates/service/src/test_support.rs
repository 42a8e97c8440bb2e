use configs::{AppConfig, DatabaseKind, Environment};
use uuid::Uuid;

/// Config for a service with no store, serving on an ephemeral port.
pub fn bare_config(name: &str) -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.service.name = name.to_string();
    cfg.service.environment = Environment::Test;
    cfg.service.host = "127.0.0.1".into();
    cfg.log.format = "compact".into();
    cfg
}

/// Config bound to a throwaway SQLite file.
pub fn sqlite_config(name: &str) -> AppConfig {
    let mut cfg = bare_config(name);
    cfg.database.kind = DatabaseKind::Relational;
    cfg.database.id_prefix = "usr".into();
    cfg.database.pool.min_connections = 1;
    let path = std::env::temp_dir().join(format!("service_{}.db", Uuid::new_v4().simple()));
    cfg.database.sqlite.path = Some(path.display().to_string());
    cfg
}
