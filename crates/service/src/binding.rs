//! The one backing store a service is bound to, chosen at construction.

use common::{ErrorTranslator, Logger};
use configs::{AppConfig, DatabaseKind, Environment};
use database::{DocumentStore, RecordStore, RecordStoreOptions};

use crate::errors::ServiceError;

#[derive(Clone, Debug, Default)]
pub enum DatabaseBinding {
    #[default]
    None,
    Relational(RecordStore),
    Document(DocumentStore),
}

impl DatabaseBinding {
    /// Connect the store family named by `cfg.database.kind`.
    ///
    /// Relational services use Postgres in production and a SQLite file
    /// everywhere else; the table is the lowercased service name.
    pub async fn connect(cfg: &AppConfig, logger: &Logger, errors: &ErrorTranslator) -> Result<Self, ServiceError> {
        let db = &cfg.database;
        match db.kind {
            DatabaseKind::Disabled => Ok(Self::None),
            DatabaseKind::Relational => {
                let opts = RecordStoreOptions {
                    table: cfg.table_name(),
                    id_prefix: db.id_prefix.clone(),
                    failure_policy: db.failure_policy,
                    logger: logger.clone(),
                };
                let store = if cfg.service.environment == Environment::Production {
                    RecordStore::connect_postgres(&db.postgres, &db.pool, opts).await?
                } else {
                    RecordStore::connect_sqlite(&db.sqlite.url(&cfg.service.name), &db.pool, opts).await?
                };
                Ok(Self::Relational(store))
            }
            DatabaseKind::Document => {
                let store = DocumentStore::connect(&db.mongo, &cfg.service.name, logger.clone(), errors.clone()).await?;
                Ok(Self::Document(store))
            }
        }
    }

    pub fn kind(&self) -> DatabaseKind {
        match self {
            Self::None => DatabaseKind::Disabled,
            Self::Relational(_) => DatabaseKind::Relational,
            Self::Document(_) => DatabaseKind::Document,
        }
    }

    pub fn record_store(&self) -> Option<&RecordStore> {
        match self {
            Self::Relational(store) => Some(store),
            _ => None,
        }
    }

    pub fn document_store(&self) -> Option<&DocumentStore> {
        match self {
            Self::Document(store) => Some(store),
            _ => None,
        }
    }
}
