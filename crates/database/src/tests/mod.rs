use common::Logger;
use configs::{FailurePolicy, PoolConfig};
use uuid::Uuid;

use crate::{RecordStore, RecordStoreOptions};

/// Record store CRUD against a throwaway SQLite file
pub mod crud_tests;



pub mod account {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "account")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: String,
        pub name: String,
        pub email: String,
        pub created_at: i64,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

pub async fn sqlite_store(id_prefix: &str, policy: FailurePolicy) -> anyhow::Result<RecordStore> {
    let path = std::env::temp_dir().join(format!("record_store_{}.db", Uuid::new_v4().simple()));
    let url = format!("sqlite://{}?mode=rwc", path.display());
    let pool = PoolConfig { min_connections: 1, max_connections: 4, ..Default::default() };
    let store = RecordStore::connect_sqlite(
        &url,
        &pool,
        RecordStoreOptions {
            table: "accounts".into(),
            id_prefix: id_prefix.into(),
            failure_policy: policy,
            logger: Logger::named("accounts"),
        },
    )
    .await?;
    store.auto_migrate(account::Entity).await?;
    Ok(store)
}
