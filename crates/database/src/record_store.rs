//! Transactional CRUD over one relational table
//!
//! Every operation opens its own transaction and commits or rolls back
//! before returning. The table is bound at construction, so one entity type
//! can back several services that each own a table of the same shape.

use std::future::Future;
use std::pin::Pin;

use common::logger::{Fields, Logger};
use common::{ids, Classify};
use configs::{FailurePolicy, PoolConfig, PostgresConfig};
use sea_orm::sea_query::{Alias, Expr, Query, SimpleExpr, Table};
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, ColumnType, ConnectionTrait, DatabaseConnection,
    DatabaseTransaction, DbBackend, EntityTrait, IdenStatic, Iterable, ModelTrait, PrimaryKeyToColumn, Schema, Statement,
    TransactionError, TransactionTrait, Value,
};

use crate::db::connect_with_config;
use crate::errors::StoreError;
use crate::statement::{bind_placeholders, parse_order};

type TxnFuture<'c, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'c>>;

#[derive(Clone, Debug)]
pub struct RecordStoreOptions {
    pub table: String,
    /// Prefix for identifiers generated by `create`; empty disables generation.
    pub id_prefix: String,
    pub failure_policy: FailurePolicy,
    pub logger: Logger,
}

#[derive(Clone, Debug)]
pub struct RecordStore {
    db: DatabaseConnection,
    table: String,
    id_prefix: String,
    policy: FailurePolicy,
    logger: Logger,
}

impl RecordStore {
    pub fn new(db: DatabaseConnection, opts: RecordStoreOptions) -> Self {
        Self {
            db,
            table: opts.table,
            id_prefix: opts.id_prefix,
            policy: opts.failure_policy,
            logger: opts.logger,
        }
    }

    pub async fn connect_postgres(
        pg: &PostgresConfig,
        pool: &PoolConfig,
        opts: RecordStoreOptions,
    ) -> Result<Self, StoreError> {
        Self::connect_url(&pg.url(), pool, opts).await
    }

    /// `url` is a `sqlite://<file>?mode=rwc` string.
    pub async fn connect_sqlite(url: &str, pool: &PoolConfig, opts: RecordStoreOptions) -> Result<Self, StoreError> {
        Self::connect_url(url, pool, opts).await
    }

    async fn connect_url(url: &str, pool: &PoolConfig, opts: RecordStoreOptions) -> Result<Self, StoreError> {
        match connect_with_config(url, pool).await {
            Ok(db) => {
                opts.logger.info_with(
                    "connected to relational database",
                    &Fields::new().with("table", &opts.table).with("backend", format!("{:?}", db.get_database_backend())),
                );
                Ok(Self::new(db, opts))
            }
            Err(err) => {
                opts.logger.error_with("db error when initialize the database", &err);
                Err(err.into())
            }
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn backend(&self) -> DbBackend {
        self.db.get_database_backend()
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.policy
    }

    pub fn new_id(&self, prefix: &str) -> String {
        ids::new_id(prefix)
    }

    /// Insert `record`, returning the identifier it was stored under.
    ///
    /// A string primary key that is unset or empty is replaced by a generated
    /// identifier when the store has an identifier prefix.
    pub async fn create<A>(&self, mut record: A) -> Result<String, StoreError>
    where
        A: ActiveModelTrait + Send,
    {
        let pk = primary_column::<A::Entity>(&self.table)?;
        if !self.id_prefix.is_empty() && is_blank(&pk, &record.get(pk)) {
            record.set(pk, Value::from(ids::new_id(&self.id_prefix)));
        }
        let id = active_id(&record.get(pk));

        let mut columns = Vec::new();
        let mut values = Vec::new();
        for col in <A::Entity as EntityTrait>::Column::iter() {
            if let ActiveValue::Set(v) | ActiveValue::Unchanged(v) = record.get(col) {
                columns.push(Alias::new(col.as_str()));
                values.push(SimpleExpr::Value(v));
            }
        }
        let mut insert = Query::insert();
        insert
            .into_table(self.table_ref())
            .columns(columns)
            .values(values)
            .map_err(|e| StoreError::Validation(e.to_string()))?;
        let stmt = self.backend().build(&insert);

        let result = self
            .in_txn("create", move |txn| {
                Box::pin(async move {
                    txn.execute(stmt).await?;
                    Ok(())
                })
            })
            .await;
        self.settle(result).map(|_| id)
    }

    /// Apply the `Set` fields of `patch` to the row identified by `target`.
    pub async fn update<M, A>(&self, target: &M, patch: A) -> Result<(), StoreError>
    where
        M: ModelTrait + Sync,
        A: ActiveModelTrait<Entity = M::Entity> + Send,
    {
        let pk = primary_column::<M::Entity>(&self.table)?;
        let changes: Vec<(Alias, SimpleExpr)> = <M::Entity as EntityTrait>::Column::iter()
            .filter(|col| col.as_str() != pk.as_str())
            .filter_map(|col| match patch.get(col) {
                ActiveValue::Set(v) => Some((Alias::new(col.as_str()), SimpleExpr::Value(v))),
                _ => None,
            })
            .collect();
        if changes.is_empty() {
            return Err(StoreError::Validation(format!("update on {} sets no fields", self.table)));
        }

        let mut update = Query::update();
        update
            .table(self.table_ref())
            .values(changes)
            .and_where(Expr::col(Alias::new(pk.as_str())).eq(target.get(pk)));
        let stmt = self.backend().build(&update);

        let result = self
            .in_txn("update", move |txn| {
                Box::pin(async move {
                    txn.execute(stmt).await?;
                    Ok(())
                })
            })
            .await;
        self.settle(result)
    }

    pub async fn delete<M>(&self, target: &M) -> Result<(), StoreError>
    where
        M: ModelTrait + Sync,
    {
        let pk = primary_column::<M::Entity>(&self.table)?;
        let mut delete = Query::delete();
        delete
            .from_table(self.table_ref())
            .and_where(Expr::col(Alias::new(pk.as_str())).eq(target.get(pk)));
        let stmt = self.backend().build(&delete);

        let result = self
            .in_txn("delete", move |txn| {
                Box::pin(async move {
                    txn.execute(stmt).await?;
                    Ok(())
                })
            })
            .await;
        self.settle(result)
    }

    pub async fn find_by_id<E>(&self, id: &str) -> Result<E::Model, StoreError>
    where
        E: EntityTrait,
    {
        let pk = primary_column::<E>(&self.table)?;
        let mut select = Query::select();
        select
            .columns(column_aliases::<E>())
            .from(self.table_ref())
            .and_where(Expr::col(Alias::new(pk.as_str())).eq(id))
            .limit(1);
        let stmt = self.backend().build(&select);
        let table = self.table.clone();
        let id = id.to_string();

        self.in_txn("find", move |txn| {
            Box::pin(async move {
                E::find()
                    .from_raw_sql(stmt)
                    .one(txn)
                    .await?
                    .ok_or_else(|| StoreError::not_found(table, id))
            })
        })
        .await
    }

    /// Rows matching `filter` (`?` placeholders bound from `args`), ordered by
    /// `order_by` (`"<column> [asc|desc]"`, comma separated). An empty filter
    /// matches every row.
    pub async fn query<E>(&self, filter: &str, order_by: &str, args: Vec<Value>) -> Result<Vec<E::Model>, StoreError>
    where
        E: EntityTrait,
    {
        let order = parse_order(order_by)?;
        let mut select = Query::select();
        select.columns(column_aliases::<E>()).from(self.table_ref());
        if !filter.trim().is_empty() {
            select.and_where(Expr::cust_with_values(filter, args));
        }
        for (column, dir) in order {
            select.order_by(Alias::new(column), dir);
        }
        let stmt = self.backend().build(&select);

        self.in_txn("query", move |txn| {
            Box::pin(async move { Ok(E::find().from_raw_sql(stmt).all(txn).await?) })
        })
        .await
    }

    /// Run a raw statement with `?` placeholders; nothing is materialized.
    pub async fn exec(&self, raw: &str, args: Vec<Value>) -> Result<(), StoreError> {
        let backend = self.backend();
        let stmt = Statement::from_sql_and_values(backend, bind_placeholders(backend, raw), args);
        let result = self
            .in_txn("exec", move |txn| {
                Box::pin(async move {
                    txn.execute(stmt).await?;
                    Ok(())
                })
            })
            .await;
        self.settle(result)
    }

    /// Create the bound table from `entity`'s schema unless it already exists.
    pub async fn auto_migrate<E>(&self, entity: E) -> Result<(), StoreError>
    where
        E: EntityTrait,
    {
        let backend = self.backend();
        let mut create = Schema::new(backend).create_table_from_entity(entity);
        create.table(self.table_ref()).if_not_exists();
        self.db.execute(backend.build(&create)).await.map_err(|err| {
            let err = StoreError::from(err);
            self.log_failure("migrate", &err);
            err
        })?;
        Ok(())
    }

    pub async fn drop_table(&self) -> Result<(), StoreError> {
        let mut drop = Table::drop();
        drop.table(self.table_ref()).if_exists();
        self.db.execute(self.backend().build(&drop)).await?;
        Ok(())
    }

    fn table_ref(&self) -> Alias {
        Alias::new(self.table.as_str())
    }

    async fn in_txn<T, F>(&self, op: &'static str, f: F) -> Result<T, StoreError>
    where
        T: Send,
        F: for<'c> FnOnce(&'c DatabaseTransaction) -> TxnFuture<'c, T> + Send,
    {
        self.db
            .transaction::<_, T, StoreError>(f)
            .await
            .map_err(|err| {
                let err = match err {
                    TransactionError::Connection(db) => StoreError::Db(db),
                    TransactionError::Transaction(err) => err,
                };
                self.log_failure(op, &err);
                err
            })
    }

    /// Swallow an already-logged write failure under `LogOnly`.
    fn settle(&self, result: Result<(), StoreError>) -> Result<(), StoreError> {
        match (result, self.policy) {
            (Err(StoreError::Validation(msg)), _) => Err(StoreError::Validation(msg)),
            (Err(_), FailurePolicy::LogOnly) => Ok(()),
            (result, _) => result,
        }
    }

    fn log_failure(&self, op: &str, err: &StoreError) {
        let kind = err.kind();
        let table = self.table.as_str();
        self.logger.span().in_scope(|| {
            if kind.level() == tracing::Level::ERROR {
                tracing::error!(%table, operation = op, error.kind = kind.as_str(), error = %err, "db error when {op} entity");
            } else {
                tracing::warn!(%table, operation = op, error.kind = kind.as_str(), error = %err, "db error when {op} entity");
            }
        });
    }
}

fn primary_column<E: EntityTrait>(table: &str) -> Result<E::Column, StoreError> {
    let mut keys = E::PrimaryKey::iter();
    match (keys.next(), keys.next()) {
        (Some(key), None) => Ok(key.into_column()),
        _ => Err(StoreError::Validation(format!("{table} needs a single-column primary key"))),
    }
}

fn column_aliases<E: EntityTrait>() -> Vec<Alias> {
    E::Column::iter().map(|c| Alias::new(c.as_str())).collect()
}

fn is_blank<C: ColumnTrait>(column: &C, value: &ActiveValue<Value>) -> bool {
    match value {
        ActiveValue::NotSet => matches!(
            column.def().get_column_type(),
            ColumnType::String(_) | ColumnType::Text | ColumnType::Char(_)
        ),
        ActiveValue::Set(Value::String(None)) | ActiveValue::Unchanged(Value::String(None)) => true,
        ActiveValue::Set(Value::String(Some(s))) | ActiveValue::Unchanged(Value::String(Some(s))) => s.is_empty(),
        _ => false,
    }
}

fn active_id(value: &ActiveValue<Value>) -> String {
    match value {
        ActiveValue::Set(v) | ActiveValue::Unchanged(v) => match v {
            Value::String(Some(s)) => s.to_string(),
            Value::Int(Some(n)) => n.to_string(),
            Value::BigInt(Some(n)) => n.to_string(),
            Value::Uuid(Some(u)) => u.to_string(),
            other => format!("{other:?}"),
        },
        ActiveValue::NotSet => String::new(),
    }
}
