//! Document store scoped to one MongoDB collection
//!
//! Single-document lookups report `NotFound` when nothing matched and
//! `Internal` for anything else; both go through the service's
//! [`ErrorTranslator`] before being returned.

use std::time::Duration;

use common::logger::{Fields, Logger};
use common::pagination::Pagination;
use common::ErrorTranslator;
use configs::MongoConfig;
use futures::TryStreamExt;
use heck::ToSnakeCase;
use mongodb::bson::{doc, Bson, Document};
use mongodb::options::{
    ClientOptions, FindOneAndDeleteOptions, FindOneAndUpdateOptions, FindOneOptions, FindOptions, ReturnDocument,
};
use mongodb::results::{DeleteResult, InsertManyResult, UpdateResult};
use mongodb::{Client, Collection};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::errors::StoreError;

#[derive(Clone, Debug)]
pub struct DocumentStore {
    client: Client,
    database: String,
    collection: String,
    errors: ErrorTranslator,
    logger: Logger,
    max_time: Option<Duration>,
}

impl DocumentStore {
    /// Connect, ping the server and bind the snake-cased `collection`.
    pub async fn connect(
        cfg: &MongoConfig,
        collection: &str,
        logger: Logger,
        errors: ErrorTranslator,
    ) -> Result<Self, StoreError> {
        let client = match build_client(cfg, logger.name()).await {
            Ok(client) => client,
            Err(err) => {
                logger.error_with("db error when initialize the document store", &err);
                return Err(err.into());
            }
        };
        if let Err(err) = client.database(&cfg.database).run_command(doc! { "ping": 1 }, None).await {
            logger.error_with("db error when ping the document store", &err);
            return Err(err.into());
        }

        let store = Self::from_client(client, cfg, collection, logger, errors);
        store.logger.info_with(
            "connected to mongodb",
            &Fields::new().with("db_name", &store.database).with("db_collection", &store.collection),
        );
        Ok(store)
    }

    /// Wrap an existing client without contacting the server.
    pub fn from_client(
        client: Client,
        cfg: &MongoConfig,
        collection: &str,
        logger: Logger,
        errors: ErrorTranslator,
    ) -> Self {
        let max_time = (cfg.max_time_ms > 0).then(|| Duration::from_millis(cfg.max_time_ms));
        Self {
            client,
            database: cfg.database.clone(),
            collection: collection.to_snake_case(),
            errors,
            logger,
            max_time,
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn database_name(&self) -> &str {
        &self.database
    }

    pub fn collection_name(&self) -> &str {
        &self.collection
    }

    pub fn collection<T: Send + Sync>(&self) -> Collection<T> {
        self.client.database(&self.database).collection::<T>(&self.collection)
    }

    pub async fn find_one_by_id<T>(&self, id: &str) -> Result<T, StoreError>
    where
        T: DeserializeOwned + Unpin + Send + Sync,
    {
        self.find_one_as("find one by id", doc! { "_id": id }).await
    }

    pub async fn find_one<T>(&self, filter: Document) -> Result<T, StoreError>
    where
        T: DeserializeOwned + Unpin + Send + Sync,
    {
        self.find_one_as("find one", filter).await
    }

    /// One page of matches using offset/limit.
    pub async fn find_paginated<T>(&self, filter: Document, skip: u64, limit: i64) -> Result<Vec<T>, StoreError>
    where
        T: DeserializeOwned + Unpin + Send + Sync,
    {
        let mut opts = FindOptions::default();
        opts.skip = Some(skip);
        opts.limit = Some(limit);
        self.find_many(filter, opts).await
    }

    pub async fn find_page<T>(&self, filter: Document, page: Pagination) -> Result<Vec<T>, StoreError>
    where
        T: DeserializeOwned + Unpin + Send + Sync,
    {
        let (skip, limit) = page.skip_limit();
        self.find_paginated(filter, skip, limit).await
    }

    pub async fn find_many<T>(&self, filter: Document, mut opts: FindOptions) -> Result<Vec<T>, StoreError>
    where
        T: DeserializeOwned + Unpin + Send + Sync,
    {
        if opts.max_time.is_none() {
            opts.max_time = self.max_time;
        }
        let cursor = self
            .collection::<T>()
            .find(filter, opts)
            .await
            .map_err(|err| self.internal("find many", err))?;
        cursor.try_collect().await.map_err(|err| self.internal("find many", err))
    }

    /// Insert `doc`, returning the `_id` it was stored under.
    pub async fn insert_one<T>(&self, doc: &T) -> Result<Bson, StoreError>
    where
        T: Serialize + Send + Sync,
    {
        self.collection::<T>()
            .insert_one(doc, None)
            .await
            .map(|res| res.inserted_id)
            .map_err(|err| self.internal("insert one", err))
    }

    pub async fn insert_many<T>(&self, docs: &[T]) -> Result<InsertManyResult, StoreError>
    where
        T: Serialize + Send + Sync,
    {
        if docs.is_empty() {
            return Err(StoreError::Validation("insert many needs at least one document".into()));
        }
        self.collection::<T>()
            .insert_many(docs.iter(), None)
            .await
            .map_err(|err| self.internal("insert many", err))
    }

    /// Apply `update` to the document with `_id == id`, returning the updated document.
    pub async fn update_one_by_id<T>(&self, id: &str, update: Document) -> Result<T, StoreError>
    where
        T: DeserializeOwned + Unpin + Send + Sync,
    {
        let mut opts = FindOneAndUpdateOptions::default();
        opts.return_document = Some(ReturnDocument::After);
        opts.max_time = self.max_time;
        match self.collection::<T>().find_one_and_update(doc! { "_id": id }, update, opts).await {
            Ok(Some(doc)) => Ok(doc),
            Ok(None) => Err(self.not_found("update one by id", StoreError::not_found(self.collection.clone(), id))),
            Err(err) => Err(self.internal("update one by id", err)),
        }
    }

    pub async fn update_many(&self, filter: Document, update: Document) -> Result<UpdateResult, StoreError> {
        self.collection::<Document>()
            .update_many(filter, update, None)
            .await
            .map_err(|err| self.internal("update many", err))
    }

    /// Replace the whole document; a zero `matched_count` means nothing had that id.
    pub async fn replace_one_by_id<T>(&self, id: &str, replacement: &T) -> Result<UpdateResult, StoreError>
    where
        T: Serialize + Send + Sync,
    {
        self.collection::<T>()
            .replace_one(doc! { "_id": id }, replacement, None)
            .await
            .map_err(|err| self.internal("replace one by id", err))
    }

    /// Remove the document with `_id == id`, returning what was removed.
    pub async fn delete_one_by_id<T>(&self, id: &str) -> Result<T, StoreError>
    where
        T: DeserializeOwned + Unpin + Send + Sync,
    {
        let mut opts = FindOneAndDeleteOptions::default();
        opts.max_time = self.max_time;
        match self.collection::<T>().find_one_and_delete(doc! { "_id": id }, opts).await {
            Ok(Some(doc)) => Ok(doc),
            Ok(None) => Err(self.not_found("delete one by id", StoreError::not_found(self.collection.clone(), id))),
            Err(err) => Err(self.internal("delete one by id", err)),
        }
    }

    pub async fn delete_many(&self, filter: Document) -> Result<DeleteResult, StoreError> {
        self.collection::<Document>()
            .delete_many(filter, None)
            .await
            .map_err(|err| self.internal("delete many", err))
    }

    async fn find_one_as<T>(&self, op: &'static str, filter: Document) -> Result<T, StoreError>
    where
        T: DeserializeOwned + Unpin + Send + Sync,
    {
        let mut opts = FindOneOptions::default();
        opts.max_time = self.max_time;
        let label = filter_label(&filter);
        match self.collection::<T>().find_one(filter, opts).await {
            Ok(Some(doc)) => Ok(doc),
            Ok(None) => Err(self.not_found(op, StoreError::not_found(self.collection.clone(), label))),
            Err(err) => Err(self.internal(op, err)),
        }
    }

    fn fields(&self, op: &'static str) -> Fields {
        Fields::new()
            .with("operation", op)
            .with("db_name", &self.database)
            .with("db_collection", &self.collection)
    }

    fn not_found(&self, op: &'static str, err: StoreError) -> StoreError {
        self.errors.report(&err, &self.fields(op));
        err
    }

    fn internal(&self, op: &'static str, err: mongodb::error::Error) -> StoreError {
        let err = StoreError::from(err);
        self.errors.report(&err, &self.fields(op));
        err
    }
}

async fn build_client(cfg: &MongoConfig, app_name: &str) -> mongodb::error::Result<Client> {
    let mut opts = ClientOptions::parse(cfg.uri()).await?;
    let timeout = Duration::from_secs(cfg.connect_timeout_secs);
    opts.connect_timeout = Some(timeout);
    opts.server_selection_timeout = Some(timeout);
    if !app_name.is_empty() {
        opts.app_name = Some(app_name.to_string());
    }
    Client::with_options(opts)
}

/// Short description of a filter for error messages.
fn filter_label(filter: &Document) -> String {
    match filter.get("_id") {
        Some(Bson::String(id)) => id.clone(),
        Some(other) => other.to_string(),
        None => filter.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_label_prefers_id() {
        assert_eq!(filter_label(&doc! { "_id": "p_1", "x": 1 }), "p_1");
        assert!(filter_label(&doc! { "name": "a" }).contains("name"));
    }
}
