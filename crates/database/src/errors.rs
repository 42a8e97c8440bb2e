use common::{Classify, ErrorKind};
use mongodb::error::{ErrorKind as MongoErrorKind, WriteFailure};
use sea_orm::{DbErr, SqlErr};
use thiserror::Error;
use tonic::Status;

const DUPLICATE_KEY: i32 = 11000;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },
    #[error("{entity} already exists: {id}")]
    AlreadyExists { entity: String, id: String },
    #[error("validation error: {0}")]
    Validation(String),
    #[error("database error: {0}")]
    Db(#[from] DbErr),
    #[error("document store error: {0}")]
    Document(#[from] mongodb::error::Error),
}

impl StoreError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound { entity: entity.into(), id: id.into() }
    }
}

impl Classify for StoreError {
    fn kind(&self) -> ErrorKind {
        match self {
            StoreError::NotFound { .. } => ErrorKind::NotFound,
            StoreError::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            StoreError::Validation(_) => ErrorKind::Validation,
            StoreError::Db(DbErr::RecordNotFound(_)) => ErrorKind::NotFound,
            StoreError::Db(err) => match err.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => ErrorKind::AlreadyExists,
                _ => ErrorKind::Internal,
            },
            StoreError::Document(err) if is_duplicate_key(err) => ErrorKind::AlreadyExists,
            StoreError::Document(_) => ErrorKind::Internal,
        }
    }
}

impl From<StoreError> for Status {
    fn from(err: StoreError) -> Self {
        Status::new(err.kind().code(), err.to_string())
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        MongoErrorKind::Write(WriteFailure::WriteError(e)) => e.code == DUPLICATE_KEY,
        MongoErrorKind::BulkWrite(failure) => failure
            .write_errors
            .as_ref()
            .is_some_and(|errors| errors.iter().any(|e| e.code == DUPLICATE_KEY)),
        _ => false,
    }
}
