use database::StoreError;
use thiserror::Error;

use crate::lifecycle::ServiceState;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("http client error: {0}")]
    Http(#[from] common::http::HttpError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("transport error: {0}")]
    Transport(#[from] tonic::transport::Error),
    #[error("service {name} cannot serve from state {state}")]
    InvalidState { name: String, state: ServiceState },
}
