pub mod db;
pub mod document_store;
pub mod errors;
pub mod record_store;
pub mod statement;

pub use document_store::DocumentStore;
pub use errors::StoreError;
pub use record_store::{RecordStore, RecordStoreOptions};

#[cfg(test)]
mod tests;
