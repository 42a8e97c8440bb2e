//! Shared building blocks for services: logging, error translation,
//! identifiers, outbound HTTP and the admin health route.

pub mod admin_http;
pub mod errors;
pub mod http;
pub mod ids;
pub mod logger;
pub mod pagination;
pub mod types;
pub mod utils;

pub use errors::{Classify, ErrorKind, ErrorTranslator};
pub use logger::{Fields, Logger, LoggerOptions};
