//! Service bootstrap: one logger, at most one store binding, one gRPC listener.
//! - `Service` wires the pieces from an `AppConfig` and runs the listener.
//! - `ServiceHandle` observes and stops a running service from other tasks.
//! - Every service answers `svckit.health.Health/Check`.

pub mod binding;
pub mod errors;
pub mod health;
pub mod lifecycle;
pub mod service;
#[cfg(test)]
pub mod test_support;

pub use binding::DatabaseBinding;
pub use errors::ServiceError;
pub use lifecycle::{ServiceHandle, ServiceState};
pub use service::Service;
#[cfg(test)]
mod tests;
