//! Built-in `svckit.health.Health/Check` RPC

use common::logger::Fields;
use common::ErrorTranslator;
use tokio::sync::watch;
use tonic::{Request, Response, Status};

use crate::lifecycle::ServiceState;

#[derive(Clone, PartialEq, prost::Message)]
pub struct HealthCheckRequest {
    /// Service to check; empty means the one answering.
    #[prost(string, tag = "1")]
    pub service: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct HealthCheckResponse {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub state: String,
    #[prost(bool, tag = "3")]
    pub serving: bool,
}

include!(concat!(env!("OUT_DIR"), "/svckit.health.Health.rs"));

pub use health_client::HealthClient;
pub use health_server::{Health, HealthServer};

pub struct HealthReporter {
    name: String,
    state: watch::Receiver<ServiceState>,
    errors: ErrorTranslator,
}

impl HealthReporter {
    pub fn new(name: impl Into<String>, state: watch::Receiver<ServiceState>, errors: ErrorTranslator) -> Self {
        Self { name: name.into(), state, errors }
    }

    pub fn report(&self) -> HealthCheckResponse {
        let state = *self.state.borrow();
        HealthCheckResponse {
            name: self.name.clone(),
            state: state.to_string(),
            serving: state == ServiceState::Serving,
        }
    }
}

#[tonic::async_trait]
impl Health for HealthReporter {
    async fn check(&self, request: Request<HealthCheckRequest>) -> Result<Response<HealthCheckResponse>, Status> {
        let req = request.into_inner();
        if !req.service.is_empty() && req.service != self.name {
            return Err(self.errors.not_found(&Fields::new().with("service", &req.service)));
        }
        Ok(Response::new(self.report()))
    }
}
