use serde::{Deserialize, Serialize};

/// Health report shared by the gRPC health method and the admin `/healthz` route.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct Health {
    pub name: String,
    pub state: String,
    pub serving: bool,
}
