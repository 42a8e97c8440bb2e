//! Service bootstrap
//!
//! A [`Service`] owns one logger, at most one store binding and a gRPC
//! listener. Callers register their gRPC services through
//! [`Service::grpc_server`] and then call [`Service::listen_and_serve`].

use std::sync::Arc;
use std::time::Duration;

use common::admin_http::{self, HealthFn};
use common::http::{HttpClient, HttpClientOptions};
use common::logger::Fields;
use common::types::Health;
use common::utils::logging::LogFormat;
use common::{ErrorTranslator, Logger, LoggerOptions};
use configs::{AppConfig, DEFAULT_PORT};
use database::{DocumentStore, RecordStore};
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::service::RoutesBuilder;
use tonic::transport::{Channel, Endpoint, Server};

use crate::binding::DatabaseBinding;
use crate::errors::ServiceError;
use crate::health::{HealthReporter, HealthServer};
use crate::lifecycle::{ServiceHandle, ServiceState};

pub struct Service {
    config: AppConfig,
    logger: Logger,
    errors: ErrorTranslator,
    database: DatabaseBinding,
    http: HttpClient,
    routes: RoutesBuilder,
    handle: ServiceHandle,
}

impl Service {
    /// Build the logger, connect the configured store and prepare the listener.
    pub async fn new(config: AppConfig) -> Result<Self, ServiceError> {
        let format = config
            .log
            .format
            .parse::<LogFormat>()
            .map_err(ServiceError::Config)?;
        let logger = Logger::new(&LoggerOptions {
            name: config.service.name.clone(),
            level: config.log.level.clone(),
            format,
        });
        let errors = ErrorTranslator::new(config.service.name.clone(), logger.clone());

        let database = match DatabaseBinding::connect(&config, &logger, &errors).await {
            Ok(binding) => binding,
            Err(err) => {
                logger.error_with("failed to bind the database", &err);
                return Err(err);
            }
        };

        let http = HttpClient::new(HttpClientOptions {
            base_uri: config.http.base_uri.clone(),
            default_content_type: config.http.default_content_type.clone(),
            timeout: Duration::from_secs(config.http.timeout_secs),
        })?;

        logger.info_with(
            "service created",
            &Fields::new()
                .with("environment", format!("{:?}", config.service.environment))
                .with("database", format!("{:?}", database.kind())),
        );

        Ok(Self {
            config,
            logger,
            errors,
            database,
            http,
            routes: RoutesBuilder::default(),
            handle: ServiceHandle::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.config.service.name
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn errors(&self) -> &ErrorTranslator {
        &self.errors
    }

    pub fn database(&self) -> &DatabaseBinding {
        &self.database
    }

    pub fn record_store(&self) -> Option<&RecordStore> {
        self.database.record_store()
    }

    pub fn document_store(&self) -> Option<&DocumentStore> {
        self.database.document_store()
    }

    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    /// Routes served once the service starts; add caller services here.
    pub fn grpc_server(&mut self) -> &mut RoutesBuilder {
        &mut self.routes
    }

    pub fn handle(&self) -> ServiceHandle {
        self.handle.clone()
    }

    pub fn state(&self) -> ServiceState {
        self.handle.state()
    }

    pub fn stop(&self) {
        if self.handle.stop() {
            self.logger.info("service stopping");
        }
    }

    /// Lazy channel to the peer service `name` on the default port.
    pub fn client_connection(&self, name: &str) -> Result<Channel, ServiceError> {
        let endpoint = Endpoint::from_shared(format!("http://{name}:{DEFAULT_PORT}")).map_err(|err| {
            self.logger.error_with("invalid client endpoint", &err);
            err
        })?;
        Ok(endpoint.connect_lazy())
    }

    /// Bind the configured address and serve until stopped.
    pub async fn listen_and_serve(&mut self) -> Result<(), ServiceError> {
        let addr = self.config.service.bind_addr();
        let listener = TcpListener::bind(&addr).await.map_err(|err| {
            self.logger.error_with("failed to listen", &err);
            err
        })?;
        self.serve(listener).await
    }

    /// Serve gRPC on `listener` until [`ServiceHandle::stop`] is called.
    pub async fn serve(&mut self, listener: TcpListener) -> Result<(), ServiceError> {
        if let Err(state) = self.handle.begin_serving() {
            return Err(ServiceError::InvalidState { name: self.name().to_string(), state });
        }
        let addr = listener.local_addr()?;

        let mut routes = std::mem::take(&mut self.routes);
        routes.add_service(HealthServer::new(HealthReporter::new(
            self.name(),
            self.handle.subscribe(),
            self.errors.clone(),
        )));

        let admin = match self.config.service.admin_addr.clone() {
            Some(admin_addr) => match self.spawn_admin(&admin_addr).await {
                Ok(task) => Some(task),
                Err(err) => {
                    self.handle.stop();
                    self.logger.error_with("failed to start admin server", &err);
                    return Err(err);
                }
            },
            None => None,
        };

        self.logger.info_with("service listening", &Fields::new().with("addr", addr));
        let result = Server::builder()
            .add_routes(routes.routes())
            .serve_with_incoming_shutdown(TcpListenerStream::new(listener), self.handle.stopped())
            .await;

        self.handle.stop();
        if let Some(admin) = admin {
            let _ = admin.await;
        }
        match result {
            Ok(()) => {
                self.logger.info("service stopped");
                Ok(())
            }
            Err(err) => {
                self.logger.error_with("service failed while serving", &err);
                Err(err.into())
            }
        }
    }

    async fn spawn_admin(&self, admin_addr: &str) -> Result<tokio::task::JoinHandle<()>, ServiceError> {
        let listener = TcpListener::bind(admin_addr).await?;
        let name = self.name().to_string();
        let rx = self.handle.subscribe();
        let report: HealthFn = Arc::new(move || {
            let state = *rx.borrow();
            Health { name: name.clone(), state: state.to_string(), serving: state == ServiceState::Serving }
        });
        let logger = self.logger.clone();
        let shutdown = self.handle.stopped();
        Ok(tokio::spawn(async move {
            if let Err(err) = admin_http::serve_admin(listener, report, shutdown).await {
                logger.error_with("admin server failed", &err);
            }
        }))
    }
}
