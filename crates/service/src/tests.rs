use std::time::Duration;

use anyhow::Result;
use sea_orm::Set;
use tokio::net::TcpListener;
use tonic::Code;

use crate::health::{HealthCheckRequest, HealthClient};
use crate::test_support::{bare_config, sqlite_config};
use crate::{DatabaseBinding, Service, ServiceError, ServiceState};

mod member {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "member")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: String,
        pub name: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

async fn local_listener() -> Result<(TcpListener, String)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let url = format!("http://{}", listener.local_addr()?);
    Ok((listener, url))
}

#[tokio::test]
async fn test_stop_before_serve_skips_serving() -> Result<()> {
    let mut svc = Service::new(bare_config("idle")).await?;
    assert_eq!(svc.state(), ServiceState::Created);
    assert!(matches!(svc.database(), DatabaseBinding::None));

    svc.stop();
    assert_eq!(svc.state(), ServiceState::Stopped);

    let (listener, _) = local_listener().await?;
    let err = svc.serve(listener).await.unwrap_err();
    assert!(matches!(err, ServiceError::InvalidState { state: ServiceState::Stopped, .. }));
    Ok(())
}

#[tokio::test]
async fn test_serve_reports_health_then_stops() -> Result<()> {
    let mut svc = Service::new(bare_config("user")).await?;
    let handle = svc.handle();
    let (listener, url) = local_listener().await?;

    let task = tokio::spawn(async move {
        let result = svc.serve(listener).await;
        (svc, result)
    });
    assert_eq!(handle.started().await, ServiceState::Serving);

    let mut client = HealthClient::connect(url).await?;
    let resp = client.check(HealthCheckRequest { service: String::new() }).await?.into_inner();
    assert_eq!(resp.name, "user");
    assert_eq!(resp.state, "Serving");
    assert!(resp.serving);

    let status = client
        .check(HealthCheckRequest { service: "billing".into() })
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::NotFound);
    assert_eq!(status.message(), "user not found");

    handle.stop();
    let (mut svc, result) = tokio::time::timeout(Duration::from_secs(5), task).await??;
    result?;
    assert_eq!(svc.state(), ServiceState::Stopped);

    // no restart after stop
    let (listener, _) = local_listener().await?;
    assert!(svc.serve(listener).await.is_err());
    Ok(())
}

#[tokio::test]
async fn test_relational_binding_uses_sqlite_outside_production() -> Result<()> {
    let svc = Service::new(sqlite_config("Members")).await?;
    let store = svc.record_store().expect("relational binding");
    assert_eq!(store.table(), "members");
    assert!(svc.document_store().is_none());

    store.auto_migrate(member::Entity).await?;
    let id = store
        .create(member::ActiveModel { id: Set(String::new()), name: Set("a".into()) })
        .await?;
    assert!(id.starts_with("usr_"));

    let found = store.find_by_id::<member::Entity>(&id).await?;
    assert_eq!(found.name, "a");
    Ok(())
}

#[tokio::test]
async fn test_client_connection() -> Result<()> {
    let svc = Service::new(bare_config("caller")).await?;
    assert!(svc.client_connection("billing").is_ok());
    assert!(matches!(svc.client_connection("not a host"), Err(ServiceError::Transport(_))));
    Ok(())
}

#[tokio::test]
async fn test_bad_log_format_is_a_config_error() {
    let mut cfg = bare_config("noisy");
    cfg.log.format = "xml".into();
    assert!(matches!(Service::new(cfg).await, Err(ServiceError::Config(_))));
}
