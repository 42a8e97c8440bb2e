use std::process::ExitCode;

use dotenvy::dotenv;
use service::Service;
use tracing::{error, info};
use uuid::Uuid;

fn main() -> ExitCode {
    dotenv().ok();

    let cfg = match configs::AppConfig::load_and_validate() {
        Ok(cfg) => cfg,
        Err(e) => {
            common::utils::logging::init_logging_default();
            error!(event = "config_invalid", error = %e, "failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    let instance_id = Uuid::new_v4();
    let pid = std::process::id();
    let version = env!("CARGO_PKG_VERSION");

    std::panic::set_hook(Box::new({
        let service = cfg.service.name.clone();
        move |info| {
            error!(%service, event = "panic", %instance_id, pid, message = %info, "unhandled panic occurred");
        }
    }));

    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();
    if let Some(w) = cfg.service.worker_threads {
        builder.worker_threads(w);
    }
    let rt = match builder.build() {
        Ok(rt) => rt,
        Err(e) => {
            common::utils::logging::init_logging_default();
            error!(event = "runtime_build_failed", error = %e, "failed to build tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    rt.block_on(async move {
        let threads = cfg.service.worker_threads.unwrap_or_default();
        let mut svc = match Service::new(cfg).await {
            Ok(svc) => svc,
            Err(e) => {
                error!(event = "bootstrap_failed", error = %e, "failed to build service");
                return ExitCode::FAILURE;
            }
        };
        info!(service = svc.name(), event = "start", %instance_id, pid, version, threads, "service starting");

        let peers = svc.config().service.peers.clone();
        for peer in &peers {
            if let Err(e) = svc.client_connection(peer) {
                error!(service = svc.name(), event = "peer_invalid", %peer, error = %e, "cannot reach peer service");
                return ExitCode::FAILURE;
            }
        }

        let handle = svc.handle();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!(event = "shutdown_signal", %instance_id, pid, "received Ctrl+C, shutting down");
                handle.stop();
            }
        });

        match svc.listen_and_serve().await {
            Ok(()) => {
                info!(service = svc.name(), event = "stop", %instance_id, pid, "service stopped normally");
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!(service = svc.name(), event = "run_failed", error = %e, "service returned error");
                ExitCode::FAILURE
            }
        }
    })
}
