mod cli;

use crate::cli::{StorageBackendArg, CLI};
use anyhow::Context;
use clap::Parser;
use jiff::SignedDuration;
use shortlink_core::{AuditEvent, AuditLogger, AuditPackage, Repository, Shortener};
use shortlink_gateway::{App, AppState};
use shortlink_generator::RandomGenerator;
use shortlink_shortener::{ShortlinkStore, StoreSettings, Sweeper};
use shortlink_storage::{InMemoryRepository, MySqlRepository};
use shortlink_telemetry::{
    init_tracing, RemoteAuditConfig, RemoteAuditLogger, TracingAuditLogger, TracingConfig,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CLI::parse();

    let _telemetry = init_tracing(
        &TracingConfig::builder()
            .service_name("shortlink-gateway")
            .format(config.log_format.into())
            .otlp_endpoint(config.otlp_endpoint.clone())
            .build(),
    )?;

    info!(
        listen_addr = %config.listen_addr,
        public_base_url = %config.public_base_url,
        storage_backend = %config.storage,
        "starting shortlink gateway"
    );

    let remote_audit = match &config.audit_endpoint {
        Some(endpoint) => Some(RemoteAuditLogger::spawn(
            RemoteAuditConfig::builder()
                .endpoint(endpoint.clone())
                .token(config.audit_token.clone())
                .timeout(Duration::from_secs(config.audit_timeout_secs))
                .queue_capacity(config.audit_queue_capacity)
                .build(),
        )?),
        None => None,
    };
    let audit: Arc<dyn AuditLogger> = match &remote_audit {
        Some(remote) => Arc::new(remote.clone()),
        None => Arc::new(TracingAuditLogger),
    };

    let shortener: Arc<dyn Shortener> = match config.storage {
        StorageBackendArg::InMemory => build_store(&config, InMemoryRepository::new(), &audit),
        StorageBackendArg::Mysql => {
            let mysql_dsn = config
                .mysql_dsn
                .as_deref()
                .context("mysql dsn is required when storage backend is mysql")?;
            let repository = MySqlRepository::connect(mysql_dsn)
                .await
                .context("failed to connect to mysql")?;
            repository
                .migrate()
                .await
                .context("failed to create mysql schema")?;
            build_store(&config, repository, &audit)
        }
    };

    let served = run_server(&config, shortener, audit.as_ref()).await;

    // Flush "Server stopped" and anything still queued before the runtime exits.
    if let Some(remote) = remote_audit {
        remote
            .shutdown(Duration::from_secs(config.audit_timeout_secs))
            .await;
    }
    served
}

fn build_store<R: Repository>(
    config: &CLI,
    repository: R,
    audit: &Arc<dyn AuditLogger>,
) -> Arc<dyn Shortener> {
    let settings = StoreSettings::builder()
        .default_validity(SignedDuration::from_mins(i64::from(config.default_validity_minutes)))
        .max_generation_attempts(config.max_generation_attempts)
        .build();

    Arc::new(
        ShortlinkStore::new(repository, RandomGenerator::new(config.code_length))
            .with_audit_logger(Arc::clone(audit))
            .with_settings(settings),
    )
}

async fn run_server(
    config: &CLI,
    shortener: Arc<dyn Shortener>,
    audit: &dyn AuditLogger,
) -> anyhow::Result<()> {
    let sweeper = Sweeper::spawn(
        Arc::clone(&shortener),
        Duration::from_secs(config.sweep_interval_secs),
    );

    let router = App::router(AppState::new(shortener, config.public_base_url.clone()));
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    let local_addr = listener.local_addr()?;

    info!(listen_addr = %local_addr, "gateway listening");
    audit.log(AuditEvent::info(
        AuditPackage::System,
        format!("Server started on port {}", local_addr.port()),
    ));

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("http server failed")?;

    sweeper.shutdown().await;
    info!("gateway stopped");
    audit.log(AuditEvent::info(AuditPackage::System, "Server stopped"));

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
}
