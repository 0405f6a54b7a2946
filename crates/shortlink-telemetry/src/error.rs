use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("failed to install the log bridge: {0}")]
    LogBridge(String),
    #[error("a global tracing subscriber is already installed")]
    Subscriber(#[from] tracing::subscriber::SetGlobalDefaultError),
    #[error("failed to build the OTLP exporter: {0}")]
    Exporter(#[from] opentelemetry_otlp::ExporterBuildError),
    #[error("failed to build the audit HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}
