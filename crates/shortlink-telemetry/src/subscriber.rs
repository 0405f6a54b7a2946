use crate::error::TelemetryError;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::trace::SdkTracerProvider;
use opentelemetry_sdk::Resource;
use tracing::warn;
use tracing_log::LogTracer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter};
use typed_builder::TypedBuilder;

pub const DEFAULT_FILTER: &str = "info";
pub const DEFAULT_SERVICE_NAME: &str = "shortlink";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, TypedBuilder)]
pub struct TracingConfig {
    #[builder(default = DEFAULT_SERVICE_NAME.to_string(), setter(into))]
    pub service_name: String,
    #[builder(default)]
    pub format: LogFormat,
    /// Used when `RUST_LOG` is unset or unparsable.
    #[builder(default = DEFAULT_FILTER.to_string(), setter(into))]
    pub default_filter: String,
    /// gRPC endpoint of an OTLP collector. Spans are only exported when set.
    #[builder(default)]
    pub otlp_endpoint: Option<String>,
}

/// Flushes and shuts down span export when dropped.
#[must_use = "dropping the guard stops span export"]
pub struct TelemetryGuard {
    provider: Option<SdkTracerProvider>,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.provider.take() {
            if let Err(err) = provider.shutdown() {
                warn!(error = %err, "failed to shut down span exporter");
            }
        }
    }
}

fn tracer_provider(
    service_name: &str,
    endpoint: &str,
) -> Result<SdkTracerProvider, TelemetryError> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;

    let resource = Resource::builder()
        .with_service_name(service_name.to_owned())
        .build();

    Ok(SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(resource)
        .build())
}

/// Installs the global subscriber: env filter, fmt output and optional
/// OTLP span export. `log` records are bridged into tracing.
///
/// Must be called once, from inside a tokio runtime when OTLP is enabled.
pub fn init_tracing(config: &TracingConfig) -> Result<TelemetryGuard, TelemetryError> {
    LogTracer::init().map_err(|e| TelemetryError::LogBridge(e.to_string()))?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    let provider = config
        .otlp_endpoint
        .as_deref()
        .map(|endpoint| tracer_provider(&config.service_name, endpoint))
        .transpose()?;

    let otel_layer = provider.as_ref().map(|provider| {
        tracing_opentelemetry::layer().with_tracer(provider.tracer(config.service_name.clone()))
    });

    let registry = tracing_subscriber::registry().with(filter).with(otel_layer);

    match config.format {
        LogFormat::Pretty => {
            tracing::subscriber::set_global_default(registry.with(fmt::layer().pretty()))?
        }
        LogFormat::Json => tracing::subscriber::set_global_default(
            registry.with(fmt::layer().json().flatten_event(true)),
        )?,
    }

    Ok(TelemetryGuard { provider })
}
