use axum::{
    Router,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use borg_prometheus::{MetricsError, Registry, encode_text, text_content_type};
use tokio::net::TcpListener;
use tracing::{debug, error};

use crate::{config::ListenAddress, error::StartupError};

/// Bind the first candidate of `address` that the host accepts.
pub async fn bind(address: &ListenAddress) -> Result<TcpListener, StartupError> {
    let mut last_error = None;
    for candidate in address.candidates() {
        match TcpListener::bind(&candidate).await {
            Ok(listener) => return Ok(listener),
            Err(e) => {
                debug!(target: "borg.exporter", %candidate, error = %e, "bind failed");
                last_error = Some(e);
            }
        }
    }
    Err(StartupError::Bind {
        address: address.to_string(),
        source: last_error
            .unwrap_or_else(|| std::io::Error::from(std::io::ErrorKind::AddrNotAvailable)),
    })
}

/// HTTP surface of the exporter.
pub struct MetricsApi {
    registry: Registry,
    metrics_path: String,
}

impl MetricsApi {
    pub fn new(registry: Registry, metrics_path: impl Into<String>) -> Self {
        Self {
            registry,
            metrics_path: metrics_path.into(),
        }
    }

    /// Routes:
    /// - GET /health - liveness, empty 200
    /// - GET <metrics_path> - Prometheus text format
    pub fn router(self) -> Router {
        Router::new()
            .route("/health", get(health))
            .route(&self.metrics_path, get(metrics))
            .with_state(self.registry)
    }
}

struct ScrapeError(MetricsError);

impl IntoResponse for ScrapeError {
    fn into_response(self) -> Response {
        error!(target: "borg.exporter", error = %self.0, "failed to encode metrics");
        (StatusCode::INTERNAL_SERVER_ERROR, "failed to encode metrics").into_response()
    }
}

/// GET /health
async fn health() -> StatusCode {
    StatusCode::OK
}

/// GET <metrics_path>
///
/// Reads only the registry, so a scrape never waits for a running collection cycle.
async fn metrics(State(registry): State<Registry>) -> Result<impl IntoResponse, ScrapeError> {
    let body = encode_text(&registry).map_err(ScrapeError)?;
    debug!(target: "borg.exporter", bytes = body.len(), "metrics scraped");
    Ok(([(header::CONTENT_TYPE, text_content_type())], body))
}

#[cfg(test)]
mod tests {
    use borg_prometheus::BorgMetrics;

    use super::*;

    async fn serve(api: MetricsApi) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, api.router()).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn registry() -> Registry {
        let metrics = BorgMetrics::new("my-hostname", "borg 1.2.8").unwrap();
        let registry = Registry::new();
        metrics.register(&registry).unwrap();
        metrics.set_last_backup_files("/srv/borg", 42.0);
        registry
    }

    #[tokio::test]
    async fn bind_reports_the_configured_address() {
        let listener = bind(&ListenAddress::Exact("127.0.0.1:0".into()))
            .await
            .unwrap();
        assert!(listener.local_addr().unwrap().ip().is_loopback());

        let taken = listener.local_addr().unwrap().to_string();
        let err = bind(&ListenAddress::Exact(taken.clone())).await.unwrap_err();
        match err {
            StartupError::Bind { address, .. } => assert_eq!(address, taken),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn all_interfaces_binds_some_family() {
        let listener = bind(&ListenAddress::AllInterfaces(0)).await.unwrap();
        assert!(listener.local_addr().unwrap().ip().is_unspecified());
    }

    #[tokio::test]
    async fn health_is_empty_ok() {
        let base = serve(MetricsApi::new(registry(), "/metrics")).await;

        let resp = reqwest::get(format!("{base}/health")).await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        assert!(resp.text().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn metrics_are_served_on_configured_path() {
        let base = serve(MetricsApi::new(registry(), "/borg")).await;

        let resp = reqwest::get(format!("{base}/borg")).await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        let content_type = resp.headers()[reqwest::header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .to_string();
        assert!(content_type.starts_with("text/plain"));

        let body = resp.text().await.unwrap();
        assert!(body.contains(r#"borg_last_backup_files{repository="/srv/borg"} 42"#));
        let system = body
            .lines()
            .find(|l| l.starts_with("borg_system_info{"))
            .unwrap();
        assert!(system.contains(r#"hostname="my-hostname""#));
        assert!(system.ends_with(" 1"));

        let missing = reqwest::get(format!("{base}/metrics")).await.unwrap();
        assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);
    }
}
