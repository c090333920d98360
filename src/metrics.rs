use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use tracing::warn;

static HANDLE: OnceCell<Option<PrometheusHandle>> = OnceCell::new();

#[derive(Clone)]
pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder (once per process) and describe the series.
    /// Returns `None` if another recorder is already installed.
    pub fn init() -> Option<Self> {
        let handle = HANDLE.get_or_init(|| match PrometheusBuilder::new().install_recorder() {
            Ok(h) => {
                describe_all();
                Some(h)
            }
            Err(e) => {
                warn!(error = ?e, "prometheus: recorder not installed");
                None
            }
        });
        handle.clone().map(|handle| Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router<S>(&self) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

fn describe_all() {
    describe_counter!(
        "rankings_requests_total",
        "Ranking/statistics requests, by endpoint."
    );
    describe_counter!(
        "rankings_errors_total",
        "Requests that ended in a server error, by endpoint."
    );
    describe_counter!(
        "reviews_submitted_total",
        "Stored review comments, by sentiment label."
    );
    describe_histogram!(
        "rankings_duration_ms",
        "Request handling time in milliseconds, by endpoint."
    );
    describe_gauge!("store_restaurants", "Restaurants visible in the last full scan.");
}
