//! Prometheus metrics endpoint.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use metrics_exporter_prometheus::PrometheusHandle;

/// Registers help text for the metrics the service records.
pub fn describe() {
    metrics::describe_counter!("orders_placed_total", "Orders successfully placed");
    metrics::describe_counter!(
        "order_placement_failures_total",
        "Rejected or failed placements, by reason"
    );
    metrics::describe_counter!(
        "order_number_fallbacks_total",
        "Placements that fell back to a timestamped order number"
    );
    metrics::describe_counter!(
        "order_status_transitions_total",
        "Accepted payment and order status changes, by kind and target"
    );
    metrics::describe_counter!("store_timeouts_total", "Store calls that exceeded their bound");
    metrics::describe_counter!("dashboard_reports_total", "Dashboard reports computed");
    metrics::describe_histogram!(
        "order_placement_duration_seconds",
        metrics::Unit::Seconds,
        "Time to reserve stock, number and store an order"
    );
}

/// GET /metrics — returns Prometheus-formatted metrics.
pub async fn get(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        handle.render(),
    )
}
