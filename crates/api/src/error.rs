//! API error types with HTTP response mapping.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::OrderError;
use lifecycle::LifecycleError;
use order_store::StoreError;
use reporting::ReportingError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Order placement or transition failed.
    Lifecycle(LifecycleError),
    /// A report could not be computed.
    Reporting(ReportingError),
    /// Direct ledger or store access failed.
    Store(StoreError),
    /// Malformed request body, path or query.
    BadRequest(String),
    /// Resource not found.
    NotFound(String),
    /// Missing or invalid bearer token.
    Unauthorized(String),
    /// Authenticated, but not allowed.
    Forbidden(String),
}

impl ApiError {
    /// Returns the status code and client-facing message.
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            ApiError::Lifecycle(err) => (lifecycle_status(err), err.to_string()),
            ApiError::Reporting(err) => (reporting_status(err), err.to_string()),
            ApiError::Store(err) => (store_status(err), err.to_string()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
        }
    }

    /// Field the error refers to, for validation failures.
    fn field(&self) -> Option<&str> {
        match self {
            ApiError::Lifecycle(LifecycleError::Order(OrderError::Validation { field, .. })) => {
                Some(field.as_str())
            }
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();

        if status.is_server_error() {
            tracing::error!(%status, error = %message, "request failed");
        } else {
            tracing::debug!(%status, error = %message, "request rejected");
        }

        let mut body = serde_json::json!({ "success": false, "error": message });
        if let Some(field) = self.field() {
            body["field"] = serde_json::Value::from(field);
        }
        (status, axum::Json(body)).into_response()
    }
}

fn lifecycle_status(err: &LifecycleError) -> StatusCode {
    match err {
        LifecycleError::Order(_)
        | LifecycleError::InsufficientStock { .. }
        | LifecycleError::ProductNotFound(_) => StatusCode::BAD_REQUEST,
        LifecycleError::NotFound(_) => StatusCode::NOT_FOUND,
        LifecycleError::Conflict { .. } => StatusCode::CONFLICT,
        LifecycleError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        LifecycleError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

fn reporting_status(err: &ReportingError) -> StatusCode {
    match err {
        ReportingError::Store(store_err) => store_status(store_err),
        ReportingError::InvalidPeriod(_) | ReportingError::InvalidRange { .. } => {
            StatusCode::BAD_REQUEST
        }
        ReportingError::Directory(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

fn store_status(err: &StoreError) -> StatusCode {
    match err {
        StoreError::OrderNotFound(_) | StoreError::ProductNotFound(_) => StatusCode::NOT_FOUND,
        StoreError::InsufficientStock { .. } | StoreError::UnplacedOrder => {
            StatusCode::BAD_REQUEST
        }
        StoreError::DuplicateOrderNumber(_)
        | StoreError::DuplicateOrderId(_)
        | StoreError::ConcurrencyConflict { .. } => StatusCode::CONFLICT,
        StoreError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        StoreError::Database(_) | StoreError::Migration(_) => StatusCode::SERVICE_UNAVAILABLE,
        StoreError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<LifecycleError> for ApiError {
    fn from(err: LifecycleError) -> Self {
        ApiError::Lifecycle(err)
    }
}

impl From<OrderError> for ApiError {
    fn from(err: OrderError) -> Self {
        ApiError::Lifecycle(LifecycleError::Order(err))
    }
}

impl From<ReportingError> for ApiError {
    fn from(err: ReportingError) -> Self {
        ApiError::Reporting(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Store(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}
