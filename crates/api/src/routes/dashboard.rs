//! Dashboard and revenue analytics endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use chrono::NaiveDate;
use reporting::{DailyRevenue, DashboardStats, RevenuePeriod};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::auth::Admin;
use crate::error::ApiError;

#[derive(Serialize)]
pub struct DashboardResponse {
    pub success: bool,
    pub stats: DashboardStats,
}

#[derive(Debug, Default, Deserialize)]
pub struct RevenueParams {
    pub period: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueResponse {
    pub success: bool,
    pub period: RevenuePeriod,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub series: Vec<DailyRevenue>,
}

/// GET /dashboard/stats — order, revenue, product and user totals (admin).
#[tracing::instrument(skip(state, _admin))]
pub async fn stats(
    State(state): State<Arc<AppState>>,
    _admin: Admin,
) -> Result<Json<DashboardResponse>, ApiError> {
    let stats = state
        .reports
        .dashboard_stats(state.lifecycle.ledger().as_ref(), state.users.as_ref())
        .await?;

    Ok(Json(DashboardResponse {
        success: true,
        stats,
    }))
}

/// GET /analytics/revenue?period=7d|30d|3m — daily revenue ending today (admin).
#[tracing::instrument(skip(state, _admin, params))]
pub async fn revenue(
    State(state): State<Arc<AppState>>,
    _admin: Admin,
    params: Result<Query<RevenueParams>, QueryRejection>,
) -> Result<Json<RevenueResponse>, ApiError> {
    let Query(params) = params?;
    let period = match params.period.as_deref() {
        None | Some("") => RevenuePeriod::default(),
        Some(value) => value.parse()?,
    };

    let range = period.current_range()?;
    let series = state.reports.revenue_series(range).await?;

    Ok(Json(RevenueResponse {
        success: true,
        period,
        start_date: range.start(),
        end_date: range.end(),
        series,
    }))
}
