//! Stock level endpoints for the catalog collaborator.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use common::ProductId;
use order_store::{InventoryLedger, with_timeout};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::auth::Admin;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct SetStockRequest {
    pub stock: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockResponse {
    pub success: bool,
    pub product_id: ProductId,
    pub stock: u32,
}

/// GET /inventory/{productId} — current stock of a product (admin).
#[tracing::instrument(skip(state, _admin))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    _admin: Admin,
    Path(product_id): Path<String>,
) -> Result<Json<StockResponse>, ApiError> {
    let product_id = ProductId::new(product_id);
    let ledger = state.lifecycle.ledger();
    let stock = with_timeout(state.store_timeout(), ledger.stock_level(&product_id)).await?;

    Ok(Json(StockResponse {
        success: true,
        product_id,
        stock,
    }))
}

/// PUT /inventory/{productId} — set the stock of a product (admin).
#[tracing::instrument(skip(state, admin, payload), fields(user_id = %admin.0.user_id))]
pub async fn put(
    State(state): State<Arc<AppState>>,
    admin: Admin,
    Path(product_id): Path<String>,
    payload: Result<Json<SetStockRequest>, JsonRejection>,
) -> Result<Json<StockResponse>, ApiError> {
    let Json(req) = payload?;
    let product_id = ProductId::new(product_id);
    if product_id.as_str().trim().is_empty() {
        return Err(ApiError::BadRequest("productId is required".to_string()));
    }

    let ledger = state.lifecycle.ledger();
    with_timeout(state.store_timeout(), ledger.set_stock(&product_id, req.stock)).await?;
    tracing::info!(%product_id, stock = req.stock, "stock level set");

    Ok(Json(StockResponse {
        success: true,
        product_id,
        stock: req.stock,
    }))
}
