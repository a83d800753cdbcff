//! Order placement, listing and status endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::OrderId;
use domain::{
    Money, Order, OrderItem, OrderStatus, PaymentMethod, PaymentStatus, PlaceOrder,
    ShippingAddress,
};
use order_store::OrderQuery;
use reporting::StatusCounts;
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::auth::{Admin, Identity};
use crate::error::ApiError;

/// Largest page an order listing returns.
const MAX_PAGE_SIZE: usize = 500;

// -- Request types --

/// Checkout body for `POST /orders`.
///
/// All amounts (`items[].price`, `subtotal`, `shippingCost`, `total`) are
/// integer minor units, e.g. cents: `1999` is $19.99. Fractional numbers
/// are rejected with 400.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub items: Vec<OrderItem>,
    pub shipping_address: ShippingAddress,
    pub payment_intent_id: String,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    pub subtotal: Money,
    pub shipping_cost: Money,
    pub total: Money,
}

impl CreateOrderRequest {
    fn into_command(self, customer_id: String) -> PlaceOrder {
        let cmd = PlaceOrder::new(
            self.items,
            self.shipping_address,
            self.payment_intent_id,
            self.subtotal,
            self.shipping_cost,
            self.total,
        )
        .for_customer(customer_id);

        match self.payment_method {
            Some(method) => cmd.with_payment_method(method),
            None => cmd,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListOrdersParams {
    pub payment_method: Option<String>,
    pub payment_status: Option<String>,
    pub order_status: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl ListOrdersParams {
    fn into_query(self) -> Result<OrderQuery, ApiError> {
        let mut query = OrderQuery::new();
        if let Some(method) = non_empty(self.payment_method) {
            query = query.payment_method(method.parse()?);
        }
        if let Some(status) = non_empty(self.payment_status) {
            query = query.payment_status(status.parse()?);
        }
        if let Some(status) = non_empty(self.order_status) {
            query = query.order_status(status.parse()?);
        }
        query = query.limit(self.limit.unwrap_or(MAX_PAGE_SIZE).min(MAX_PAGE_SIZE));
        if let Some(offset) = self.offset {
            query = query.offset(offset);
        }
        Ok(query)
    }
}

/// Treats `?orderStatus=` and `?orderStatus=all` as no filter.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty() && v != "all")
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderStatusRequest {
    pub order_status: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePaymentStatusRequest {
    pub payment_status: String,
    #[serde(default)]
    pub paid_at: Option<DateTime<Utc>>,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub success: bool,
    pub order: Order,
}

impl OrderResponse {
    fn ok(order: Order) -> Json<Self> {
        Json(Self {
            success: true,
            order,
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderListResponse {
    pub success: bool,
    pub orders: Vec<Order>,
    pub total: usize,
    pub status_counts: StatusCounts,
}

// -- Handlers --

/// POST /orders — place an order for the authenticated customer.
#[tracing::instrument(skip(state, identity, payload), fields(user_id = %identity.user_id))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    payload: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let Json(req) = payload?;
    let cmd = req.into_command(identity.user_id);

    let placed = state.lifecycle.place_order(cmd).await?;

    Ok((StatusCode::CREATED, OrderResponse::ok(placed.order)))
}

/// GET /orders — filtered listing with per-status counts (admin).
#[tracing::instrument(skip(state, _admin, params))]
pub async fn list(
    State(state): State<Arc<AppState>>,
    _admin: Admin,
    params: Result<Query<ListOrdersParams>, QueryRejection>,
) -> Result<Json<OrderListResponse>, ApiError> {
    let Query(params) = params?;
    let query = params.into_query()?;

    let orders = state.lifecycle.list_orders(query).await?;
    let status_counts = state.reports.order_status_counts().await?;

    Ok(Json(OrderListResponse {
        success: true,
        total: orders.len(),
        orders,
        status_counts,
    }))
}

/// GET /orders/{id} — the caller's own order, or any order for admins.
#[tracing::instrument(skip(state, identity), fields(user_id = %identity.user_id))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let order = state.lifecycle.get_order(order_id).await?;

    // Other customers' orders are reported as absent
    if !identity.is_admin() && order.customer_id() != Some(identity.user_id.as_str()) {
        return Err(ApiError::NotFound(format!("Order not found: {order_id}")));
    }

    Ok(OrderResponse::ok(order))
}

/// PATCH /orders/{id}/status — move an order through fulfilment (admin).
#[tracing::instrument(skip(state, _admin, payload))]
pub async fn update_status(
    State(state): State<Arc<AppState>>,
    _admin: Admin,
    Path(id): Path<String>,
    payload: Result<Json<UpdateOrderStatusRequest>, JsonRejection>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let Json(req) = payload?;
    let target: OrderStatus = req.order_status.parse()?;

    let result = state.lifecycle.update_order_status(order_id, target).await?;

    Ok(OrderResponse::ok(result.order))
}

/// PATCH /orders/{id}/payment-status — record a payment outcome (admin).
#[tracing::instrument(skip(state, _admin, payload))]
pub async fn update_payment_status(
    State(state): State<Arc<AppState>>,
    _admin: Admin,
    Path(id): Path<String>,
    payload: Result<Json<UpdatePaymentStatusRequest>, JsonRejection>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let Json(req) = payload?;
    let target: PaymentStatus = req.payment_status.parse()?;

    let result = state
        .lifecycle
        .update_payment_status(order_id, target, req.paid_at)
        .await?;

    Ok(OrderResponse::ok(result.order))
}

fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    id.parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid order id: {id}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_params_build_query() {
        let params = ListOrdersParams {
            payment_method: Some("cash_on_delivery".to_string()),
            payment_status: Some("pending".to_string()),
            order_status: Some("all".to_string()),
            limit: Some(10_000),
            offset: Some(20),
        };
        let query = params.into_query().unwrap();

        assert_eq!(query.payment_method, Some(PaymentMethod::CashOnDelivery));
        assert_eq!(query.payment_status, Some(PaymentStatus::Pending));
        assert_eq!(query.order_status, None);
        assert_eq!(query.limit, Some(MAX_PAGE_SIZE));
        assert_eq!(query.offset, Some(20));
    }

    #[test]
    fn test_list_params_reject_unknown_status() {
        let params = ListOrdersParams {
            order_status: Some("lost".to_string()),
            ..Default::default()
        };
        assert!(params.into_query().is_err());
    }

    #[test]
    fn test_explicit_payment_method_wins() {
        let req: CreateOrderRequest = serde_json::from_value(serde_json::json!({
            "items": [{ "productId": "A", "name": "Widget", "price": 100, "quantity": 1 }],
            "shippingAddress": {
                "fullName": "Test Customer",
                "phone": "555-0100",
                "street": "1 Main St",
                "city": "Springfield",
                "postalCode": "12345",
                "country": "US"
            },
            "paymentIntentId": "pi_123",
            "paymentMethod": "bank_transfer",
            "subtotal": 100,
            "shippingCost": 0,
            "total": 100
        }))
        .unwrap();

        let cmd = req.into_command("user-1".to_string());
        assert_eq!(cmd.payment_method(), PaymentMethod::BankTransfer);
        assert_eq!(cmd.customer_id.as_deref(), Some("user-1"));
    }

    #[test]
    fn test_order_id_must_be_uuid() {
        assert!(matches!(
            parse_order_id("ORD-000001"),
            Err(ApiError::BadRequest(_))
        ));
        assert!(parse_order_id(&OrderId::new().to_string()).is_ok());
    }
}
