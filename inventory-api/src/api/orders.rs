use axum::{
    extract::State,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::products::ProductResponse;
use crate::error::AppError;
use crate::server::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/", post(place_order))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    #[serde(default)]
    pub product_id: Option<String>,
    #[serde(default)]
    pub quantity: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub message: String,
    pub product: ProductResponse,
    pub remaining_stock: u32,
}

async fn place_order(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<PlaceOrderRequest>,
) -> Result<Json<OrderResponse>, AppError> {
    // 格式校验在入队前完成, 不合法的请求不会进入队列
    let product_id = payload
        .product_id
        .as_deref()
        .and_then(|raw| Uuid::parse_str(raw).ok())
        .ok_or_else(|| AppError::BadRequest("A valid productId is required".to_string()))?;

    let quantity = match payload.quantity {
        Some(q) if q > 0 && q <= i64::from(u32::MAX) => q as u32,
        _ => {
            return Err(AppError::BadRequest(
                "Quantity must be a positive integer".to_string(),
            ))
        }
    };

    let receipt = state.orders.place(product_id, quantity).await?;

    Ok(Json(OrderResponse {
        message: "Order placed successfully".to_string(),
        product: ProductResponse::from(receipt.product),
        remaining_stock: receipt.remaining_stock,
    }))
}
