use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    middleware,
    routing::{delete, get, patch, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::domain::models::product::{Product, StockStatus};
use crate::domain::services::product_service::{
    CreateProduct, ProductService, UpdateProduct,
};
use crate::error::AppError;
use crate::middleware::auth::{admin_auth, AdminContext};
use crate::server::AppState;

pub fn routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let admin_routes = Router::new()
        .route("/", post(create_product))
        .route("/admin/all", get(list_all_products))
        .route("/:id", put(update_product))
        .route("/:id", delete(deactivate_product))
        .route("/:id/stock", patch(update_stock))
        .route("/:id/toggle-status", patch(toggle_status))
        .route("/:id/permanent", delete(delete_permanent))
        .route_layer(middleware::from_fn_with_state(state, admin_auth));

    Router::new()
        .route("/", get(list_products))
        .route("/:id", get(get_product))
        .route("/category/:category", get(list_by_category))
        .route("/search/:query", get(search_products))
        .merge(admin_routes)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductResponse {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub stock: u32,
    pub category: String,
    pub sku: Option<String>,
    pub is_active: bool,
    pub low_stock_threshold: u32,
    pub stock_status: StockStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<Product> for ProductResponse {
    fn from(product: Product) -> Self {
        let stock_status = product.stock_status();
        Self {
            id: product.id,
            name: product.name,
            description: product.description,
            price: product.price,
            stock: product.stock,
            category: product.category,
            sku: product.sku,
            is_active: product.is_active,
            low_stock_threshold: product.low_stock_threshold,
            stock_status,
            created_at: product.created_at,
            updated_at: product.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProductMessageResponse {
    pub message: String,
    pub product: ProductResponse,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockChangedResponse {
    pub message: String,
    pub product: ProductResponse,
    pub old_stock: u32,
    pub new_stock: u32,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    #[validate(length(min = 1, message = "Name cannot be empty"))]
    pub name: String,
    pub description: Option<String>,
    #[validate(range(min = 0.0, message = "Price must be non-negative"))]
    pub price: f64,
    #[validate(range(min = 0, message = "Stock must be non-negative"))]
    pub stock: i64,
    pub category: Option<String>,
    pub sku: Option<String>,
    #[validate(range(min = 0, message = "Low stock threshold must be non-negative"))]
    pub low_stock_threshold: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(range(min = 0.0, message = "Price must be non-negative"))]
    pub price: Option<f64>,
    #[validate(range(min = 0, message = "Stock must be non-negative"))]
    pub stock: Option<i64>,
    pub category: Option<String>,
    pub sku: Option<String>,
    #[validate(range(min = 0, message = "Low stock threshold must be non-negative"))]
    pub low_stock_threshold: Option<i64>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateStockRequest {
    #[validate(range(min = 0, message = "Valid stock quantity is required"))]
    pub stock: i64,
}

async fn list_products(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ProductResponse>>, AppError> {
    let product_service = ProductService::new(state.clone());
    let products = product_service.list_active().await?;

    Ok(Json(products.into_iter().map(ProductResponse::from).collect()))
}

async fn list_all_products(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ProductResponse>>, AppError> {
    let product_service = ProductService::new(state.clone());
    let products = product_service.list_all().await?;

    Ok(Json(products.into_iter().map(ProductResponse::from).collect()))
}

async fn get_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProductResponse>, AppError> {
    let product_service = ProductService::new(state.clone());
    let product = product_service.get_product(id).await?;

    Ok(Json(ProductResponse::from(product)))
}

async fn list_by_category(
    State(state): State<Arc<AppState>>,
    Path(category): Path<String>,
) -> Result<Json<Vec<ProductResponse>>, AppError> {
    let product_service = ProductService::new(state.clone());
    let products = product_service.list_by_category(&category).await?;

    Ok(Json(products.into_iter().map(ProductResponse::from).collect()))
}

async fn search_products(
    State(state): State<Arc<AppState>>,
    Path(query): Path<String>,
) -> Result<Json<Vec<ProductResponse>>, AppError> {
    let product_service = ProductService::new(state.clone());
    let products = product_service.search(&query).await?;

    Ok(Json(products.into_iter().map(ProductResponse::from).collect()))
}

async fn create_product(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AdminContext>,
    Json(payload): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<ProductMessageResponse>), AppError> {
    // 验证请求
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let product_service = ProductService::new(state.clone());
    let product = product_service
        .create_product(CreateProduct {
            name: payload.name,
            description: payload.description,
            price: payload.price,
            stock: payload.stock as u32,
            category: payload.category,
            sku: payload.sku,
            low_stock_threshold: payload.low_stock_threshold.map(|t| t as u32),
        })
        .await?;

    tracing::info!(product = %product.name, admin = %admin.email, "Product created");

    Ok((
        StatusCode::CREATED,
        Json(ProductMessageResponse {
            message: "Product created successfully".to_string(),
            product: ProductResponse::from(product),
        }),
    ))
}

async fn update_product(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AdminContext>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductRequest>,
) -> Result<Json<ProductMessageResponse>, AppError> {
    // 验证请求
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let product_service = ProductService::new(state.clone());
    let product = product_service
        .update_product(
            id,
            UpdateProduct {
                name: payload.name,
                description: payload.description,
                price: payload.price,
                stock: payload.stock.map(|s| s as u32),
                category: payload.category,
                sku: payload.sku,
                low_stock_threshold: payload.low_stock_threshold.map(|t| t as u32),
                is_active: payload.is_active,
            },
        )
        .await?;

    tracing::info!(product = %product.name, admin = %admin.email, "Product updated");

    Ok(Json(ProductMessageResponse {
        message: "Product updated successfully".to_string(),
        product: ProductResponse::from(product),
    }))
}

async fn update_stock(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AdminContext>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStockRequest>,
) -> Result<Json<StockChangedResponse>, AppError> {
    // 验证请求
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let product_service = ProductService::new(state.clone());
    let (product, old_stock) = product_service.set_stock(id, payload.stock as u32).await?;

    tracing::info!(
        product = %product.name,
        old_stock,
        new_stock = product.stock,
        admin = %admin.email,
        "Stock updated"
    );

    let new_stock = product.stock;
    Ok(Json(StockChangedResponse {
        message: "Stock updated successfully".to_string(),
        product: ProductResponse::from(product),
        old_stock,
        new_stock,
    }))
}

async fn toggle_status(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AdminContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProductMessageResponse>, AppError> {
    let product_service = ProductService::new(state.clone());
    let product = product_service.toggle_status(id).await?;

    let action = if product.is_active { "activated" } else { "deactivated" };
    tracing::info!(product = %product.name, admin = %admin.email, "Product {}", action);

    Ok(Json(ProductMessageResponse {
        message: format!("Product {} successfully", action),
        product: ProductResponse::from(product),
    }))
}

async fn deactivate_product(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AdminContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProductMessageResponse>, AppError> {
    let product_service = ProductService::new(state.clone());
    let product = product_service.deactivate(id).await?;

    tracing::info!(product = %product.name, admin = %admin.email, "Product soft deleted");

    Ok(Json(ProductMessageResponse {
        message: "Product deleted successfully".to_string(),
        product: ProductResponse::from(product),
    }))
}

async fn delete_permanent(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AdminContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProductMessageResponse>, AppError> {
    let product_service = ProductService::new(state.clone());
    let product = product_service.delete_permanent(id).await?;

    tracing::info!(product = %product.name, admin = %admin.email, "Product permanently deleted");

    Ok(Json(ProductMessageResponse {
        message: "Product permanently deleted".to_string(),
        product: ProductResponse::from(product),
    }))
}
