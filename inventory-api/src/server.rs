use axum::{routing::get, Json, Router};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::api::{auth, events, orders, products, users};
use crate::config::Config;
use crate::domain::repositories::product_repository::ProductRepository;
use crate::domain::repositories::user_repository::UserRepository;
use crate::domain::services::order_service::OrderClient;
use crate::error::AppError;
use crate::infrastructure::broadcast::Broadcaster;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub products: Arc<ProductRepository>,
    pub users: Arc<UserRepository>,
    pub broadcaster: Broadcaster,
    pub orders: OrderClient,
}

pub async fn create_app(state: AppState) -> Result<Router, AppError> {
    let app_state = Arc::new(state);

    // 健康检查路由
    let health_route = Router::new().route("/health", get(health));

    // API 路由
    let api_routes = Router::new()
        .nest("/auth", auth::routes())
        .nest("/admin", users::routes(app_state.clone()))
        .nest("/products", products::routes(app_state.clone()))
        .nest("/orders", orders::routes());

    // 组合所有路由
    let app = Router::new()
        .nest("/api/v1", api_routes)
        .merge(health_route)
        .merge(events::routes())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                )
                .layer(TimeoutLayer::new(Duration::from_secs(30))),
        )
        .with_state(app_state);

    Ok(app)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}
