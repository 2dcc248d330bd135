use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    middleware,
    routing::{delete, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::domain::models::user::{User, UserRole};
use crate::domain::services::user_service::UserService;
use crate::error::AppError;
use crate::middleware::auth::{admin_auth, AdminContext};
use crate::server::AppState;

pub fn routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/:id", delete(delete_user))
        .route_layer(middleware::from_fn_with_state(state, admin_auth))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, message = "Name cannot be empty"))]
    pub name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    pub role: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreatedUserResponse {
    pub message: String,
    pub user: UserResponse,
}

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub users: Vec<UserResponse>,
}

async fn create_user(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AdminContext>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<CreatedUserResponse>), AppError> {
    // 验证请求
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let user_service = UserService::new(state.clone());
    let user = user_service
        .create_user(
            &payload.name,
            &payload.email,
            &payload.password,
            payload.role.as_deref(),
        )
        .await?;

    tracing::info!(user = %user.email, admin = %admin.email, "User created");

    Ok((
        StatusCode::CREATED,
        Json(CreatedUserResponse {
            message: "User created successfully".to_string(),
            user: UserResponse::from(user),
        }),
    ))
}

async fn list_users(
    State(state): State<Arc<AppState>>,
) -> Result<Json<UserListResponse>, AppError> {
    let user_service = UserService::new(state.clone());
    let users = user_service.list_users().await?;

    Ok(Json(UserListResponse {
        users: users.into_iter().map(UserResponse::from).collect(),
    }))
}

async fn delete_user(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AdminContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let user_service = UserService::new(state.clone());
    user_service.delete_user(id).await?;

    tracing::info!(user_id = %id, admin = %admin.email, "User deleted");

    Ok(Json(json!({ "message": "User deleted successfully" })))
}
