use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::models::user::UserRole;
use crate::domain::services::auth_service::AuthService;
use crate::error::AppError;
use crate::server::AppState;

/// 通过认证的管理员身份, 由中间件写入请求扩展
#[derive(Debug, Clone)]
pub struct AdminContext {
    pub user_id: Uuid,
    pub email: String,
}

pub async fn admin_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    // 从请求头获取令牌
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .ok_or_else(|| AppError::Auth("Missing authorization header".to_string()))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Auth("Invalid authorization header format".to_string()))?;

    // 验证令牌并检查角色
    let auth_service = AuthService::new(state.clone());
    let claims = auth_service.validate_token(token)?;

    if claims.role != UserRole::Admin {
        return Err(AppError::Forbidden(
            "Administrator access required".to_string(),
        ));
    }

    let user_id = Uuid::parse_str(&claims.sub)
        .map_err(|_| AppError::Auth("Invalid token subject".to_string()))?;

    request.extensions_mut().insert(AdminContext {
        user_id,
        email: claims.email,
    });

    Ok(next.run(request).await)
}
