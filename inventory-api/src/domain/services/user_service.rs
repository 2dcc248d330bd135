use std::sync::Arc;
use uuid::Uuid;

use crate::domain::models::user::{User, UserRole};
use crate::domain::services::auth_service::AuthService;
use crate::error::AppError;
use crate::server::AppState;

pub struct UserService {
    state: Arc<AppState>,
}

impl UserService {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    pub async fn create_user(
        &self,
        name: &str,
        email: &str,
        password: &str,
        role: Option<&str>,
    ) -> Result<User, AppError> {
        let name = name.trim();
        let email = email.trim();

        if self.state.users.find_by_email(email).await?.is_some() {
            return Err(AppError::Validation(
                "User with this email already exists".to_string(),
            ));
        }

        let role = match role {
            None => UserRole::User,
            Some(value) => UserRole::parse(value).ok_or_else(|| {
                AppError::Validation("Role must be either 'admin' or 'user'".to_string())
            })?,
        };

        let auth_service = AuthService::new(self.state.clone());
        let password_hash = auth_service.hash_password(password)?;

        let user = User::new(name, email, &password_hash, role);
        self.state.users.insert(&user).await?;

        Ok(user)
    }

    pub async fn list_users(&self) -> Result<Vec<User>, AppError> {
        self.state.users.list().await
    }

    pub async fn delete_user(&self, id: Uuid) -> Result<(), AppError> {
        let deleted = self.state.users.delete(id).await?;
        if !deleted {
            return Err(AppError::NotFound("User not found".to_string()));
        }

        Ok(())
    }

    /// 首次启动时按配置创建管理员账号, 已存在则跳过
    pub async fn ensure_bootstrap_admin(&self) -> Result<(), AppError> {
        let auth = &self.state.config.auth;
        let (Some(email), Some(password)) = (
            auth.bootstrap_admin_email.as_deref(),
            auth.bootstrap_admin_password.as_deref(),
        ) else {
            return Ok(());
        };

        if self.state.users.has_admin().await? {
            return Ok(());
        }

        if self.state.users.find_by_email(email).await?.is_some() {
            return Ok(());
        }

        let name = auth
            .bootstrap_admin_name
            .as_deref()
            .unwrap_or("Administrator");

        self.create_user(name, email, password, Some("admin")).await?;
        tracing::info!(admin = %email, "Bootstrap admin account created");

        Ok(())
    }
}
