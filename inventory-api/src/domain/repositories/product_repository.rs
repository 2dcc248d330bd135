use async_trait::async_trait;
use chrono::Utc;
use sqlx::MySqlPool;
use uuid::Uuid;

use crate::domain::models::product::Product;
use crate::error::AppError;

/// 订单队列依赖的最小库存接口: 读当前状态 + 提交扣减
#[async_trait]
pub trait StockLedger: Send + Sync {
    async fn find(&self, id: Uuid) -> Result<Option<Product>, AppError>;

    async fn list_active(&self) -> Result<Vec<Product>, AppError>;

    /// 带条件的扣减, 库存不足时数据库侧也不会被写成负数
    async fn decrement_stock(&self, id: Uuid, quantity: u32) -> Result<Product, AppError>;
}

pub struct ProductRepository {
    pool: MySqlPool,
}

impl ProductRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    pub async fn list_all(&self) -> Result<Vec<Product>, AppError> {
        let products = sqlx::query_as::<_, Product>(
            r#"SELECT * FROM products ORDER BY created_at DESC"#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    pub async fn list_by_category(&self, category: &str) -> Result<Vec<Product>, AppError> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT * FROM products
            WHERE category = ? AND is_active = TRUE
            ORDER BY created_at DESC
            "#,
        )
        .bind(category)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    pub async fn search(&self, query: &str) -> Result<Vec<Product>, AppError> {
        let pattern = format!("%{}%", query);

        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT * FROM products
            WHERE is_active = TRUE
              AND (name LIKE ? OR description LIKE ? OR category LIKE ? OR sku LIKE ?)
            ORDER BY created_at DESC
            "#,
        )
        .bind(&pattern)
        .bind(&pattern)
        .bind(&pattern)
        .bind(&pattern)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<Product>, AppError> {
        let product = sqlx::query_as::<_, Product>(
            r#"SELECT * FROM products WHERE name = ?"#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    pub async fn find_by_sku(&self, sku: &str) -> Result<Option<Product>, AppError> {
        let product = sqlx::query_as::<_, Product>(
            r#"SELECT * FROM products WHERE sku = ?"#,
        )
        .bind(sku)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    pub async fn insert(&self, product: &Product) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO products
                (id, name, description, price, stock, category, sku,
                 is_active, low_stock_threshold, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.stock)
        .bind(&product.category)
        .bind(&product.sku)
        .bind(product.is_active)
        .bind(product.low_stock_threshold)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn update(&self, product: &Product) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE products
            SET name = ?, description = ?, price = ?, stock = ?, category = ?,
                sku = ?, is_active = ?, low_stock_threshold = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.stock)
        .bind(&product.category)
        .bind(&product.sku)
        .bind(product.is_active)
        .bind(product.low_stock_threshold)
        .bind(product.updated_at)
        .bind(product.id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(r#"DELETE FROM products WHERE id = ?"#)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl StockLedger for ProductRepository {
    async fn find(&self, id: Uuid) -> Result<Option<Product>, AppError> {
        let product = sqlx::query_as::<_, Product>(
            r#"SELECT * FROM products WHERE id = ?"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    async fn list_active(&self) -> Result<Vec<Product>, AppError> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT * FROM products
            WHERE is_active = TRUE
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    async fn decrement_stock(&self, id: Uuid, quantity: u32) -> Result<Product, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock = stock - ?, updated_at = ?
            WHERE id = ? AND stock >= ?
            "#,
        )
        .bind(quantity)
        .bind(Utc::now())
        .bind(id)
        .bind(quantity)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::Internal(format!(
                "stock commit rejected for product {}",
                id
            )));
        }

        self.find(id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("product {} vanished after commit", id)))
    }
}
