use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::domain::models::product::{
    Product, DEFAULT_CATEGORY, DEFAULT_LOW_STOCK_THRESHOLD,
};
use crate::domain::repositories::product_repository::StockLedger;
use crate::error::AppError;
use crate::server::AppState;

#[derive(Debug)]
pub struct CreateProduct {
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub stock: u32,
    pub category: Option<String>,
    pub sku: Option<String>,
    pub low_stock_threshold: Option<u32>,
}

#[derive(Debug, Default)]
pub struct UpdateProduct {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub stock: Option<u32>,
    pub category: Option<String>,
    pub sku: Option<String>,
    pub low_stock_threshold: Option<u32>,
    pub is_active: Option<bool>,
}

pub struct ProductService {
    state: Arc<AppState>,
}

impl ProductService {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    pub async fn list_active(&self) -> Result<Vec<Product>, AppError> {
        self.state.products.list_active().await
    }

    pub async fn list_all(&self) -> Result<Vec<Product>, AppError> {
        self.state.products.list_all().await
    }

    pub async fn list_by_category(&self, category: &str) -> Result<Vec<Product>, AppError> {
        self.state.products.list_by_category(category).await
    }

    pub async fn search(&self, query: &str) -> Result<Vec<Product>, AppError> {
        self.state.products.search(query).await
    }

    pub async fn get_product(&self, id: Uuid) -> Result<Product, AppError> {
        self.state
            .products
            .find(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Product not found".to_string()))
    }

    pub async fn create_product(&self, input: CreateProduct) -> Result<Product, AppError> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::Validation("Name cannot be empty".to_string()));
        }

        if self.state.products.find_by_name(&name).await?.is_some() {
            return Err(AppError::Validation(
                "Product with this name already exists".to_string(),
            ));
        }

        let sku = normalize_sku(input.sku);
        if let Some(sku) = &sku {
            if self.state.products.find_by_sku(sku).await?.is_some() {
                return Err(AppError::Validation(
                    "Product with this SKU already exists".to_string(),
                ));
            }
        }

        let description = input
            .description
            .map(|d| d.trim().to_string())
            .unwrap_or_default();

        let category = input
            .category
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());

        let threshold = input
            .low_stock_threshold
            .unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD);

        let product = Product::new(
            &name,
            &description,
            input.price,
            input.stock,
            &category,
            sku,
            threshold,
        );
        self.state.products.insert(&product).await?;

        Ok(product)
    }

    pub async fn update_product(
        &self,
        id: Uuid,
        input: UpdateProduct,
    ) -> Result<Product, AppError> {
        let mut product = self.get_product(id).await?;

        if let Some(name) = input.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(AppError::Validation("Name cannot be empty".to_string()));
            }

            if name != product.name {
                if let Some(existing) = self.state.products.find_by_name(&name).await? {
                    if existing.id != id {
                        return Err(AppError::Validation(
                            "Product with this name already exists".to_string(),
                        ));
                    }
                }
                product.name = name;
            }
        }

        if let Some(description) = input.description {
            product.description = description.trim().to_string();
        }

        if let Some(price) = input.price {
            product.price = price;
        }

        if let Some(stock) = input.stock {
            product.stock = stock;
        }

        if let Some(category) = input.category {
            product.category = category.trim().to_string();
        }

        if let Some(sku) = input.sku {
            let sku = normalize_sku(Some(sku));
            if let Some(new_sku) = &sku {
                if product.sku.as_deref() != Some(new_sku.as_str()) {
                    if let Some(existing) = self.state.products.find_by_sku(new_sku).await? {
                        if existing.id != id {
                            return Err(AppError::Validation(
                                "Product with this SKU already exists".to_string(),
                            ));
                        }
                    }
                }
            }
            product.sku = sku;
        }

        if let Some(threshold) = input.low_stock_threshold {
            product.low_stock_threshold = threshold;
        }

        if let Some(is_active) = input.is_active {
            product.is_active = is_active;
        }

        product.updated_at = Utc::now();
        self.state.products.update(&product).await?;

        Ok(product)
    }

    /// 直接设置库存绝对值, 返回更新后的商品和旧库存
    pub async fn set_stock(&self, id: Uuid, stock: u32) -> Result<(Product, u32), AppError> {
        let mut product = self.get_product(id).await?;

        let old_stock = product.stock;
        product.stock = stock;
        product.updated_at = Utc::now();
        self.state.products.update(&product).await?;

        Ok((product, old_stock))
    }

    pub async fn toggle_status(&self, id: Uuid) -> Result<Product, AppError> {
        let mut product = self.get_product(id).await?;

        product.is_active = !product.is_active;
        product.updated_at = Utc::now();
        self.state.products.update(&product).await?;

        Ok(product)
    }

    /// 软删除: 只下架, 不删数据
    pub async fn deactivate(&self, id: Uuid) -> Result<Product, AppError> {
        let mut product = self.get_product(id).await?;

        product.is_active = false;
        product.updated_at = Utc::now();
        self.state.products.update(&product).await?;

        Ok(product)
    }

    pub async fn delete_permanent(&self, id: Uuid) -> Result<Product, AppError> {
        let product = self.get_product(id).await?;
        self.state.products.delete(id).await?;

        Ok(product)
    }
}

fn normalize_sku(sku: Option<String>) -> Option<String> {
    sku.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}
