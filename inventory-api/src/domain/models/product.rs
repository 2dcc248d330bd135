use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const DEFAULT_LOW_STOCK_THRESHOLD: u32 = 5;
pub const DEFAULT_CATEGORY: &str = "General";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub stock: u32,
    pub category: String,
    pub sku: Option<String>,
    pub is_active: bool,
    pub low_stock_threshold: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 库存档位, 由当前库存和阈值推导, 不落库
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    OutOfStock,
    LowStock,
    InStock,
}

impl Product {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: &str,
        description: &str,
        price: f64,
        stock: u32,
        category: &str,
        sku: Option<String>,
        low_stock_threshold: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: description.to_string(),
            price,
            stock,
            category: category.to_string(),
            sku,
            is_active: true,
            low_stock_threshold,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    pub fn stock_status(&self) -> StockStatus {
        if self.stock == 0 {
            StockStatus::OutOfStock
        } else if self.stock <= self.low_stock_threshold {
            StockStatus::LowStock
        } else {
            StockStatus::InStock
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product_with_stock(stock: u32, threshold: u32) -> Product {
        Product::new("milk", "", 100.0, stock, DEFAULT_CATEGORY, None, threshold)
    }

    #[test]
    fn zero_stock_is_out_of_stock() {
        assert_eq!(product_with_stock(0, 5).stock_status(), StockStatus::OutOfStock);
    }

    #[test]
    fn stock_at_or_below_threshold_is_low() {
        assert_eq!(product_with_stock(1, 5).stock_status(), StockStatus::LowStock);
        assert_eq!(product_with_stock(5, 5).stock_status(), StockStatus::LowStock);
    }

    #[test]
    fn stock_above_threshold_is_in_stock() {
        assert_eq!(product_with_stock(6, 5).stock_status(), StockStatus::InStock);
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&StockStatus::OutOfStock).unwrap();
        assert_eq!(json, r#""out_of_stock""#);
    }
}
