//! 订单队列端到端行为: 并发下单不超卖, FIFO 结算, 事件推送与故障恢复。

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::future::join_all;
use tokio::sync::broadcast::error::TryRecvError;
use uuid::Uuid;

use inventory_api::domain::models::product::Product;
use inventory_api::domain::repositories::product_repository::StockLedger;
use inventory_api::domain::services::order_service::{OrderClient, OrderError, OrderQueue};
use inventory_api::error::AppError;
use inventory_api::infrastructure::broadcast::{Broadcaster, StockEvent};

/// 内存版库存, 行为对齐 MySQL 实现: 条件扣减, 不足时拒绝提交
struct MemoryLedger {
    products: Mutex<HashMap<Uuid, Product>>,
    fail_next_commit: AtomicBool,
}

impl MemoryLedger {
    fn new(products: Vec<Product>) -> Self {
        Self {
            products: Mutex::new(products.into_iter().map(|p| (p.id, p)).collect()),
            fail_next_commit: AtomicBool::new(false),
        }
    }

    fn stock_of(&self, id: Uuid) -> u32 {
        self.products.lock().unwrap()[&id].stock
    }
}

#[async_trait]
impl StockLedger for MemoryLedger {
    async fn find(&self, id: Uuid) -> Result<Option<Product>, AppError> {
        Ok(self.products.lock().unwrap().get(&id).cloned())
    }

    async fn list_active(&self) -> Result<Vec<Product>, AppError> {
        Ok(self
            .products
            .lock()
            .unwrap()
            .values()
            .filter(|p| p.is_active)
            .cloned()
            .collect())
    }

    async fn decrement_stock(&self, id: Uuid, quantity: u32) -> Result<Product, AppError> {
        if self.fail_next_commit.swap(false, Ordering::SeqCst) {
            return Err(AppError::Internal("simulated store failure".to_string()));
        }

        let mut products = self.products.lock().unwrap();
        let product = products
            .get_mut(&id)
            .ok_or_else(|| AppError::Internal("product vanished".to_string()))?;

        product.stock = product
            .stock
            .checked_sub(quantity)
            .ok_or_else(|| AppError::Internal("stock commit rejected".to_string()))?;

        Ok(product.clone())
    }
}

fn seeded_product(name: &str, stock: u32) -> Product {
    Product::new(name, "", 100.0, stock, "General", None, 5)
}

fn start_queue(products: Vec<Product>) -> (Arc<MemoryLedger>, Broadcaster, OrderClient) {
    let ledger = Arc::new(MemoryLedger::new(products));
    let broadcaster = Broadcaster::new(64);
    let (queue, client) = OrderQueue::new(16, ledger.clone(), broadcaster.clone());
    tokio::spawn(queue.run());
    (ledger, broadcaster, client)
}

#[tokio::test]
async fn requests_resolve_in_submission_order() {
    let product = seeded_product("milk", 5);
    let id = product.id;
    let (ledger, _broadcaster, client) = start_queue(vec![product]);

    // join! 按声明顺序首次轮询, 三笔请求严格按此顺序入队
    let (first, second, third) =
        tokio::join!(client.place(id, 3), client.place(id, 3), client.place(id, 3));

    let receipt = first.expect("first order should commit");
    assert_eq!(receipt.remaining_stock, 2);

    let err = second.expect_err("second order should be rejected");
    assert_eq!(err, OrderError::InsufficientStock { available: 2 });
    assert_eq!(err.to_string(), "Insufficient stock: 2 units available");

    let err = third.expect_err("third order should be rejected");
    assert_eq!(err, OrderError::InsufficientStock { available: 2 });

    assert_eq!(ledger.stock_of(id), 2);
}

#[tokio::test]
async fn concurrent_submissions_never_oversell() {
    let product = seeded_product("bread", 5);
    let id = product.id;
    let (ledger, _broadcaster, client) = start_queue(vec![product]);

    let orders = (0..20).map(|_| client.place(id, 1));
    let outcomes = join_all(orders).await;

    let committed = outcomes.iter().filter(|o| o.is_ok()).count();
    assert_eq!(committed, 5);

    for outcome in outcomes.iter().filter(|o| o.is_err()) {
        assert!(matches!(
            outcome.as_ref().unwrap_err(),
            OrderError::InsufficientStock { .. }
        ));
    }

    assert_eq!(ledger.stock_of(id), 0);
}

#[tokio::test]
async fn zero_quantity_never_reaches_the_ledger() {
    let product = seeded_product("cheese", 5);
    let id = product.id;
    let (ledger, _broadcaster, client) = start_queue(vec![product]);

    let err = client.place(id, 0).await.expect_err("zero quantity must fail");
    assert!(matches!(err, OrderError::InvalidRequest(_)));
    assert_eq!(ledger.stock_of(id), 5);

    // 队列不受影响, 下一笔正常结算
    let receipt = client.place(id, 1).await.expect("valid order should commit");
    assert_eq!(receipt.remaining_stock, 4);
}

#[tokio::test]
async fn unknown_product_yields_not_found_without_mutation() {
    let product = seeded_product("juice", 5);
    let id = product.id;
    let (ledger, broadcaster, client) = start_queue(vec![product]);
    let mut events = broadcaster.subscribe();

    let err = client.place(Uuid::new_v4(), 1).await.expect_err("must fail");
    assert_eq!(err, OrderError::NotFound);

    assert_eq!(ledger.stock_of(id), 5);
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn each_commit_broadcasts_exactly_one_stock_update() {
    let product = seeded_product("butter", 5);
    let id = product.id;
    let (_ledger, broadcaster, client) = start_queue(vec![product]);
    let mut events = broadcaster.subscribe();

    client.place(id, 4).await.expect("order should commit");

    let mut stock_updates = 0;
    let mut orders_placed = 0;
    let mut out_of_stock = 0;
    while let Ok(event) = events.try_recv() {
        match event {
            StockEvent::StockUpdate(_) => stock_updates += 1,
            StockEvent::OrderPlaced {
                quantity,
                remaining_stock,
                ..
            } => {
                orders_placed += 1;
                assert_eq!(quantity, 4);
                assert_eq!(remaining_stock, 1);
            }
            StockEvent::OutOfStock { .. } => out_of_stock += 1,
        }
    }

    assert_eq!(stock_updates, 1);
    assert_eq!(orders_placed, 1);
    assert_eq!(out_of_stock, 0, "stock is still positive");
}

#[tokio::test]
async fn draining_stock_broadcasts_out_of_stock() {
    let product = seeded_product("eggs", 2);
    let id = product.id;
    let (_ledger, broadcaster, client) = start_queue(vec![product]);
    let mut events = broadcaster.subscribe();

    client.place(id, 2).await.expect("order should commit");

    let mut saw_out_of_stock = false;
    while let Ok(event) = events.try_recv() {
        if let StockEvent::OutOfStock { product_name } = event {
            assert_eq!(product_name, "eggs");
            saw_out_of_stock = true;
        }
    }
    assert!(saw_out_of_stock);
}

#[tokio::test]
async fn inactive_product_is_unavailable() {
    let mut product = seeded_product("yogurt", 5);
    product.is_active = false;
    let id = product.id;
    let (ledger, _broadcaster, client) = start_queue(vec![product]);

    let err = client.place(id, 1).await.expect_err("must fail");
    assert_eq!(err, OrderError::ProductUnavailable);
    assert_eq!(ledger.stock_of(id), 5);
}

#[tokio::test]
async fn queue_recovers_after_a_store_failure() {
    let product = seeded_product("flour", 5);
    let id = product.id;
    let (ledger, _broadcaster, client) = start_queue(vec![product]);

    ledger.fail_next_commit.store(true, Ordering::SeqCst);

    let err = client.place(id, 1).await.expect_err("commit failure surfaces");
    assert!(matches!(err, OrderError::Internal(_)));
    assert_eq!(ledger.stock_of(id), 5, "failed commit must not mutate stock");

    // 后续请求照常处理, 队列没有被卡死
    let receipt = client.place(id, 2).await.expect("queue keeps processing");
    assert_eq!(receipt.remaining_stock, 3);
}
