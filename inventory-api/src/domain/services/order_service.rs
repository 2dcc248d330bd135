use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::models::product::Product;
use crate::domain::repositories::product_repository::StockLedger;
use crate::error::AppError;
use crate::infrastructure::broadcast::{Broadcaster, StockEvent};

/// 订单处理的业务结果
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("Product not found")]
    NotFound,

    #[error("Product is currently unavailable")]
    ProductUnavailable,

    #[error("Insufficient stock: {available} units available")]
    InsufficientStock { available: u32 },

    #[error("Order processing failed: {0}")]
    Internal(String),
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::InvalidRequest(message) => AppError::BadRequest(message),
            OrderError::NotFound => AppError::NotFound("Product not found".to_string()),
            unavailable @ OrderError::ProductUnavailable => {
                AppError::BadRequest(unavailable.to_string())
            }
            insufficient @ OrderError::InsufficientStock { .. } => {
                AppError::BadRequest(insufficient.to_string())
            }
            OrderError::Internal(message) => AppError::Internal(message),
        }
    }
}

#[derive(Debug)]
pub struct OrderReceipt {
    pub product: Product,
    pub remaining_stock: u32,
}

/// 队列中的一笔待处理订单; 只在队列内部存活, 处理完即丢弃
#[derive(Debug)]
struct OrderRequest {
    product_id: Uuid,
    quantity: u32,
    respond_to: oneshot::Sender<Result<OrderReceipt, OrderError>>,
}

/// 提交订单的入口, 可随意克隆; 所有克隆共享同一条 FIFO 队列
#[derive(Debug, Clone)]
pub struct OrderClient {
    sender: mpsc::Sender<OrderRequest>,
}

impl OrderClient {
    /// 提交一笔订单并等待结果。
    ///
    /// 非法数量在入队前就被拒绝, 不会占用队列;
    /// 合法请求严格按提交顺序处理, 每个调用方只会收到一次结果。
    pub async fn place(
        &self,
        product_id: Uuid,
        quantity: u32,
    ) -> Result<OrderReceipt, OrderError> {
        if quantity == 0 {
            return Err(OrderError::InvalidRequest(
                "Quantity must be a positive integer".to_string(),
            ));
        }

        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(OrderRequest {
                product_id,
                quantity,
                respond_to,
            })
            .await
            .map_err(|_| OrderError::Internal("order queue is not running".to_string()))?;

        response
            .await
            .map_err(|_| OrderError::Internal("order request was dropped".to_string()))?
    }
}

/// 订单串行化队列。
///
/// 唯一一个会扣减库存的地方: 单消费者任务逐笔处理,
/// 同一时刻最多只有一笔扣减在进行, 并发下单也不会超卖。
pub struct OrderQueue {
    receiver: mpsc::Receiver<OrderRequest>,
    ledger: Arc<dyn StockLedger>,
    broadcaster: Broadcaster,
}

impl OrderQueue {
    pub fn new(
        capacity: usize,
        ledger: Arc<dyn StockLedger>,
        broadcaster: Broadcaster,
    ) -> (Self, OrderClient) {
        let (sender, receiver) = mpsc::channel(capacity);
        let queue = Self {
            receiver,
            ledger,
            broadcaster,
        };
        (queue, OrderClient { sender })
    }

    /// 消费循环, 由 main 作为后台任务启动一次。
    /// 所有 OrderClient 被丢弃后循环自然退出。
    pub async fn run(mut self) {
        info!("order queue started");

        while let Some(request) = self.receiver.recv().await {
            let outcome = self.process(request.product_id, request.quantity).await;

            match &outcome {
                Ok(receipt) => info!(
                    product = %receipt.product.name,
                    quantity = request.quantity,
                    remaining = receipt.remaining_stock,
                    "order committed"
                ),
                Err(err) => debug!(
                    product_id = %request.product_id,
                    error = %err,
                    "order rejected"
                ),
            }

            // 调用方可能已经放弃等待; 发送失败不影响后续请求
            let _ = request.respond_to.send(outcome);
        }

        info!("order queue stopped");
    }

    /// 处理单笔订单。校验一律基于出队时刻重新读到的库存,
    /// 出错只决定这一笔的结果, 队列继续前进。
    async fn process(
        &self,
        product_id: Uuid,
        quantity: u32,
    ) -> Result<OrderReceipt, OrderError> {
        let product = self
            .ledger
            .find(product_id)
            .await
            .map_err(store_failure)?
            .ok_or(OrderError::NotFound)?;

        if !product.is_active {
            return Err(OrderError::ProductUnavailable);
        }

        if product.stock < quantity {
            return Err(OrderError::InsufficientStock {
                available: product.stock,
            });
        }

        let updated = self
            .ledger
            .decrement_stock(product_id, quantity)
            .await
            .map_err(store_failure)?;

        self.publish_committed(&updated, quantity).await;

        let remaining_stock = updated.stock;
        Ok(OrderReceipt {
            product: updated,
            remaining_stock,
        })
    }

    /// 提交成功后的事件推送, 全部尽力而为
    async fn publish_committed(&self, product: &Product, quantity: u32) {
        match self.ledger.list_active().await {
            Ok(products) => self.broadcaster.publish(StockEvent::StockUpdate(products)),
            // 订单已提交, 快照失败只丢这一次推送
            Err(err) => warn!(error = %err, "failed to load stock snapshot for broadcast"),
        }

        self.broadcaster.publish(StockEvent::OrderPlaced {
            product_name: product.name.clone(),
            quantity,
            remaining_stock: product.stock,
        });

        if product.stock == 0 {
            self.broadcaster.publish(StockEvent::OutOfStock {
                product_name: product.name.clone(),
            });
        }
    }
}

fn store_failure(err: AppError) -> OrderError {
    OrderError::Internal(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::http::StatusCode;

    struct NoStore;

    #[async_trait]
    impl StockLedger for NoStore {
        async fn find(&self, _id: Uuid) -> Result<Option<Product>, AppError> {
            Ok(None)
        }

        async fn list_active(&self) -> Result<Vec<Product>, AppError> {
            Ok(Vec::new())
        }

        async fn decrement_stock(&self, _id: Uuid, _quantity: u32) -> Result<Product, AppError> {
            Err(AppError::Internal("no products".to_string()))
        }
    }

    #[tokio::test]
    async fn zero_quantity_is_rejected_before_entering_the_queue() {
        let (mut queue, client) = OrderQueue::new(4, Arc::new(NoStore), Broadcaster::new(4));

        let result = client.place(Uuid::new_v4(), 0).await;
        assert_eq!(
            result.unwrap_err(),
            OrderError::InvalidRequest("Quantity must be a positive integer".to_string())
        );

        // 队列里不应出现任何请求
        assert!(queue.receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn place_fails_cleanly_when_the_queue_is_gone() {
        let (queue, client) = OrderQueue::new(4, Arc::new(NoStore), Broadcaster::new(4));
        drop(queue);

        let result = client.place(Uuid::new_v4(), 1).await;
        assert!(matches!(result, Err(OrderError::Internal(_))));
    }

    #[test]
    fn insufficient_stock_message_reports_available_units() {
        let err = OrderError::InsufficientStock { available: 2 };
        assert_eq!(err.to_string(), "Insufficient stock: 2 units available");
    }

    #[test]
    fn order_errors_map_to_http_statuses() {
        let cases = [
            (OrderError::InvalidRequest("bad".to_string()), StatusCode::BAD_REQUEST),
            (OrderError::NotFound, StatusCode::NOT_FOUND),
            (OrderError::ProductUnavailable, StatusCode::BAD_REQUEST),
            (OrderError::InsufficientStock { available: 0 }, StatusCode::BAD_REQUEST),
            (OrderError::Internal("boom".to_string()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, status) in cases {
            assert_eq!(AppError::from(err).status_code(), status);
        }
    }
}
