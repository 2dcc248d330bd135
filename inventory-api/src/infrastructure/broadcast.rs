use tokio::sync::broadcast;

use crate::domain::models::product::Product;

/// 库存事件, 提交成功后由订单队列发布
#[derive(Debug, Clone)]
pub enum StockEvent {
    /// 全量在售商品快照
    StockUpdate(Vec<Product>),
    OrderPlaced {
        product_name: String,
        quantity: u32,
        remaining_stock: u32,
    },
    OutOfStock {
        product_name: String,
    },
}

/// 进程内事件总线, WebSocket 订阅端各持有一个 Receiver
#[derive(Debug, Clone)]
pub struct Broadcaster {
    sender: broadcast::Sender<StockEvent>,
}

impl Broadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StockEvent> {
        self.sender.subscribe()
    }

    /// 发布是尽力而为的: 没有订阅者时事件直接丢弃, 不影响调用方
    pub fn publish(&self, event: StockEvent) {
        if self.sender.send(event).is_err() {
            tracing::debug!("no active subscribers, stock event dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_without_subscribers_is_silent() {
        let broadcaster = Broadcaster::new(8);
        broadcaster.publish(StockEvent::OutOfStock {
            product_name: "milk".to_string(),
        });
    }

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let broadcaster = Broadcaster::new(8);
        let mut rx = broadcaster.subscribe();

        broadcaster.publish(StockEvent::OrderPlaced {
            product_name: "bread".to_string(),
            quantity: 2,
            remaining_stock: 3,
        });

        match rx.recv().await.unwrap() {
            StockEvent::OrderPlaced {
                product_name,
                quantity,
                remaining_stock,
            } => {
                assert_eq!(product_name, "bread");
                assert_eq!(quantity, 2);
                assert_eq!(remaining_stock, 3);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
