use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
    routing::get,
    Router,
};
use futures::{
    stream::{SplitSink, StreamExt},
    SinkExt,
};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::api::products::ProductResponse;
use crate::domain::repositories::product_repository::StockLedger;
use crate::infrastructure::broadcast::StockEvent;
use crate::server::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/ws", get(ws_handler))
}

/// 推送给订阅端的帧格式:
/// `{"event":"stockUpdate","data":[...]}` /
/// `{"event":"orderPlaced","data":{"productName":..,"quantity":..,"remainingStock":..}}` /
/// `{"event":"outOfStock","data":{"productName":..}}`
#[derive(Debug, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum WireEvent {
    StockUpdate(Vec<ProductResponse>),
    #[serde(rename_all = "camelCase")]
    OrderPlaced {
        product_name: String,
        quantity: u32,
        remaining_stock: u32,
    },
    #[serde(rename_all = "camelCase")]
    OutOfStock { product_name: String },
}

impl From<StockEvent> for WireEvent {
    fn from(event: StockEvent) -> Self {
        match event {
            StockEvent::StockUpdate(products) => WireEvent::StockUpdate(
                products.into_iter().map(ProductResponse::from).collect(),
            ),
            StockEvent::OrderPlaced {
                product_name,
                quantity,
                remaining_stock,
            } => WireEvent::OrderPlaced {
                product_name,
                quantity,
                remaining_stock,
            },
            StockEvent::OutOfStock { product_name } => WireEvent::OutOfStock { product_name },
        }
    }
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    info!("stock subscriber connected");

    let (mut sender, mut receiver) = socket.split();
    let mut events = state.broadcaster.subscribe();

    // 连接时先推一次当前库存快照
    match state.products.list_active().await {
        Ok(products) => {
            let frame = WireEvent::StockUpdate(
                products.into_iter().map(ProductResponse::from).collect(),
            );
            if send_frame(&mut sender, &frame).await.is_err() {
                return;
            }
        }
        Err(err) => warn!(error = %err, "failed to load initial stock snapshot"),
    }

    let mut send_task = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    let frame = WireEvent::from(event);
                    if send_frame(&mut sender, &frame).await.is_err() {
                        break;
                    }
                }
                // 订阅端消费太慢时跳过积压的事件, 不阻塞总线
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "subscriber lagging, stock events skipped");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    // 订阅端不发业务消息, 只处理关闭帧
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = receiver.next().await {
            if let Message::Close(_) = message {
                break;
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    }

    info!("stock subscriber disconnected");
}

async fn send_frame(
    sender: &mut SplitSink<WebSocket, Message>,
    frame: &WireEvent,
) -> Result<(), axum::Error> {
    let text = match serde_json::to_string(frame) {
        Ok(text) => text,
        Err(err) => {
            debug!(error = %err, "failed to serialize stock event");
            return Ok(());
        }
    };

    sender.send(Message::Text(text)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_use_the_camel_case_envelope() {
        let frame = WireEvent::from(StockEvent::OutOfStock {
            product_name: "milk".to_string(),
        });
        assert_eq!(
            serde_json::to_string(&frame).unwrap(),
            r#"{"event":"outOfStock","data":{"productName":"milk"}}"#
        );

        let frame = WireEvent::from(StockEvent::OrderPlaced {
            product_name: "bread".to_string(),
            quantity: 2,
            remaining_stock: 3,
        });
        assert_eq!(
            serde_json::to_string(&frame).unwrap(),
            r#"{"event":"orderPlaced","data":{"productName":"bread","quantity":2,"remainingStock":3}}"#
        );
    }

    #[test]
    fn empty_snapshot_serializes_as_an_array() {
        let frame = WireEvent::StockUpdate(Vec::new());
        assert_eq!(
            serde_json::to_string(&frame).unwrap(),
            r#"{"event":"stockUpdate","data":[]}"#
        );
    }
}
