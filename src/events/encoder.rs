//! Event encoding: DomainEvent → transport-ready message
//!
//! Clients pattern-match on the argument positions, so the order of `args`
//! for each event is part of the wire contract.

use super::types::DomainEvent;
use serde::Serialize;
use serde_json::{json, Value};

/// An encoded event, ready to hand to any number of subscribers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EncodedMessage {
    /// Event name (e.g. "OrderStatusChanged")
    pub event: &'static str,
    /// Ordered payload fields
    pub args: Vec<Value>,
    #[serde(skip)]
    frame: String,
}

impl EncodedMessage {
    fn new(event: &'static str, args: Vec<Value>) -> Self {
        let frame = format!(
            "{{\"event\":\"{}\",\"args\":{}}}",
            event,
            Value::Array(args.clone())
        );
        Self { event, args, frame }
    }

    /// The rendered JSON text frame `{"event": .., "args": [..]}`
    pub fn frame(&self) -> &str {
        &self.frame
    }
}

/// Encode a domain event into its wire form
pub fn encode(event: &DomainEvent) -> EncodedMessage {
    let args = match event {
        DomainEvent::OrderStatusChanged { order_id, status } => {
            vec![json!(order_id), json!(status.as_str())]
        }
        DomainEvent::OrderItemStatusChanged {
            order_id,
            order_item_id,
            status,
        } => vec![json!(order_id), json!(order_item_id), json!(status.as_str())],
        DomainEvent::OrderItemUpdated { update, .. } => vec![json!({
            "ItemId": update.item_id,
            "ProductId": update.product_id,
            "ProductName": update.product_name,
            "NewStatus": update.new_status.as_str(),
            "Timestamp": update.timestamp.to_rfc3339(),
        })],
        DomainEvent::NewOrder {
            order_id,
            table_number,
        }
        | DomainEvent::OrderCompleted {
            order_id,
            table_number,
        } => vec![json!(order_id), json!(table_number)],
        DomainEvent::OrderCancelled { order_id } => vec![json!(order_id)],
        DomainEvent::TableStatusChanged { table_id, status } => {
            vec![json!(table_id), json!(status.as_str())]
        }
        DomainEvent::KitchenUpdate => Vec::new(),
        DomainEvent::PaymentProcessed {
            order_id,
            amount,
            method,
            is_fully_paid,
        } => vec![
            json!(order_id),
            json!(amount),
            json!(method.as_str()),
            json!(is_fully_paid),
        ],
        DomainEvent::StockUpdated {
            product_id,
            product_name,
            new_stock,
        } => vec![json!(product_id), json!(product_name), json!(new_stock)],
        DomainEvent::StockReduced {
            product_id,
            product_name,
            old_stock,
            new_stock,
            quantity_reduced,
        } => vec![
            json!(product_id),
            json!(product_name),
            json!(old_stock),
            json!(new_stock),
            json!(quantity_reduced),
        ],
    };

    EncodedMessage::new(event.name(), args)
}
