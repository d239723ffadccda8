//! Domain event types for real-time notifications

use super::topic::EntityId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Preparing,
    Ready,
    Served,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::Served => "served",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

/// Status of a single line on an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderItemStatus {
    Pending,
    Preparing,
    Ready,
    Served,
    Cancelled,
}

impl OrderItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderItemStatus::Pending => "pending",
            OrderItemStatus::Preparing => "preparing",
            OrderItemStatus::Ready => "ready",
            OrderItemStatus::Served => "served",
            OrderItemStatus::Cancelled => "cancelled",
        }
    }
}

/// Occupancy status of a table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableStatus {
    Available,
    Occupied,
    Reserved,
    Cleaning,
}

impl TableStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TableStatus::Available => "available",
            TableStatus::Occupied => "occupied",
            TableStatus::Reserved => "reserved",
            TableStatus::Cleaning => "cleaning",
        }
    }
}

/// How a payment was tendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    Mobile,
    Voucher,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Mobile => "mobile",
            PaymentMethod::Voucher => "voucher",
        }
    }
}

macro_rules! display_as_str {
    ($($ty:ty),+) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })+
    };
}

display_as_str!(OrderStatus, OrderItemStatus, TableStatus, PaymentMethod);

/// Snapshot of an order line after an edit (item, product, status or time)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItemUpdate {
    pub item_id: EntityId,
    pub product_id: EntityId,
    pub product_name: String,
    pub new_status: OrderItemStatus,
    pub timestamp: DateTime<Utc>,
}

impl OrderItemUpdate {
    /// Create an update stamped with the current time
    pub fn new(
        item_id: EntityId,
        product_id: EntityId,
        product_name: impl Into<String>,
        new_status: OrderItemStatus,
    ) -> Self {
        Self {
            item_id,
            product_id,
            product_name: product_name.into(),
            new_status,
            timestamp: Utc::now(),
        }
    }
}

/// A state change to push to live observers
///
/// Created at publish time and discarded after delivery. The `type` tag equals
/// the variant name so the same JSON can be posted to `/internal/events`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DomainEvent {
    OrderStatusChanged {
        order_id: EntityId,
        status: OrderStatus,
    },
    OrderItemStatusChanged {
        order_id: EntityId,
        order_item_id: EntityId,
        status: OrderItemStatus,
    },
    OrderItemUpdated {
        order_id: EntityId,
        update: OrderItemUpdate,
    },
    NewOrder {
        order_id: EntityId,
        table_number: String,
    },
    OrderCancelled {
        order_id: EntityId,
    },
    OrderCompleted {
        order_id: EntityId,
        table_number: String,
    },
    TableStatusChanged {
        table_id: EntityId,
        status: TableStatus,
    },
    KitchenUpdate,
    PaymentProcessed {
        order_id: EntityId,
        amount: f64,
        method: PaymentMethod,
        is_fully_paid: bool,
    },
    StockUpdated {
        product_id: EntityId,
        product_name: String,
        new_stock: i32,
    },
    StockReduced {
        product_id: EntityId,
        product_name: String,
        old_stock: i32,
        new_stock: i32,
        quantity_reduced: i32,
    },
}

impl DomainEvent {
    /// Event name as seen by clients
    pub fn name(&self) -> &'static str {
        match self {
            DomainEvent::OrderStatusChanged { .. } => "OrderStatusChanged",
            DomainEvent::OrderItemStatusChanged { .. } => "OrderItemStatusChanged",
            DomainEvent::OrderItemUpdated { .. } => "OrderItemUpdated",
            DomainEvent::NewOrder { .. } => "NewOrder",
            DomainEvent::OrderCancelled { .. } => "OrderCancelled",
            DomainEvent::OrderCompleted { .. } => "OrderCompleted",
            DomainEvent::TableStatusChanged { .. } => "TableStatusChanged",
            DomainEvent::KitchenUpdate => "KitchenUpdate",
            DomainEvent::PaymentProcessed { .. } => "PaymentProcessed",
            DomainEvent::StockUpdated { .. } => "StockUpdated",
            DomainEvent::StockReduced { .. } => "StockReduced",
        }
    }
}
