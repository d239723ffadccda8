//! Notification facade consumed by order, payment and inventory services
//!
//! Call these methods only after the data store transaction has committed.
//! Delivery is fire-and-forget: nothing is returned, and no caller may rely on
//! a notification having reached a client.

use super::broadcaster::Broadcaster;
use super::topic::{EntityId, Topic};
use super::types::{
    DomainEvent, OrderItemStatus, OrderItemUpdate, OrderStatus, PaymentMethod, TableStatus,
};

/// Topics an event is published to, in publish order
pub fn topics_for(event: &DomainEvent) -> Vec<Topic> {
    match event {
        DomainEvent::OrderStatusChanged { order_id, .. }
        | DomainEvent::OrderItemStatusChanged { order_id, .. }
        | DomainEvent::OrderItemUpdated { order_id, .. }
        | DomainEvent::OrderCancelled { order_id }
        | DomainEvent::PaymentProcessed { order_id, .. } => vec![Topic::order(*order_id)],
        DomainEvent::NewOrder { .. } | DomainEvent::KitchenUpdate => vec![Topic::Kitchen],
        DomainEvent::OrderCompleted { order_id, .. } => {
            vec![Topic::order(*order_id), Topic::Kitchen]
        }
        DomainEvent::TableStatusChanged { table_id, .. } => {
            vec![Topic::table(*table_id), Topic::AllTables]
        }
        DomainEvent::StockUpdated { product_id, .. }
        | DomainEvent::StockReduced { product_id, .. } => {
            vec![Topic::product(*product_id), Topic::Inventory]
        }
    }
}

/// Publishes domain occurrences to live observers
///
/// Implementors provide `notify`; every domain method is a thin mapping onto it.
/// Injected into services as `Arc<dyn RealtimeNotifier>`.
pub trait RealtimeNotifier: Send + Sync {
    /// Route one event to its topics
    fn notify(&self, event: DomainEvent);

    fn order_status_changed(&self, order_id: EntityId, status: OrderStatus) {
        self.notify(DomainEvent::OrderStatusChanged { order_id, status });
    }

    fn order_item_status_changed(
        &self,
        order_id: EntityId,
        order_item_id: EntityId,
        status: OrderItemStatus,
    ) {
        self.notify(DomainEvent::OrderItemStatusChanged {
            order_id,
            order_item_id,
            status,
        });
    }

    fn order_item_updated(&self, order_id: EntityId, update: OrderItemUpdate) {
        self.notify(DomainEvent::OrderItemUpdated { order_id, update });
    }

    fn new_order(&self, order_id: EntityId, table_number: &str) {
        self.notify(DomainEvent::NewOrder {
            order_id,
            table_number: table_number.to_string(),
        });
    }

    fn order_cancelled(&self, order_id: EntityId) {
        self.notify(DomainEvent::OrderCancelled { order_id });
    }

    fn order_completed(&self, order_id: EntityId, table_number: &str) {
        self.notify(DomainEvent::OrderCompleted {
            order_id,
            table_number: table_number.to_string(),
        });
    }

    fn table_status_changed(&self, table_id: EntityId, status: TableStatus) {
        self.notify(DomainEvent::TableStatusChanged { table_id, status });
    }

    fn kitchen_update(&self) {
        self.notify(DomainEvent::KitchenUpdate);
    }

    fn payment_processed(
        &self,
        order_id: EntityId,
        amount: f64,
        method: PaymentMethod,
        is_fully_paid: bool,
    ) {
        self.notify(DomainEvent::PaymentProcessed {
            order_id,
            amount,
            method,
            is_fully_paid,
        });
    }

    fn stock_updated(&self, product_id: EntityId, product_name: &str, new_stock: i32) {
        self.notify(DomainEvent::StockUpdated {
            product_id,
            product_name: product_name.to_string(),
            new_stock,
        });
    }

    fn stock_reduced(
        &self,
        product_id: EntityId,
        product_name: &str,
        old_stock: i32,
        new_stock: i32,
        quantity_reduced: i32,
    ) {
        self.notify(DomainEvent::StockReduced {
            product_id,
            product_name: product_name.to_string(),
            old_stock,
            new_stock,
            quantity_reduced,
        });
    }
}

impl RealtimeNotifier for Broadcaster {
    fn notify(&self, event: DomainEvent) {
        // Each topic is an independent publish; an empty one is not an error
        for topic in topics_for(&event) {
            self.publish(&topic, &event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Records events instead of publishing them
    #[derive(Default)]
    struct RecordingNotifier {
        events: Mutex<Vec<DomainEvent>>,
    }

    impl RealtimeNotifier for RecordingNotifier {
        fn notify(&self, event: DomainEvent) {
            self.events.lock().push(event);
        }
    }

    #[test]
    fn test_routing_table() {
        assert_eq!(
            topics_for(&DomainEvent::OrderStatusChanged {
                order_id: 1,
                status: OrderStatus::Ready
            }),
            vec![Topic::Order(1)]
        );
        assert_eq!(
            topics_for(&DomainEvent::OrderItemStatusChanged {
                order_id: 2,
                order_item_id: 20,
                status: OrderItemStatus::Ready
            }),
            vec![Topic::Order(2)]
        );
        assert_eq!(
            topics_for(&DomainEvent::OrderItemUpdated {
                order_id: 3,
                update: OrderItemUpdate::new(1, 1, "Soup", OrderItemStatus::Pending)
            }),
            vec![Topic::Order(3)]
        );
        assert_eq!(
            topics_for(&DomainEvent::NewOrder {
                order_id: 4,
                table_number: "4".into()
            }),
            vec![Topic::Kitchen]
        );
        assert_eq!(
            topics_for(&DomainEvent::OrderCancelled { order_id: 5 }),
            vec![Topic::Order(5)]
        );
        assert_eq!(
            topics_for(&DomainEvent::OrderCompleted {
                order_id: 6,
                table_number: "6".into()
            }),
            vec![Topic::Order(6), Topic::Kitchen]
        );
        assert_eq!(
            topics_for(&DomainEvent::TableStatusChanged {
                table_id: 7,
                status: TableStatus::Occupied
            }),
            vec![Topic::Table(7), Topic::AllTables]
        );
        assert_eq!(
            topics_for(&DomainEvent::KitchenUpdate),
            vec![Topic::Kitchen]
        );
        assert_eq!(
            topics_for(&DomainEvent::PaymentProcessed {
                order_id: 8,
                amount: 10.0,
                method: PaymentMethod::Cash,
                is_fully_paid: true
            }),
            vec![Topic::Order(8)]
        );
        assert_eq!(
            topics_for(&DomainEvent::StockUpdated {
                product_id: 9,
                product_name: "Flour".into(),
                new_stock: 1
            }),
            vec![Topic::Product(9), Topic::Inventory]
        );
        assert_eq!(
            topics_for(&DomainEvent::StockReduced {
                product_id: 9,
                product_name: "Flour".into(),
                old_stock: 2,
                new_stock: 1,
                quantity_reduced: 1
            }),
            vec![Topic::Product(9), Topic::Inventory]
        );
    }

    #[test]
    fn test_facade_methods_build_events() {
        let notifier = RecordingNotifier::default();
        notifier.order_status_changed(1, OrderStatus::Served);
        notifier.new_order(2, "T5");
        notifier.order_completed(2, "T5");
        notifier.kitchen_update();
        notifier.stock_reduced(3, "Basil", 10, 7, 3);

        let events = notifier.events.lock();
        assert_eq!(events.len(), 5);
        assert_eq!(
            events[0],
            DomainEvent::OrderStatusChanged {
                order_id: 1,
                status: OrderStatus::Served
            }
        );
        assert_eq!(
            events[1],
            DomainEvent::NewOrder {
                order_id: 2,
                table_number: "T5".into()
            }
        );
        assert_eq!(events[3], DomainEvent::KitchenUpdate);
        assert_eq!(
            events[4],
            DomainEvent::StockReduced {
                product_id: 3,
                product_name: "Basil".into(),
                old_stock: 10,
                new_stock: 7,
                quantity_reduced: 3
            }
        );
    }

    #[test]
    fn test_usable_as_trait_object() {
        let recorder = Arc::new(RecordingNotifier::default());
        let notifier: Arc<dyn RealtimeNotifier> = recorder.clone();
        notifier.order_cancelled(4);
        notifier.table_status_changed(2, TableStatus::Cleaning);
        assert_eq!(recorder.events.lock().len(), 2);
    }

    #[test]
    fn test_broadcaster_table_status_reaches_both_topics() {
        let hub = Broadcaster::default();
        let table_board = hub.connect();
        let floor_board = hub.connect();
        let other_table = hub.connect();
        hub.subscribe(Topic::table(4), &table_board);
        hub.subscribe(Topic::AllTables, &floor_board);
        hub.subscribe(Topic::table(5), &other_table);

        hub.table_status_changed(4, TableStatus::Occupied);

        let frame = r#"{"event":"TableStatusChanged","args":[4,"occupied"]}"#;
        assert_eq!(table_board.try_recv().unwrap().frame(), frame);
        assert_eq!(floor_board.try_recv().unwrap().frame(), frame);
        assert!(other_table.try_recv().is_none());
    }

    #[test]
    fn test_broadcaster_partial_delivery_is_fine() {
        let hub = Broadcaster::default();
        let inventory = hub.connect();
        hub.subscribe(Topic::Inventory, &inventory);

        // No product:11 subscribers; inventory still gets it
        hub.stock_updated(11, "Olive oil", 4);
        let message = inventory.try_recv().unwrap();
        assert_eq!(message.event, "StockUpdated");
        assert_eq!(message.args[1], "Olive oil");
    }
}
