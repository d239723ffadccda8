//! Topic addressing for real-time notifications
//!
//! A topic partitions the subscriber space. Its wire name is what clients send
//! in `subscribe` frames and what shows up in logs, so `Display` and `FromStr`
//! must stay symmetric.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Identifier of an order, table or product in the data store
pub type EntityId = i64;

/// Wire name of the broadcast-all table topic
const ALL_TABLES: &str = "table:*";

/// A named channel of subscribers
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Topic {
    /// `order:<id>`: one order's lifecycle
    Order(EntityId),
    /// `table:<id>`: one table
    Table(EntityId),
    /// `table:*`: every table-status change
    AllTables,
    /// `kitchen`: kitchen display / production
    Kitchen,
    /// `product:<id>`: stock level of one product
    Product(EntityId),
    /// `inventory`: every stock change
    Inventory,
}

impl Topic {
    pub fn order(order_id: EntityId) -> Self {
        Topic::Order(order_id)
    }

    pub fn table(table_id: EntityId) -> Self {
        Topic::Table(table_id)
    }

    pub fn product(product_id: EntityId) -> Self {
        Topic::Product(product_id)
    }

    /// The family prefix, used as a low-cardinality log field
    pub fn family(&self) -> &'static str {
        match self {
            Topic::Order(_) => "order",
            Topic::Table(_) | Topic::AllTables => "table",
            Topic::Kitchen => "kitchen",
            Topic::Product(_) => "product",
            Topic::Inventory => "inventory",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topic::Order(id) => write!(f, "order:{}", id),
            Topic::Table(id) => write!(f, "table:{}", id),
            Topic::AllTables => f.write_str(ALL_TABLES),
            Topic::Kitchen => f.write_str("kitchen"),
            Topic::Product(id) => write!(f, "product:{}", id),
            Topic::Inventory => f.write_str("inventory"),
        }
    }
}

/// Rejected topic name
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopicParseError {
    #[error("empty topic name")]
    Empty,
    #[error("unknown topic family: {0}")]
    UnknownFamily(String),
    #[error("topic '{0}' requires an identifier")]
    MissingId(String),
    #[error("invalid identifier '{id}' in topic '{topic}'")]
    InvalidId { topic: String, id: String },
}

impl FromStr for Topic {
    type Err = TopicParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(TopicParseError::Empty);
        }
        match s {
            ALL_TABLES => return Ok(Topic::AllTables),
            "kitchen" => return Ok(Topic::Kitchen),
            "inventory" => return Ok(Topic::Inventory),
            _ => {}
        }

        let (family, raw_id) = match s.split_once(':') {
            Some((family, id)) => (family, id),
            None if matches!(s, "order" | "table" | "product") => {
                return Err(TopicParseError::MissingId(s.to_string()))
            }
            None => return Err(TopicParseError::UnknownFamily(s.to_string())),
        };

        let build: fn(EntityId) -> Topic = match family {
            "order" => Topic::Order,
            "table" => Topic::Table,
            "product" => Topic::Product,
            other => return Err(TopicParseError::UnknownFamily(other.to_string())),
        };

        if raw_id.is_empty() {
            return Err(TopicParseError::MissingId(s.to_string()));
        }
        raw_id
            .parse::<EntityId>()
            .map(build)
            .map_err(|_| TopicParseError::InvalidId {
                topic: s.to_string(),
                id: raw_id.to_string(),
            })
    }
}

impl Serialize for Topic {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Topic {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_matches_wire_names() {
        assert_eq!(Topic::order(42).to_string(), "order:42");
        assert_eq!(Topic::table(7).to_string(), "table:7");
        assert_eq!(Topic::AllTables.to_string(), "table:*");
        assert_eq!(Topic::Kitchen.to_string(), "kitchen");
        assert_eq!(Topic::product(3).to_string(), "product:3");
        assert_eq!(Topic::Inventory.to_string(), "inventory");
    }

    #[test]
    fn test_parse_every_family() {
        assert_eq!("order:42".parse::<Topic>().unwrap(), Topic::Order(42));
        assert_eq!("table:7".parse::<Topic>().unwrap(), Topic::Table(7));
        assert_eq!("table:*".parse::<Topic>().unwrap(), Topic::AllTables);
        assert_eq!(" kitchen ".parse::<Topic>().unwrap(), Topic::Kitchen);
        assert_eq!("product:3".parse::<Topic>().unwrap(), Topic::Product(3));
        assert_eq!("inventory".parse::<Topic>().unwrap(), Topic::Inventory);
    }

    #[test]
    fn test_parse_rejects_bad_names() {
        assert_eq!("".parse::<Topic>(), Err(TopicParseError::Empty));
        assert_eq!(
            "bar".parse::<Topic>(),
            Err(TopicParseError::UnknownFamily("bar".into()))
        );
        assert_eq!(
            "waiter:1".parse::<Topic>(),
            Err(TopicParseError::UnknownFamily("waiter".into()))
        );
        assert_eq!(
            "order".parse::<Topic>(),
            Err(TopicParseError::MissingId("order".into()))
        );
        assert_eq!(
            "order:".parse::<Topic>(),
            Err(TopicParseError::MissingId("order:".into()))
        );
        assert!(matches!(
            "order:abc".parse::<Topic>(),
            Err(TopicParseError::InvalidId { .. })
        ));
        // Only the table family has a wildcard
        assert!(matches!(
            "order:*".parse::<Topic>(),
            Err(TopicParseError::InvalidId { .. })
        ));
    }

    #[test]
    fn test_serde_uses_wire_name() {
        let json = serde_json::to_string(&Topic::AllTables).unwrap();
        assert_eq!(json, "\"table:*\"");
        let topic: Topic = serde_json::from_str("\"order:9\"").unwrap();
        assert_eq!(topic, Topic::Order(9));
        assert!(serde_json::from_str::<Topic>("\"nope\"").is_err());
    }

    #[test]
    fn test_family() {
        assert_eq!(Topic::AllTables.family(), "table");
        assert_eq!(Topic::Table(1).family(), "table");
        assert_eq!(Topic::Order(1).family(), "order");
    }
}
