//! Inventory items and stock classification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::RecordId;

/// Stock status of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StockLevel {
    OutOfStock,
    Low,
    Normal,
}

impl StockLevel {
    /// Classify a quantity against its reorder level.
    ///
    /// Zero is out of stock even when the reorder level is zero.
    pub fn classify(quantity: u32, reorder_level: u32) -> Self {
        if quantity == 0 {
            StockLevel::OutOfStock
        } else if quantity <= reorder_level {
            StockLevel::Low
        } else {
            StockLevel::Normal
        }
    }

    /// Label shown in the inventory screen.
    pub fn label(&self) -> &'static str {
        match self {
            StockLevel::OutOfStock => "Sin Stock",
            StockLevel::Low => "Stock Bajo",
            StockLevel::Normal => "Stock Normal",
        }
    }

    /// Out-of-stock items are low-stock too.
    pub fn needs_reorder(&self) -> bool {
        !matches!(self, StockLevel::Normal)
    }
}

/// Gauge fill: `min(quantity / (2 * reorder_level) * 100, 100)`.
///
/// With a zero reorder level any stock fills the gauge.
pub fn stock_fill_percent(quantity: u32, reorder_level: u32) -> f64 {
    if reorder_level == 0 {
        return if quantity == 0 { 0.0 } else { 100.0 };
    }
    let pct = f64::from(quantity) / (2.0 * f64::from(reorder_level)) * 100.0;
    pct.min(100.0)
}

/// A stocked product.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InventoryItem {
    pub id: RecordId,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "descripcion", default)]
    pub description: Option<String>,
    #[serde(rename = "cantidad")]
    pub quantity: u32,
    #[serde(rename = "nivel_reorden")]
    pub reorder_level: u32,
    /// Decimal price; the API sends either a string or a number
    #[serde(rename = "precio", default, deserialize_with = "lenient_price")]
    pub unit_price: Option<f64>,
    #[serde(rename = "creado_en", default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl InventoryItem {
    pub fn stock_level(&self) -> StockLevel {
        StockLevel::classify(self.quantity, self.reorder_level)
    }

    pub fn fill_percent(&self) -> f64 {
        stock_fill_percent(self.quantity, self.reorder_level)
    }
}

/// Split items into (low stock, normal stock), preserving order.
pub fn partition_by_stock(items: &[InventoryItem]) -> (Vec<&InventoryItem>, Vec<&InventoryItem>) {
    items.iter().partition(|item| item.stock_level().needs_reorder())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPrice {
    Number(f64),
    Text(String),
}

fn lenient_price<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    match Option::<RawPrice>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawPrice::Number(n)) => Ok(Some(n)),
        Some(RawPrice::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(RawPrice::Text(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(quantity: u32, reorder_level: u32) -> InventoryItem {
        InventoryItem {
            id: RecordId::from("1"),
            name: "Amoxicilina".into(),
            description: None,
            quantity,
            reorder_level,
            unit_price: None,
            created_at: None,
        }
    }

    #[test]
    fn test_stock_labels() {
        assert_eq!(item(3, 5).stock_level().label(), "Stock Bajo");
        assert_eq!(item(0, 5).stock_level().label(), "Sin Stock");
        assert_eq!(item(10, 5).stock_level().label(), "Stock Normal");
        assert_eq!(item(5, 5).stock_level(), StockLevel::Low);
    }

    #[test]
    fn test_fill_percent() {
        assert_eq!(stock_fill_percent(5, 5), 50.0);
        assert_eq!(stock_fill_percent(20, 5), 100.0);
        assert_eq!(stock_fill_percent(0, 0), 0.0);
        assert_eq!(stock_fill_percent(3, 0), 100.0);
    }

    #[test]
    fn test_price_as_string_or_number() {
        let a: InventoryItem = serde_json::from_str(
            r#"{"id": 1, "nombre": "Gasas", "cantidad": 4, "nivel_reorden": 2, "precio": "12.50"}"#,
        )
        .unwrap();
        let b: InventoryItem = serde_json::from_str(
            r#"{"id": 2, "nombre": "Gasas", "cantidad": 4, "nivel_reorden": 2, "precio": 12.5}"#,
        )
        .unwrap();
        let c: InventoryItem = serde_json::from_str(
            r#"{"id": 3, "nombre": "Gasas", "cantidad": 4, "nivel_reorden": 2, "precio": null}"#,
        )
        .unwrap();
        assert_eq!(a.unit_price, Some(12.5));
        assert_eq!(b.unit_price, Some(12.5));
        assert_eq!(c.unit_price, None);
    }

    #[test]
    fn test_partition_by_stock() {
        let items = vec![item(0, 2), item(9, 2), item(2, 2)];
        let (low, normal) = partition_by_stock(&items);
        assert_eq!(low.len(), 2);
        assert_eq!(normal.len(), 1);
        assert_eq!(normal[0].quantity, 9);
    }
}
