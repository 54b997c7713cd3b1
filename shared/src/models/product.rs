//! Product and bar catalogue models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{BarId, ProductId};

/// A product sold at a bar
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: ProductId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub cost_price: Option<Decimal>,
    /// Default selling price, used when the day's record carries none
    #[serde(default)]
    pub selling_price: Option<Decimal>,
    #[serde(default)]
    pub low_stock_threshold: Option<i64>,
}

/// Product reference as returned by the backend: either populated or a bare id
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ProductRef {
    Populated(Product),
    Id(ProductId),
}

impl ProductRef {
    pub fn id(&self) -> &ProductId {
        match self {
            ProductRef::Populated(product) => &product.id,
            ProductRef::Id(id) => id,
        }
    }

    pub fn populated(&self) -> Option<&Product> {
        match self {
            ProductRef::Populated(product) => Some(product),
            ProductRef::Id(_) => None,
        }
    }
}

/// A physical sales location
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bar {
    #[serde(rename = "_id")]
    pub id: BarId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
}

/// Bar reference as returned by the backend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum BarRef {
    Populated(Bar),
    Id(BarId),
}

impl BarRef {
    pub fn id(&self) -> &BarId {
        match self {
            BarRef::Populated(bar) => &bar.id,
            BarRef::Id(id) => id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_ref_accepts_both_shapes() {
        let populated: ProductRef =
            serde_json::from_str(r#"{"_id":"p1","name":"Lager","sellingPrice":4.5}"#).unwrap();
        assert_eq!(populated.id().as_str(), "p1");
        assert_eq!(populated.populated().unwrap().name, "Lager");

        let bare: ProductRef = serde_json::from_str(r#""p2""#).unwrap();
        assert_eq!(bare.id().as_str(), "p2");
        assert!(bare.populated().is_none());
    }
}
