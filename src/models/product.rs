use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A raw product row as streamed from the relational store, with
/// brand/series names already joined in
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductRow {
    pub product_id: i64,
    pub external_id: String,
    pub sku: String,
    pub name: String,
    pub description: String,
    pub brand_id: i64,
    pub brand_name: String,
    pub series_id: i64,
    pub series_name: String,
    pub unit: String,
    pub dimensions: String,
    pub min_sale: i64,
    pub weight: f64,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

/// One completion-suggester entry carried on an indexed document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SuggestEntry {
    pub input: Vec<String>,
    pub weight: u32,
}

/// Per-document attachment counters
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DocumentCounts {
    pub certificates: u32,
    pub manuals: u32,
    pub drawings: u32,
}

/// The indexable document uploaded to the search engine.
///
/// Identity is `product_id`, which doubles as the backend document id.
/// Empty text fields are elided on serialization to keep bulk payloads small.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductDocument {
    pub product_id: i64,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub external_id: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sku: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    pub brand_id: i64,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub brand_name: String,

    pub series_id: i64,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub series_name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub unit: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub dimensions: String,

    pub min_sale: i64,

    pub weight: f64,

    /// Whitespace-normalized concatenation of the identifying/text fields
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub search_all: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggest: Vec<SuggestEntry>,

    #[serde(default)]
    pub popularity_score: f64,

    #[serde(default)]
    pub in_stock: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub category_ids: Vec<i64>,

    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attributes: Map<String, Value>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,

    #[serde(default)]
    pub documents: DocumentCounts,

    /// ISO-8601, defaulted to indexing time when the source value is unusable
    pub created_at: String,

    /// ISO-8601, defaulted to indexing time when the source value is unusable
    pub updated_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_fields_elided_on_serialization() {
        let doc = ProductDocument {
            product_id: 1,
            external_id: "AB-1".to_string(),
            sku: String::new(),
            name: "Gadget".to_string(),
            description: String::new(),
            brand_id: 0,
            brand_name: String::new(),
            series_id: 0,
            series_name: String::new(),
            unit: String::new(),
            dimensions: String::new(),
            min_sale: 1,
            weight: 0.0,
            search_all: "Gadget AB-1".to_string(),
            suggest: vec![],
            popularity_score: 0.0,
            in_stock: false,
            categories: vec![],
            category_ids: vec![],
            attributes: Map::new(),
            images: vec![],
            documents: DocumentCounts::default(),
            created_at: "2024-01-01T00:00:00Z".to_string(),
            updated_at: "2024-01-01T00:00:00Z".to_string(),
        };

        let value = serde_json::to_value(&doc).unwrap();
        let obj = value.as_object().unwrap();

        assert!(obj.contains_key("external_id"));
        assert!(!obj.contains_key("sku"));
        assert!(!obj.contains_key("description"));
        assert!(!obj.contains_key("suggest"));
        assert!(!obj.contains_key("categories"));
    }

    #[test]
    fn test_document_round_trips() {
        let doc = ProductDocument {
            product_id: 7,
            external_id: "X-9".to_string(),
            sku: "S7".to_string(),
            name: "Drill".to_string(),
            description: "A drill".to_string(),
            brand_id: 3,
            brand_name: "Makita".to_string(),
            series_id: 0,
            series_name: String::new(),
            unit: "pc".to_string(),
            dimensions: String::new(),
            min_sale: 1,
            weight: 1.5,
            search_all: "Drill X-9 S7 Makita A drill".to_string(),
            suggest: vec![SuggestEntry {
                input: vec!["Drill".to_string()],
                weight: 100,
            }],
            popularity_score: 2.0,
            in_stock: true,
            categories: vec!["tools".to_string()],
            category_ids: vec![11],
            attributes: Map::new(),
            images: vec![],
            documents: DocumentCounts {
                certificates: 1,
                manuals: 0,
                drawings: 0,
            },
            created_at: "2024-05-01T10:00:00Z".to_string(),
            updated_at: "2024-05-02T10:00:00Z".to_string(),
        };

        let json = serde_json::to_string(&doc).unwrap();
        let back: ProductDocument = serde_json::from_str(&json).unwrap();
        assert_eq!(doc, back);
    }
}
