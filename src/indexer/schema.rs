//! Index schema loading and shape validation

use crate::error::{AppError, Result};
use serde_json::Value;
use std::path::Path;

/// Schema shipped with the crate; used when no override path is configured
pub const EMBEDDED_SCHEMA: &str = include_str!("../../config/index_schema.json");

/// Analyzers every schema must define
const REQUIRED_ANALYZERS: [&str; 4] = [
    "text_analyzer",
    "code_analyzer",
    "search_analyzer",
    "autocomplete_analyzer",
];

/// Fields every schema must map
const REQUIRED_FIELDS: [&str; 5] = ["product_id", "external_id", "name", "brand_name", "suggest"];

/// Load the index schema from an override path or the embedded default
pub fn load_schema(path: Option<&Path>) -> Result<Value> {
    let raw = match path {
        Some(path) => std::fs::read_to_string(path).map_err(|e| {
            AppError::Schema(format!("Cannot read schema file {}: {}", path.display(), e))
        })?,
        None => EMBEDDED_SCHEMA.to_string(),
    };

    serde_json::from_str(&raw)
        .map_err(|e| AppError::Schema(format!("Schema is not valid JSON: {}", e)))
}

/// Validate the schema shape before index creation
pub fn validate_schema(schema: &Value) -> Result<()> {
    if schema.get("settings").is_none() {
        return Err(AppError::Schema("Schema is missing 'settings'".to_string()));
    }
    let mappings = schema
        .get("mappings")
        .ok_or_else(|| AppError::Schema("Schema is missing 'mappings'".to_string()))?;

    let analyzers = schema
        .pointer("/settings/analysis/analyzer")
        .and_then(Value::as_object)
        .ok_or_else(|| {
            AppError::Schema("Schema is missing 'settings.analysis.analyzer'".to_string())
        })?;
    for required in REQUIRED_ANALYZERS {
        if !analyzers.contains_key(required) {
            return Err(AppError::Schema(format!(
                "Schema is missing required analyzer '{}'",
                required
            )));
        }
    }

    let properties = mappings
        .get("properties")
        .and_then(Value::as_object)
        .ok_or_else(|| AppError::Schema("Schema is missing 'mappings.properties'".to_string()))?;
    for required in REQUIRED_FIELDS {
        if !properties.contains_key(required) {
            return Err(AppError::Schema(format!(
                "Schema is missing required field '{}'",
                required
            )));
        }
    }

    // The suggest field must be a completion-suggester field
    let suggest_type = properties
        .get("suggest")
        .and_then(|f| f.get("type"))
        .and_then(Value::as_str);
    if suggest_type != Some("completion") {
        return Err(AppError::Schema(
            "Schema field 'suggest' must have type 'completion'".to_string(),
        ));
    }

    Ok(())
}
