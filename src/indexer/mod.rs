//! Zero-downtime reindex pipeline
//!
//! A reindex builds a fresh timestamped physical index, streams the product
//! table through the document builder into bulk uploads, validates the
//! result, atomically rotates the serving alias onto it, and retires old
//! generations. Any failure after index creation tears the partial index
//! down and leaves the previous alias target untouched.

mod document;
mod pipeline;
mod schema;

pub use document::{DocumentBuilder, SkipReason};
pub use pipeline::{IndexerPipeline, PipelineOptions, PipelineReport};
pub use schema::{load_schema, validate_schema, EMBEDDED_SCHEMA};
