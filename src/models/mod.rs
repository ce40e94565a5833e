//! Domain models: source product rows and indexable documents

mod product;

pub use product::{DocumentCounts, ProductDocument, ProductRow, SuggestEntry};
