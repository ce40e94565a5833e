//! Product-catalog search service
//!
//! Two tightly coupled subsystems over one search engine:
//!
//! - **Indexer pipeline** ([`indexer`]): builds a fresh timestamped index
//!   from the relational products table, validates it and atomically rotates
//!   the serving alias onto it, keeping a bounded number of old generations.
//! - **Query engine** ([`query`] + [`service`]): a multi-strategy relevance
//!   model with function scoring, rescoring and completion-suggester
//!   autocomplete, routed through a circuit breaker ([`health`]) with a
//!   relational fallback ([`store`]) when the engine is unhealthy.
//!
//! The search engine itself is only reached through the [`backend`] trait;
//! authoritative data lives in the relational store and the search path is
//! strictly read-only.

pub mod api;
pub mod backend;
pub mod config;
pub mod enrichment;
pub mod error;
pub mod health;
pub mod indexer;
pub mod models;
pub mod query;
pub mod service;
pub mod store;
