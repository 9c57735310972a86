//! patent-index
//!
//! Thin OpenSearch wrapper: a blocking client built once and shared, DSL
//! rendering for `patent_core::query::SearchRequest`, and the index mapping and
//! bulk writer used by ingest.

pub mod client;
pub mod dsl;
pub mod mapping;

pub use client::{BulkOutcome, ClusterInfo, IndexStats, OpenSearchClient};
