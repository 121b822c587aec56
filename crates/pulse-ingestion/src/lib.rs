//! pulse-ingestion — producers and sinks around the classifier.
//! - Gmail export decoding and HTML stripping
//! - GitHub issues fetching
//! - CSV dataset store
//! - Checkpointed enrichment pipelines
//! - Dashboard statistics

pub mod email;
pub mod pipeline;
pub mod sources;
pub mod stats;
pub mod store;

pub use pipeline::{EnrichmentOptions, EnrichmentPipeline, EnrichmentProgress, EnrichmentSummary};
pub use stats::{analyze_dataset, DatasetAnalysis, DatasetStats};
pub use store::{DatasetStore, Table};
