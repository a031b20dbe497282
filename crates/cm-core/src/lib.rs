//! Embedding clustering and graph construction engine.
//!
//! Takes records carrying three linked embeddings (trigger, thought,
//! response), clusters each family with DBSCAN, gives every leftover noise
//! point its own cluster, colors clusters from a per-run registry, and lays
//! the result out as a three-column node/link graph.
//!
//! Zero I/O: no opinions about where records come from or how the graph is drawn.

pub mod config;
pub mod constants;
pub mod dbscan;
pub mod error;
pub mod export;
pub mod graph;
pub mod layout;
pub mod noise;
pub mod normalize;
pub mod palette;
pub mod pipeline;
pub mod record;
pub mod report;
pub mod similarity;

pub use config::{ClusterParams, Columns, LayoutConfig, PipelineConfig, RefineConfig};
pub use constants::{DEFAULT_EPS, DEFAULT_MIN_PTS, PLACEHOLDER_LABEL};
pub use dbscan::{Dbscan, euclidean};
pub use error::ConfigError;
pub use export::{CURRENT_VERSION, GraphExport, export_json, parse_records};
pub use graph::{ClusterRegion, FamilyClusters, Graph, GraphBuilder, Link, Node};
pub use layout::{RefineOutcome, refine};
pub use noise::{fill_noise, is_partition};
pub use normalize::{EmbeddingIssue, NormalizedFamily, l2_normalize, magnitude, normalize_family};
pub use palette::{ColorRegistry, Palette};
pub use pipeline::{PipelineOutput, normalize_records, run};
pub use record::{Family, RawEmbedding, Record};
pub use report::Diagnostic;
pub use similarity::{SimilarityPair, cosine_similarity, eps_for_similarity, pairwise};
