//! Aggregation of DMR++ chunk metadata.
//!
//! A sequence of shard documents describing the same variables is combined into one
//! document whose chunk references span every shard, either along a brand-new outermost
//! dimension ([JoinMode::JoinNew]) or along an existing one ([JoinMode::JoinExisting]).
//! No array data is read.

pub mod aggregate;
pub mod chunk;
pub mod chunk_position;
pub mod classify;
pub mod config;
pub mod emit;
mod error;
pub mod fqn;
pub mod ingest;
mod merge;
pub mod metadata;
pub mod prune;
pub mod session;
pub mod storage;
pub mod tree;
pub mod xml;

pub use aggregate::{Aggregation, AggregationSummary, Aggregator, VariableSummary, aggregate};
pub use config::{AggregationSpec, JoinMode};
pub use error::{Error, Mismatch, Result};
pub use session::{Session, Shard, SkippedVariable};
pub use storage::ShardLocation;
pub use tree::{DocumentTree, NodeId, NodeKind};
