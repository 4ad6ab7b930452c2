use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::info;
use serde::Serialize;

use crate::config::{AggregationSpec, JoinMode};
use crate::metadata::DimRef;
use crate::session::{Session, Shard, SkippedVariable};
use crate::tree::DocumentTree;

/// Drives a [Session] over an ordered sequence of shards.
#[derive(Debug, Clone)]
pub struct Aggregator {
    spec: AggregationSpec,
    cancel: Option<Arc<AtomicBool>>,
}

impl Aggregator {
    pub fn new(spec: AggregationSpec) -> Self {
        Self { spec, cancel: None }
    }

    /// Abort with [crate::Error::Cancelled] once `flag` is set; checked between shards.
    #[must_use]
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn spec(&self) -> &AggregationSpec {
        &self.spec
    }

    /// Aggregate shards in the given order; the first one is the template.
    pub fn aggregate<I>(&self, shards: I) -> crate::Result<Aggregation>
    where
        I: IntoIterator<Item = Shard>,
    {
        self.try_aggregate(shards.into_iter().map(Ok))
    }

    /// As [Aggregator::aggregate], for shards which are loaded lazily and may fail to load.
    ///
    /// Any error ends the aggregation; nothing of the partially assembled tree is returned.
    pub fn try_aggregate<I>(&self, shards: I) -> crate::Result<Aggregation>
    where
        I: IntoIterator<Item = crate::Result<Shard>>,
    {
        self.spec.validate()?;
        let mut shards = shards.into_iter();
        let template = shards.next().ok_or_else(|| {
            crate::Error::configuration("no shard documents were specified, unable to aggregate")
        })??;
        let mut session = Session::start(template, self.spec.clone())?;
        for shard in shards {
            if self.is_cancelled() {
                return Err(crate::Error::Cancelled {
                    merged: session.shard_count(),
                });
            }
            session.merge(shard?)?;
        }
        let aggregation = session.finish()?;
        info!(
            "aggregated {} shard(s) along '{}' ({} variable(s))",
            aggregation.summary.shards,
            aggregation.summary.dimension,
            aggregation.summary.variables.len()
        );
        Ok(aggregation)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

/// Aggregate `shards` in order under `spec`.
pub fn aggregate<I>(spec: AggregationSpec, shards: I) -> crate::Result<Aggregation>
where
    I: IntoIterator<Item = Shard>,
{
    Aggregator::new(spec).aggregate(shards)
}

/// The assembled document and a description of what went into it.
#[derive(Debug, Clone)]
pub struct Aggregation {
    pub tree: DocumentTree,
    pub summary: AggregationSummary,
}

impl Aggregation {
    pub fn to_xml(&self) -> crate::Result<String> {
        crate::xml::to_string(&self.tree)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationSummary {
    pub mode: JoinMode,
    /// FQN of the new or extended dimension.
    pub dimension: String,
    pub dimension_size: u64,
    pub shards: usize,
    /// JoinExisting: the summed declared size of the target dimension over all shards.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_extent: Option<u64>,
    pub variables: BTreeMap<String, VariableSummary>,
    pub coordinates: Vec<String>,
    pub pruned: Vec<String>,
    pub skipped: Vec<SkippedVariable>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableSummary {
    /// Dimension FQNs, or the size of anonymous dimensions.
    pub dimensions: Vec<String>,
    pub chunk_shape: Vec<u64>,
    pub chunks: usize,
}

impl AggregationSummary {
    pub(crate) fn new(session: &Session) -> Self {
        let dimension = session.spec.dimension_fqn();
        let variables = session
            .aggregation
            .iter()
            .map(|var| {
                let dimensions = var
                    .dim_refs
                    .iter()
                    .map(|d| match d {
                        DimRef::Named(fqn) => fqn.clone(),
                        DimRef::Anonymous(size) => size.to_string(),
                    })
                    .collect();
                (
                    var.fqn.clone(),
                    VariableSummary {
                        dimensions,
                        chunk_shape: var.chunk_shape.clone(),
                        chunks: var.chunks.len(),
                    },
                )
            })
            .collect();
        Self {
            mode: session.spec.mode,
            dimension_size: session.dimensions.get(&dimension).map_or(0, |d| d.size),
            dimension,
            shards: session.shard_count,
            target_extent: (session.spec.mode == JoinMode::JoinExisting)
                .then_some(session.target_extent),
            variables,
            coordinates: session.coordinates.fqns().map(str::to_string).collect(),
            pruned: session.pruned.iter().cloned().collect(),
            skipped: session.skipped.clone(),
        }
    }
}
