use std::collections::BTreeSet;

use log::{debug, warn};
use serde::Serialize;

use crate::classify::classify;
use crate::config::{AggregationSpec, JoinMode};
use crate::emit::emit;
use crate::ingest::{Ingested, ingest, prepare_template};
use crate::merge;
use crate::metadata::{DimensionRegistry, VariableRegistry};
use crate::prune::prune;
use crate::tree::DocumentTree;

/// One input document.
#[derive(Debug, Clone)]
pub struct Shard {
    pub tree: DocumentTree,
    /// Dataset-level data URL, used for chunks without their own `href`.
    pub data_url: Option<String>,
    /// Position along the aggregation axis. Assigned by the [Session] in arrival order.
    pub index: usize,
}

impl Shard {
    /// Wrap a parsed document, taking its data URL from the dataset `href`.
    pub fn new(tree: DocumentTree) -> Self {
        let data_url = tree.attr(tree.root(), "href").map(str::to_string);
        Self {
            tree,
            data_url,
            index: 0,
        }
    }

    #[must_use]
    pub fn with_data_url(mut self, data_url: impl Into<String>) -> Self {
        self.data_url = Some(data_url.into());
        self
    }
}

/// A variable a shard declares but the template does not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedVariable {
    pub shard: usize,
    pub fqn: String,
}

/// The state of one aggregation: the template tree being assembled and its registries.
///
/// Sessions share nothing, so any number may run side by side.
#[derive(Debug)]
pub struct Session {
    pub(crate) spec: AggregationSpec,
    pub(crate) tree: DocumentTree,
    pub(crate) data_url: Option<String>,
    pub(crate) dimensions: DimensionRegistry,
    pub(crate) coordinates: VariableRegistry,
    pub(crate) aggregation: VariableRegistry,
    pub(crate) target: Option<String>,
    pub(crate) pruned: BTreeSet<String>,
    pub(crate) shard_count: usize,
    /// JoinExisting: sum of the target dimension's declared size over all shards.
    pub(crate) target_extent: u64,
    pub(crate) skipped: Vec<SkippedVariable>,
}

impl Session {
    /// Ingest the template shard: registries, coordinate split, pruning, and the template's own chunks.
    pub fn start(template: Shard, spec: AggregationSpec) -> crate::Result<Self> {
        spec.validate()?;
        let Shard { mut tree, data_url, .. } = template;

        let Ingested {
            dimensions,
            variables,
            data_url: root_data_url,
        } = ingest(&mut tree, &spec)?;
        let data_url = data_url.or(root_data_url);
        let classified = classify(&dimensions, variables, &spec)?;
        let coordinates = classified.coordinates;
        let mut aggregation = classified.aggregation;

        let pruned: BTreeSet<String> = prune(
            &mut tree,
            &mut aggregation,
            &coordinates,
            classified.target.as_deref(),
            spec.allow_list(),
        )
        .into_iter()
        .collect();
        prepare_template(&mut tree, &mut aggregation, data_url.as_deref(), &spec)?;

        let target_extent = match &classified.target {
            Some(target) => {
                for var in aggregation.iter() {
                    if var.outermost_dimension() != Some(target.as_str()) {
                        warn!(
                            "'{}' is not indexed by '{target}' first, but its chunks will be stacked along it",
                            var.fqn
                        );
                    }
                }
                dimensions.get(target).map_or(0, |d| d.size)
            }
            None => 0,
        };

        debug!(
            "template ingested: {} dimension(s), {} coordinate variable(s), {} aggregation variable(s)",
            dimensions.len(),
            coordinates.len(),
            aggregation.len()
        );

        Ok(Self {
            spec,
            tree,
            data_url,
            dimensions,
            coordinates,
            aggregation,
            target: classified.target,
            pruned,
            shard_count: 1,
            target_extent,
            skipped: Vec::new(),
        })
    }

    /// Fold the next shard into the template.
    ///
    /// The shard's index is the number of shards merged so far. If the shard is
    /// rejected the session is unchanged, and the caller decides whether to go on.
    pub fn merge(&mut self, mut shard: Shard) -> crate::Result<()> {
        shard.index = self.shard_count;
        let plan = merge::plan(self, &shard)?;
        debug!(
            "shard {}: merging {} chunk(s)",
            shard.index,
            plan.chunk_count()
        );
        merge::commit(self, &shard, plan);
        self.shard_count += 1;
        Ok(())
    }

    /// Number of shards merged, the template included.
    pub fn shard_count(&self) -> usize {
        self.shard_count
    }

    pub fn spec(&self) -> &AggregationSpec {
        &self.spec
    }

    pub fn tree(&self) -> &DocumentTree {
        &self.tree
    }

    pub fn data_url(&self) -> Option<&str> {
        self.data_url.as_deref()
    }

    pub fn dimensions(&self) -> &DimensionRegistry {
        &self.dimensions
    }

    pub fn coordinate_variables(&self) -> &VariableRegistry {
        &self.coordinates
    }

    pub fn aggregation_variables(&self) -> &VariableRegistry {
        &self.aggregation
    }

    /// JoinExisting: FQN of the variable being extended.
    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    pub fn skipped(&self) -> &[SkippedVariable] {
        &self.skipped
    }

    /// Finalize dimension sizes and variable dimensions, returning the assembled tree.
    pub fn finish(mut self) -> crate::Result<crate::aggregate::Aggregation> {
        emit(
            &mut self.tree,
            &mut self.dimensions,
            &mut self.aggregation,
            &self.spec,
            self.shard_count,
        )?;
        let summary = crate::aggregate::AggregationSummary::new(&self);
        if self.spec.mode == JoinMode::JoinExisting {
            debug!(
                "target dimension '{}' spans {} element(s) across {} shard(s)",
                self.spec.dimension_fqn(),
                self.target_extent,
                self.shard_count
            );
        }
        Ok(crate::aggregate::Aggregation {
            tree: self.tree,
            summary,
        })
    }
}
