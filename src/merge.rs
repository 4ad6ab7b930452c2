//! Folding one shard's chunks into the template.
//!
//! Merging is two-phase: [plan] walks the shard and validates it against the
//! template without touching anything, then [commit] copies the planned chunks
//! into the template tree. A shard that fails validation leaves the session as
//! it was before the shard arrived.

use log::{debug, warn};

use crate::chunk::ChunkEntry;
use crate::config::JoinMode;
use crate::error::Mismatch;
use crate::fqn::fqn;
use crate::metadata::{ChunkLayout, DimensionDecl, read_dim_refs};
use crate::session::{Session, Shard, SkippedVariable};
use crate::tree::{DocumentTree, NodeId, NodeKind};

/// A chunk of the shard, already repositioned, waiting to be appended.
#[derive(Debug, Clone)]
struct PlannedChunk {
    variable: String,
    source: NodeId,
    entry: ChunkEntry,
}

/// Everything merging one shard will change.
#[derive(Debug, Default)]
pub(crate) struct MergePlan {
    chunks: Vec<PlannedChunk>,
    skipped: Vec<String>,
    target_extent: u64,
}

impl MergePlan {
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }
}

/// Validate `shard` against the session's template and work out the chunks it contributes.
pub(crate) fn plan(session: &Session, shard: &Shard) -> crate::Result<MergePlan> {
    let mut plan = MergePlan::default();
    let planner = Planner { session, shard };
    planner.container(shard.tree.root(), &mut plan)?;
    Ok(plan)
}

/// Apply a plan produced by [plan] for the same shard.
pub(crate) fn commit(session: &mut Session, shard: &Shard, plan: MergePlan) {
    for planned in plan.chunks {
        let Some(var) = session.aggregation.get_mut(&planned.variable) else {
            continue;
        };
        let copy = session.tree.import_subtree(&shard.tree, planned.source);
        planned.entry.write(&mut session.tree, copy);
        var.chunks.append(&mut session.tree, copy);
    }
    session.target_extent += plan.target_extent;
    session
        .skipped
        .extend(plan.skipped.into_iter().map(|fqn| SkippedVariable {
            shard: shard.index,
            fqn,
        }));
}

struct Planner<'a> {
    session: &'a Session,
    shard: &'a Shard,
}

impl Planner<'_> {
    fn tree(&self) -> &DocumentTree {
        &self.shard.tree
    }

    fn container(&self, container: NodeId, plan: &mut MergePlan) -> crate::Result<()> {
        for &kid in self.tree().children(container) {
            match self.tree().kind(kid) {
                NodeKind::Group | NodeKind::Structure | NodeKind::Sequence => {
                    self.container(kid, plan)?;
                }
                NodeKind::Dimension => self.dimension(kid, plan)?,
                NodeKind::Atomic(_) => self.variable(kid, plan)?,
                NodeKind::Enumeration => {
                    debug!(
                        "shard {}: skipping Enumeration {}",
                        self.shard.index,
                        self.tree().name(kid).unwrap_or_default()
                    );
                }
                NodeKind::Dataset
                | NodeKind::Dim
                | NodeKind::Chunks
                | NodeKind::ChunkDimensionSizes
                | NodeKind::Chunk
                | NodeKind::Other => {}
            }
        }
        Ok(())
    }

    fn dimension(&self, id: NodeId, plan: &mut MergePlan) -> crate::Result<()> {
        let decl = DimensionDecl::read(self.tree(), id)?;
        let Some(template) = self.session.dimensions.get(&decl.fqn) else {
            return Err(crate::Error::UnresolvedReference {
                reference: decl.fqn.clone(),
                fqn: decl.fqn,
            });
        };
        if self.session.target.as_deref() == Some(decl.fqn.as_str()) {
            plan.target_extent += decl.size;
            return Ok(());
        }
        if decl.size != template.size {
            return Err(crate::Error::mismatch(
                decl.fqn,
                Mismatch::DimensionSize {
                    template: template.size,
                    shard: decl.size,
                },
            ));
        }
        Ok(())
    }

    fn variable(&self, id: NodeId, plan: &mut MergePlan) -> crate::Result<()> {
        let tree = self.tree();
        let fqn = fqn(tree, id);
        if self.session.coordinates.contains(&fqn) {
            return Ok(());
        }
        let Some(template) = self.session.aggregation.get(&fqn) else {
            if tree.child_of_kind(id, NodeKind::Dim).is_none()
                || self.session.pruned.contains(&fqn)
            {
                return Ok(());
            }
            warn!(
                "Unable to locate template variable '{fqn}' for shard {}, skipping.",
                self.shard.index
            );
            plan.skipped.push(fqn);
            return Ok(());
        };

        let dim_refs = read_dim_refs(tree, id, &fqn, &self.session.dimensions)?;
        if dim_refs.len() != template.rank() {
            return Err(crate::Error::mismatch(
                fqn,
                Mismatch::Rank {
                    template: template.rank(),
                    shard: dim_refs.len(),
                },
            ));
        }
        let chunks = tree.child_of_kind(id, NodeKind::Chunks).ok_or_else(|| {
            crate::Error::missing(&fqn, "shard variable has no chunks block")
        })?;
        let layout = ChunkLayout::read(tree, chunks, &fqn, dim_refs.len())?;
        if layout.chunk_shape != template.native_chunk_shape() {
            return Err(crate::Error::mismatch(
                fqn,
                Mismatch::ChunkShape {
                    template: template.native_chunk_shape().to_vec(),
                    shard: layout.chunk_shape,
                },
            ));
        }

        let index = self.shard.index as u64;
        for (source, mut entry) in layout.entries {
            match self.session.spec.mode {
                JoinMode::JoinNew => entry.position_in_array.insert(0, index),
                JoinMode::JoinExisting => {
                    if let Some(outer) = entry.position_in_array.first_mut() {
                        *outer = index;
                    }
                }
            }
            if entry.href.is_none() {
                let href = self.shard.data_url.as_deref().ok_or_else(|| {
                    crate::Error::missing(
                        &fqn,
                        format!(
                            "shard {index} has a chunk without href and no dataset-level href"
                        ),
                    )
                })?;
                entry.href = Some(href.to_string());
            }
            entry.trust |= self.session.spec.trust_urls;
            plan.chunks.push(PlannedChunk {
                variable: fqn.clone(),
                source,
                entry,
            });
        }
        Ok(())
    }
}
