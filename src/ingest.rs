//! Reading the template shard into dimension and variable registries.

use log::{debug, warn};

use crate::chunk::{ChunkEntry, ChunkSet};
use crate::config::{AggregationSpec, JoinMode};
use crate::fqn::fqn;
use crate::metadata::{
    ChunkLayout, DimensionDecl, DimensionRegistry, VariableDecl, VariableRegistry, read_dim_refs,
};
use crate::tree::{DocumentTree, NodeId, NodeKind};

/// Registries built from the template shard.
#[derive(Debug, Clone, Default)]
pub struct Ingested {
    pub dimensions: DimensionRegistry,
    /// Every chunked array variable, coordinates included.
    pub variables: VariableRegistry,
    /// The template's dataset-level `href`.
    pub data_url: Option<String>,
}

/// Register the template's dimensions and chunked array variables.
///
/// For [JoinMode::JoinNew] this also declares the new dimension, with size 1,
/// as the first child of the dataset root.
pub fn ingest(tree: &mut DocumentTree, spec: &AggregationSpec) -> crate::Result<Ingested> {
    let root = tree.root();
    let data_url = tree.attr(root, "href").map(str::to_string);

    let mut dimensions = DimensionRegistry::default();
    let mut candidates = Vec::new();
    collect(tree, root, &mut dimensions, &mut candidates)?;

    let mut variables = VariableRegistry::default();
    for id in candidates {
        if let Some(decl) = read_variable(tree, id, &dimensions)? {
            variables.insert(decl);
        }
    }

    if spec.mode == JoinMode::JoinNew {
        dimensions.insert(declare_new_dimension(tree, spec, &dimensions)?);
    }

    for dim in dimensions.iter() {
        debug!("dimension: {} size: {}", dim.fqn, dim.size);
    }
    for var in variables.iter() {
        debug!(
            "chunked variable: {} type: {:?} rank: {}",
            var.fqn,
            var.atomic_type,
            var.rank()
        );
    }

    Ok(Ingested {
        dimensions,
        variables,
        data_url,
    })
}

/// Walk containers, registering dimensions and noting atomic variables.
pub(crate) fn collect(
    tree: &DocumentTree,
    container: NodeId,
    dimensions: &mut DimensionRegistry,
    candidates: &mut Vec<NodeId>,
) -> crate::Result<()> {
    for &kid in tree.children(container) {
        match tree.kind(kid) {
            NodeKind::Group | NodeKind::Structure | NodeKind::Sequence => {
                collect(tree, kid, dimensions, candidates)?;
            }
            NodeKind::Dimension => {
                dimensions.insert(DimensionDecl::read(tree, kid)?);
            }
            NodeKind::Atomic(_) => candidates.push(kid),
            NodeKind::Enumeration => {
                warn!(
                    "Skipping Enumeration name: {}",
                    tree.name(kid).unwrap_or_default()
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

/// Build the declaration of an atomic variable, if it is an array with a chunks block.
fn read_variable(
    tree: &mut DocumentTree,
    id: NodeId,
    dimensions: &DimensionRegistry,
) -> crate::Result<Option<VariableDecl>> {
    let NodeKind::Atomic(atomic_type) = tree.kind(id) else {
        return Ok(None);
    };
    if tree.child_of_kind(id, NodeKind::Dim).is_none() {
        return Ok(None);
    }
    let Some(chunks) = tree.child_of_kind(id, NodeKind::Chunks) else {
        return Ok(None);
    };
    let fqn = fqn(tree, id);
    let dim_refs = read_dim_refs(tree, id, &fqn, dimensions)?;
    let layout = ChunkLayout::read(tree, chunks, &fqn, dim_refs.len())?;
    if layout.inferred {
        debug!("{fqn}: single chunk without chunkDimensionSizes, using the whole array");
        for (chunk, entry) in &layout.entries {
            entry.write(tree, *chunk);
        }
    }
    Ok(Some(VariableDecl {
        name: tree.name(id).unwrap_or_default().to_string(),
        fqn,
        atomic_type,
        dim_refs,
        chunk_shape: layout.chunk_shape,
        chunks: ChunkSet::new(tree, chunks),
        node: id,
        inferred_shape: layout.inferred,
        pending_axis: false,
    }))
}

fn declare_new_dimension(
    tree: &mut DocumentTree,
    spec: &AggregationSpec,
    dimensions: &DimensionRegistry,
) -> crate::Result<DimensionDecl> {
    let fqn = spec.dimension_fqn();
    if dimensions.contains(&fqn) {
        return Err(crate::Error::configuration(format!(
            "the template already declares a dimension named '{fqn}'"
        )));
    }
    let root = tree.root();
    let node = tree.create_element("Dimension");
    let name = fqn.trim_start_matches('/').to_string();
    tree.push_attr(node, "name", name.as_str());
    tree.push_attr(node, "size", "1");
    tree.insert_child(root, 0, node);
    Ok(DimensionDecl {
        fqn,
        name,
        size: 1,
        node,
    })
}

/// Bring the template's own chunks of every aggregation variable into their final form.
///
/// For [JoinMode::JoinNew] each chunk shape gains a leading `1` and each chunk position
/// a leading `0`. Chunks without an `href` inherit `data_url`.
pub fn prepare_template(
    tree: &mut DocumentTree,
    aggregation: &mut VariableRegistry,
    data_url: Option<&str>,
    spec: &AggregationSpec,
) -> crate::Result<()> {
    for var in aggregation.iter_mut() {
        if spec.mode == JoinMode::JoinNew {
            var.chunk_shape.insert(0, 1);
            var.pending_axis = true;
        }
        let nodes: Vec<_> = var.chunks.chunk_nodes(tree).collect();
        for chunk in nodes {
            let mut entry = ChunkEntry::read(tree, chunk, &var.fqn, None)?;
            if spec.mode == JoinMode::JoinNew {
                entry.position_in_array.insert(0, 0);
            }
            if entry.href.is_none() {
                let href = data_url.ok_or_else(|| {
                    crate::Error::missing(
                        &var.fqn,
                        "template chunk has no href and the template dataset declares none",
                    )
                })?;
                entry.href = Some(href.to_string());
            }
            entry.trust |= spec.trust_urls;
            entry.write(tree, chunk);
        }
    }
    Ok(())
}
