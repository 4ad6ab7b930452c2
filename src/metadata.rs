use std::collections::BTreeMap;

use crate::chunk::{ChunkEntry, ChunkSet};
use crate::chunk_position::parse_chunk_dimension_sizes;
use crate::error::Mismatch;
use crate::fqn::{fqn, join};
use crate::tree::{AtomicType, DocumentTree, NodeId, NodeKind};

/// A declared dimension (`<Dimension name=".." size=".."/>`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionDecl {
    pub fqn: String,
    pub name: String,
    pub size: u64,
    pub(crate) node: NodeId,
}

impl DimensionDecl {
    pub(crate) fn read(tree: &DocumentTree, id: NodeId) -> crate::Result<Self> {
        let fqn = fqn(tree, id);
        let name = tree
            .name(id)
            .ok_or_else(|| crate::Error::missing(&fqn, "dimension has no name"))?
            .to_string();
        let size = read_size(tree, id, &fqn)?;
        Ok(Self {
            fqn,
            name,
            size,
            node: id,
        })
    }

    pub fn node(&self) -> NodeId {
        self.node
    }
}

fn read_size(tree: &DocumentTree, id: NodeId, fqn: &str) -> crate::Result<u64> {
    let text = tree
        .attr(id, "size")
        .ok_or_else(|| crate::Error::missing(fqn, "dimension has no size"))?;
    text.trim()
        .parse()
        .map_err(|_| crate::Error::invalid_attribute(fqn, "size", text))
}

/// All dimensions declared by the template, keyed by FQN.
#[derive(Debug, Clone, Default)]
pub struct DimensionRegistry {
    dimensions: BTreeMap<String, DimensionDecl>,
}

impl DimensionRegistry {
    pub fn insert(&mut self, decl: DimensionDecl) -> Option<DimensionDecl> {
        self.dimensions.insert(decl.fqn.clone(), decl)
    }

    pub fn get(&self, fqn: &str) -> Option<&DimensionDecl> {
        self.dimensions.get(fqn)
    }

    pub fn contains(&self, fqn: &str) -> bool {
        self.dimensions.contains_key(fqn)
    }

    pub fn len(&self) -> usize {
        self.dimensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dimensions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DimensionDecl> {
        self.dimensions.values()
    }

    /// Update both the registry and the `size` attribute of the declaring element.
    pub(crate) fn set_size(
        &mut self,
        tree: &mut DocumentTree,
        fqn: &str,
        size: u64,
    ) -> crate::Result<()> {
        let decl = self
            .dimensions
            .get_mut(fqn)
            .ok_or_else(|| crate::Error::missing(fqn, "dimension is not registered"))?;
        decl.size = size;
        tree.set_attr(decl.node, "size", size.to_string());
        Ok(())
    }

    /// Resolve a `Dim` reference made from within the container `scope`.
    ///
    /// Absolute references must match exactly; relative ones are looked up
    /// in `scope` and then in each enclosing container.
    pub fn resolve(&self, scope: &str, reference: &str) -> Option<&DimensionDecl> {
        if reference.starts_with('/') {
            return self.get(reference);
        }
        let mut scope = scope;
        loop {
            if let Some(decl) = self.get(&join(scope, reference)) {
                return Some(decl);
            }
            if scope == "/" || scope.is_empty() {
                return None;
            }
            scope = match scope.rsplit_once('/') {
                Some(("", _)) | None => "/",
                Some((parent, _)) => parent,
            };
        }
    }
}

/// One `<Dim>` reference of a variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DimRef {
    /// Reference to a declared dimension, by FQN.
    Named(String),
    /// Anonymous dimension given only by its size.
    Anonymous(u64),
}

impl DimRef {
    pub fn fqn(&self) -> Option<&str> {
        match self {
            DimRef::Named(fqn) => Some(fqn),
            DimRef::Anonymous(_) => None,
        }
    }
}

/// Read the `Dim` children of the variable element `id`, resolving named ones.
pub(crate) fn read_dim_refs(
    tree: &DocumentTree,
    id: NodeId,
    var_fqn: &str,
    dimensions: &DimensionRegistry,
) -> crate::Result<Vec<DimRef>> {
    let scope = tree.parent(id).map_or_else(|| "/".to_string(), |p| fqn(tree, p));
    tree.children_of_kind(id, NodeKind::Dim)
        .map(|dim| match tree.name(dim) {
            Some(reference) => dimensions
                .resolve(&scope, reference)
                .map(|decl| DimRef::Named(decl.fqn.clone()))
                .ok_or_else(|| crate::Error::UnresolvedReference {
                    fqn: var_fqn.to_string(),
                    reference: reference.to_string(),
                }),
            None => read_size(tree, dim, var_fqn).map(DimRef::Anonymous),
        })
        .collect()
}

/// The chunk shape a variable declares, or the marker that it must be inferred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkShape {
    Declared(Vec<u64>),
    /// No `chunkDimensionSizes`, but exactly one chunk: the whole array is that chunk.
    InferSingleChunk,
}

impl ChunkShape {
    pub(crate) fn read(tree: &DocumentTree, chunks: NodeId, fqn: &str) -> crate::Result<Self> {
        if let Some(sizes) = tree.child_of_kind(chunks, NodeKind::ChunkDimensionSizes) {
            let text = tree.text(sizes).unwrap_or_default();
            return parse_chunk_dimension_sizes(text)
                .map(Self::Declared)
                .ok_or_else(|| crate::Error::invalid_attribute(fqn, "chunkDimensionSizes", text));
        }
        match tree.children_of_kind(chunks, NodeKind::Chunk).count() {
            1 => Ok(Self::InferSingleChunk),
            n => Err(crate::Error::missing(
                fqn,
                format!(
                    "no chunkDimensionSizes element and {n} chunks, so the chunk shape cannot be inferred"
                ),
            )),
        }
    }
}

/// The chunk layout of one variable as read from a document.
#[derive(Debug, Clone)]
pub(crate) struct ChunkLayout {
    pub chunk_shape: Vec<u64>,
    pub inferred: bool,
    pub entries: Vec<(NodeId, ChunkEntry)>,
}

impl ChunkLayout {
    /// Read and validate the `dmrpp:chunks` block `chunks` of a variable of rank `rank`.
    pub fn read(
        tree: &DocumentTree,
        chunks: NodeId,
        fqn: &str,
        rank: usize,
    ) -> crate::Result<Self> {
        let (chunk_shape, forced_position, inferred) = match ChunkShape::read(tree, chunks, fqn)? {
            ChunkShape::Declared(shape) => (shape, None, false),
            ChunkShape::InferSingleChunk => (vec![1; rank], Some(vec![0; rank]), true),
        };
        if chunk_shape.len() != rank {
            return Err(crate::Error::mismatch(
                fqn,
                Mismatch::ChunkShapeRank { rank, chunk_shape },
            ));
        }
        let entries = tree
            .children_of_kind(chunks, NodeKind::Chunk)
            .map(|id| {
                let entry = ChunkEntry::read(tree, id, fqn, forced_position.clone())?;
                if entry.position_in_array.len() != rank {
                    return Err(crate::Error::mismatch(
                        fqn,
                        Mismatch::ChunkPosition {
                            rank,
                            position: entry.position_in_array,
                        },
                    ));
                }
                Ok((id, entry))
            })
            .collect::<crate::Result<Vec<_>>>()?;
        Ok(Self {
            chunk_shape,
            inferred,
            entries,
        })
    }
}

/// A chunked array variable of the template.
#[derive(Debug, Clone)]
pub struct VariableDecl {
    pub fqn: String,
    pub name: String,
    pub atomic_type: AtomicType,
    pub dim_refs: Vec<DimRef>,
    /// One entry per dimension reference, outermost first.
    pub chunk_shape: Vec<u64>,
    pub chunks: ChunkSet,
    pub(crate) node: NodeId,
    /// The chunk shape was not declared and has to be written out.
    pub(crate) inferred_shape: bool,
    /// A new outermost axis has been prepended to the chunk shape but not yet to `dim_refs`.
    pub(crate) pending_axis: bool,
}

impl VariableDecl {
    pub fn rank(&self) -> usize {
        self.dim_refs.len()
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    /// The chunk shape as the shard documents declare it, without any pending new axis.
    pub fn native_chunk_shape(&self) -> &[u64] {
        if self.pending_axis {
            &self.chunk_shape[1..]
        } else {
            &self.chunk_shape
        }
    }

    pub fn outermost_dimension(&self) -> Option<&str> {
        self.dim_refs.first().and_then(DimRef::fqn)
    }
}

/// Variables keyed by FQN.
#[derive(Debug, Clone, Default)]
pub struct VariableRegistry {
    variables: BTreeMap<String, VariableDecl>,
}

impl VariableRegistry {
    pub fn insert(&mut self, decl: VariableDecl) -> Option<VariableDecl> {
        self.variables.insert(decl.fqn.clone(), decl)
    }

    pub fn get(&self, fqn: &str) -> Option<&VariableDecl> {
        self.variables.get(fqn)
    }

    pub fn get_mut(&mut self, fqn: &str) -> Option<&mut VariableDecl> {
        self.variables.get_mut(fqn)
    }

    pub fn remove(&mut self, fqn: &str) -> Option<VariableDecl> {
        self.variables.remove(fqn)
    }

    pub fn contains(&self, fqn: &str) -> bool {
        self.variables.contains_key(fqn)
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &VariableDecl> {
        self.variables.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut VariableDecl> {
        self.variables.values_mut()
    }

    pub fn fqns(&self) -> impl Iterator<Item = &str> {
        self.variables.keys().map(String::as_str)
    }
}
