use crate::chunk_position::{format_chunk_dimension_sizes, format_position, parse_position};
use crate::tree::{DocumentTree, NodeId, NodeKind};

pub(crate) const POSITION_ATTR: &str = "chunkPositionInArray";
pub(crate) const HREF_ATTR: &str = "href";
pub(crate) const TRUST_ATTR: &str = "trust";

/// One `dmrpp:chunk` entry: where the block sits in the chunk grid and where its bytes live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkEntry {
    pub position_in_array: Vec<u64>,
    pub href: Option<String>,
    pub trust: bool,
}

impl ChunkEntry {
    /// Read a chunk element of the variable `fqn`.
    ///
    /// `forced_position` replaces whatever position the element declares;
    /// otherwise the position attribute is required.
    pub(crate) fn read(
        tree: &DocumentTree,
        id: NodeId,
        fqn: &str,
        forced_position: Option<Vec<u64>>,
    ) -> crate::Result<Self> {
        let position_in_array = match forced_position {
            Some(p) => p,
            None => {
                let text = tree.attr(id, POSITION_ATTR).ok_or_else(|| {
                    crate::Error::missing(fqn, format!("chunk has no {POSITION_ATTR} attribute"))
                })?;
                parse_position(text)
                    .ok_or_else(|| crate::Error::invalid_attribute(fqn, POSITION_ATTR, text))?
            }
        };
        Ok(Self {
            position_in_array,
            href: tree.attr(id, HREF_ATTR).map(str::to_string),
            trust: tree
                .attr(id, TRUST_ATTR)
                .is_some_and(|t| t.eq_ignore_ascii_case("true")),
        })
    }

    /// Write this entry's fields onto a chunk element, leaving its byte range untouched.
    pub(crate) fn write(&self, tree: &mut DocumentTree, id: NodeId) {
        tree.set_attr(id, POSITION_ATTR, format_position(&self.position_in_array));
        if let Some(href) = &self.href {
            tree.set_attr(id, HREF_ATTR, href.as_str());
        }
        if self.trust {
            tree.set_attr(id, TRUST_ATTR, "true");
        }
    }
}

/// The `dmrpp:chunks` block of one variable. Chunks are only ever appended.
#[derive(Debug, Clone)]
pub struct ChunkSet {
    node: NodeId,
    count: usize,
}

impl ChunkSet {
    pub(crate) fn new(tree: &DocumentTree, node: NodeId) -> Self {
        Self {
            node,
            count: tree.children_of_kind(node, NodeKind::Chunk).count(),
        }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Chunk elements in document order.
    pub fn chunk_nodes<'a>(
        &self,
        tree: &'a DocumentTree,
    ) -> impl Iterator<Item = NodeId> + use<'a> {
        tree.children_of_kind(self.node, NodeKind::Chunk)
    }

    pub(crate) fn append(&mut self, tree: &mut DocumentTree, chunk: NodeId) {
        tree.append_child(self.node, chunk);
        self.count += 1;
    }

    /// Replace (or create) the `chunkDimensionSizes` element.
    pub(crate) fn write_shape(&self, tree: &mut DocumentTree, shape: &[u64]) {
        let sizes = match tree.child_of_kind(self.node, NodeKind::ChunkDimensionSizes) {
            Some(id) => id,
            None => {
                let tag = match tree.node(self.node).tag().split_once(':') {
                    Some((prefix, _)) => format!("{prefix}:chunkDimensionSizes"),
                    None => "chunkDimensionSizes".to_string(),
                };
                let id = tree.create_element(tag);
                tree.insert_child(self.node, 0, id);
                id
            }
        };
        tree.set_text(sizes, format_chunk_dimension_sizes(shape));
    }
}
