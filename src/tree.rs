//! Arena-backed DMR++ document tree.
//!
//! Nodes are addressed by [NodeId] and store the index of their parent,
//! so upward walks (see [crate::fqn]) need no back-pointers.
//! Detached nodes stay in the arena but are unreachable from the root.

/// Index of a node within one [DocumentTree].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// DAP4 atomic types which may carry chunked array data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AtomicType {
    Int8,
    UInt8,
    Byte,
    Char,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float32,
    Float64,
    String,
    Uri,
    Opaque,
    Enum,
}

impl AtomicType {
    fn from_local_name(name: &str) -> Option<Self> {
        let t = match name {
            "Int8" => Self::Int8,
            "UInt8" => Self::UInt8,
            "Byte" => Self::Byte,
            "Char" => Self::Char,
            "Int16" => Self::Int16,
            "UInt16" => Self::UInt16,
            "Int32" => Self::Int32,
            "UInt32" => Self::UInt32,
            "Int64" => Self::Int64,
            "UInt64" => Self::UInt64,
            "Float32" => Self::Float32,
            "Float64" => Self::Float64,
            "String" => Self::String,
            "URI" => Self::Uri,
            "Opaque" => Self::Opaque,
            "Enum" => Self::Enum,
            _ => return None,
        };
        Some(t)
    }
}

/// The element kinds the aggregator distinguishes.
///
/// Anything else (attributes, maps, DAP4 extensions) is [NodeKind::Other]
/// and is carried through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Dataset,
    Group,
    Structure,
    Sequence,
    /// Dimension declaration.
    Dimension,
    /// Dimension reference inside a variable.
    Dim,
    Atomic(AtomicType),
    /// Enumeration type declaration.
    Enumeration,
    Chunks,
    ChunkDimensionSizes,
    Chunk,
    Other,
}

impl NodeKind {
    /// Classify an element by its tag, ignoring any namespace prefix.
    pub fn from_tag(tag: &str) -> Self {
        match local_name(tag) {
            "Dataset" => Self::Dataset,
            "Group" => Self::Group,
            "Structure" => Self::Structure,
            "Sequence" => Self::Sequence,
            "Dimension" => Self::Dimension,
            "Dim" => Self::Dim,
            "Enumeration" => Self::Enumeration,
            "chunks" => Self::Chunks,
            "chunkDimensionSizes" => Self::ChunkDimensionSizes,
            "chunk" => Self::Chunk,
            other => AtomicType::from_local_name(other).map_or(Self::Other, Self::Atomic),
        }
    }
}

/// Strip an XML namespace prefix.
pub fn local_name(qualified: &str) -> &str {
    qualified
        .rsplit_once(':')
        .map_or(qualified, |(_, local)| local)
}

#[derive(Debug, Clone)]
pub struct Node {
    tag: String,
    kind: NodeKind,
    attributes: Vec<(String, String)>,
    text: Option<String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    fn new(tag: impl Into<String>) -> Self {
        let tag = tag.into();
        Self {
            kind: NodeKind::from_tag(&tag),
            tag,
            attributes: Vec::new(),
            text: None,
            parent: None,
            children: Vec::new(),
        }
    }

    /// Qualified tag, including any namespace prefix.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Attributes in document order, with their qualified keys.
    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

#[derive(Debug, Clone)]
pub struct DocumentTree {
    nodes: Vec<Node>,
    root: NodeId,
}

impl DocumentTree {
    /// Create a tree holding only a root element.
    pub fn new(root_tag: impl Into<String>) -> Self {
        Self {
            nodes: vec![Node::new(root_tag)],
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.node(id).kind
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    /// The `name` attribute, if present.
    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.attr(id, "name")
    }

    /// Look up an attribute by local name, so `dmrpp:href` and `href` both match `"href"`.
    pub fn attr(&self, id: NodeId, local: &str) -> Option<&str> {
        self.node(id)
            .attributes
            .iter()
            .find(|(k, _)| local_name(k) == local && !k.starts_with("xmlns"))
            .map(|(_, v)| v.as_str())
    }

    /// Set an attribute, replacing the value of one with the same local name.
    pub fn set_attr(&mut self, id: NodeId, key: &str, value: impl Into<String>) {
        let value = value.into();
        let local = local_name(key);
        let attributes = &mut self.node_mut(id).attributes;
        match attributes
            .iter_mut()
            .find(|(k, _)| local_name(k) == local && !k.starts_with("xmlns"))
        {
            Some((_, v)) => *v = value,
            None => attributes.push((key.to_string(), value)),
        }
    }

    pub fn push_attr(&mut self, id: NodeId, key: impl Into<String>, value: impl Into<String>) {
        self.node_mut(id)
            .attributes
            .push((key.into(), value.into()));
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.node(id).text.as_deref()
    }

    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) {
        self.node_mut(id).text = Some(text.into());
    }

    pub(crate) fn append_text(&mut self, id: NodeId, text: &str) {
        self.node_mut(id)
            .text
            .get_or_insert_with(String::new)
            .push_str(text);
    }

    pub fn child_of_kind(&self, id: NodeId, kind: NodeKind) -> Option<NodeId> {
        self.children_of_kind(id, kind).next()
    }

    pub fn children_of_kind(
        &self,
        id: NodeId,
        kind: NodeKind,
    ) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(move |&c| self.kind(c) == kind)
    }

    /// Allocate a detached element.
    pub fn create_element(&mut self, tag: impl Into<String>) -> NodeId {
        self.nodes.push(Node::new(tag));
        NodeId(self.nodes.len() - 1)
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        let index = self.children(parent).len();
        self.insert_child(parent, index, child);
    }

    /// Insert `child` at `index` among `parent`'s children, detaching it first.
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        self.detach(child);
        let children = &mut self.node_mut(parent).children;
        let index = index.min(children.len());
        children.insert(index, child);
        self.node_mut(child).parent = Some(parent);
    }

    /// Remove a node (and its subtree) from its parent.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.node_mut(id).parent.take() {
            self.node_mut(parent).children.retain(|&c| c != id);
        }
    }

    /// Deep-copy a subtree of another tree into this one, returning the detached copy.
    pub fn import_subtree(&mut self, source: &DocumentTree, id: NodeId) -> NodeId {
        let original = source.node(id);
        let copy = self.create_element(original.tag.clone());
        {
            let node = self.node_mut(copy);
            node.attributes = original.attributes.clone();
            node.text = original.text.clone();
        }
        for &child in original.children() {
            let child_copy = self.import_subtree(source, child);
            self.append_child(copy, child_copy);
        }
        copy
    }

    /// All nodes reachable from `id`, in document order, including `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).iter().rev());
        }
        out
    }
}
