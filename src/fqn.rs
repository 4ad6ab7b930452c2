//! Fully qualified names of dimensions and variables.

use crate::tree::{DocumentTree, NodeId, NodeKind};

/// The `/`-joined names of `id` and its enclosing containers, stopping at the dataset root.
///
/// The dataset root itself is `/`. Nodes without a `name` contribute an empty segment.
pub fn fqn(tree: &DocumentTree, id: NodeId) -> String {
    let mut segments = Vec::new();
    let mut current = Some(id);
    while let Some(node) = current {
        if tree.kind(node) == NodeKind::Dataset || tree.parent(node).is_none() {
            break;
        }
        segments.push(tree.name(node).unwrap_or_default());
        current = tree.parent(node);
    }
    if segments.is_empty() {
        return "/".to_string();
    }
    segments.iter().rev().fold(String::new(), |mut acc, s| {
        acc.push('/');
        acc.push_str(s);
        acc
    })
}

/// Append `name` to a container FQN.
pub fn join(parent: &str, name: &str) -> String {
    if parent.ends_with('/') {
        format!("{parent}{name}")
    } else {
        format!("{parent}/{name}")
    }
}

/// Turn a user-supplied name into a root-level FQN (`time` and `/time` both become `/time`).
pub fn normalize(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}
