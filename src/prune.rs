use std::collections::BTreeSet;

use log::debug;

use crate::metadata::VariableRegistry;
use crate::tree::DocumentTree;

/// Drop every aggregation variable not named in `allow_list` from both the tree and the registry.
///
/// Coordinate variables and the JoinExisting `target` are never dropped. Returns the FQNs removed.
pub fn prune(
    tree: &mut DocumentTree,
    aggregation: &mut VariableRegistry,
    coordinates: &VariableRegistry,
    target: Option<&str>,
    allow_list: Option<&BTreeSet<String>>,
) -> Vec<String> {
    let Some(allow_list) = allow_list.filter(|list| !list.is_empty()) else {
        return Vec::new();
    };
    let dropped: Vec<String> = aggregation
        .fqns()
        .filter(|&fqn| {
            !allow_list.contains(fqn) && !coordinates.contains(fqn) && target != Some(fqn)
        })
        .map(str::to_string)
        .collect();
    for fqn in &dropped {
        if let Some(var) = aggregation.remove(fqn) {
            debug!("pruning variable: {fqn}");
            tree.detach(var.node());
        }
    }
    dropped
}
