use crate::config::AggregationSpec;
use crate::metadata::{DimRef, DimensionRegistry, VariableRegistry};
use crate::tree::{DocumentTree, NodeKind};

/// Write final dimension sizes, new dimension references and chunk shapes into the tree.
///
/// The aggregation dimension's size becomes `shard_count`, the template included.
/// Variables which gained an outermost axis get a `Dim` reference to it before their
/// existing ones.
pub fn emit(
    tree: &mut DocumentTree,
    dimensions: &mut DimensionRegistry,
    aggregation: &mut VariableRegistry,
    spec: &AggregationSpec,
    shard_count: usize,
) -> crate::Result<()> {
    let dimension_fqn = spec.dimension_fqn();
    dimensions.set_size(tree, &dimension_fqn, shard_count as u64)?;

    for var in aggregation.iter_mut() {
        let new_axis = var.pending_axis;
        if new_axis {
            let first_dim = tree.child_of_kind(var.node, NodeKind::Dim);
            let (tag, index) = match first_dim {
                Some(dim) => (
                    tree.node(dim).tag().to_string(),
                    tree.children(var.node)
                        .iter()
                        .position(|&c| c == dim)
                        .unwrap_or(0),
                ),
                None => ("Dim".to_string(), 0),
            };
            let dim = tree.create_element(tag);
            tree.push_attr(dim, "name", dimension_fqn.as_str());
            tree.insert_child(var.node, index, dim);
            var.dim_refs.insert(0, DimRef::Named(dimension_fqn.clone()));
            var.pending_axis = false;
        }
        if new_axis || var.inferred_shape {
            var.chunks.write_shape(tree, &var.chunk_shape);
        }
        debug_assert_eq!(var.chunk_shape.len(), var.rank());
    }
    Ok(())
}
