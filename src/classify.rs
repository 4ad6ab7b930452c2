use log::debug;

use crate::config::{AggregationSpec, JoinMode};
use crate::metadata::{DimensionRegistry, VariableRegistry};

/// Variables split by role.
#[derive(Debug, Clone, Default)]
pub struct Classified {
    /// Variables holding the tick values of a dimension; never aggregated.
    pub coordinates: VariableRegistry,
    pub aggregation: VariableRegistry,
    /// JoinExisting only: FQN of the coordinate variable being extended.
    pub target: Option<String>,
}

/// Move every variable whose FQN equals a dimension's FQN into the coordinate set,
/// except the JoinExisting target, which stays in the aggregation set.
pub fn classify(
    dimensions: &DimensionRegistry,
    mut variables: VariableRegistry,
    spec: &AggregationSpec,
) -> crate::Result<Classified> {
    let target_fqn = match spec.mode {
        JoinMode::JoinExisting => Some(spec.dimension_fqn()),
        JoinMode::JoinNew => None,
    };

    let mut coordinates = VariableRegistry::default();
    let mut target = None;
    for dim in dimensions.iter() {
        if !variables.contains(&dim.fqn) {
            continue;
        }
        if target_fqn.as_deref() == Some(dim.fqn.as_str()) {
            target = Some(dim.fqn.clone());
        } else if let Some(var) = variables.remove(&dim.fqn) {
            debug!("coordinate variable: {}", var.fqn);
            coordinates.insert(var);
        }
    }

    if let Some(fqn) = &target_fqn
        && target.is_none()
    {
        return Err(crate::Error::configuration(format!(
            "joinExisting target '{fqn}' is not a chunked coordinate variable of a declared dimension"
        )));
    }

    Ok(Classified {
        coordinates,
        aggregation: variables,
        target,
    })
}
