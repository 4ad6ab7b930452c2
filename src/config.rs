use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::fqn::normalize;

/// How shards are stacked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JoinMode {
    /// Add a new outermost dimension with one index per shard.
    #[default]
    JoinNew,
    /// Extend a dimension the shards already declare.
    JoinExisting,
}

/// Configuration of one aggregation run.
///
/// Deserializes from JSON such as
/// `{"mode": "joinNew", "dimensionName": "time_agg", "variables": ["/temp"], "trustUrls": true}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationSpec {
    #[serde(default)]
    pub mode: JoinMode,
    /// JoinNew: name of the new dimension. JoinExisting: the dimension (and its coordinate variable) to extend.
    #[serde(default)]
    pub dimension_name: String,
    /// Only these aggregation variables are kept, if given.
    #[serde(default, rename = "variables", skip_serializing_if = "Option::is_none")]
    pub variable_allow_list: Option<BTreeSet<String>>,
    /// Mark every aggregated chunk URL as trusted.
    #[serde(default)]
    pub trust_urls: bool,
}

impl AggregationSpec {
    pub fn join_new(dimension_name: impl Into<String>) -> Self {
        Self {
            mode: JoinMode::JoinNew,
            dimension_name: dimension_name.into(),
            ..Default::default()
        }
    }

    pub fn join_existing(dimension_name: impl Into<String>) -> Self {
        Self {
            mode: JoinMode::JoinExisting,
            dimension_name: dimension_name.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_allow_list<I, S>(mut self, variables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.variable_allow_list = Some(variables.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn with_trust_urls(mut self, trust_urls: bool) -> Self {
        self.trust_urls = trust_urls;
        self
    }

    /// FQN of the new (JoinNew) or extended (JoinExisting) dimension.
    pub fn dimension_fqn(&self) -> String {
        normalize(&self.dimension_name)
    }

    /// The allow-list, unless it is absent or empty.
    pub fn allow_list(&self) -> Option<&BTreeSet<String>> {
        self.variable_allow_list
            .as_ref()
            .filter(|list| !list.is_empty())
    }

    pub fn validate(&self) -> crate::Result<()> {
        let name = self.dimension_name.trim();
        if name.is_empty() || name == "/" {
            return Err(crate::Error::configuration(match self.mode {
                JoinMode::JoinNew => "joinNew aggregation requires a dimension name",
                JoinMode::JoinExisting => "joinExisting aggregation requires a target variable name",
            }));
        }
        if self.mode == JoinMode::JoinNew && name.trim_start_matches('/').contains('/') {
            return Err(crate::Error::configuration(format!(
                "the new dimension '{name}' must be declared at the dataset root"
            )));
        }
        Ok(())
    }
}
