use std::fmt;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("'{fqn}' references dimension '{reference}', which the template does not declare")]
    UnresolvedReference { fqn: String, reference: String },
    #[error("structural mismatch at '{fqn}': {mismatch}")]
    StructuralMismatch { fqn: String, mismatch: Mismatch },
    #[error("missing metadata for '{fqn}': {detail}")]
    MissingMetadata { fqn: String, detail: String },
    #[error("invalid value {value:?} for attribute '{attribute}' of '{fqn}'")]
    InvalidAttribute {
        fqn: String,
        attribute: String,
        value: String,
    },
    #[error("aggregation cancelled after {merged} shard(s)")]
    Cancelled { merged: usize },
    #[error("xml error: {0}")]
    Xml(String),
    #[error("{0}")]
    General(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
    #[error(transparent)]
    Wrapped(Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    pub fn general(message: impl Into<String>) -> Self {
        Self::General(message.into())
    }

    pub fn wrap(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Wrapped(Box::new(error))
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn missing(fqn: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::MissingMetadata {
            fqn: fqn.into(),
            detail: detail.into(),
        }
    }

    pub fn mismatch(fqn: impl Into<String>, mismatch: Mismatch) -> Self {
        Self::StructuralMismatch {
            fqn: fqn.into(),
            mismatch,
        }
    }

    pub fn invalid_attribute(
        fqn: impl Into<String>,
        attribute: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::InvalidAttribute {
            fqn: fqn.into(),
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    pub(crate) fn xml(error: impl fmt::Display) -> Self {
        Self::Xml(error.to_string())
    }
}

/// What disagreed between the template and a shard (or within one variable).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mismatch {
    /// Declared dimension sizes differ.
    DimensionSize { template: u64, shard: u64 },
    /// Number of dimension references differs.
    Rank { template: usize, shard: usize },
    /// Chunk dimension sizes differ.
    ChunkShape { template: Vec<u64>, shard: Vec<u64> },
    /// A variable's declared chunk shape does not have one entry per dimension.
    ChunkShapeRank { rank: usize, chunk_shape: Vec<u64> },
    /// A chunk position does not have one coordinate per dimension.
    ChunkPosition { rank: usize, position: Vec<u64> },
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mismatch::DimensionSize { template, shard } => write!(
                f,
                "shard dimension size ({shard}) does not match template dimension size ({template})"
            ),
            Mismatch::Rank { template, shard } => write!(
                f,
                "shard variable has {shard} dimension(s), template variable has {template}"
            ),
            Mismatch::ChunkShape { template, shard } => write!(
                f,
                "template chunk dimension sizes ({}) are not compatible with shard chunk dimension sizes ({})",
                join(template),
                join(shard)
            ),
            Mismatch::ChunkShapeRank { rank, chunk_shape } => write!(
                f,
                "chunk dimension sizes ({}) do not match variable rank {rank}",
                join(chunk_shape)
            ),
            Mismatch::ChunkPosition { rank, position } => write!(
                f,
                "chunk position [{}] does not match variable rank {rank}",
                position
                    .iter()
                    .map(u64::to_string)
                    .collect::<Vec<_>>()
                    .join(",")
            ),
        }
    }
}

fn join(values: &[u64]) -> String {
    values
        .iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}
