//! Locating and loading shard documents, and the newline-delimited lists that name them.

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};

use log::{debug, warn};

use crate::fqn::normalize;
use crate::session::Shard;

#[cfg(feature = "remote")]
mod remote;

pub const FILE_PROTOCOL: &str = "file://";
pub const HTTP_PROTOCOL: &str = "http://";
pub const HTTPS_PROTOCOL: &str = "https://";

/// Where one shard document lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShardLocation {
    Local(PathBuf),
    Remote(String),
}

impl ShardLocation {
    /// Interpret a path, `file://` URL or `http(s)://` URL.
    ///
    /// Local paths may not contain `..`.
    pub fn parse(location: &str) -> crate::Result<Self> {
        let location = location.trim();
        if location.starts_with(HTTP_PROTOCOL) || location.starts_with(HTTPS_PROTOCOL) {
            return Ok(Self::Remote(location.to_string()));
        }
        let path = Path::new(location.strip_prefix(FILE_PROTOCOL).unwrap_or(location));
        if path.components().any(|c| c == Component::ParentDir) {
            return Err(crate::Error::configuration(format!(
                "upward traversal paths (containing \"..\") are not allowed: {location}"
            )));
        }
        Ok(Self::Local(path.to_path_buf()))
    }

    /// Read the document text.
    pub fn read(&self) -> crate::Result<String> {
        match self {
            Self::Local(path) => fs::read_to_string(path).map_err(|e| {
                crate::Error::Io(std::io::Error::new(
                    e.kind(),
                    format!("unable to read {}: {e}", path.display()),
                ))
            }),
            #[cfg(feature = "remote")]
            Self::Remote(url) => remote::fetch(url),
            #[cfg(not(feature = "remote"))]
            Self::Remote(url) => Err(crate::Error::configuration(format!(
                "remote shard locations require the `remote` feature: {url}"
            ))),
        }
    }

    /// Read and parse the document.
    pub fn load(&self) -> crate::Result<Shard> {
        debug!("loading shard {self}");
        let text = self.read()?;
        Ok(Shard::new(crate::xml::parse(&text)?))
    }
}

impl fmt::Display for ShardLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(path) => write!(f, "{}", path.display()),
            Self::Remote(url) => f.write_str(url),
        }
    }
}

/// Turn command-line arguments into an ordered list of shard locations.
///
/// Several arguments are taken as the shards themselves. A single argument may be a
/// directory (its regular files, sorted by name), a list file with one location per
/// line, or a single shard document.
pub fn resolve_locations<S: AsRef<str>>(args: &[S]) -> crate::Result<Vec<ShardLocation>> {
    match args {
        [] => Err(crate::Error::configuration(
            "no shard documents were specified, unable to aggregate",
        )),
        [single] => resolve_single(single.as_ref()),
        many => many
            .iter()
            .map(|s| ShardLocation::parse(s.as_ref()))
            .collect(),
    }
}

fn resolve_single(arg: &str) -> crate::Result<Vec<ShardLocation>> {
    let location = ShardLocation::parse(arg)?;
    let ShardLocation::Local(path) = &location else {
        return Ok(vec![location]);
    };
    if path.is_dir() {
        return list_directory(path);
    }
    if !path.is_file() {
        return Err(crate::Error::configuration(format!(
            "unable to locate file: {}",
            path.display()
        )));
    }
    let text = fs::read_to_string(path)?;
    if text.trim_start().starts_with('<') {
        return Ok(vec![location]);
    }
    parse_list(&text)
        .iter()
        .map(|entry| ShardLocation::parse(entry))
        .collect()
}

fn list_directory(dir: &Path) -> crate::Result<Vec<ShardLocation>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files.into_iter().map(ShardLocation::Local).collect())
}

/// Non-empty, trimmed lines in order, without repeats.
pub fn parse_list(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if seen.insert(line) {
            debug!("loading value: {line}");
            out.push(line.to_string());
        } else {
            warn!("ignoring repeated list entry '{line}'");
        }
    }
    out
}

/// Read a newline-delimited list file.
pub fn read_list_file(path: impl AsRef<Path>) -> crate::Result<Vec<String>> {
    Ok(parse_list(&fs::read_to_string(path)?))
}

/// Read the variables to keep, one FQN per line.
pub fn load_allow_list(path: impl AsRef<Path>) -> crate::Result<BTreeSet<String>> {
    Ok(read_list_file(path)?
        .iter()
        .map(|name| normalize(name))
        .collect())
}
