#![allow(dead_code)]

use std::path::{Path, PathBuf};

use dmrpp_agg::storage::ShardLocation;
use dmrpp_agg::{DocumentTree, NodeId, NodeKind, Shard};

pub const SHARD_NAMES: [&str; 3] = ["a", "b", "c"];

pub fn data_dir() -> PathBuf {
    env_logger::try_init().ok();
    Path::new(env!("CARGO_MANIFEST_DIR")).join("data")
}

pub fn shard_path(name: &str) -> PathBuf {
    data_dir().join("shards").join(format!("{name}.dmrpp"))
}

/// Load one of the sample shards from `data/shards`.
pub fn load(name: &str) -> Shard {
    ShardLocation::Local(shard_path(name))
        .load()
        .expect("sample shard should load")
}

pub fn samples() -> Vec<Shard> {
    SHARD_NAMES.iter().map(|name| load(name)).collect()
}

pub fn sample_href(name: &str) -> String {
    format!("https://data.example.org/{name}.h5")
}

/// Wrap `body` in a DMR++ dataset element.
pub fn document(href: Option<&str>, body: &str) -> String {
    let href = href
        .map(|h| format!(r#" dmrpp:href="{h}""#))
        .unwrap_or_default();
    format!(
        r#"<?xml version="1.0" encoding="ISO-8859-1"?>
<Dataset xmlns="http://xml.opendap.org/ns/DAP/4.0#" xmlns:dmrpp="http://xml.opendap.org/dap/dmrpp/1.0.0#" name="test.h5"{href}>
{body}
</Dataset>"#
    )
}

pub fn shard(href: Option<&str>, body: &str) -> Shard {
    env_logger::try_init().ok();
    Shard::new(dmrpp_agg::xml::parse(&document(href, body)).expect("test document should parse"))
}

/// A shard declaring `/time` (size `time`) and `/lat` (size `lat`), and a variable
/// `/temp(/time, /lat)` with the given chunk shape and one chunk per entry of `positions`.
pub fn temp_shard(href: &str, time: u64, lat: u64, chunk_shape: &str, positions: &[&str]) -> Shard {
    let chunks: String = positions
        .iter()
        .enumerate()
        .map(|(i, p)| {
            format!(
                r#"<dmrpp:chunk offset="{}" nBytes="16" chunkPositionInArray="{p}"/>"#,
                1000 + 16 * i
            )
        })
        .collect();
    shard(
        Some(href),
        &format!(
            r#"<Dimension name="time" size="{time}"/>
<Dimension name="lat" size="{lat}"/>
<Float32 name="temp">
  <Dim name="/time"/>
  <Dim name="/lat"/>
  <dmrpp:chunks>
    <dmrpp:chunkDimensionSizes>{chunk_shape}</dmrpp:chunkDimensionSizes>
    {chunks}
  </dmrpp:chunks>
</Float32>"#
        ),
    )
}

fn find(tree: &DocumentTree, fqn: &str, matches: impl Fn(NodeKind) -> bool) -> Option<NodeId> {
    tree.descendants(tree.root())
        .into_iter()
        .find(|&id| matches(tree.kind(id)) && dmrpp_agg::fqn::fqn(tree, id) == fqn)
}

pub fn variable(tree: &DocumentTree, fqn: &str) -> NodeId {
    find(tree, fqn, |k| matches!(k, NodeKind::Atomic(_)))
        .unwrap_or_else(|| panic!("no variable {fqn}"))
}

pub fn try_variable(tree: &DocumentTree, fqn: &str) -> Option<NodeId> {
    find(tree, fqn, |k| matches!(k, NodeKind::Atomic(_)))
}

pub fn dimension(tree: &DocumentTree, fqn: &str) -> NodeId {
    find(tree, fqn, |k| k == NodeKind::Dimension).unwrap_or_else(|| panic!("no dimension {fqn}"))
}

pub fn dimension_count(tree: &DocumentTree, fqn: &str) -> usize {
    tree.descendants(tree.root())
        .into_iter()
        .filter(|&id| tree.kind(id) == NodeKind::Dimension && dmrpp_agg::fqn::fqn(tree, id) == fqn)
        .count()
}

pub fn dim_names(tree: &DocumentTree, var: NodeId) -> Vec<String> {
    tree.children_of_kind(var, NodeKind::Dim)
        .map(|d| tree.name(d).unwrap_or_default().to_string())
        .collect()
}

fn chunk_nodes(tree: &DocumentTree, var: NodeId) -> Vec<NodeId> {
    let chunks = tree
        .child_of_kind(var, NodeKind::Chunks)
        .expect("variable should have chunks");
    tree.children_of_kind(chunks, NodeKind::Chunk).collect()
}

pub fn chunk_shape(tree: &DocumentTree, var: NodeId) -> Option<String> {
    let chunks = tree.child_of_kind(var, NodeKind::Chunks)?;
    let sizes = tree.child_of_kind(chunks, NodeKind::ChunkDimensionSizes)?;
    tree.text(sizes).map(str::to_string)
}

pub fn positions(tree: &DocumentTree, var: NodeId) -> Vec<String> {
    chunk_nodes(tree, var)
        .into_iter()
        .map(|c| tree.attr(c, "chunkPositionInArray").unwrap_or_default().to_string())
        .collect()
}

pub fn hrefs(tree: &DocumentTree, var: NodeId) -> Vec<String> {
    chunk_nodes(tree, var)
        .into_iter()
        .map(|c| tree.attr(c, "href").unwrap_or_default().to_string())
        .collect()
}

pub fn offsets(tree: &DocumentTree, var: NodeId) -> Vec<String> {
    chunk_nodes(tree, var)
        .into_iter()
        .map(|c| tree.attr(c, "offset").unwrap_or_default().to_string())
        .collect()
}

pub fn trusted(tree: &DocumentTree, var: NodeId) -> Vec<bool> {
    chunk_nodes(tree, var)
        .into_iter()
        .map(|c| tree.attr(c, "trust") == Some("true"))
        .collect()
}
