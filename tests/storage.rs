mod common;

use std::collections::BTreeSet;
use std::fs;

use pretty_assertions::assert_eq;

use common::*;
use dmrpp_agg::storage::{ShardLocation, load_allow_list, parse_list, resolve_locations};
use dmrpp_agg::{AggregationSpec, Aggregator, Error};

#[test]
fn parses_location_kinds() {
    assert_eq!(
        ShardLocation::parse("https://host/a.dmrpp").unwrap(),
        ShardLocation::Remote("https://host/a.dmrpp".to_string())
    );
    assert_eq!(
        ShardLocation::parse("file:///data/a.dmrpp").unwrap(),
        ShardLocation::Local("/data/a.dmrpp".into())
    );
    assert_eq!(
        ShardLocation::parse("  data/a.dmrpp ").unwrap(),
        ShardLocation::Local("data/a.dmrpp".into())
    );
}

#[test]
fn rejects_upward_traversal() {
    for location in ["../a.dmrpp", "data/../../etc/passwd", "file:///data/../a"] {
        let err = ShardLocation::parse(location).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)), "{location}: {err}");
    }
}

#[test]
fn no_arguments_is_a_configuration_error() {
    let err = resolve_locations::<&str>(&[]).unwrap_err();
    assert!(matches!(err, Error::Configuration(_)), "{err}");
}

#[test]
fn several_arguments_are_taken_in_order() {
    let locations = resolve_locations(&["b.dmrpp", "https://host/a.dmrpp"]).unwrap();
    assert_eq!(
        locations,
        [
            ShardLocation::Local("b.dmrpp".into()),
            ShardLocation::Remote("https://host/a.dmrpp".to_string()),
        ]
    );
}

#[test]
fn directory_is_listed_in_name_order() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["c.dmrpp", "a.dmrpp", "b.dmrpp"] {
        fs::write(dir.path().join(name), "<Dataset/>").unwrap();
    }
    fs::create_dir(dir.path().join("nested")).unwrap();

    let locations = resolve_locations(&[dir.path().to_str().unwrap()]).unwrap();
    assert_eq!(
        locations,
        ["a.dmrpp", "b.dmrpp", "c.dmrpp"]
            .map(|name| ShardLocation::Local(dir.path().join(name)))
    );
}

#[test]
fn list_file_keeps_order_and_drops_repeats() {
    let dir = tempfile::tempdir().unwrap();
    let list = dir.path().join("shards.txt");
    fs::write(
        &list,
        "https://host/2.dmrpp\n\n  /data/1.dmrpp \nhttps://host/2.dmrpp\n/data/3.dmrpp\n",
    )
    .unwrap();

    let locations = resolve_locations(&[list.to_str().unwrap()]).unwrap();
    assert_eq!(
        locations,
        [
            ShardLocation::Remote("https://host/2.dmrpp".to_string()),
            ShardLocation::Local("/data/1.dmrpp".into()),
            ShardLocation::Local("/data/3.dmrpp".into()),
        ]
    );
}

#[test]
fn single_document_argument_is_one_shard() {
    let path = shard_path("a");
    let locations = resolve_locations(&[path.to_str().unwrap()]).unwrap();
    assert_eq!(locations, [ShardLocation::Local(path)]);
}

#[test]
fn missing_single_argument_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nothing-here");
    let err = resolve_locations(&[missing.to_str().unwrap()]).unwrap_err();
    assert!(matches!(err, Error::Configuration(_)), "{err}");
}

#[test]
fn parse_list_trims_and_dedupes() {
    assert_eq!(parse_list(" a \n\nb\na\r\n c\n"), ["a", "b", "c"]);
    assert!(parse_list("\n \n").is_empty());
}

#[test]
fn allow_list_names_are_rooted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vars.txt");
    fs::write(&path, "/temp\nquality/flags\n\n/temp\n").unwrap();
    let expected: BTreeSet<String> = ["/quality/flags", "/temp"]
        .into_iter()
        .map(str::to_string)
        .collect();
    assert_eq!(load_allow_list(&path).unwrap(), expected);
}

#[test]
fn loads_shard_with_dataset_href() {
    let shard = load("b");
    assert_eq!(shard.data_url.as_deref(), Some(sample_href("b").as_str()));
    assert_eq!(shard.index, 0);
}

#[test]
fn unreadable_shard_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = ShardLocation::Local(dir.path().join("absent.dmrpp"))
        .load()
        .unwrap_err();
    assert!(matches!(err, Error::Io(_)), "{err}");
}

#[test]
fn non_dataset_document_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("group.dmrpp");
    fs::write(&path, r#"<Group name="g"/>"#).unwrap();
    assert!(ShardLocation::Local(path).load().is_err());
}

#[cfg(not(feature = "remote"))]
#[test]
fn remote_locations_need_the_remote_feature() {
    let err = ShardLocation::Remote("https://host/a.dmrpp".to_string())
        .load()
        .unwrap_err();
    assert!(matches!(err, Error::Configuration(_)), "{err}");
}

#[test]
fn directory_of_samples_aggregates_end_to_end() {
    let dir = data_dir().join("shards");
    let locations = resolve_locations(&[dir.to_str().unwrap()]).unwrap();
    assert_eq!(locations.len(), 3);

    let result = Aggregator::new(AggregationSpec::join_new("time_agg"))
        .try_aggregate(locations.iter().map(ShardLocation::load))
        .unwrap();
    let temp = variable(&result.tree, "/temp");
    assert_eq!(
        hrefs(&result.tree, temp),
        SHARD_NAMES.map(sample_href).to_vec()
    );
}
