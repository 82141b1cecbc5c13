use std::io::Write;
use std::path::PathBuf;
use wfc_catalog::loader::{load_descriptor, load_from_file};
use wfc_catalog::{CatalogError, Direction, LoadError, BASE_GROUP, EMPTY_HASH, SOLID_HASH};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn test_data_path(filename: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("rules_data");
    path.push(filename);
    path
}

#[test]
fn test_load_valid_simple() {
    init_logger();
    let catalog = load_from_file(&test_data_path("valid_simple.ron")).unwrap();

    // Built-ins, slab, four step rotations and the crate.
    assert_eq!(catalog.len(), 8);
    assert_eq!(catalog.layer_count(), 2);
    assert_eq!(catalog.hash_of(0), EMPTY_HASH);
    assert_eq!(catalog.hash_of(1), SOLID_HASH);

    let props = catalog.group_index("Props").unwrap();
    assert_eq!(catalog.group_range(BASE_GROUP).len(), 5);
    assert_eq!(catalog.group_range(props).len(), 1);

    let crate_index = catalog.group_range(props).start;
    let crate_block = catalog.block(crate_index);
    assert_eq!(crate_block.name, "crate");
    assert_eq!(crate_block.layer, 1);
    assert_eq!(crate_block.weight_group, catalog.weight_group_index("Rare").unwrap());
    let resources = catalog.get_block_resources_by_hash(crate_block.hash).unwrap();
    assert_eq!(resources.template.as_deref(), Some("crate.prefab"));
}

#[test]
fn test_load_valid_json_matches_ron_hashes() {
    let json = load_from_file(&test_data_path("valid_simple.json")).unwrap();
    let ron = load_from_file(&test_data_path("valid_simple.ron")).unwrap();
    let slab_json = json.blocks().iter().find(|b| b.name == "slab").unwrap();
    let slab_ron = ron.blocks().iter().find(|b| b.name == "slab").unwrap();
    // The RON slab carries a material, which is part of its identity.
    assert_ne!(slab_json.hash, slab_ron.hash);
    assert_eq!(slab_json.connections, slab_ron.connections);
    assert_eq!(slab_json.weight, 2.0);
}

#[test]
fn test_load_big_block() {
    let catalog = load_from_file(&test_data_path("valid_big_block.ron")).unwrap();
    assert_eq!(catalog.len(), 6);

    let tower: Vec<_> = catalog
        .blocks()
        .iter()
        .filter(|b| b.big_block.as_deref() == Some("tower"))
        .collect();
    assert_eq!(tower.len(), 3);
    for pair in tower.windows(2) {
        assert!(pair[0].connects_to(pair[1], Direction::Up));
    }
    assert!(!tower[0].connects_to(tower[2], Direction::Up));
    assert!(tower.iter().all(|b| b.weight == 0.25));
}

#[test]
fn test_load_invalid_dup_layer() {
    let err = load_from_file(&test_data_path("invalid_dup_layer.ron")).unwrap_err();
    assert!(matches!(err, LoadError::Catalog(CatalogError::DuplicateLayer(0))));
}

#[test]
fn test_load_invalid_missing_mesh() {
    match load_from_file(&test_data_path("invalid_missing_mesh.ron")).unwrap_err() {
        LoadError::Catalog(CatalogError::MissingMesh(name)) => assert_eq!(name, "ghost"),
        other => panic!("Expected MissingMesh, got {other:?}"),
    }
}

#[test]
fn test_load_invalid_neg_weight() {
    let err = load_from_file(&test_data_path("invalid_neg_weight.ron")).unwrap_err();
    assert!(matches!(err, LoadError::Catalog(CatalogError::InvalidWeight(..))));
    assert!(err.to_string().contains("slab"));
}

#[test]
fn test_load_malformed() {
    let err = load_descriptor(&test_data_path("malformed.ron")).unwrap_err();
    assert!(matches!(err, LoadError::ParseError { .. }));
}

#[test]
fn test_load_missing_file() {
    let err = load_from_file(&test_data_path("does_not_exist.ron")).unwrap_err();
    assert!(matches!(err, LoadError::Io(_)));
}

#[test]
fn test_load_unsupported_extension() {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    writeln!(file, "layers: []").unwrap();
    let err = load_from_file(file.path()).unwrap_err();
    match err {
        LoadError::UnsupportedFormat(ext) => assert_eq!(ext, "yaml"),
        other => panic!("Expected UnsupportedFormat, got {other:?}"),
    }
}

#[test]
fn test_load_empty_repository_from_temp_file() {
    let mut file = tempfile::Builder::new().suffix(".RON").tempfile().unwrap();
    writeln!(file, "()").unwrap();
    let catalog = load_from_file(file.path()).unwrap();
    assert_eq!(catalog.len(), 2);
    assert_eq!(catalog.layer_count(), 0);
}
