use std::fs;

use depcheck::commands::{
    import_package_command, init_catalog_command, load_config, load_metadata_files, open_catalog,
    run_check, CheckOptions,
};
use depcheck::{canonicalize_or_current, load_package_metadata, metadata_fingerprint, sha256_file};
use depcheck_core::model::Architecture;
use tempfile::tempdir;

#[test]
fn canonicalize_or_current_resolves_existing_relative_path() {
    let original = std::env::current_dir().expect("cwd");
    let tmp = tempdir().expect("tempdir");
    let subdir = tmp.path().join("nested");
    fs::create_dir_all(&subdir).expect("create nested");
    std::env::set_current_dir(tmp.path()).expect("chdir tmp");

    let result = canonicalize_or_current("nested").expect("canonicalize nested");
    let missing = canonicalize_or_current("not-yet.db").expect("canonicalize missing");
    std::env::set_current_dir(original).expect("restore cwd");

    assert_eq!(result, subdir.canonicalize().expect("canonicalize subdir"));
    assert!(missing.is_absolute());
    assert!(missing.ends_with("not-yet.db"));
}

#[test]
fn sha256_file_matches_known_digest() {
    let tmp = tempdir().expect("tempdir");
    let path = tmp.path().join("abc.txt");
    fs::write(&path, "abc").expect("write");

    assert_eq!(
        sha256_file(&path).expect("hash"),
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
    let err = sha256_file(&tmp.path().join("absent")).unwrap_err();
    assert!(err.to_string().contains("Failed to open file for hashing"));
}

#[test]
fn fingerprint_ignores_argument_order() {
    let tmp = tempdir().expect("tempdir");
    let a = tmp.path().join("a.json");
    let b = tmp.path().join("b.json");
    fs::write(&a, "one").expect("write a");
    fs::write(&b, "two").expect("write b");

    let forward = metadata_fingerprint(&[a.clone(), b.clone()]).expect("fingerprint");
    let backward = metadata_fingerprint(&[b.clone(), a.clone()]).expect("fingerprint");
    assert_eq!(forward, backward);

    fs::write(&b, "three").expect("rewrite b");
    assert_ne!(forward, metadata_fingerprint(&[a, b]).expect("fingerprint"));
}

#[test]
fn metadata_loads_from_json_and_yaml() {
    let tmp = tempdir().expect("tempdir");
    let json = tmp.path().join("foo.json");
    let yaml = tmp.path().join("foo.yml");
    fs::write(&json, r#"{"pkgname": "CSWfoo", "arch": "i386", "depends": ["CSWbar"]}"#)
        .expect("write json");
    fs::write(&yaml, "pkgname: CSWfoo\narch: i386\ndepends: [CSWbar]\n").expect("write yaml");

    let from_json = load_package_metadata(&json).expect("json");
    let from_yaml = load_package_metadata(&yaml).expect("yaml");
    assert_eq!(from_json, from_yaml);
    assert_eq!(from_json.arch, Architecture::I386);
    assert!(from_json.files.is_empty());
}

#[test]
fn malformed_metadata_names_the_file() {
    let tmp = tempdir().expect("tempdir");
    let path = tmp.path().join("broken.json");
    fs::write(&path, "{not json").expect("write");

    let err = load_package_metadata(&path).unwrap_err();
    assert!(err.to_string().contains("Failed to parse package metadata JSON"), "unexpected: {err}");
    assert!(err.to_string().contains("broken.json"));
}

#[test]
fn load_metadata_files_requires_at_least_one() {
    let err = load_metadata_files(&[]).unwrap_err();
    assert!(err.to_string().contains("At least one package metadata file"));
}

#[test]
fn load_config_falls_back_to_defaults() {
    let config = load_config(None).expect("defaults");
    assert_eq!(config.name, "checkpkg");

    let err = load_config(Some("/nonexistent/checks.yaml")).unwrap_err();
    assert!(err.to_string().contains("Failed to load check config"));
}

#[test]
fn open_catalog_errors_when_missing() {
    let tmp = tempdir().expect("tempdir");
    let db = tmp.path().join("absent.db").to_string_lossy().to_string();
    let err = open_catalog(&db).err().expect("missing catalog is an error");
    assert!(err.to_string().contains("Catalog database does not exist"));
}

#[test]
fn run_check_applies_jobs_and_returns_the_outcome() {
    let tmp = tempdir().expect("tempdir");
    let db = tmp.path().join("catalog.db").to_string_lossy().to_string();
    init_catalog_command(&db).expect("init catalog");

    let lib = tmp.path().join("lib.json");
    fs::write(
        &lib,
        r#"{"pkgname": "CSWlibz", "arch": "sparc", "files": ["/opt/csw/lib/libz.so.1"]}"#,
    )
    .expect("write lib");
    import_package_command(&db, None, &[lib.to_string_lossy().to_string()]).expect("import");

    let mut metadata = Vec::new();
    for name in ["CSWa", "CSWb", "CSWc"] {
        let path = tmp.path().join(format!("{name}.yaml"));
        fs::write(
            &path,
            format!(
                "pkgname: {name}\narch: sparc\nbinaries:\n  - path: opt/csw/bin/{name}\n    \
                 runpath: [/opt/csw/lib]\n    needed_sonames: [libz.so.1]\n"
            ),
        )
        .expect("write metadata");
        metadata.push(path.to_string_lossy().to_string());
    }

    let opts = CheckOptions { db, jobs: Some(3), metadata, ..CheckOptions::default() };
    let outcome = run_check(&opts).expect("run check");

    assert_eq!(outcome.reported.len(), 3);
    assert!(outcome.gar_lines.iter().any(|l| l == "RUNTIME_DEP_PKGS_CSWb += CSWlibz"));
}
