use std::collections::BTreeMap;

use depcheck_core::config::ResolverConfig;
use depcheck_core::resolve::{SonameResolution, SonameResolver};

fn dirs(entries: &[(&str, &[&str])]) -> BTreeMap<String, Vec<String>> {
    entries
        .iter()
        .map(|(dir, pkgs)| (dir.to_string(), pkgs.iter().map(|p| p.to_string()).collect()))
        .collect()
}

fn runpath(entries: &[&str]) -> Vec<String> {
    entries.iter().map(|e| e.to_string()).collect()
}

#[test]
fn first_runpath_entry_wins() {
    let resolver = SonameResolver::default();
    let found = dirs(&[("/opt/csw/lib", &["CSWlibfoo"]), ("/opt/csw/lib/foo", &["CSWfoo-libs"])]);

    let res =
        resolver.resolve("libfoo.so.1", &runpath(&["/opt/csw/lib/foo", "/opt/csw/lib"]), &found);
    assert_eq!(
        res,
        SonameResolution::Found {
            search_dir: "/opt/csw/lib/foo".into(),
            catalog_dir: "/opt/csw/lib/foo".into(),
            pkgnames: vec!["CSWfoo-libs".into()],
        }
    );

    let res =
        resolver.resolve("libfoo.so.1", &runpath(&["/opt/csw/lib", "/opt/csw/lib/foo"]), &found);
    assert_eq!(res.catalog_path("libfoo.so.1").as_deref(), Some("/opt/csw/lib/libfoo.so.1"));
}

#[test]
fn isalist_token_expands_to_every_variant() {
    let resolver = SonameResolver::default();
    let found = dirs(&[("/opt/csw/lib/sparcv8plus+vis", &["CSWlibfoo"])]);

    let res = resolver.resolve("libfoo.so.1", &runpath(&["/opt/csw/lib/$ISALIST"]), &found);
    assert!(matches!(
        res,
        SonameResolution::Found { ref search_dir, .. } if search_dir == "/opt/csw/lib/sparcv8plus+vis"
    ));
}

#[test]
fn sixty_four_alias_reaches_the_isa_directory() {
    let resolver = SonameResolver::default();
    let found = dirs(&[("/opt/csw/lib/sparcv9", &["CSWlibfoo"])]);

    let res = resolver.resolve("libfoo.so.1", &runpath(&["/opt/csw/lib/64/"]), &found);
    match res {
        SonameResolution::Found { search_dir, catalog_dir, pkgnames } => {
            assert_eq!(search_dir, "/opt/csw/lib/sparcv9");
            assert_eq!(catalog_dir, "/opt/csw/lib/sparcv9");
            assert_eq!(pkgnames, vec!["CSWlibfoo"]);
        }
        other => panic!("expected Found, got {other:?}"),
    }
}

#[test]
fn literal_catalog_directory_beats_an_alias_of_another() {
    let resolver = SonameResolver::default();
    // /opt/csw/lib/64 also expands to /opt/csw/lib/amd64
    let found = dirs(&[
        ("/opt/csw/lib/64", &["CSWlibfoo"]),
        ("/opt/csw/lib/amd64", &["CSWlibfoo-amd64"]),
    ]);

    let res = resolver.resolve("libfoo.so.1", &runpath(&["/opt/csw/lib/amd64"]), &found);
    assert_eq!(
        res,
        SonameResolution::Found {
            search_dir: "/opt/csw/lib/amd64".into(),
            catalog_dir: "/opt/csw/lib/amd64".into(),
            pkgnames: vec!["CSWlibfoo-amd64".into()],
        }
    );
}

#[test]
fn catalog_directory_behind_symlink_is_reachable() {
    let resolver = SonameResolver::default();
    // installed under the i386 symlink, recorded under it by the catalog
    let found = dirs(&[("/opt/csw/lib/i386", &["CSWlibfoo"])]);

    let res = resolver.resolve("libfoo.so.1", &runpath(&["/opt/csw/lib"]), &found);
    assert_eq!(res.catalog_path("libfoo.so.1").as_deref(), Some("/opt/csw/lib/i386/libfoo.so.1"));
}

#[test]
fn default_runpath_has_lowest_priority() {
    let resolver = SonameResolver::default();
    let found = dirs(&[("/usr/lib", &["SUNWcsl"]), ("/opt/csw/lib", &["CSWlibc"])]);

    let res = resolver.resolve("libc.so.1", &runpath(&["/opt/csw/lib"]), &found);
    assert!(matches!(
        res,
        SonameResolution::Found { ref catalog_dir, .. } if catalog_dir == "/opt/csw/lib"
    ));

    let res = resolver.resolve("libc.so.1", &[], &found);
    assert!(matches!(
        res,
        SonameResolution::Found { ref catalog_dir, .. } if catalog_dir == "/usr/lib"
    ));
}

#[test]
fn unknown_soname_is_orphan_unless_allowed() {
    let resolver = SonameResolver::default();
    let empty = BTreeMap::new();

    assert_eq!(
        resolver.resolve("libnope.so.1", &runpath(&["/opt/csw/lib"]), &empty),
        SonameResolution::Orphan
    );
    assert_eq!(resolver.resolve("libm.so.2", &[], &empty), SonameResolution::AllowedOrphan);
}

#[test]
fn search_path_lists_expanded_directories_in_order() {
    let mut config = ResolverConfig::default();
    config.isalists_by_arch.clear();
    let resolver = SonameResolver::from_config(&config);

    let path = resolver.search_path(&runpath(&["/opt/csw//lib/"]));
    assert_eq!(path.first().map(String::as_str), Some("/opt/csw/lib"));
    assert!(path.contains(&"/usr/lib".to_string()));
    assert!(path.contains(&"/lib".to_string()));
}
