#[test]
fn version_matches_cargo_pkg_version() {
    assert_eq!(cartogram::VERSION, env!("CARGO_PKG_VERSION"));
    assert!(!cartogram::VERSION.is_empty());
}
