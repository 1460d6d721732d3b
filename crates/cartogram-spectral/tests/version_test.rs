#[test]
fn version_matches_cargo_pkg_version() {
    assert_eq!(cartogram_spectral::VERSION, env!("CARGO_PKG_VERSION"));
    assert!(!cartogram_spectral::VERSION.is_empty());
}
