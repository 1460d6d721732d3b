use cartogram::geom::{Coordinate, coord};
use cartogram::{Feature, Layer};

fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Vec<Coordinate> {
    vec![coord(x0, y0), coord(x1, y0), coord(x1, y1), coord(x0, y1)]
}

/// Areas 4, 4 and 2.
fn layer(values: [f64; 3]) -> Layer {
    Layer::new(
        "regions",
        vec![
            Feature::from_rings("a", vec![rect(0.0, 0.0, 2.0, 2.0)], values[0]).unwrap(),
            Feature::from_rings("b", vec![rect(2.0, 0.0, 4.0, 2.0)], values[1]).unwrap(),
            Feature::from_rings("c", vec![rect(4.0, 0.0, 5.0, 2.0)], values[2]).unwrap(),
        ],
    )
}

#[test]
fn missing_absolute_values_get_the_mean_density_times_area() {
    let mut layer = layer([8.0, 24.0, -99.0]);
    assert_eq!(layer.replace_missing_values(-99.0, false), 1);
    assert_eq!(layer.features[2].value, 8.0);
    assert_eq!(layer.features[0].value, 8.0);
}

#[test]
fn missing_densities_get_the_mean_density() {
    let mut layer = layer([2.0, 6.0, -99.0]);
    assert_eq!(layer.replace_missing_values(-99.0, true), 1);
    assert_eq!(layer.features[2].value, 4.0);
}

#[test]
fn without_sentinels_nothing_changes() {
    let mut layer = layer([1.0, 2.0, 3.0]);
    assert_eq!(layer.replace_missing_values(-99.0, false), 0);
    assert_eq!(layer.features[2].value, 3.0);
}

#[test]
fn non_finite_values_are_cleaned_to_zero() {
    let mut layer = layer([f64::NAN, f64::INFINITY, 3.0]);
    assert!(layer.value_summary().is_some_and(|s| s.count == 1));
    assert_eq!(layer.clean_values(), 2);
    assert_eq!(layer.features[0].value, 0.0);
    assert_eq!(layer.features[1].value, 0.0);

    let summary = layer.value_summary().unwrap();
    assert_eq!(summary.count, 3);
    assert_eq!(summary.min, 0.0);
    assert_eq!(summary.max, 3.0);
    assert_eq!(summary.sum, 3.0);
    assert_eq!(summary.mean, 1.0);
}

#[test]
fn densities_follow_values_and_areas() {
    let mut layer = layer([8.0, -4.0, 6.0]);
    layer.compute_densities(false);
    assert_eq!(layer.features[0].density, 2.0);
    assert_eq!(layer.features[1].density, 0.0);
    assert_eq!(layer.features[2].density, 3.0);
    assert_eq!(layer.total_area(), 10.0);
    assert!((layer.mean_density() - 1.4).abs() < 1e-12);

    layer.compute_densities(true);
    assert_eq!(layer.features[0].density, 8.0);
    assert_eq!(layer.features[1].density, 0.0);
}

#[test]
fn envelope_spans_every_feature() {
    let layer = layer([1.0, 1.0, 1.0]);
    let env = layer.envelope();
    assert_eq!((env.min_x(), env.max_x()), (0.0, 5.0));
    assert_eq!((env.min_y(), env.max_y()), (0.0, 2.0));
    assert!(Layer::default().envelope().is_null());
}

#[test]
fn regularization_splits_long_edges() {
    let layer = layer([1.0, 1.0, 1.0]);
    let fine = layer.regularized(0.6).unwrap();
    let original = layer.features[0].geometry.coordinate_count();
    let split = fine.features[0].geometry.coordinate_count();
    assert_eq!(original, 4);
    assert_eq!(split, 16);
    assert!((fine.features[0].area() - 4.0).abs() < 1e-12);
    assert_eq!(fine.features[0].value, 1.0);
}

#[test]
fn holes_come_from_nested_rings() {
    let feature = Feature::from_rings(
        "donut",
        vec![rect(0.0, 0.0, 4.0, 4.0), rect(1.0, 1.0, 2.0, 2.0)],
        1.0,
    )
    .unwrap();
    assert_eq!(feature.geometry.polygons().len(), 1);
    assert_eq!(feature.geometry.polygons()[0].holes().len(), 1);
    assert_eq!(feature.area(), 15.0);
}
