use cartogram::geom::{Coordinate, coord, segment_intersection};
use cartogram::{
    CancelFlag, Cartogram, CartogramOptions, Error, Feature, Layer, NoProgress, PROGRESS_MAX,
    estimate_maximum_segment_length,
};

fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Vec<Coordinate> {
    vec![coord(x0, y0), coord(x1, y0), coord(x1, y1), coord(x0, y1)]
}

/// Two 10x10 squares side by side; the western one carries three times the value.
fn regions() -> Layer {
    Layer::new(
        "regions",
        vec![
            Feature::from_rings("west", vec![rect(0.0, 0.0, 10.0, 10.0)], 300.0).unwrap(),
            Feature::from_rings("east", vec![rect(10.0, 0.0, 20.0, 10.0)], 100.0).unwrap(),
        ],
    )
}

fn quick_options() -> CartogramOptions {
    CartogramOptions {
        amount_of_deformation: 0,
        grid_size: Some(16),
        diffusion_grid_size: Some(64),
        diffusion_iterations: Some(1),
        ..CartogramOptions::default()
    }
}

/// Options whose deadline has passed before the first pass starts.
fn expired_options() -> CartogramOptions {
    CartogramOptions {
        maximum_running_time_secs: Some(0),
        ..quick_options()
    }
}

#[test]
fn working_envelope_adds_a_margin() {
    let env = Cartogram::new(regions()).working_envelope();
    assert!((env.min_x() + 1.0).abs() < 1e-12);
    assert!((env.max_x() - 21.0).abs() < 1e-12);
    assert!((env.min_y() + 0.5).abs() < 1e-12);
    assert!((env.max_y() - 10.5).abs() < 1e-12);
}

#[test]
fn segment_length_estimate() {
    let env = cartogram::geom::Envelope::new(0.0, 100.0, 0.0, 100.0);
    assert!((estimate_maximum_segment_length(&env, 4) - 5.0).abs() < 1e-12);
    assert_eq!(estimate_maximum_segment_length(&env, 0), 500.0);
}

/// True when two non-parallel edges that share no vertex cross.
fn self_intersects(ring: &[Coordinate]) -> bool {
    let n = ring.len();
    let edge = |k: usize| (ring[k], ring[(k + 1) % n]);
    (0..n).any(|i| {
        (i + 2..n)
            .filter(|&j| !(i == 0 && j == n - 1))
            .any(|j| {
                let ((a, b), (c, d)) = (edge(i), edge(j));
                let (u, v) = (b - a, d - c);
                let sine = u.cross(v) / (u.length() * v.length());
                sine.abs() > 1e-6 && segment_intersection(a, b, c, d).is_some()
            })
    })
}

#[test]
fn single_feature_keeps_its_area_and_shape() {
    let square = Feature::from_rings("only", vec![rect(2.5, 2.5, 7.5, 7.5)], 100.0).unwrap();
    let options = CartogramOptions {
        amount_of_deformation: 0,
        grid_size: Some(8),
        diffusion_iterations: Some(1),
        ..CartogramOptions::default()
    };
    let result = Cartogram::new(Layer::new("square", vec![square]))
        .with_options(options)
        .compute(&mut NoProgress)
        .unwrap();
    assert_eq!(result.report.params.diffusion_grid_size, 128);

    let projected = result.master.projected().next().unwrap();
    assert!((projected.area() - 25.0).abs() < 25.0 * 0.05, "{}", projected.area());
    let polygons = projected.geometry.polygons();
    assert_eq!(polygons.len(), 1);
    assert!(polygons[0].holes().is_empty());
    assert!(!self_intersects(polygons[0].exterior()));

    // Uniform density: the grid does not move.
    let grid = &result.grid;
    let env = *grid.envelope();
    for i in 0..grid.size_x() {
        for j in 0..grid.size_y() {
            let expected = coord(
                env.min_x() + i as f64 * grid.cell_size_x(),
                env.min_y() + j as f64 * grid.cell_size_y(),
            );
            assert!((grid.node(i, j) - expected).length() < 1e-6);
        }
    }
}

#[test]
fn dense_feature_grows_at_the_expense_of_the_sparse_one() {
    let mut seen = Vec::new();
    let result = Cartogram::new(regions())
        .with_options(quick_options())
        .compute(&mut |p: u16, _: &str| seen.push(p))
        .unwrap();

    assert_eq!(result.master.failure_count(), 0);
    let areas: Vec<f64> = result.master.projected().map(Feature::area).collect();
    assert_eq!(areas.len(), 2);
    assert!(areas[0] / areas[1] > 1.3, "areas {areas:?}");
    let total: f64 = areas.iter().sum();
    assert!((total - 200.0).abs() < 20.0, "total area {total}");

    let report = &result.report;
    assert_eq!(report.passes.len(), 1);
    assert!(!report.finished_early);
    assert_eq!(report.params.diffusion_grid_size, 64);
    assert_eq!(report.params.grid_size_x, 16);
    assert_eq!(report.params.grid_size_y, 8);
    assert_eq!(report.unprojectable_features, 0);
    assert_eq!(report.size_error.map(|s| s.count), Some(2));
    assert!(result.grid_layer.is_none());

    assert!(seen.windows(2).all(|w| w[0] <= w[1]), "{seen:?}");
    assert_eq!(seen.last(), Some(&PROGRESS_MAX));
}

#[test]
fn every_share_moves_toward_its_value_share() {
    let values = [100.0, 200.0, 600.0, 100.0];
    let squares = [
        rect(0.0, 0.0, 10.0, 10.0),
        rect(10.0, 0.0, 20.0, 10.0),
        rect(0.0, 10.0, 10.0, 20.0),
        rect(10.0, 10.0, 20.0, 20.0),
    ];
    let features = squares
        .into_iter()
        .zip(values)
        .enumerate()
        .map(|(n, (ring, value))| Feature::from_rings(n.to_string(), vec![ring], value).unwrap())
        .collect();
    let result = Cartogram::new(Layer::new("quadrants", features))
        .with_options(quick_options())
        .compute(&mut NoProgress)
        .unwrap();

    assert_eq!(result.master.failure_count(), 0);
    let areas: Vec<f64> = result.master.projected().map(Feature::area).collect();
    let total_area: f64 = areas.iter().sum();
    let total_value: f64 = values.iter().sum();
    for (area, value) in areas.iter().zip(values) {
        let target = value / total_value;
        let before = (0.25 - target).abs();
        let after = (area / total_area - target).abs();
        assert!(after < before, "areas {areas:?}");
    }
    assert!(areas.iter().all(|&a| a <= areas[2]), "areas {areas:?}");
}

#[test]
fn expired_deadline_still_projects_every_layer() {
    let cities = Layer::new(
        "cities",
        vec![Feature::from_rings("c", vec![rect(2.0, 2.0, 3.0, 3.0)], f64::NAN).unwrap()],
    );
    let result = Cartogram::new(regions())
        .with_slaves(vec![cities])
        .with_options(expired_options())
        .compute(&mut NoProgress)
        .unwrap();

    assert!(result.report.finished_early);
    assert!(result.report.passes.is_empty());
    assert_eq!(result.report.slave_layers, vec!["cities".to_string()]);
    assert_eq!(result.slaves.len(), 1);

    let west = result.master.projected().next().unwrap();
    assert!((west.area() - 100.0).abs() < 1e-6);
    let city = result.slaves[0].projected().next().unwrap();
    assert!((city.area() - 1.0).abs() < 1e-6);
    assert!(city.value.is_nan());
}

#[test]
fn missing_values_are_replaced_and_reported() {
    let mut layer = regions();
    layer.features.push(
        Feature::from_rings("unknown", vec![rect(20.0, 0.0, 25.0, 10.0)], -1.0).unwrap(),
    );
    let options = CartogramOptions {
        missing_value: Some(-1.0),
        ..expired_options()
    };
    let result = Cartogram::new(layer)
        .with_options(options)
        .compute(&mut NoProgress)
        .unwrap();
    assert_eq!(result.report.replaced_values, 1);
    assert_eq!(result.report.cleaned_values, 0);
    // Mean density 2 over the other features, times 50 units of area.
    let unknown = result.master.projected().nth(2).unwrap();
    assert!((unknown.value - 100.0).abs() < 1e-9);
}

#[test]
fn reference_grid_is_projected_on_request() {
    let options = CartogramOptions {
        create_grid_layer: true,
        grid_layer_size: 4,
        ..expired_options()
    };
    let result = Cartogram::new(regions())
        .with_options(options)
        .compute(&mut NoProgress)
        .unwrap();
    let grid = result.grid_layer.unwrap();
    assert!((grid.resolution - 4.4).abs() < 1e-9);
    assert!(!grid.lines.is_empty());
    assert!(grid.lines.iter().all(|line| line.len() >= 2));
}

#[test]
fn constrained_layers_are_reported() {
    let lake = Layer::new(
        "lakes",
        vec![Feature::from_rings("lake", vec![rect(20.2, 10.1, 20.8, 10.4)], 0.0).unwrap()],
    );
    let result = Cartogram::new(regions())
        .with_constrained(vec![lake])
        .with_options(expired_options())
        .compute(&mut NoProgress)
        .unwrap();
    assert_eq!(result.report.constrained_layers, vec!["lakes".to_string()]);
}

#[test]
fn empty_master_layer_is_rejected() {
    let err = Cartogram::new(Layer::new("nothing", Vec::new()))
        .compute(&mut NoProgress)
        .unwrap_err();
    assert!(matches!(err, Error::EmptyLayer { layer } if layer == "nothing"));
}

#[test]
fn master_without_values_fails_before_diffusion() {
    let zeros = Layer::new(
        "zeros",
        vec![
            Feature::from_rings("west", vec![rect(0.0, 0.0, 10.0, 10.0)], 0.0).unwrap(),
            Feature::from_rings("east", vec![rect(10.0, 0.0, 20.0, 10.0)], 0.0).unwrap(),
        ],
    );
    let mut seen = Vec::new();
    let err = Cartogram::new(zeros)
        .with_options(quick_options())
        .compute(&mut |p: u16, _: &str| seen.push(p))
        .unwrap_err();
    assert!(matches!(err, Error::NoDensity { layer } if layer == "zeros"));
    assert!(seen.iter().all(|&p| p < 300), "{seen:?}");
}

#[test]
fn invalid_options_are_rejected() {
    let options = CartogramOptions {
        amount_of_deformation: 150,
        ..CartogramOptions::default()
    };
    assert!(matches!(
        Cartogram::new(regions()).with_options(options).compute(&mut NoProgress),
        Err(Error::InvalidOptions { .. })
    ));

    let options = CartogramOptions {
        diffusion_grid_size: Some(100),
        ..CartogramOptions::default()
    };
    assert!(matches!(
        Cartogram::new(regions()).with_options(options).compute(&mut NoProgress),
        Err(Error::InvalidOptions { .. })
    ));
}

#[test]
fn cancelled_run_returns_an_error() {
    let flag = CancelFlag::new();
    flag.cancel();
    let err = Cartogram::new(regions())
        .with_options(quick_options())
        .with_cancel_flag(flag)
        .compute(&mut NoProgress)
        .unwrap_err();
    assert!(matches!(err, Error::Cancelled));
}
