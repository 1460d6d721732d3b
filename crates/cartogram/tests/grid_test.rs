use cartogram::geom::{Coordinate, Envelope, coord};
use cartogram::{CartogramGrid, CellState, Error, Feature, Layer};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Vec<Coordinate> {
    vec![coord(x0, y0), coord(x1, y0), coord(x1, y1), coord(x0, y1)]
}

fn feature(id: &str, ring: Vec<Coordinate>, value: f64) -> Feature {
    Feature::from_rings(id, vec![ring], value).unwrap()
}

/// 5x5 nodes over `[0, 4]²`: unit cells.
fn unit_grid() -> CartogramGrid {
    CartogramGrid::new(5, 5, Envelope::new(0.0, 4.0, 0.0, 4.0)).unwrap()
}

/// Density 2 around the lower-left corner, density 6 around the upper-right one.
fn two_feature_layer() -> Layer {
    Layer::new(
        "master",
        vec![
            feature("low", rect(-0.5, -0.5, 1.5, 1.5), 8.0),
            feature("high", rect(2.5, 2.5, 4.5, 4.5), 24.0),
        ],
    )
}

#[test]
fn rejects_degenerate_grids() {
    let env = Envelope::new(0.0, 1.0, 0.0, 1.0);
    assert!(matches!(
        CartogramGrid::new(1, 5, env),
        Err(Error::InvalidGrid { size_x: 1, size_y: 5 })
    ));
    assert!(matches!(
        CartogramGrid::new(5, 5, Envelope::new(0.0, 1.0, 2.0, 2.0)),
        Err(Error::DegenerateEnvelope)
    ));
    assert!(matches!(
        CartogramGrid::new(5, 5, Envelope::null()),
        Err(Error::DegenerateEnvelope)
    ));
}

#[test]
fn nodes_start_on_a_regular_lattice() {
    let grid = unit_grid();
    assert_eq!(grid.cell_size_x(), 1.0);
    assert_eq!(grid.cell_size_y(), 1.0);
    assert_eq!(grid.node(0, 0), coord(0.0, 0.0));
    assert_eq!(grid.node(2, 3), coord(2.0, 3.0));
    assert_eq!(grid.node(4, 4), coord(4.0, 4.0));
    assert_eq!(grid.current_cell_area(1, 2), 1.0);
}

#[test]
fn cell_indices_use_upper_bounds_and_clamp() {
    let grid = unit_grid();
    assert_eq!(grid.cell_index_x(-3.0), 0);
    assert_eq!(grid.cell_index_x(0.0), 0);
    assert_eq!(grid.cell_index_x(1.0), 0);
    assert_eq!(grid.cell_index_x(1.5), 1);
    assert_eq!(grid.cell_index_x(4.0), 3);
    assert_eq!(grid.cell_index_y(10.0), 3);
    assert_eq!(
        grid.cell_envelope(1, 2),
        Envelope::new(1.0, 2.0, 2.0, 3.0)
    );
}

#[test]
fn original_density_fills_covered_and_partial_cells() {
    let mut grid = unit_grid();
    let mut layer = two_feature_layer();
    grid.compute_original_density(&mut layer, false).unwrap();

    assert_eq!(layer.features[0].density, 2.0);
    assert_eq!(layer.features[1].density, 6.0);
    assert_eq!(grid.mean_density(), 4.0);

    // Fully inside a feature.
    assert_eq!(grid.original_density(0, 0), 2.0);
    assert_eq!(grid.cell_state(0, 0), CellState::Free);
    assert_eq!(grid.original_density(3, 3), 6.0);
    // Partly covered: mean moved halfway toward the feature density.
    assert_eq!(grid.original_density(1, 1), 3.0);
    assert_eq!(grid.original_density(0, 1), 3.0);
    assert_eq!(grid.original_density(2, 2), 5.0);
    assert_eq!(grid.cell_state(2, 2), CellState::Free);
    // Untouched.
    assert_eq!(grid.original_density(0, 3), 4.0);
    assert_eq!(grid.cell_state(0, 3), CellState::Empty);

    assert_eq!(grid.current_density(1, 1), grid.original_density(1, 1));
    assert_eq!(grid.min_original_density(), 2.0);
    assert_eq!(grid.max_original_density(), 6.0);
}

#[test]
fn density_values_accept_densities_directly() {
    let mut grid = unit_grid();
    let mut layer = Layer::new(
        "master",
        vec![
            feature("low", rect(-0.5, -0.5, 1.5, 1.5), 2.0),
            feature("high", rect(2.5, 2.5, 4.5, 4.5), 6.0),
        ],
    );
    grid.compute_original_density(&mut layer, true).unwrap();
    assert_eq!(grid.original_density(0, 0), 2.0);
    assert_eq!(grid.original_density(3, 3), 6.0);
    assert_eq!(grid.mean_density(), 4.0);
}

#[test]
fn zero_area_layer_is_rejected() {
    let mut grid = unit_grid();
    let mut layer = Layer::new("empty", Vec::new());
    assert!(matches!(
        grid.compute_original_density(&mut layer, false),
        Err(Error::ZeroArea { .. })
    ));
}

#[test]
fn layer_without_positive_values_has_no_density() {
    let mut grid = unit_grid();
    let mut layer = Layer::new(
        "zeros",
        vec![
            feature("a", rect(0.0, 0.0, 2.0, 4.0), 0.0),
            feature("b", rect(2.0, 0.0, 4.0, 4.0), 0.0),
        ],
    );
    assert!(matches!(
        grid.compute_original_density(&mut layer, false),
        Err(Error::NoDensity { layer }) if layer == "zeros"
    ));
    let mut layer = Layer::new("negative", vec![feature("a", rect(0.0, 0.0, 4.0, 4.0), -3.0)]);
    assert!(matches!(
        grid.compute_original_density(&mut layer, true),
        Err(Error::NoDensity { .. })
    ));
}

#[test]
fn stretched_cells_dilute_their_density() {
    let mut grid = unit_grid();
    let mut layer = two_feature_layer();
    grid.compute_original_density(&mut layer, false).unwrap();
    for i in 0..5 {
        for j in 0..5 {
            let n = grid.node(i, j);
            grid.set_node(i, j, coord(n.x * 2.0, n.y * 2.0));
        }
    }
    grid.update_density_values();
    assert_eq!(grid.current_cell_area(0, 0), 4.0);
    assert_eq!(grid.current_density(0, 0), 0.5);
    assert_eq!(grid.current_density(3, 3), 1.5);
    assert_eq!(grid.original_density(3, 3), 6.0);

    grid.compute_node_coordinates();
    assert_eq!(grid.node(3, 1), coord(3.0, 1.0));
}

#[test]
fn scaling_maps_the_original_range() {
    let mut grid = unit_grid();
    let mut layer = two_feature_layer();
    grid.compute_original_density(&mut layer, false).unwrap();
    grid.scale_density_values(0.0, 1.0);
    assert_eq!(grid.original_density(0, 0), 0.0);
    assert_eq!(grid.original_density(3, 3), 1.0);
    assert_eq!(grid.original_density(0, 3), 0.5);
    assert_eq!(grid.mean_density(), 0.5);
}

#[test]
fn uniform_density_has_no_error() {
    let mut grid = unit_grid();
    let mut layer = Layer::new("all", vec![feature("all", rect(-1.0, -1.0, 5.0, 5.0), 36.0)]);
    grid.compute_original_density(&mut layer, false).unwrap();
    assert_eq!(grid.mean_density(), 1.0);
    assert_eq!(grid.mean_density_error(), 0.0);

    // Cells at 2 and 6 deviate by half the mean, the six partly covered ones by a quarter.
    let mut layer = two_feature_layer();
    grid.compute_original_density(&mut layer, false).unwrap();
    assert!((grid.mean_density_error() - 10.0 / 64.0).abs() < 1e-12);
}

#[test]
fn cells_iterate_row_by_row() {
    let grid = unit_grid();
    let cells: Vec<_> = grid.cells().collect();
    assert_eq!(cells.len(), 16);
    assert_eq!((cells[0].i, cells[0].j), (0, 0));
    assert_eq!((cells[1].i, cells[1].j), (1, 0));
    assert_eq!((cells[4].i, cells[4].j), (0, 1));
    assert_eq!(cells[5].polygon.area(), 1.0);
    assert_eq!(cells[5].state, CellState::Empty);
}

#[test]
fn constrained_features_mark_empty_cells_rigid() {
    let mut grid = unit_grid();
    let mut layer = two_feature_layer();
    grid.compute_original_density(&mut layer, false).unwrap();
    let lake = Layer::new("lakes", vec![feature("lake", rect(0.2, 3.2, 0.8, 3.8), 0.0)]);
    // A free cell is left alone.
    let pond = Layer::new("ponds", vec![feature("pond", rect(0.2, 0.2, 0.8, 0.8), 0.0)]);

    assert_eq!(grid.prepare_constrained_deformation(&[lake, pond]), 1);
    assert_eq!(grid.cell_state(0, 3), CellState::Rigid);
    assert_eq!(grid.cell_state(0, 0), CellState::Free);
}

#[test]
fn square_rigid_cell_stays_in_place() {
    let mut grid = CartogramGrid::new(4, 4, Envelope::new(0.0, 3.0, 0.0, 3.0)).unwrap();
    grid.set_cell_state(1, 1, CellState::Rigid);
    assert_eq!(grid.conform_to_constrained_deformation(), 4);
    assert_eq!(grid.node(1, 1), coord(1.0, 1.0));
    assert_eq!(grid.node(2, 2), coord(2.0, 2.0));
}

#[test]
fn free_neighbors_pin_shared_corners() {
    let mut grid = CartogramGrid::new(4, 4, Envelope::new(0.0, 3.0, 0.0, 3.0)).unwrap();
    grid.set_cell_state(1, 1, CellState::Rigid);
    grid.set_cell_state(0, 0, CellState::Free);
    assert_eq!(grid.apply_constrained_deformation_to_cell(1, 1), 3);
}

#[test]
fn rigid_corner_moves_a_bounded_step_toward_square() {
    let mut grid = CartogramGrid::new(4, 4, Envelope::new(0.0, 3.0, 0.0, 3.0)).unwrap();
    grid.set_cell_state(1, 1, CellState::Rigid);
    let before = coord(2.5, 2.5);
    grid.set_node(2, 2, before);

    grid.conform_to_constrained_deformation();
    let after = grid.node(2, 2);
    let target = coord(2.25, 2.25);
    assert!((after - target).length() < (before - target).length());
    assert!((after - before).length() <= 0.1 + 1e-12);
}

#[test]
fn moves_that_would_fold_the_grid_are_rejected() {
    let mut grid = CartogramGrid::new(4, 4, Envelope::new(0.0, 3.0, 0.0, 3.0)).unwrap();
    grid.set_node(2, 1, coord(1.05, 1.0));
    assert!(!grid.try_to_move_node(1, 1, 1.1, 1.0));
    assert_eq!(grid.node(1, 1), coord(1.0, 1.0));
    assert!(grid.try_to_move_node(1, 1, 0.98, 1.0));
    assert_eq!(grid.node(1, 1), coord(0.98, 1.0));
}

/// Every node stays strictly between its neighbors on both axes.
fn assert_unfolded(grid: &CartogramGrid) {
    let (nx, ny) = (grid.size_x(), grid.size_y());
    for i in 0..nx {
        for j in 0..ny {
            let node = grid.node(i, j);
            let rows = j.saturating_sub(1)..=(j + 1).min(ny - 1);
            let cols = i.saturating_sub(1)..=(i + 1).min(nx - 1);
            for r in rows {
                if i > 0 {
                    assert!(grid.node(i - 1, r).x < node.x, "({i}, {j}) vs ({}, {r})", i - 1);
                }
                if i + 1 < nx {
                    assert!(grid.node(i + 1, r).x > node.x, "({i}, {j}) vs ({}, {r})", i + 1);
                }
            }
            for c in cols {
                if j > 0 {
                    assert!(grid.node(c, j - 1).y < node.y, "({i}, {j}) vs ({c}, {})", j - 1);
                }
                if j + 1 < ny {
                    assert!(grid.node(c, j + 1).y > node.y, "({i}, {j}) vs ({c}, {})", j + 1);
                }
            }
        }
    }
}

#[test]
fn random_moves_never_fold_the_grid() {
    let mut rng = StdRng::seed_from_u64(11);
    let mut grid = CartogramGrid::new(4, 4, Envelope::new(0.0, 3.0, 0.0, 3.0)).unwrap();
    grid.set_cell_state(1, 1, CellState::Rigid);

    let mut accepted = 0;
    for step in 0..20_000 {
        let (i, j) = (rng.gen_range(0..4), rng.gen_range(0..4));
        let node = grid.node(i, j);
        let x = node.x + rng.gen_range(-0.5..0.5);
        let y = node.y + rng.gen_range(-0.5..0.5);
        if grid.try_to_move_node(i, j, x, y) {
            accepted += 1;
        }
        if step % 100 == 0 {
            grid.conform_to_constrained_deformation();
        }
        assert_unfolded(&grid);
    }
    assert!(accepted > 1000, "only {accepted} moves accepted");
}
