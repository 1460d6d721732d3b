use crate::{Coordinate, GeomError, Polygon, Result};

fn validate_ring(index: usize, mut ring: Vec<Coordinate>) -> Result<Vec<Coordinate>> {
    if let Some(vertex) = ring.iter().position(|c| !c.x.is_finite() || !c.y.is_finite()) {
        return Err(GeomError::NonFiniteCoordinate {
            ring: index,
            vertex,
        });
    }
    ring.dedup();
    if ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }
    if ring.len() < 3 {
        return Err(GeomError::DegenerateRing {
            ring: index,
            vertices: ring.len(),
        });
    }
    Ok(ring)
}

/// Assembles polygons from a flat list of rings.
///
/// A ring contained in another ring becomes one of its holes; the first unclaimed containing
/// ring in input order claims it. Output polygons keep the input order of their exterior rings.
pub fn polygons_from_rings(rings: Vec<Vec<Coordinate>>) -> Result<Vec<Polygon>> {
    let shells = rings
        .into_iter()
        .enumerate()
        .map(|(i, ring)| validate_ring(i, ring).map(Polygon::new))
        .collect::<Result<Vec<_>>>()?;

    let n = shells.len();
    let mut owner: Vec<Option<usize>> = vec![None; n];
    for i in 0..n {
        if owner[i].is_some() {
            continue;
        }
        for j in 0..n {
            if j == i || owner[j].is_some() {
                continue;
            }
            if shells[i].contains(&shells[j]) {
                owner[j] = Some(i);
            }
        }
    }

    // A ring claimed by a ring that was itself claimed later is an island inside a hole.
    let claimed = owner.clone();
    for parent in owner.iter_mut() {
        if let Some(p) = *parent {
            if claimed[p].is_some() {
                *parent = None;
            }
        }
    }

    let mut holes: Vec<Vec<Vec<Coordinate>>> = vec![Vec::new(); n];
    for (j, parent) in owner.iter().enumerate() {
        if let Some(parent) = *parent {
            holes[parent].push(shells[j].exterior().to_vec());
        }
    }

    Ok(shells
        .into_iter()
        .zip(holes)
        .zip(owner)
        .filter(|(_, owner)| owner.is_none())
        .map(|((shell, holes), _)| Polygon::with_holes(shell.exterior().to_vec(), holes))
        .collect())
}
