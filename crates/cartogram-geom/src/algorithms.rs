//! Stateless planar predicates and measures.

use crate::{Coordinate, GeomError, Result, coord};

/// Parametric slack accepted at segment ends by [`segment_intersection`].
pub const SEGMENT_EPSILON: f64 = 1e-3;

pub fn area_of_triangle(a: Coordinate, b: Coordinate, c: Coordinate) -> f64 {
    let u = a - c;
    let v = b - c;
    (0.5 * (u.x * v.y - u.y * v.x)).abs()
}

/// Area of the quadrilateral `abcd`, split along the `ac` diagonal.
pub fn area_of_quadrangle(a: Coordinate, b: Coordinate, c: Coordinate, d: Coordinate) -> f64 {
    area_of_triangle(a, b, c) + area_of_triangle(a, c, d)
}

/// Shoelace sum over an implicitly closed ring. Positive for counter-clockwise rings.
pub fn signed_ring_area(ring: &[Coordinate]) -> f64 {
    if ring.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    let mut prev = ring[ring.len() - 1];
    for &c in ring {
        sum += prev.x * c.y - c.x * prev.y;
        prev = c;
    }
    0.5 * sum
}

pub fn ring_area(ring: &[Coordinate]) -> f64 {
    signed_ring_area(ring).abs()
}

/// Intersection point of the segments `ab` and `cd`.
///
/// Both parameters must fall within `[-ε, 1+ε]`. Parallel and collinear segments yield `None`.
pub fn segment_intersection(
    a: Coordinate,
    b: Coordinate,
    c: Coordinate,
    d: Coordinate,
) -> Option<Coordinate> {
    let v = b - a;
    let w = d - c;
    let denom = w.y * v.x - w.x * v.y;
    if denom == 0.0 {
        return None;
    }

    let n1 = w.y * (c.x - a.x) - w.x * (c.y - a.y);
    let n2 = v.y * (c.x - a.x) - v.x * (c.y - a.y);
    let t1 = n1 / denom;
    let t2 = n2 / denom;

    let accepted = |t: f64| (-SEGMENT_EPSILON..=1.0 + SEGMENT_EPSILON).contains(&t);
    (accepted(t1) && accepted(t2)).then(|| a + v * t1)
}

/// Even-odd ray casting of `p` against an implicitly closed ring.
///
/// Counts the ring edges straddling `p.x` that pass below `p`.
pub fn ring_contains_point(ring: &[Coordinate], p: Coordinate) -> bool {
    if ring.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        let v1 = ring[i];
        let v2 = ring[j];
        let straddles = (v1.x < p.x && v2.x >= p.x) || (v2.x < p.x && v1.x >= p.x);
        if straddles && v1.y + (p.x - v1.x) / (v2.x - v1.x) * (v2.y - v1.y) < p.y {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Splits every segment longer than `max_len` into `2^k` equal pieces, `k` the smallest power
/// that brings the pieces under `max_len`. With `closed`, the segment from the last vertex back
/// to the first is split as well (without repeating the first vertex).
pub fn subdivide_segments(
    coords: &[Coordinate],
    max_len: f64,
    closed: bool,
) -> Result<Vec<Coordinate>> {
    if !(max_len.is_finite() && max_len > 0.0) {
        return Err(GeomError::InvalidSegmentLength(max_len));
    }
    let Some(&last) = coords.last() else {
        return Ok(Vec::new());
    };

    let mut out = Vec::with_capacity(coords.len());
    let segment_count = if closed {
        coords.len()
    } else {
        coords.len() - 1
    };
    for k in 0..segment_count {
        let a = coords[k];
        let b = coords[(k + 1) % coords.len()];
        out.push(a);
        let len = (b - a).length();
        if len <= max_len {
            continue;
        }
        let pieces = 1usize << (len / max_len).log2().ceil() as u32;
        for step in 1..pieces {
            let t = step as f64 / pieces as f64;
            out.push(coord(a.x + t * (b.x - a.x), a.y + t * (b.y - a.y)));
        }
    }
    if !closed {
        out.push(last);
    }
    Ok(out)
}
