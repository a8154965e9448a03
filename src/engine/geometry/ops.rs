// ABOUTME: Thin wrapper over the geo crate - the only module allowed to name a geometry engine
// ABOUTME: Keeps boolean ops, splitting, and snap-rounding in one place so zone code stays engine-agnostic

use geo::BooleanOps;
use geo_types::{coord, Coord, LineString, MultiPolygon, Polygon};

/// Coordinates within this distance are treated as equal everywhere in the
/// zone builder, to avoid cascading empty results from floating-point noise
/// in polygon boolean ops.
pub fn snap_eq(a: f64, b: f64, tolerance: f64) -> bool {
    (a - b).abs() <= tolerance
}

pub fn coord_snap_eq(a: Coord<f64>, b: Coord<f64>, tolerance: f64) -> bool {
    snap_eq(a.x, b.x, tolerance) && snap_eq(a.y, b.y, tolerance)
}

/// Rounds every coordinate in a ring to the nearest multiple of `tolerance`,
/// collapsing near-duplicate vertices that boolean ops would otherwise turn
/// into degenerate slivers.
pub fn snap_round(poly: &Polygon<f64>, tolerance: f64) -> Polygon<f64> {
    if tolerance <= 0.0 {
        return poly.clone();
    }
    let snap = |c: &Coord<f64>| coord! {
        x: (c.x / tolerance).round() * tolerance,
        y: (c.y / tolerance).round() * tolerance,
    };
    let exterior = LineString(poly.exterior().0.iter().map(snap).collect());
    let interiors = poly
        .interiors()
        .iter()
        .map(|ring| LineString(ring.0.iter().map(snap).collect()))
        .collect();
    Polygon::new(exterior, interiors)
}

pub fn union(a: &Polygon<f64>, b: &Polygon<f64>) -> MultiPolygon<f64> {
    a.union(b)
}

pub fn union_all(polys: &[Polygon<f64>]) -> MultiPolygon<f64> {
    let mut acc = MultiPolygon::new(vec![]);
    for poly in polys {
        acc = acc.union(poly);
    }
    acc
}

pub fn difference(a: &Polygon<f64>, b: &Polygon<f64>) -> MultiPolygon<f64> {
    a.difference(b)
}

pub fn intersection(a: &Polygon<f64>, b: &Polygon<f64>) -> MultiPolygon<f64> {
    a.intersection(b)
}

/// Splits `poly` by the infinite line through `line`, returning
/// `(below_or_left, above_or_right)` halves as the intersection of `poly`
/// with two oversized half-plane rectangles straddling the line. The
/// "explode id" convention used by the zone builder maps directly onto this
/// pair: explode-id 1 is `below_or_left`, explode-id 2 is `above_or_right`.
pub fn split_by_line(poly: &Polygon<f64>, line: &LineString<f64>) -> (MultiPolygon<f64>, MultiPolygon<f64>) {
    let (p0, p1) = match (line.0.first(), line.0.last()) {
        (Some(a), Some(b)) => (*a, *b),
        _ => return (MultiPolygon::new(vec![]), MultiPolygon::new(vec![])),
    };
    let dx = p1.x - p0.x;
    let dy = p1.y - p0.y;
    let len = (dx * dx + dy * dy).sqrt();
    if len < f64::EPSILON {
        return (MultiPolygon::new(vec![]), MultiPolygon::new(vec![]));
    }
    // unit normal, pointing to the "above/right" side
    let nx = -dy / len;
    let ny = dx / len;
    let half_plane = half_plane_polygon(p0, nx, ny, poly);

    let side_a = poly.intersection(&half_plane);
    let side_b = poly.difference(&half_plane);
    (side_b, side_a)
}

/// Builds a rectangle much larger than `bounds_of` on the positive-normal
/// side of the line through `origin` with unit normal `(nx, ny)`.
fn half_plane_polygon(origin: Coord<f64>, nx: f64, ny: f64, bounds_of: &Polygon<f64>) -> Polygon<f64> {
    use geo::BoundingRect;
    let bbox = bounds_of
        .bounding_rect()
        .unwrap_or(geo_types::Rect::new(coord! { x: 0.0, y: 0.0 }, coord! { x: 1.0, y: 1.0 }));
    let diag = ((bbox.width().powi(2) + bbox.height().powi(2)).sqrt()).max(1.0);
    let reach = diag * 4.0;
    // tangent direction along the splitting line
    let tx = ny;
    let ty = -nx;
    let p_a = coord! { x: origin.x + tx * reach, y: origin.y + ty * reach };
    let p_b = coord! { x: origin.x - tx * reach, y: origin.y - ty * reach };
    let p_c = coord! { x: p_b.x + nx * reach, y: p_b.y + ny * reach };
    let p_d = coord! { x: p_a.x + nx * reach, y: p_a.y + ny * reach };
    Polygon::new(LineString(vec![p_a, p_b, p_c, p_d, p_a]), vec![])
}

pub fn largest_polygon(mp: &MultiPolygon<f64>) -> Option<Polygon<f64>> {
    use geo::Area;
    mp.0.iter()
        .max_by(|a, b| a.unsigned_area().partial_cmp(&b.unsigned_area()).unwrap())
        .cloned()
}

pub fn is_empty(mp: &MultiPolygon<f64>) -> bool {
    use geo::Area;
    mp.0.is_empty() || mp.0.iter().all(|p| p.unsigned_area() < 1e-9)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::Polygon;

    fn square(x0: f64, y0: f64, side: f64) -> Polygon<f64> {
        Polygon::new(
            LineString(vec![
                coord! { x: x0, y: y0 },
                coord! { x: x0 + side, y: y0 },
                coord! { x: x0 + side, y: y0 + side },
                coord! { x: x0, y: y0 + side },
                coord! { x: x0, y: y0 },
            ]),
            vec![],
        )
    }

    #[test]
    fn snap_round_collapses_near_duplicate_vertices() {
        let poly = square(0.0, 0.0, 10.0003);
        let snapped = snap_round(&poly, 0.01);
        assert!((snapped.exterior().0[2].x - 10.0).abs() < 1e-9);
    }

    #[test]
    fn split_by_line_divides_a_square_in_half() {
        let poly = square(0.0, 0.0, 10.0);
        let line = LineString(vec![coord! { x: 5.0, y: -1.0 }, coord! { x: 5.0, y: 11.0 }]);
        let (left, right) = split_by_line(&poly, &line);
        assert!(!is_empty(&left));
        assert!(!is_empty(&right));
    }

    #[test]
    fn union_of_overlapping_squares_is_not_empty() {
        let a = square(0.0, 0.0, 10.0);
        let b = square(5.0, 5.0, 10.0);
        let merged = union(&a, &b);
        assert!(!is_empty(&merged));
    }
}
