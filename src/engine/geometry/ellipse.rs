// ABOUTME: Ellipse polygon construction and the polygonal-approximation angular correction
// ABOUTME: Shared by displacement, displacement-vortex, cavity, and wake zone construction

use geo_types::{coord, Coord, LineString, Polygon};

/// Builds a closed polygon approximating an ellipse centered at `center`,
/// with semi-axis `r_x` along the local x-axis and `r_y` along the local
/// y-axis, rotated by `rotation` radians (counter-clockwise from the local
/// x-axis), tessellated into `npoints` vertices.
pub fn ellipse_polygon(
    center: Coord<f64>,
    r_x: f64,
    r_y: f64,
    rotation: f64,
    npoints: usize,
) -> Polygon<f64> {
    let npoints = npoints.max(8);
    let (sin_r, cos_r) = rotation.sin_cos();
    let mut coords = Vec::with_capacity(npoints + 1);
    for i in 0..npoints {
        let t = 2.0 * std::f64::consts::PI * (i as f64) / (npoints as f64);
        let (sin_t, cos_t) = t.sin_cos();
        let local_x = r_x * cos_t;
        let local_y = r_y * sin_t;
        let x = center.x + local_x * cos_r - local_y * sin_r;
        let y = center.y + local_x * sin_r + local_y * cos_r;
        coords.push(coord! { x: x, y: y });
    }
    coords.push(coords[0]);
    Polygon::new(LineString(coords), vec![])
}

/// Angular correction for the polygonal approximation of an ellipse split by
/// its own facet line: `delta = pi/2 - acos(num / denom)` with
/// `num = (1 - cos(2*pi/n)) * r_x` and
/// `denom = sqrt((1 - cos(2*pi/n))^2 * r_x^2 + sin(2*pi/n)^2 * r_y^2)`.
///
/// Used to decide, when the facade angle is near perpendicular, which of the
/// two halves produced by splitting the ellipse is the upwind one: a
/// polygon with finitely many vertices does not split exactly on its
/// mathematical symmetry axis, so the tie-break needs a small angular
/// margin rather than an exact comparison against `theta == pi/2`.
pub fn polygon_split_correction(r_x: f64, r_y: f64, npoints: usize) -> f64 {
    let n = npoints.max(8) as f64;
    let step = 2.0 * std::f64::consts::PI / n;
    let one_minus_cos = 1.0 - step.cos();
    let num = one_minus_cos * r_x;
    let denom = ((one_minus_cos * r_x).powi(2) + step.sin().powi(2) * r_y.powi(2)).sqrt();
    if denom <= 0.0 {
        return 0.0;
    }
    std::f64::consts::FRAC_PI_2 - (num / denom).clamp(-1.0, 1.0).acos()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ellipse_polygon_is_closed() {
        let poly = ellipse_polygon(coord! { x: 0.0, y: 0.0 }, 5.0, 2.0, 0.0, 16);
        let coords = &poly.exterior().0;
        assert_eq!(coords.first(), coords.last());
        assert_eq!(coords.len(), 17);
    }

    #[test]
    fn ellipse_vertices_respect_semi_axes_at_zero_rotation() {
        let poly = ellipse_polygon(coord! { x: 0.0, y: 0.0 }, 10.0, 3.0, 0.0, 4);
        // with 4 points starting at t=0, the first vertex sits on +x axis
        let first = poly.exterior().0[0];
        assert!((first.x - 10.0).abs() < 1e-9);
        assert!(first.y.abs() < 1e-9);
    }

    #[test]
    fn split_correction_is_zero_for_a_circle_in_the_limit() {
        // a circle (r_x == r_y) still carries a small but finite correction
        // at low tessellation; it should shrink as npoints grows.
        let coarse = polygon_split_correction(5.0, 5.0, 12).abs();
        let fine = polygon_split_correction(5.0, 5.0, 360).abs();
        assert!(fine <= coarse);
    }
}
