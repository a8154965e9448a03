// ABOUTME: Point-to-zone mapper - per-zone, per-point geometric locals used by the factor formulas
// ABOUTME: Column vertical lines are built once per ix and reused across every zone that touches that column

use geo::algorithm::line_intersection::{line_intersection, LineIntersection};
use geo::{Contains, EuclideanDistance};
use geo_types::{coord, Coord, Line};

use crate::engine::geometry::{Zone, ZoneAttributes, ZoneKind};
use crate::engine::grid_builder::{GridPoint, HorizontalGrid};

/// Per-(zone, point) geometric locals needed by the wind-factor formulas.
#[derive(Debug, Clone, Copy)]
pub struct PointZoneLocal {
    pub ix: usize,
    pub iy: usize,
    /// Y-coordinate of the zone's anchor wall on the vertical line through
    /// this point.
    pub y_wall: f64,
    /// This point's own Y coordinate, so formulas can recover `y = point.y -
    /// Y_wall` instead of conflating the wall's absolute position with the
    /// point's offset from it.
    pub point_y: f64,
    /// Length of zone ∩ vertical-line along Y.
    pub l_zone: f64,
    /// Distance from the point to the zone's anchor (rooftop-corner only).
    pub anchor_distance: Option<f64>,
}

fn wall_is_max_y(kind: ZoneKind) -> bool {
    matches!(
        kind,
        ZoneKind::Cavity
            | ZoneKind::Wake
            | ZoneKind::StreetCanyon
            | ZoneKind::RooftopPerp
            | ZoneKind::RooftopCorner
    )
}

/// Intersects the zone footprint's boundary with the vertical column line,
/// returning every Y where the boundary crosses that column, sorted
/// ascending.
fn boundary_crossings(zone: &Zone, column: &geo_types::LineString<f64>) -> Vec<f64> {
    let mut ys = Vec::new();
    let exterior = zone.footprint.exterior();
    let col_line = Line::new(column.0[0], column.0[1]);
    for window in exterior.0.windows(2) {
        let edge = Line::new(window[0], window[1]);
        if let Some(LineIntersection::SinglePoint { intersection, .. }) =
            line_intersection(edge, col_line)
        {
            ys.push(intersection.y);
        }
    }
    ys.sort_by(|a, b| a.partial_cmp(b).unwrap());
    ys
}

/// Computes the locals for one zone against one grid column, returning
/// one `PointZoneLocal` per grid point in that column that falls inside the
/// zone footprint.
pub fn map_zone_to_column(
    zone: &Zone,
    grid: &HorizontalGrid,
    ix: usize,
) -> Vec<PointZoneLocal> {
    let column = grid.column_line(ix);
    let crossings = boundary_crossings(zone, &column);
    if crossings.len() < 2 {
        return Vec::new();
    }
    let y_min = crossings[0];
    let y_max = *crossings.last().unwrap();
    let l_zone = y_max - y_min;
    let y_wall = if wall_is_max_y(zone.kind) { y_max } else { y_min };

    let anchor = match &zone.attributes {
        ZoneAttributes::RooftopCorner { anchor, .. } => Some(*anchor),
        _ => None,
    };

    let mut locals = Vec::new();
    for iy in 0..grid.ny {
        let point = grid.point(ix, iy);
        let pt_coord = coord! { x: point.x, y: point.y };
        if !zone.footprint.contains(&geo_types::Point::from(pt_coord)) {
            continue;
        }
        let anchor_distance = anchor.map(|a: Coord<f64>| {
            geo_types::Point::from(pt_coord).euclidean_distance(&geo_types::Point::from(a))
        });
        locals.push(PointZoneLocal {
            ix,
            iy,
            y_wall,
            point_y: point.y,
            l_zone,
            anchor_distance,
        });
    }
    locals
}

/// Runs `map_zone_to_column` over every column the zone's bounding box
/// touches. Embarrassingly parallel across zones; the caller is expected to
/// fold results with rayon.
pub fn map_zone(zone: &Zone, grid: &HorizontalGrid) -> Vec<PointZoneLocal> {
    use geo::BoundingRect;
    let bbox = match zone.footprint.bounding_rect() {
        Some(b) => b,
        None => return Vec::new(),
    };
    let ix_lo = (((bbox.min().x - grid.x0) / grid.mesh_size).floor().max(0.0)) as usize;
    let ix_hi = ((((bbox.max().x - grid.x0) / grid.mesh_size).ceil()) as usize).min(grid.nx - 1);

    let mut locals = Vec::new();
    for ix in ix_lo..=ix_hi.max(ix_lo) {
        locals.extend(map_zone_to_column(zone, grid, ix));
    }
    locals
}
