// ABOUTME: Grid builder - horizontal point mesh over the padded obstacle envelope
// ABOUTME: Row 1 is the most-downwind row; row ny is the most-upwind, matching the +Y wind convention

use geo::BoundingRect;
use geo_types::Polygon;

use crate::engine::config::WindFieldConfig;
use crate::engine::core::PhysicsGrid;
use crate::engine::error::{Result, WindFieldError};

/// One horizontal mesh point: integer indices plus world coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridPoint {
    pub ix: usize,
    pub iy: usize,
    pub x: f64,
    pub y: f64,
}

/// The horizontal point mesh, plus the world-space origin and
/// spacing every later stage needs to map a point back to grid coordinates.
#[derive(Debug, Clone)]
pub struct HorizontalGrid {
    pub nx: usize,
    pub ny: usize,
    pub x0: f64,
    pub y0: f64,
    pub mesh_size: f64,
    points: PhysicsGrid<GridPoint>,
}

impl HorizontalGrid {
    pub fn point(&self, ix: usize, iy: usize) -> &GridPoint {
        self.points.get(ix, iy)
    }

    pub fn iter_points(&self) -> impl Iterator<Item = &GridPoint> + '_ {
        self.points.iter_coords().map(|(_, _, p)| p)
    }

    /// The vertical line (one per `ix`) running from the top row down to the
    /// bottom row, precomputed once and reused across every zone that maps onto it.
    pub fn column_line(&self, ix: usize) -> geo_types::LineString<f64> {
        use geo_types::{coord, LineString};
        let x = self.point(ix, 0).x;
        let top = self.point(ix, self.ny - 1).y;
        let bottom = self.point(ix, 0).y;
        LineString(vec![
            coord! { x: x, y: top.max(bottom) },
            coord! { x: x, y: top.min(bottom) },
        ])
    }
}

/// Builds the horizontal mesh: bounding box of the union of all obstacle
/// footprints, padded by the cross-wind and along-wind extend distances,
/// then filled with points spaced `mesh_size` apart.
pub fn build_grid(
    footprints: &[Polygon<f64>],
    cfg: &WindFieldConfig,
    max_cells_2d: usize,
) -> Result<HorizontalGrid> {
    let mut min_x = f64::MAX;
    let mut max_x = f64::MIN;
    let mut min_y = f64::MAX;
    let mut max_y = f64::MIN;
    for poly in footprints {
        if let Some(rect) = poly.bounding_rect() {
            min_x = min_x.min(rect.min().x);
            max_x = max_x.max(rect.max().x);
            min_y = min_y.min(rect.min().y);
            max_y = max_y.max(rect.max().y);
        }
    }
    if !min_x.is_finite() {
        // no obstacles at all: fall back to a nominal domain centered on
        // the origin, sized by the along/cross-wind extents alone
        min_x = -cfg.cross_wind_zone_extend as f64;
        max_x = cfg.cross_wind_zone_extend as f64;
        min_y = -cfg.along_wind_zone_extend as f64;
        max_y = cfg.along_wind_zone_extend as f64;
    }

    let x0 = min_x - cfg.cross_wind_zone_extend as f64;
    let x1 = max_x + cfg.cross_wind_zone_extend as f64;
    let y0 = min_y - cfg.along_wind_zone_extend as f64;
    let y1 = max_y + cfg.along_wind_zone_extend as f64;

    let mesh = cfg.mesh_size as f64;
    let nx = (((x1 - x0) / mesh).ceil() as usize + 1).max(2);
    let ny = (((y1 - y0) / mesh).ceil() as usize + 1).max(2);

    if nx * ny > max_cells_2d {
        return Err(WindFieldError::GridTooLarge {
            nx,
            ny,
            nz: 1,
            cells: nx * ny,
            cap: max_cells_2d,
        });
    }

    let mut points = PhysicsGrid::new(
        nx,
        ny,
        GridPoint {
            ix: 0,
            iy: 0,
            x: 0.0,
            y: 0.0,
        },
    );
    for iy in 0..ny {
        for ix in 0..nx {
            points.set(
                ix,
                iy,
                GridPoint {
                    ix,
                    iy,
                    x: x0 + ix as f64 * mesh,
                    y: y0 + iy as f64 * mesh,
                },
            );
        }
    }

    Ok(HorizontalGrid {
        nx,
        ny,
        x0,
        y0,
        mesh_size: mesh,
        points,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{coord, LineString, Polygon};

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
    fn grid_pads_the_obstacle_envelope() {
        let cfg = WindFieldConfig::default();
        let grid = build_grid(&[square(0.0, 0.0, 10.0)], &cfg, 1_000_000).unwrap();
        assert!(grid.x0 < 0.0);
        assert!(grid.point(0, 0).x < 0.0);
    }

    #[test]
    fn grid_too_large_is_rejected_before_allocation() {
        let cfg = WindFieldConfig {
            mesh_size: 0.01,
            ..WindFieldConfig::default()
        };
        let err = build_grid(&[square(0.0, 0.0, 100.0)], &cfg, 100).unwrap_err();
        assert!(matches!(err, WindFieldError::GridTooLarge { .. }));
    }

    #[test]
    fn empty_obstacle_list_still_produces_a_nominal_domain() {
        let cfg = WindFieldConfig::default();
        let grid = build_grid(&[], &cfg, 1_000_000).unwrap();
        assert!(grid.nx >= 2 && grid.ny >= 2);
    }
}
