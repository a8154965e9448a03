// ABOUTME: Initializer - vertical reference profile, resolved-factor overwrite, solid-cell mask
// ABOUTME: VelocityField and SolidMask persist from here through the solver; everything upstream is transient

use std::collections::HashSet;

use geo::{Contains, Translate};
use geo_types::Polygon;

use crate::engine::config::WindFieldConfig;
use crate::engine::core::Grid3;
use crate::engine::geometry::{ReferenceHeightSelector, StackedBlock};
use crate::engine::superimpose::ResolvedVoxel;

/// Dense face-velocity arrays plus the initial-guess arrays the solver reads
/// from. Staggered convention: `u[i,j,k]` lives on the face between cells
/// `i-1` and `i` along x (analogously for v along y, w along z).
pub struct VelocityField {
    pub nx: usize,
    pub ny: usize,
    pub nz: usize,
    pub x0: f64,
    pub y0: f64,
    pub dx: f32,
    pub dy: f32,
    pub dz: f32,
    pub u: Grid3<f32>,
    pub v: Grid3<f32>,
    pub w: Grid3<f32>,
    pub un: Grid3<f32>,
    pub vn: Grid3<f32>,
    pub wn: Grid3<f32>,
}

impl VelocityField {
    pub fn new(nx: usize, ny: usize, nz: usize, x0: f64, y0: f64, dx: f32, dy: f32, dz: f32) -> Self {
        Self {
            nx,
            ny,
            nz,
            x0,
            y0,
            dx,
            dy,
            dz,
            u: Grid3::new(nx, ny, nz, 0.0),
            v: Grid3::new(nx, ny, nz, 0.0),
            w: Grid3::new(nx, ny, nz, 0.0),
            un: Grid3::new(nx, ny, nz, 0.0),
            vn: Grid3::new(nx, ny, nz, 0.0),
            wn: Grid3::new(nx, ny, nz, 0.0),
        }
    }

    pub fn z_at(&self, k: usize) -> f32 {
        (k as f32 + 0.5) * self.dz
    }
}

/// Set of cell indices fully inside a building, or below its base height.
#[derive(Debug, Clone, Default)]
pub struct SolidMask {
    cells: HashSet<(usize, usize, usize)>,
}

impl SolidMask {
    pub fn contains(&self, i: usize, j: usize, k: usize) -> bool {
        self.cells.contains(&(i, j, k))
    }

    pub fn insert(&mut self, i: usize, j: usize, k: usize) {
        self.cells.insert((i, j, k));
    }

    pub fn iter(&self) -> impl Iterator<Item = &(usize, usize, usize)> {
        self.cells.iter()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Kuttler/Matzarakis power-law vertical profile.
pub fn vertical_reference_profile(z: f32, cfg: &WindFieldConfig) -> f32 {
    if z <= 0.0 {
        return 0.0;
    }
    let exponent = 0.12 * cfg.z0 + 0.18;
    cfg.v_ref * (z / cfg.z_ref).powf(exponent)
}

fn reference_speed(selector: ReferenceHeightSelector, owner_height: Option<f32>, cfg: &WindFieldConfig) -> f32 {
    match selector {
        ReferenceHeightSelector::ReferenceSensorHeight => cfg.v_ref,
        ReferenceHeightSelector::UpstreamBuildingHeight | ReferenceHeightSelector::LocalBuildingHeight => {
            vertical_reference_profile(owner_height.unwrap_or(cfg.z_ref), cfg)
        }
    }
}

/// Fills `un, vn, wn` with the default vertical profile, then overwrites
/// every resolved voxel with its scaled factor vector (overwrite, not
/// multiply, per the initializer contract).
pub fn initialize_field(field: &mut VelocityField, resolved: &[ResolvedVoxel], cfg: &WindFieldConfig) {
    for k in 0..field.nz {
        let v_ref = vertical_reference_profile(field.z_at(k), cfg);
        for j in 0..field.ny {
            for i in 0..field.nx {
                field.un.set(i, j, k, 0.0);
                field.vn.set(i, j, k, v_ref);
                field.wn.set(i, j, k, 0.0);
            }
        }
    }

    for voxel in resolved {
        if voxel.k >= field.nz || voxel.ix >= field.nx || voxel.iy >= field.ny {
            continue;
        }
        let speed = match voxel.ref_height_selector {
            Some(sel) => reference_speed(sel, voxel.owner_height, cfg),
            None => cfg.v_ref,
        };
        field.un.set(voxel.ix, voxel.iy, voxel.k, voxel.u_f * speed);
        field.vn.set(voxel.ix, voxel.iy, voxel.k, voxel.v_f * speed);
        field.wn.set(voxel.ix, voxel.iy, voxel.k, voxel.w_f * speed);
    }
}

/// Shifts a footprint by `(+dx/2, +dy/2)`, the correction needed to
/// rasterize buildings onto a staggered grid: factor evaluation reads cell
/// centers, but the solid mask must line up with the face-velocity
/// locations the solver actually mutates.
pub fn stagger_footprint(footprint: &Polygon<f64>, dx: f32, dy: f32) -> Polygon<f64> {
    footprint.translate(dx as f64 / 2.0, dy as f64 / 2.0)
}

/// Marks solid cells using footprints shifted by `(+dx/2, +dy/2)` (the
/// staggered-grid correction) and forces zero velocity there.
pub fn build_solid_mask(field: &mut VelocityField, blocks: &[StackedBlock]) -> SolidMask {
    let mut mask = SolidMask::default();
    let shifted: Vec<(Polygon<f64>, f32, f32)> = blocks
        .iter()
        .map(|b| {
            (
                stagger_footprint(&b.footprint, field.dx, field.dy),
                b.base_height,
                b.top_height,
            )
        })
        .collect();

    for j in 0..field.ny {
        for i in 0..field.nx {
            let x = field.x0 + i as f64 * field.dx as f64;
            let y = field.y0 + j as f64 * field.dy as f64;
            let point = geo_types::Point::new(x, y);
            for (poly, base, top) in &shifted {
                if !poly.contains(&point) {
                    continue;
                }
                for k in 0..field.nz {
                    let z = field.z_at(k);
                    if z <= *top && z > *base {
                        mask.insert(i, j, k);
                        field.u.set(i, j, k, 0.0);
                        field.v.set(i, j, k, 0.0);
                        field.w.set(i, j, k, 0.0);
                        field.un.set(i, j, k, 0.0);
                        field.vn.set(i, j, k, 0.0);
                        field.wn.set(i, j, k, 0.0);
                    }
                }
            }
        }
    }
    mask
}
