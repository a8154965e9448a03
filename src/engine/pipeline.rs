// ABOUTME: Top-level orchestration - chains zone geometry through the solver and assembles the public result
// ABOUTME: Zone/point/voxel stages fan out over rayon; the solver sweep stays single-threaded

use rayon::prelude::*;

use crate::engine::config::WindFieldConfig;
use crate::engine::diagnostics::RunDiagnostics;
use crate::engine::error::Result;
use crate::engine::factors::{evaluate_zone_factors, VoxelFactor};
use crate::engine::field::{build_solid_mask, initialize_field, SolidMask, VelocityField};
use crate::engine::geometry::{build_all_zones, validate_inputs, StackedBlock, UpwindFacet, VegetationPatch, Zone};
use crate::engine::grid_builder::build_grid;
use crate::engine::mapper::map_zone;
use crate::engine::solver::solve;
use crate::engine::superimpose::resolve;

/// Everything the pipeline needs from the caller: the three entity lists,
/// already rotated so wind blows along +Y, plus the run's configuration.
pub struct PipelineInputs {
    pub blocks: Vec<StackedBlock>,
    pub facets: Vec<UpwindFacet>,
    pub vegetation: Vec<VegetationPatch>,
    pub config: WindFieldConfig,
    /// Hard cap on the horizontal mesh's `nx * ny`, checked before the 3-D
    /// grid is allocated.
    pub max_horizontal_cells: usize,
}

/// The full result of one pipeline run: the solved velocity field, the
/// solid-cell mask, and the bookkeeping gathered along the way.
pub struct PipelineOutput {
    pub field: VelocityField,
    pub solid_mask: SolidMask,
    pub diagnostics: RunDiagnostics,
}

/// Everything built before the SOR solve runs: the zone list (C1), the
/// initial velocity guess and solid mask (C2-C6), the config the caller
/// supplied, and the diagnostics gathered so far. Exposed separately from
/// [`run`] so callers - and tests - can inspect zone construction and the
/// initial field without paying for or depending on the solve.
pub struct AssembledField {
    pub zones: Vec<Zone>,
    pub field: VelocityField,
    pub solid_mask: SolidMask,
    pub diagnostics: RunDiagnostics,
    pub config: WindFieldConfig,
}

/// Runs every stage up to and including the initializer (C1-C6): zone
/// construction, point mapping, factor evaluation, superimposition, and
/// field initialization with the solid-cell mask. Stops short of the SOR
/// solve in [`run`].
pub fn assemble(inputs: PipelineInputs) -> Result<AssembledField> {
    let PipelineInputs {
        blocks,
        facets,
        vegetation,
        config,
        max_horizontal_cells,
    } = inputs;

    let mut diagnostics = RunDiagnostics::default();

    let (blocks, facets, vegetation, skipped) = validate_inputs(blocks, facets, vegetation)?;
    diagnostics.entities_skipped_invalid_geometry = skipped;

    // Zone geometry. Per-block and per-facet construction are
    // independent of each other, but each pass also needs to mutate the
    // shared diagnostics counters, so this stays sequential; the fan-out
    // happens below in the mapping/factor stages instead, where there's no shared state to
    // contend with.
    let zones = build_all_zones(&blocks, &facets, &vegetation, &config, &mut diagnostics);

    // Horizontal point mesh
    let footprints: Vec<_> = blocks
        .iter()
        .map(|b| b.footprint.clone())
        .chain(vegetation.iter().map(|v| v.footprint.clone()))
        .collect();
    let grid = build_grid(&footprints, &config, max_horizontal_cells)?;

    let max_height = blocks
        .iter()
        .map(|b| b.top_height)
        .chain(vegetation.iter().map(|v| v.crown_top))
        .fold(0.0f32, f32::max)
        + config.rooftop_perp_height_factor.max(config.rooftop_corner_facade_factor) * 4.0
        + config.sketch_height;
    let nz = ((max_height / config.dz).ceil() as usize + 1).max(2);

    if grid.nx * grid.ny * nz > config.max_grid_cells {
        return Err(crate::engine::error::WindFieldError::GridTooLarge {
            nx: grid.nx,
            ny: grid.ny,
            nz,
            cells: grid.nx * grid.ny * nz,
            cap: config.max_grid_cells,
        });
    }

    // Point-to-zone mapping and factor evaluation, fanned out per
    // zone since zones own disjoint work and write only their own factors.
    let all_factors: Vec<VoxelFactor> = zones
        .par_iter()
        .flat_map(|zone| {
            let locals = map_zone(zone, &grid);
            locals
                .into_iter()
                .flat_map(|local| evaluate_zone_factors(zone, &local, nz, &config))
                .collect::<Vec<_>>()
        })
        .collect();

    // Superimposition, one fold per voxel
    let resolved = resolve(&all_factors);

    // Initial field + solid mask
    let mut field = VelocityField::new(grid.nx, grid.ny, nz, grid.x0, grid.y0, config.mesh_size, config.mesh_size, config.dz);
    initialize_field(&mut field, &resolved, &config);
    let solid_mask = build_solid_mask(&mut field, &blocks);
    diagnostics.points_masked_solid = solid_mask.len();

    Ok(AssembledField {
        zones,
        field,
        solid_mask,
        diagnostics,
        config,
    })
}

/// Runs the full pipeline: zone construction, point mapping, factor
/// evaluation, superimposition, field initialization, and the SOR solve.
pub fn run(inputs: PipelineInputs) -> Result<PipelineOutput> {
    let AssembledField {
        zones: _,
        mut field,
        solid_mask,
        mut diagnostics,
        config,
    } = assemble(inputs)?;

    // SOR relaxation
    solve(&mut field, &solid_mask, &config, &mut diagnostics)?;

    Ok(PipelineOutput {
        field,
        solid_mask,
        diagnostics,
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
    fn empty_domain_runs_end_to_end_and_preserves_uniform_flow() {
        let config = WindFieldConfig {
            mesh_size: 3.0,
            dz: 3.0,
            max_iterations: 5,
            ..WindFieldConfig::default()
        };
        let inputs = PipelineInputs {
            blocks: vec![],
            facets: vec![],
            vegetation: vec![],
            config,
            max_horizontal_cells: 10_000,
        };
        let output = run(inputs).unwrap();
        assert!(output.solid_mask.is_empty());
        assert!(output.field.nx >= 2);
    }

    #[test]
    fn single_block_produces_a_nonempty_solid_mask() {
        let block = StackedBlock {
            id: 1,
            footprint: square(0.0, 0.0, 10.0),
            base_height: 0.0,
            top_height: 10.0,
            displacement_length: 5.0,
            cavity_length: 5.0,
            wake_length: 10.0,
        };
        let config = WindFieldConfig {
            mesh_size: 2.0,
            dz: 2.0,
            max_iterations: 3,
            ..WindFieldConfig::default()
        };
        let inputs = PipelineInputs {
            blocks: vec![block],
            facets: vec![],
            vegetation: vec![],
            config,
            max_horizontal_cells: 100_000,
        };
        let output = run(inputs).unwrap();
        assert!(!output.solid_mask.is_empty());
        for &(i, j, k) in output.solid_mask.iter() {
            assert_eq!(*output.field.u.get(i, j, k), 0.0);
            assert_eq!(*output.field.v.get(i, j, k), 0.0);
            assert_eq!(*output.field.w.get(i, j, k), 0.0);
        }
    }
}
