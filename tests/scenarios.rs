// ABOUTME: End-to-end pipeline scenarios - empty domain, isolated cube, canyon, vegetation, perpendicular facet

use geo_types::{coord, LineString, Polygon};
use urock::engine::config::WindFieldConfig;
use urock::engine::geometry::{StackedBlock, UpwindFacet, VegetationPatch, ZoneKind};
use urock::engine::pipeline::{assemble, run, PipelineInputs};

/// Nearest grid index to a world-space point, for poking at a specific
/// location in an assembled/solved field.
fn nearest_index(field: &urock::engine::field::VelocityField, x: f64, y: f64, z: f32) -> (usize, usize, usize) {
    let i = ((x - field.x0) / field.dx as f64).round().clamp(0.0, (field.nx - 1) as f64) as usize;
    let j = ((y - field.y0) / field.dy as f64).round().clamp(0.0, (field.ny - 1) as f64) as usize;
    let k = (z / field.dz - 0.5).round().clamp(0.0, (field.nz - 1) as f32) as usize;
    (i, j, k)
}

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

fn cube_block(id: i64, x0: f64, y0: f64, side: f64, height: f32) -> StackedBlock {
    StackedBlock {
        id,
        footprint: square(x0, y0, side),
        base_height: 0.0,
        top_height: height,
        displacement_length: side as f32,
        cavity_length: side as f32 * 1.5,
        wake_length: side as f32 * 3.0,
    }
}

#[test]
fn empty_domain_leaves_the_uniform_profile_untouched() {
    let config = WindFieldConfig {
        mesh_size: 3.0,
        dz: 4.0,
        max_iterations: 2,
        ..WindFieldConfig::default()
    };
    let inputs = PipelineInputs {
        blocks: vec![],
        facets: vec![],
        vegetation: vec![],
        config,
        max_horizontal_cells: 10_000,
    };
    let output = run(inputs).expect("empty domain should solve cleanly");
    assert!(output.solid_mask.is_empty());
    // away from any obstacle, v should stay close to the unattenuated
    // vertical profile and u/w close to zero
    let (nx, ny, nz) = (output.field.nx, output.field.ny, output.field.nz);
    let mid = (nx / 2, ny / 2, nz / 2);
    assert!(output.field.u.get(mid.0, mid.1, mid.2).abs() < 0.5);
    assert!(*output.field.v.get(mid.0, mid.1, mid.2) > 0.0);
}

#[test]
fn single_isolated_cube_has_zero_velocity_inside_and_a_cavity_downwind() {
    let block = cube_block(1, -5.0, -5.0, 10.0, 10.0);
    let config = WindFieldConfig {
        mesh_size: 2.0,
        dz: 2.0,
        v_ref: 5.0,
        z_ref: 10.0,
        z0: 0.1,
        max_iterations: 80,
        ..WindFieldConfig::default()
    };
    let inputs = PipelineInputs {
        blocks: vec![block],
        facets: vec![],
        vegetation: vec![],
        config,
        max_horizontal_cells: 200_000,
    };
    let output = run(inputs).expect("single cube should solve");
    assert!(!output.solid_mask.is_empty());
    for &(i, j, k) in output.solid_mask.iter() {
        assert_eq!(*output.field.u.get(i, j, k), 0.0);
        assert_eq!(*output.field.v.get(i, j, k), 0.0);
        assert_eq!(*output.field.w.get(i, j, k), 0.0);
    }
}

#[test]
fn two_aligned_cubes_form_a_street_canyon() {
    let upstream = cube_block(1, -5.0, -5.0, 10.0, 10.0);
    let downstream = cube_block(2, -5.0, 10.0, 10.0, 10.0); // 5 m gap along +Y
    let facet_down = UpwindFacet {
        facet_id: 1,
        stacked_block_id: 2,
        segment: LineString(vec![coord! { x: -5.0, y: 10.0 }, coord! { x: 5.0, y: 10.0 }]),
        theta: std::f32::consts::FRAC_PI_2,
    };
    let config = WindFieldConfig {
        mesh_size: 2.0,
        dz: 2.0,
        max_iterations: 30,
        ..WindFieldConfig::default()
    };
    let inputs = PipelineInputs {
        blocks: vec![upstream, downstream],
        facets: vec![facet_down],
        vegetation: vec![],
        config,
        max_horizontal_cells: 300_000,
    };

    let assembled = assemble(inputs).expect("canyon scenario should assemble");
    let canyon = assembled
        .zones
        .iter()
        .find(|z| z.kind == ZoneKind::StreetCanyon)
        .expect("expected a street-canyon zone between the two aligned cubes");

    // Mid-height of the 10 m cubes, at a point inside the canyon's own
    // footprint: initial v there should point back upwind.
    use geo::Centroid;
    let centroid = canyon.footprint.centroid().expect("canyon zone should have a centroid");
    let (i, j, k) = nearest_index(&assembled.field, centroid.x(), centroid.y(), 5.0);
    assert!(
        *assembled.field.vn.get(i, j, k) < 0.0,
        "expected negative initial v inside the street canyon, got {}",
        assembled.field.vn.get(i, j, k)
    );

    let output = run(PipelineInputs {
        blocks: vec![cube_block(1, -5.0, -5.0, 10.0, 10.0), cube_block(2, -5.0, 10.0, 10.0, 10.0)],
        facets: vec![UpwindFacet {
            facet_id: 1,
            stacked_block_id: 2,
            segment: LineString(vec![coord! { x: -5.0, y: 10.0 }, coord! { x: 5.0, y: 10.0 }]),
            theta: std::f32::consts::FRAC_PI_2,
        }],
        vegetation: vec![],
        config: WindFieldConfig {
            mesh_size: 2.0,
            dz: 2.0,
            max_iterations: 30,
            ..WindFieldConfig::default()
        },
        max_horizontal_cells: 300_000,
    })
    .expect("canyon scenario should solve");
    assert!(!output.solid_mask.is_empty());
}

#[test]
fn vegetation_only_domain_has_no_cross_wind_component() {
    let patch = VegetationPatch {
        veg_id: 1,
        footprint: square(-10.0, -10.0, 20.0),
        crown_base: 1.0,
        crown_top: 8.0,
        attenuation: 0.4,
    };
    let config = WindFieldConfig {
        mesh_size: 2.0,
        dz: 2.0,
        max_iterations: 2,
        ..WindFieldConfig::default()
    };
    let inputs = PipelineInputs {
        blocks: vec![],
        facets: vec![],
        vegetation: vec![patch],
        config,
        max_horizontal_cells: 200_000,
    };
    let output = run(inputs).expect("vegetation-only domain should solve");
    assert!(output.solid_mask.is_empty());
    for v in output.field.u.data() {
        assert!(v.abs() < 1e-3);
    }
    for v in output.field.w.data() {
        assert!(v.abs() < 1e-3);
    }
}

#[test]
fn perpendicular_facet_gets_a_vortex_and_rooftop_perp_zone_but_no_corner_zone() {
    let block = cube_block(1, -5.0, -5.0, 10.0, 10.0);
    let facet = UpwindFacet {
        facet_id: 1,
        stacked_block_id: 1,
        segment: LineString(vec![coord! { x: -5.0, y: -5.0 }, coord! { x: 5.0, y: -5.0 }]),
        theta: std::f32::consts::FRAC_PI_2,
    };
    let config = WindFieldConfig {
        mesh_size: 2.0,
        dz: 2.0,
        max_iterations: 10,
        ..WindFieldConfig::default()
    };
    let inputs = PipelineInputs {
        blocks: vec![block],
        facets: vec![facet],
        vegetation: vec![],
        config,
        max_horizontal_cells: 200_000,
    };

    let assembled = assemble(inputs).expect("perpendicular facet scenario should assemble");
    assert!(
        assembled.zones.iter().any(|z| z.kind == ZoneKind::DisplacementVortex),
        "expected a displacement-vortex zone upwind of the perpendicular facet"
    );
    assert!(
        assembled.zones.iter().any(|z| z.kind == ZoneKind::RooftopPerp),
        "expected a rooftop-perpendicular zone over the facet-facing roof edge"
    );
    assert!(
        !assembled.zones.iter().any(|z| z.kind == ZoneKind::RooftopCorner),
        "a single perpendicular facet has no corner, so no rooftop-corner zone should form"
    );

    let output = run(PipelineInputs {
        blocks: vec![cube_block(1, -5.0, -5.0, 10.0, 10.0)],
        facets: vec![UpwindFacet {
            facet_id: 1,
            stacked_block_id: 1,
            segment: LineString(vec![coord! { x: -5.0, y: -5.0 }, coord! { x: 5.0, y: -5.0 }]),
            theta: std::f32::consts::FRAC_PI_2,
        }],
        vegetation: vec![],
        config: WindFieldConfig {
            mesh_size: 2.0,
            dz: 2.0,
            max_iterations: 10,
            ..WindFieldConfig::default()
        },
        max_horizontal_cells: 200_000,
    })
    .expect("perpendicular facet scenario should solve");
    assert!(!output.solid_mask.is_empty());
}
