// ABOUTME: Zone geometry builder - turns stacked blocks, facets, and vegetation into zone footprints
// ABOUTME: Each function below grows one Röckle zone kind; build_all_zones stitches them into one list

use geo::{Area, BooleanOps, EuclideanLength};
use geo_types::{coord, Coord, LineString, Polygon};

use crate::engine::config::WindFieldConfig;
use crate::engine::diagnostics::RunDiagnostics;
use crate::engine::error::WindFieldError;
use crate::engine::geometry::ellipse::{ellipse_polygon, polygon_split_correction};
use crate::engine::geometry::ops;
use crate::engine::geometry::types::{StackedBlock, UpwindFacet, VegetationPatch};
use crate::engine::geometry::zone::{Zone, ZoneAttributes, ZoneKind};

const FRAC_PI_2: f32 = std::f32::consts::FRAC_PI_2;

fn midpoint(segment: &LineString<f64>) -> Coord<f64> {
    let first = segment.0[0];
    let last = *segment.0.last().unwrap();
    coord! { x: (first.x + last.x) / 2.0, y: (first.y + last.y) / 2.0 }
}

/// Builds the half-ellipse displacement (or displacement-vortex) zone for
/// one facet, given the along-wind length to use for the vertical semi-axis.
/// Returns `None` when the ellipse degenerates or the split produces no
/// upwind half.
fn build_half_ellipse_zone(
    facet: &UpwindFacet,
    length: f32,
    cfg: &WindFieldConfig,
) -> Option<Polygon<f64>> {
    let theta = facet.theta;
    let r_y = (length as f64) * (theta.sin() as f64).powi(2);
    if r_y < cfg.ellipsoid_min_length as f64 {
        return None;
    }
    let r_x = facet.length() / 2.0;
    let center = midpoint(&facet.segment);
    // rotate so the ellipse's minor axis aligns with the wind as seen from
    // this facet
    let rotation = (FRAC_PI_2 - theta) as f64;
    let ellipse = ellipse_polygon(center, r_x, r_y, rotation, cfg.npoints_ellipse);

    let (side_one, side_two) = ops::split_by_line(&ellipse, &facet.segment);
    let delta = polygon_split_correction(r_x, r_y, cfg.npoints_ellipse) as f32;
    let keep_side_two = theta >= FRAC_PI_2 - delta;
    let kept = if keep_side_two { side_two } else { side_one };
    ops::largest_polygon(&kept)
}

pub fn build_displacement_zone(
    facet: &UpwindFacet,
    block: &StackedBlock,
    cfg: &WindFieldConfig,
) -> Result<Option<Zone>, WindFieldError> {
    let poly = match build_half_ellipse_zone(facet, block.displacement_length, cfg) {
        Some(p) => p,
        None => return Ok(None),
    };
    if poly.unsigned_area() < 1e-9 {
        return Ok(None);
    }
    Ok(Some(Zone {
        kind: ZoneKind::Displacement,
        footprint: poly,
        origin_entity_id: facet.facet_id,
        attributes: ZoneAttributes::Displacement {
            owner_height: block.height(),
        },
    }))
}

pub fn build_displacement_vortex_zone(
    facet: &UpwindFacet,
    block: &StackedBlock,
    vortex_length: f32,
    cfg: &WindFieldConfig,
) -> Result<Option<Zone>, WindFieldError> {
    if !facet.is_near_perpendicular(cfg.perpendicular_threshold_deg.to_radians()) {
        return Ok(None);
    }
    let poly = match build_half_ellipse_zone(facet, vortex_length, cfg) {
        Some(p) => p,
        None => return Ok(None),
    };
    if poly.unsigned_area() < 1e-9 {
        return Ok(None);
    }
    Ok(Some(Zone {
        kind: ZoneKind::DisplacementVortex,
        footprint: poly,
        origin_entity_id: facet.facet_id,
        attributes: ZoneAttributes::DisplacementVortex {
            owner_height: block.height(),
            vortex_length,
        },
    }))
}

/// Builds an ellipse centered on the downwind edge of a block's envelope,
/// unioned with the envelope itself, then split to keep only the downwind
/// half. Shared by the cavity and wake construction (wake just uses `length`
/// in place of the cavity length).
fn build_envelope_ellipse_zone(block: &StackedBlock, length: f32, cfg: &WindFieldConfig) -> Option<Polygon<f64>> {
    use geo::BoundingRect;
    let envelope = block.footprint.bounding_rect()?;
    let width = envelope.width();
    if width < cfg.ellipsoid_min_length as f64 {
        return None;
    }
    // downwind edge = min-Y edge in wind-aligned coordinates
    let min_y = envelope.min().y;
    let center = coord! { x: (envelope.min().x + envelope.max().x) / 2.0, y: min_y };
    let ellipse = ellipse_polygon(center, width / 2.0, length as f64, 0.0, cfg.npoints_ellipse);

    let envelope_poly: Polygon<f64> = envelope.to_polygon();
    let unioned = ops::union(&ellipse, &envelope_poly);
    let unioned_poly = ops::largest_polygon(&unioned)?;
    let snapped = ops::snap_round(&unioned_poly, cfg.snapping_tolerance as f64);

    let outline = block.footprint.exterior().clone();
    let (below, above) = ops::split_by_line(&snapped, &outline);
    // downwind half is the one whose centroid has smaller Y than the block
    use geo::Centroid;
    let pick = |mp: &geo_types::MultiPolygon<f64>| -> Option<Polygon<f64>> {
        ops::largest_polygon(mp)
    };
    let below_poly = pick(&below);
    let above_poly = pick(&above);
    match (below_poly, above_poly) {
        (Some(b), Some(a)) => {
            let block_centroid_y = block.footprint.centroid().map(|c| c.y()).unwrap_or(0.0);
            let b_y = b.centroid().map(|c| c.y()).unwrap_or(f64::MAX);
            let a_y = a.centroid().map(|c| c.y()).unwrap_or(f64::MAX);
            Some(if b_y < block_centroid_y && b_y <= a_y { b } else { a })
        }
        (Some(b), None) => Some(b),
        (None, Some(a)) => Some(a),
        (None, None) => None,
    }
}

pub fn build_cavity_zone(block: &StackedBlock, cfg: &WindFieldConfig) -> Result<Option<Zone>, WindFieldError> {
    let poly = match build_envelope_ellipse_zone(block, block.cavity_length, cfg) {
        Some(p) => p,
        None => return Ok(None),
    };
    if poly.unsigned_area() < 1e-9 {
        return Ok(None);
    }
    Ok(Some(Zone {
        kind: ZoneKind::Cavity,
        footprint: poly,
        origin_entity_id: block.id,
        attributes: ZoneAttributes::Cavity {
            owner_height: block.height(),
            cavity_length: block.cavity_length,
        },
    }))
}

pub fn build_wake_zone(block: &StackedBlock, cfg: &WindFieldConfig) -> Result<Option<Zone>, WindFieldError> {
    let poly = match build_envelope_ellipse_zone(block, block.wake_length, cfg) {
        Some(p) => p,
        None => return Ok(None),
    };
    if poly.unsigned_area() < 1e-9 {
        return Ok(None);
    }
    Ok(Some(Zone {
        kind: ZoneKind::Wake,
        footprint: poly,
        origin_entity_id: block.id,
        attributes: ZoneAttributes::Wake {
            owner_height: block.height(),
            cavity_length: block.cavity_length,
            wake_length: block.wake_length,
        },
    }))
}

/// Builds the street-canyon trapezoid between a downstream block's upwind
/// facet and an upstream block whose cavity zone intersects that facet.
pub fn build_street_canyon_zone(
    facet_down: &UpwindFacet,
    block_down: &StackedBlock,
    block_up: &StackedBlock,
    cavity_up: &Zone,
    cfg: &WindFieldConfig,
) -> Result<Option<Zone>, WindFieldError> {
    let intersection = ops::intersection(&cavity_up.footprint, &{
        // buffer the facet segment into a thin sliver polygon to intersect against
        let pts = &facet_down.segment.0;
        if pts.len() < 2 {
            return Ok(None);
        }
        Polygon::new(LineString(vec![pts[0], pts[1], pts[1], pts[0], pts[0]]), vec![])
    });
    if ops::is_empty(&intersection) {
        return Ok(None);
    }

    // Δy_up + Lc_up: the upstream block's own along-wind extent plus its
    // cavity length, per the street-canyon extrusion depth in §4.1.
    use geo::BoundingRect;
    let delta_y_up = block_up
        .footprint
        .bounding_rect()
        .map(|r| r.height())
        .unwrap_or(0.0) as f32;
    let upstream_depth = delta_y_up + block_up.cavity_length;
    let envelope = ops::largest_polygon(&intersection);
    let envelope = match envelope {
        Some(e) => e,
        None => return Ok(None),
    };

    // extrude upwind by the upstream block's own depth: scale the
    // intersection envelope's bounding box along +Y.
    let bbox = match envelope.bounding_rect() {
        Some(b) => b,
        None => return Ok(None),
    };
    let trapezoid = Polygon::new(
        LineString(vec![
            coord! { x: bbox.min().x, y: bbox.min().y },
            coord! { x: bbox.max().x, y: bbox.min().y },
            coord! { x: bbox.max().x, y: bbox.min().y + upstream_depth as f64 },
            coord! { x: bbox.min().x, y: bbox.min().y + upstream_depth as f64 },
            coord! { x: bbox.min().x, y: bbox.min().y },
        ]),
        vec![],
    );

    let remainder = ops::difference(&trapezoid, &block_up.footprint);
    let poly = match ops::largest_polygon(&remainder) {
        Some(p) if p.unsigned_area() > 1e-9 => p,
        _ => return Ok(None),
    };

    Ok(Some(Zone {
        kind: ZoneKind::StreetCanyon,
        footprint: poly,
        origin_entity_id: facet_down.facet_id,
        attributes: ZoneAttributes::StreetCanyon {
            upstream_height: block_up.height(),
            downstream_height: block_down.height(),
            theta: facet_down.theta,
        },
    }))
}

pub fn build_rooftop_perp_zone(
    facet: &UpwindFacet,
    block: &StackedBlock,
    cfg: &WindFieldConfig,
) -> Result<Option<Zone>, WindFieldError> {
    if !facet.is_near_perpendicular(cfg.perpendicular_threshold_deg.to_radians()) {
        return Ok(None);
    }
    let height = block.height();
    let perp_length = cfg.rooftop_perp_length_factor * height;
    let perp_height = cfg.rooftop_perp_height_factor * height;
    if perp_length < 1e-6 {
        return Ok(None);
    }

    let first = facet.segment.0[0];
    let last = *facet.segment.0.last().unwrap();
    let dx = last.x - first.x;
    let dy = last.y - first.y;
    let len = (dx * dx + dy * dy).sqrt().max(1e-9);
    // inward normal (downwind along the roof)
    let nx = -dy / len;
    let ny = dx / len;

    let rect = Polygon::new(
        LineString(vec![
            first,
            last,
            coord! { x: last.x + nx * perp_length as f64, y: last.y + ny * perp_length as f64 },
            coord! { x: first.x + nx * perp_length as f64, y: first.y + ny * perp_length as f64 },
            first,
        ]),
        vec![],
    );

    let clipped = ops::intersection(&rect, &block.footprint);
    let poly = match ops::largest_polygon(&clipped) {
        Some(p) if p.unsigned_area() > 1e-9 => p,
        _ => return Ok(None),
    };

    Ok(Some(Zone {
        kind: ZoneKind::RooftopPerp,
        footprint: poly,
        origin_entity_id: facet.facet_id,
        attributes: ZoneAttributes::RooftopPerp {
            owner_height: height,
            perp_length,
            perp_height,
        },
    }))
}

pub fn build_rooftop_corner_zone(
    facet: &UpwindFacet,
    block: &StackedBlock,
    cfg: &WindFieldConfig,
) -> Result<Option<Zone>, WindFieldError> {
    let offset = (facet.theta - FRAC_PI_2).abs();
    let lo = cfg.corner_threshold_lo_deg.to_radians();
    let hi = cfg.corner_threshold_hi_deg.to_radians();
    if !(offset > lo && offset < hi) {
        return Ok(None);
    }

    let facade_length = facet.length() as f32;
    let corner_length =
        cfg.rooftop_corner_length_factor * 2.0 * facade_length * (2.94 * (0.0297 * offset).exp()).tan();
    if corner_length.abs() < 1e-6 {
        return Ok(None);
    }

    let anchor = facet.segment.0[0];
    let last = *facet.segment.0.last().unwrap();
    let dx = last.x - anchor.x;
    let dy = last.y - anchor.y;
    let len = (dx * dx + dy * dy).sqrt().max(1e-9);
    let tx = dx / len;
    let ty = dy / len;
    let sign = if facet.theta < FRAC_PI_2 { 1.0 } else { -1.0 };
    let tip = coord! {
        x: anchor.x + tx * (corner_length as f64) * sign,
        y: anchor.y + ty * (corner_length as f64) * sign,
    };
    let wedge = Polygon::new(LineString(vec![anchor, last, tip, anchor]), vec![]);

    let clipped = ops::intersection(&wedge, &block.footprint);
    let poly = match ops::largest_polygon(&clipped) {
        Some(p) if p.unsigned_area() > 1e-9 => p,
        _ => return Ok(None),
    };

    Ok(Some(Zone {
        kind: ZoneKind::RooftopCorner,
        footprint: poly,
        origin_entity_id: facet.facet_id,
        attributes: ZoneAttributes::RooftopCorner {
            owner_height: block.height(),
            theta: facet.theta,
            corner_length,
            facade_length,
            anchor,
        },
    }))
}

/// `VegBuilt = patch ∩ (union of wake zones)`; `VegOpen = patch \ VegBuilt`.
pub fn build_vegetation_zones(
    patch: &VegetationPatch,
    wake_union: &geo_types::MultiPolygon<f64>,
) -> (Option<Zone>, Option<Zone>) {
    let built_mp = {
        let mut acc = geo_types::MultiPolygon::new(vec![]);
        for wake_poly in &wake_union.0 {
            acc = acc.union(&ops::intersection(&patch.footprint, wake_poly));
        }
        acc
    };
    let built = if ops::is_empty(&built_mp) {
        None
    } else {
        ops::largest_polygon(&built_mp).map(|poly| Zone {
            kind: ZoneKind::VegBuilt,
            footprint: poly,
            origin_entity_id: patch.veg_id,
            attributes: ZoneAttributes::Vegetation {
                crown_base: patch.crown_base,
                crown_top: patch.crown_top,
                attenuation: patch.attenuation,
            },
        })
    };

    let open_mp = match &built {
        Some(b) => ops::difference(&patch.footprint, &b.footprint),
        None => geo_types::MultiPolygon::new(vec![patch.footprint.clone()]),
    };
    let open = if ops::is_empty(&open_mp) {
        None
    } else {
        ops::largest_polygon(&open_mp).map(|poly| Zone {
            kind: ZoneKind::VegOpen,
            footprint: poly,
            origin_entity_id: patch.veg_id,
            attributes: ZoneAttributes::Vegetation {
                crown_base: patch.crown_base,
                crown_top: patch.crown_top,
                attenuation: patch.attenuation,
            },
        })
    };

    (built, open)
}

/// Runs every zone constructor over the full input set, in dependency order
/// (displacement/cavity/wake/rooftop per-facet and per-block first, then
/// street canyon which needs the cavity zones, then vegetation which needs
/// the wake union). Degenerate zones are dropped and counted, never treated
/// as an error.
pub fn build_all_zones(
    blocks: &[StackedBlock],
    facets: &[UpwindFacet],
    vegetation: &[VegetationPatch],
    cfg: &WindFieldConfig,
    diagnostics: &mut RunDiagnostics,
) -> Vec<Zone> {
    let mut zones = Vec::new();
    let block_by_id = |id: i64| blocks.iter().find(|b| b.id == id);

    let mut cavities = Vec::new();
    for block in blocks {
        match build_cavity_zone(block, cfg) {
            Ok(Some(z)) => cavities.push((block.id, z)),
            Ok(None) => diagnostics.zones_skipped_degenerate += 1,
            Err(_) => diagnostics.zones_skipped_degenerate += 1,
        }
        match build_wake_zone(block, cfg) {
            Ok(Some(z)) => zones.push(z),
            Ok(None) => diagnostics.zones_skipped_degenerate += 1,
            Err(_) => diagnostics.zones_skipped_degenerate += 1,
        }
    }
    for (_, cavity) in &cavities {
        zones.push(cavity.clone());
    }

    for facet in facets {
        let block = match block_by_id(facet.stacked_block_id) {
            Some(b) => b,
            None => continue,
        };
        for result in [
            build_displacement_zone(facet, block, cfg),
            build_displacement_vortex_zone(facet, block, block.displacement_length * 0.5, cfg),
            build_rooftop_perp_zone(facet, block, cfg),
            build_rooftop_corner_zone(facet, block, cfg),
        ] {
            match result {
                Ok(Some(z)) => zones.push(z),
                Ok(None) => diagnostics.zones_skipped_degenerate += 1,
                Err(_) => diagnostics.zones_skipped_degenerate += 1,
            }
        }

        for (up_id, cavity_up) in &cavities {
            if *up_id == block.id {
                continue;
            }
            let block_up = match block_by_id(*up_id) {
                Some(b) => b,
                None => continue,
            };
            if let Ok(Some(z)) = build_street_canyon_zone(facet, block, block_up, cavity_up, cfg) {
                zones.push(z);
            }
        }
    }

    let wake_union = {
        let wakes: Vec<Polygon<f64>> = zones
            .iter()
            .filter(|z| z.kind == ZoneKind::Wake)
            .map(|z| z.footprint.clone())
            .collect();
        ops::union_all(&wakes)
    };
    for patch in vegetation {
        let (built, open) = build_vegetation_zones(patch, &wake_union);
        if built.is_none() && open.is_none() {
            diagnostics.zones_skipped_degenerate += 1;
        }
        zones.extend(built);
        zones.extend(open);
    }

    zones
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{coord, LineString, Polygon};

    fn square_block(id: i64, x0: f64, y0: f64, side: f64, height: f32) -> StackedBlock {
        StackedBlock {
            id,
            footprint: Polygon::new(
                LineString(vec![
                    coord! { x: x0, y: y0 },
                    coord! { x: x0 + side, y: y0 },
                    coord! { x: x0 + side, y: y0 + side },
                    coord! { x: x0, y: y0 + side },
                    coord! { x: x0, y: y0 },
                ]),
                vec![],
            ),
            base_height: 0.0,
            top_height: height,
            displacement_length: side as f32,
            cavity_length: side as f32,
            wake_length: (side * 2.0) as f32,
        }
    }

    #[test]
    fn cavity_zone_is_nonempty_for_a_simple_cube() {
        let block = square_block(1, 0.0, 0.0, 10.0, 10.0);
        let cfg = WindFieldConfig::default();
        let zone = build_cavity_zone(&block, &cfg).unwrap();
        assert!(zone.is_some());
    }

    #[test]
    fn wake_zone_covers_more_area_than_cavity_zone() {
        let block = square_block(1, 0.0, 0.0, 10.0, 10.0);
        let cfg = WindFieldConfig::default();
        let cavity = build_cavity_zone(&block, &cfg).unwrap().unwrap();
        let wake = build_wake_zone(&block, &cfg).unwrap().unwrap();
        assert!(wake.footprint.unsigned_area() >= cavity.footprint.unsigned_area() - 1e-6);
    }

    #[test]
    fn rooftop_corner_zone_is_absent_for_a_near_parallel_facet() {
        let facet = UpwindFacet {
            facet_id: 1,
            stacked_block_id: 1,
            segment: LineString(vec![coord! { x: 0.0, y: 0.0 }, coord! { x: 10.0, y: 0.0 }]),
            theta: 0.05,
        };
        let block = square_block(1, 0.0, -10.0, 10.0, 10.0);
        let cfg = WindFieldConfig::default();
        let zone = build_rooftop_corner_zone(&facet, &block, &cfg).unwrap();
        assert!(zone.is_none());
    }

    #[test]
    fn rooftop_perp_zone_is_present_for_a_perpendicular_facet() {
        let facet = UpwindFacet {
            facet_id: 1,
            stacked_block_id: 1,
            segment: LineString(vec![coord! { x: 0.0, y: 0.0 }, coord! { x: 10.0, y: 0.0 }]),
            theta: FRAC_PI_2,
        };
        let block = square_block(1, 0.0, -10.0, 10.0, 10.0);
        let cfg = WindFieldConfig::default();
        let zone = build_rooftop_perp_zone(&facet, &block, &cfg).unwrap();
        assert!(zone.is_some());
    }
}
