// ABOUTME: Wind-factor evaluator - the closed-form formula table, one arm per zone kind
// ABOUTME: Produces one VoxelFactor per (point, z-level) a zone's vertical extent actually covers

use crate::engine::config::WindFieldConfig;
use crate::engine::geometry::{ReferenceHeightSelector, Zone, ZoneAttributes, ZoneKind};
use crate::engine::mapper::PointZoneLocal;

/// One zone's contribution to one voxel, before superimposition collapses
/// multi-zone coverage down to a single tuple per voxel.
#[derive(Debug, Clone, Copy)]
pub struct VoxelFactor {
    pub ix: usize,
    pub iy: usize,
    pub k: usize,
    pub u_f: f32,
    pub v_f: f32,
    pub w_f: f32,
    pub ref_height_selector: ReferenceHeightSelector,
    pub priority_rank: i32,
    pub source_kind: ZoneKind,
    pub owner_height: f32,
    pub y_wall: f64,
}

fn z_at_level(k: usize, dz: f32) -> f32 {
    (k as f32 + 0.5) * dz
}

/// Vegetation factor shared by `VegBuilt` (displacement `d = 0`) and
/// `VegOpen` (domain displacement height).
fn vegetation_factor(z: f32, crown_base: f32, crown_top: f32, a: f32, d: f32, z0: f32) -> f32 {
    if z <= 0.0 || z0 <= 0.0 {
        return 0.0;
    }
    let log_ref = ((crown_top - d).max(1e-3) / z0).ln();
    let log_z = (z / z0).max(1e-6).ln();
    if log_z.abs() < 1e-9 {
        return 0.0;
    }
    let base = log_ref / log_z;
    let factor = if z > crown_top {
        base
    } else if z < crown_base {
        base * (z / crown_top - 1.0).exp()
    } else {
        base * (a * (z / crown_top - 1.0)).exp()
    };
    factor.clamp(0.0, 1.0)
}

/// Evaluates one zone's formula at every z-level it covers, for one mapped
/// point. Returns an empty vec if the zone has no vertical extent at this
/// point (e.g. the point sits right on the zone boundary).
pub fn evaluate_zone_factors(
    zone: &Zone,
    local: &PointZoneLocal,
    max_k: usize,
    cfg: &WindFieldConfig,
) -> Vec<VoxelFactor> {
    let dz = cfg.dz;
    let owner_height = zone.owner_height();
    let ref_selector = zone.reference_height_selector();
    let priority_rank = zone.kind.priority_rank();
    let base = |k: usize, u_f: f32, v_f: f32, w_f: f32| VoxelFactor {
        ix: local.ix,
        iy: local.iy,
        k,
        u_f,
        v_f,
        w_f,
        ref_height_selector: ref_selector,
        priority_rank,
        source_kind: zone.kind,
        owner_height,
        y_wall: local.y_wall,
    };

    let mut out = Vec::new();
    let l_zone = local.l_zone.max(1e-6) as f32;
    // `y = point.y - Y_wall`: the point's offset from the zone's anchor
    // wall, not the wall's own absolute coordinate.
    let y_rel = (local.point_y - local.y_wall) as f32;

    match &zone.attributes {
        ZoneAttributes::Displacement { owner_height: h } => {
            let h = *h;
            for k in 0..max_k {
                let z = z_at_level(k, dz);
                let r = (y_rel / l_zone).clamp(-1.0, 1.0);
                let u_thresh = 0.6 * h * (1.0 - r * r).max(0.0).sqrt();
                if z >= u_thresh {
                    continue;
                }
                let v_f = cfg.c_dz * (z / h).max(0.0).powf(cfg.p_dz);
                out.push(base(k, 0.0, v_f, 0.0));
            }
        }
        ZoneAttributes::DisplacementVortex { owner_height: h, .. } => {
            let h = *h;
            for k in 0..max_k {
                let z = z_at_level(k, dz);
                let r = (y_rel / l_zone).clamp(-1.0, 1.0);
                let amplitude = 0.5 * h * (1.0 - r * r).max(0.0).sqrt();
                if amplitude <= 1e-6 || z >= amplitude {
                    continue;
                }
                let h_prime = z / amplitude;
                let v_f = -(0.6 * (std::f32::consts::PI * r).cos() + 0.05)
                    * 0.6
                    * (std::f32::consts::PI * h_prime).sin();
                let w_f = -0.1 * (std::f32::consts::PI * h_prime).cos() - 0.05;
                out.push(base(k, 0.0, v_f, w_f));
            }
        }
        ZoneAttributes::Cavity { owner_height: h, .. } => {
            let h = *h;
            for k in 0..max_k {
                let z = z_at_level(k, dz);
                let r = (y_rel / l_zone).clamp(-1.0, 1.0);
                let envelope = h * (1.0 - r * r).max(0.0).sqrt();
                if z >= envelope {
                    continue;
                }
                let zh = (z / h).clamp(0.0, 0.999);
                let inner = 1.0 - zh * zh;
                if inner <= 0.0 {
                    continue;
                }
                let v_f = -(1.0 - r / inner.sqrt()).powi(2);
                out.push(base(k, 0.0, v_f, 0.0));
            }
        }
        ZoneAttributes::Wake {
            owner_height: h,
            cavity_length,
            ..
        } => {
            let h = *h;
            for k in 0..max_k {
                let z = z_at_level(k, dz);
                let r = (y_rel / l_zone).clamp(-1.0, 1.0);
                let envelope = h * (1.0 - r * r).max(0.0).sqrt();
                if z >= envelope {
                    continue;
                }
                let zh = (z / h).clamp(0.0, 1.0);
                let v_f = 1.0 - (cavity_length / l_zone).powf(1.5) * (1.0 - zh * zh).max(0.0).powf(1.5);
                out.push(base(k, 0.0, v_f, 0.0));
            }
        }
        ZoneAttributes::StreetCanyon {
            upstream_height,
            downstream_height,
            theta,
        } => {
            let ceiling = upstream_height.min(*downstream_height);
            let theta_off = theta - std::f32::consts::FRAC_PI_2;
            for k in 0..max_k {
                let z = z_at_level(k, dz);
                if z >= ceiling {
                    continue;
                }
                let dy = -y_rel;
                let u_f = (2.0 * theta_off).sin()
                    * (0.5 + dy * (l_zone - dy) / (0.5 * l_zone * l_zone));
                let v_f = 1.0 - theta_off.cos().powi(2) * (1.0 + dy * (l_zone - dy) / (0.25 * l_zone * l_zone));
                let w_f = -(0.5 * (1.0 - dy / (0.5 * l_zone))).abs() * (1.0 - (l_zone - dy) / (0.5 * l_zone));
                out.push(base(k, u_f, v_f, w_f));
            }
        }
        ZoneAttributes::RooftopPerp {
            owner_height: h,
            perp_length,
            perp_height,
        } => {
            let h = *h;
            for k in 0..max_k {
                let z = z_at_level(k, dz);
                // RooftopPerp's Y_wall sits at the facet, and the zone runs
                // downwind from there, so distance along the zone from the
                // facet is the negated relative offset.
                let y = -y_rel;
                let delta_h = perp_height * (1.0 - ((y - perp_length / 2.0) / perp_length).powi(2)).max(0.0).sqrt();
                if !(z > h && z < h + delta_h) || delta_h <= 1e-6 {
                    continue;
                }
                let v_f = -((h + delta_h - z) / cfg.z_ref).max(0.0).powf(cfg.p_rtp)
                    * (h + delta_h - z).abs()
                    / delta_h;
                out.push(base(k, 0.0, v_f, 0.0));
            }
        }
        ZoneAttributes::RooftopCorner {
            owner_height: h,
            theta,
            corner_length,
            facade_length,
            ..
        } => {
            let h = *h;
            let kappa = 1.0; // precomputed wind factor derived from theta; literature value
            let angle_offset = (theta - std::f32::consts::FRAC_PI_2).abs();
            // distance from the corner anchor, normalized by the facade
            // extent the zone was built from; the wedge's wind effect
            // decays to nothing at the far edge of the facade.
            let denom = (*facade_length as f64 * angle_offset.cos() as f64).max(1e-6);
            let anchor_ratio = (local.anchor_distance.unwrap_or(0.0) / denom) as f32;
            let decay = (1.0 - anchor_ratio * anchor_ratio).max(0.0).sqrt();
            let delta_h = corner_length.abs().min(h) * decay;
            for k in 0..max_k {
                let z = z_at_level(k, dz);
                if !(z > h && z < h + delta_h) || delta_h <= 1e-6 {
                    continue;
                }
                let ratio = ((h + delta_h - z) / cfg.z_ref).max(0.0).powf(cfg.p_rtp) * (h + delta_h - z).abs()
                    / delta_h;
                let u_f = -kappa * (2.0 * theta).sin() * ratio;
                let v_f = -kappa * theta.sin().powi(2) * ratio;
                out.push(base(k, u_f, v_f, 0.0));
            }
        }
        ZoneAttributes::Vegetation {
            crown_base,
            crown_top,
            attenuation,
        } => {
            let d = if zone.kind == ZoneKind::VegBuilt {
                0.0
            } else {
                cfg.displacement_height
            };
            for k in 0..max_k {
                let z = z_at_level(k, dz);
                let v_f = vegetation_factor(z, *crown_base, *crown_top, *attenuation, d, cfg.z0);
                out.push(base(k, 1.0, v_f, 1.0));
            }
        }
    }

    out
}
