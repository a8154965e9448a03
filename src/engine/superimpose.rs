// ABOUTME: Superimposition resolver - three-pass fold from many per-zone factors to one per voxel
// ABOUTME: Pass 1 picks a winner by lexicographic key, Pass 2 weights it, Pass 3 multiplies in vegetation

use std::collections::HashMap;

use crate::engine::factors::VoxelFactor;
use crate::engine::geometry::{ReferenceHeightSelector, SuperimpositionRole, ZoneKind};

/// A voxel's final factor tuple after all three passes. `owner_height` and
/// `ref_height_selector` are `None` when the voxel was touched only by
/// vegetation (no priority/weighting zone covered it).
#[derive(Debug, Clone, Copy)]
pub struct ResolvedVoxel {
    pub ix: usize,
    pub iy: usize,
    pub k: usize,
    pub u_f: f32,
    pub v_f: f32,
    pub w_f: f32,
    pub ref_height_selector: Option<ReferenceHeightSelector>,
    pub owner_height: Option<f32>,
}

fn lex_key(f: &VoxelFactor) -> (i64, i64, i32) {
    // quantize y_wall so it compares exactly; owner_height similarly
    (
        (f.y_wall * 1_000.0).round() as i64,
        (f.owner_height * 1_000.0).round() as i64,
        f.priority_rank,
    )
}

fn pick_winner<'a>(candidates: impl Iterator<Item = &'a VoxelFactor>) -> Option<&'a VoxelFactor> {
    candidates.max_by_key(|f| lex_key(f))
}

/// Runs the full three-pass resolution over every contribution, which may
/// come from multiple zones covering the same voxel.
pub fn resolve(factors: &[VoxelFactor]) -> Vec<ResolvedVoxel> {
    let mut by_voxel: HashMap<(usize, usize, usize), Vec<&VoxelFactor>> = HashMap::new();
    for f in factors {
        by_voxel.entry((f.ix, f.iy, f.k)).or_default().push(f);
    }

    let mut out = Vec::with_capacity(by_voxel.len());
    for ((ix, iy, k), contribs) in by_voxel {
        let priority = pick_winner(
            contribs
                .iter()
                .copied()
                .filter(|f| f.source_kind.superimposition_role() == SuperimpositionRole::Priority),
        );
        let weighting = pick_winner(
            contribs
                .iter()
                .copied()
                .filter(|f| f.source_kind.superimposition_role() == SuperimpositionRole::Weighting),
        );

        let (mut u_f, mut v_f, mut w_f, mut ref_sel, mut owner_height) = match priority {
            Some(p) => (p.u_f, p.v_f, p.w_f, Some(p.ref_height_selector), Some(p.owner_height)),
            None => (1.0, 1.0, 1.0, None, None),
        };

        if let (Some(p), Some(wt)) = (priority, weighting) {
            let more_upstream = wt.y_wall > p.y_wall
                || ((wt.y_wall - p.y_wall).abs() < 1e-9 && wt.owner_height > p.owner_height);
            if more_upstream {
                u_f *= wt.u_f;
                v_f *= wt.v_f;
                w_f *= wt.w_f;
                ref_sel = Some(ReferenceHeightSelector::ReferenceSensorHeight);
            }
        } else if priority.is_none() {
            if let Some(wt) = weighting {
                u_f *= wt.u_f;
                v_f *= wt.v_f;
                w_f *= wt.w_f;
                ref_sel = Some(ReferenceHeightSelector::ReferenceSensorHeight);
                owner_height = Some(wt.owner_height);
            }
        }

        let veg = pick_winner(contribs.iter().copied().filter(|f| {
            matches!(f.source_kind, ZoneKind::VegBuilt | ZoneKind::VegOpen)
        }));
        if let Some(v) = veg {
            v_f *= v.v_f;
            if ref_sel.is_none() {
                ref_sel = Some(ReferenceHeightSelector::ReferenceSensorHeight);
            }
        }

        out.push(ResolvedVoxel {
            ix,
            iy,
            k,
            u_f,
            v_f,
            w_f,
            ref_height_selector: ref_sel,
            owner_height,
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn factor(
        ix: usize,
        y_wall: f64,
        owner_height: f32,
        priority_rank: i32,
        kind: ZoneKind,
        v_f: f32,
    ) -> VoxelFactor {
        VoxelFactor {
            ix,
            iy: 0,
            k: 0,
            u_f: 0.0,
            v_f,
            w_f: 0.0,
            ref_height_selector: kind.default_reference_height_selector(),
            priority_rank,
            source_kind: kind,
            owner_height,
            y_wall,
        }
    }

    #[test]
    fn pass_one_keeps_only_one_candidate_per_voxel() {
        let factors = vec![
            factor(0, 10.0, 5.0, 2, ZoneKind::Cavity, -0.5),
            factor(0, 20.0, 5.0, 2, ZoneKind::Wake, 0.3),
        ];
        let resolved = resolve(&factors);
        assert_eq!(resolved.len(), 1);
        // the more-upstream (larger Y_wall) candidate wins
        assert_eq!(resolved[0].v_f, 0.3);
    }

    #[test]
    fn weighting_zone_multiplies_when_more_upstream() {
        let factors = vec![
            factor(0, 10.0, 5.0, 2, ZoneKind::Cavity, 2.0),
            factor(0, 20.0, 5.0, 0, ZoneKind::DisplacementVortex, 3.0),
        ];
        let resolved = resolve(&factors);
        assert_eq!(resolved.len(), 1);
        assert!((resolved[0].v_f - 6.0).abs() < 1e-6);
    }

    #[test]
    fn vegetation_only_voxel_has_no_owner_height() {
        let factors = vec![factor(0, 0.0, 0.0, 0, ZoneKind::VegOpen, 0.7)];
        let resolved = resolve(&factors);
        assert_eq!(resolved.len(), 1);
        assert!(resolved[0].owner_height.is_none());
        assert!((resolved[0].v_f - 0.7).abs() < 1e-6);
    }
}
