// ABOUTME: Zone kind table - each variant carries its priority rank and reference-height selector as data
// ABOUTME: Replaces string-keyed zone dictionaries with an enum match, per the table-driven redesign

use geo_types::Polygon;

/// Which reference speed the initializer multiplies a voxel's resolved
/// factor against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceHeightSelector {
    /// Scale by the vertical profile evaluated at the upstream obstacle's
    /// height.
    UpstreamBuildingHeight,
    /// Scale by the bare reference wind speed `V_REF`.
    ReferenceSensorHeight,
    /// Scale by the vertical profile evaluated at the owning obstacle's own
    /// height.
    LocalBuildingHeight,
}

/// Which of the three superimposition passes a zone kind participates in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuperimpositionRole {
    /// Competes in Pass 1 on `(Y_wall, owner_height, priority_rank)`.
    Priority,
    /// Competes in Pass 2 and multiplies the Pass-1 winner when upstream.
    Weighting,
    /// Always multiplicative against `v_f` in Pass 3.
    DownstreamVegetation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ZoneKind {
    Displacement,
    DisplacementVortex,
    Cavity,
    Wake,
    StreetCanyon,
    RooftopPerp,
    RooftopCorner,
    VegBuilt,
    VegOpen,
}

impl ZoneKind {
    /// Explicit priority rank used as the last tie-break key in Pass 1.
    /// Higher wins. Only meaningful among `Priority`-role zones.
    pub fn priority_rank(self) -> i32 {
        match self {
            ZoneKind::StreetCanyon => 5,
            ZoneKind::RooftopCorner => 4,
            ZoneKind::RooftopPerp => 3,
            ZoneKind::Cavity => 2,
            ZoneKind::Wake => 1,
            ZoneKind::Displacement => 0,
            ZoneKind::DisplacementVortex | ZoneKind::VegBuilt | ZoneKind::VegOpen => 0,
        }
    }

    pub fn superimposition_role(self) -> SuperimpositionRole {
        match self {
            ZoneKind::Displacement
            | ZoneKind::Cavity
            | ZoneKind::Wake
            | ZoneKind::StreetCanyon
            | ZoneKind::RooftopPerp
            | ZoneKind::RooftopCorner => SuperimpositionRole::Priority,
            ZoneKind::DisplacementVortex => SuperimpositionRole::Weighting,
            ZoneKind::VegBuilt | ZoneKind::VegOpen => SuperimpositionRole::DownstreamVegetation,
        }
    }

    pub fn default_reference_height_selector(self) -> ReferenceHeightSelector {
        match self {
            ZoneKind::Displacement => ReferenceHeightSelector::ReferenceSensorHeight,
            ZoneKind::DisplacementVortex => ReferenceHeightSelector::UpstreamBuildingHeight,
            ZoneKind::Cavity | ZoneKind::Wake => ReferenceHeightSelector::LocalBuildingHeight,
            ZoneKind::StreetCanyon => ReferenceHeightSelector::UpstreamBuildingHeight,
            ZoneKind::RooftopPerp | ZoneKind::RooftopCorner => {
                ReferenceHeightSelector::ReferenceSensorHeight
            }
            // vegetation zones are purely multiplicative; they do not select
            // a reference speed of their own.
            ZoneKind::VegBuilt | ZoneKind::VegOpen => ReferenceHeightSelector::ReferenceSensorHeight,
        }
    }
}

/// Kind-specific attributes carried alongside a zone's footprint. Only the
/// fields relevant to that zone's wind-factor formula are populated; see the
/// per-kind comments.
#[derive(Debug, Clone)]
pub enum ZoneAttributes {
    Displacement {
        owner_height: f32,
    },
    DisplacementVortex {
        owner_height: f32,
        vortex_length: f32,
    },
    Cavity {
        owner_height: f32,
        cavity_length: f32,
    },
    Wake {
        owner_height: f32,
        cavity_length: f32,
        wake_length: f32,
    },
    StreetCanyon {
        upstream_height: f32,
        downstream_height: f32,
        theta: f32,
    },
    RooftopPerp {
        owner_height: f32,
        perp_length: f32,
        perp_height: f32,
    },
    RooftopCorner {
        owner_height: f32,
        theta: f32,
        corner_length: f32,
        facade_length: f32,
        anchor: geo_types::Coord<f64>,
    },
    Vegetation {
        crown_base: f32,
        crown_top: f32,
        attenuation: f32,
    },
}

/// A single Röckle zone: a 2-D footprint plus the kind-specific attributes
/// its wind-factor formula needs.
#[derive(Debug, Clone)]
pub struct Zone {
    pub kind: ZoneKind,
    pub footprint: Polygon<f64>,
    /// Id of the block, facet, or vegetation patch this zone was derived
    /// from, for diagnostics and error reporting.
    pub origin_entity_id: i64,
    pub attributes: ZoneAttributes,
}

impl Zone {
    pub fn reference_height_selector(&self) -> ReferenceHeightSelector {
        self.kind.default_reference_height_selector()
    }

    pub fn owner_height(&self) -> f32 {
        match &self.attributes {
            ZoneAttributes::Displacement { owner_height }
            | ZoneAttributes::DisplacementVortex { owner_height, .. }
            | ZoneAttributes::Cavity { owner_height, .. }
            | ZoneAttributes::Wake { owner_height, .. }
            | ZoneAttributes::RooftopPerp { owner_height, .. }
            | ZoneAttributes::RooftopCorner { owner_height, .. } => *owner_height,
            ZoneAttributes::StreetCanyon {
                upstream_height,
                downstream_height,
                ..
            } => upstream_height.min(*downstream_height),
            ZoneAttributes::Vegetation { crown_top, .. } => *crown_top,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_roles_match_the_six_priority_zone_kinds() {
        use SuperimpositionRole::*;
        let priority_kinds = [
            ZoneKind::Displacement,
            ZoneKind::Cavity,
            ZoneKind::Wake,
            ZoneKind::StreetCanyon,
            ZoneKind::RooftopPerp,
            ZoneKind::RooftopCorner,
        ];
        for kind in priority_kinds {
            assert_eq!(kind.superimposition_role(), Priority);
        }
        assert_eq!(
            ZoneKind::DisplacementVortex.superimposition_role(),
            Weighting
        );
        assert_eq!(
            ZoneKind::VegBuilt.superimposition_role(),
            DownstreamVegetation
        );
    }

    #[test]
    fn street_canyon_ranks_above_displacement() {
        assert!(ZoneKind::StreetCanyon.priority_rank() > ZoneKind::Displacement.priority_rank());
    }
}
