// ABOUTME: Run-wide tunables - zone geometry thresholds, reference wind profile, solver knobs
// ABOUTME: Struct-of-constants with a documented Default, overridden per run via factory methods

/// Every numeric knob the pipeline needs that is not derived from the input
/// geometry itself: zone-classification thresholds, the reference wind
/// profile, the output grid resolution, and the SOR solver's stopping
/// conditions.
///
/// Defaults follow the published Röckle/URock literature values where the
/// retrieved reference implementation's own constants module was not part of
/// the pack; each one is called out in the grounding ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct WindFieldConfig {
    /// Roughness length of the surroundings, metres.
    pub z0: f32,
    /// Displacement height of the surroundings, metres.
    pub displacement_height: f32,
    /// Reference wind speed at `z_ref`, m/s.
    pub v_ref: f32,
    /// Height at which `v_ref` is specified, metres.
    pub z_ref: f32,
    /// Wind direction the reference speed blows from, degrees, meteorological
    /// convention (0 = from north, measured clockwise).
    pub wind_direction_deg: f32,

    /// Horizontal mesh cell size, metres.
    pub mesh_size: f32,
    /// Vertical layer thickness, metres.
    pub dz: f32,
    /// Height of a synthetic sketch/ground layer used to avoid a zero-height
    /// lowest cell, metres.
    pub sketch_height: f32,

    /// Facet is treated as perpendicular to the wind when the angle between
    /// its normal and the wind vector is below this, degrees.
    pub perpendicular_threshold_deg: f32,
    /// Facet is treated as a building corner when the angle is between this
    /// and `corner_threshold_hi_deg`, degrees.
    pub corner_threshold_lo_deg: f32,
    pub corner_threshold_hi_deg: f32,

    /// Number of vertices used to tessellate an elliptical zone boundary.
    pub npoints_ellipse: usize,
    /// Minimum semi-axis length below which an ellipse degenerates, metres.
    pub ellipsoid_min_length: f32,
    /// Distance tolerance for treating two coordinates as coincident during
    /// polygon snapping.
    pub snapping_tolerance: f32,

    /// How far the along-wind (displacement/cavity/wake) zones extend beyond
    /// the geometric construction before being clipped, metres.
    pub along_wind_zone_extend: f32,
    /// How far the cross-wind extent of a zone is padded, metres.
    pub cross_wind_zone_extend: f32,

    /// Rooftop-perpendicular recirculation bubble length, as a multiple of
    /// obstacle height.
    pub rooftop_perp_length_factor: f32,
    /// Rooftop-perpendicular recirculation bubble height, as a multiple of
    /// obstacle height.
    pub rooftop_perp_height_factor: f32,
    /// Rooftop-corner zone length, as a multiple of obstacle height.
    pub rooftop_corner_length_factor: f32,
    /// Rooftop-corner zone facade extent, as a multiple of obstacle width.
    pub rooftop_corner_facade_factor: f32,

    /// Street-canyon depth coefficient (`C_DZ` in the zone formulas).
    pub c_dz: f32,
    /// Street-canyon depth exponent (`p_DZ`).
    pub p_dz: f32,
    /// Rooftop-perpendicular vertical decay exponent (`p_RTP`).
    pub p_rtp: f32,

    /// Default attenuation factor applied to vegetation-interior wind speed
    /// when a patch carries no explicit porosity.
    pub default_veg_atten_fact: f32,

    /// SOR over-relaxation factor, `omega` in the relaxation update.
    pub omega: f32,
    /// Lagrange-multiplier alpha weights balancing horizontal vs vertical
    /// correction in the SOR stencil.
    pub alpha1: f32,
    pub alpha2: f32,
    /// Weight on the initial field in the mass-conservation functional.
    pub eta: f32,
    /// Maximum SOR sweeps before giving up.
    pub max_iterations: usize,
    /// Relative change in `sum|lambda|` below which the solver is converged.
    pub convergence_threshold: f64,

    /// Hard cap on `nx * ny * nz` to bound memory before a grid is allocated.
    pub max_grid_cells: usize,
}

impl Default for WindFieldConfig {
    fn default() -> Self {
        Self {
            z0: 0.1,
            displacement_height: 0.0,
            v_ref: 5.0,
            z_ref: 10.0,
            wind_direction_deg: 270.0,

            mesh_size: 2.0,
            dz: 2.0,
            sketch_height: 0.5,

            perpendicular_threshold_deg: 20.0,
            corner_threshold_lo_deg: 20.0,
            corner_threshold_hi_deg: 70.0,

            npoints_ellipse: 20,
            ellipsoid_min_length: 1.0,
            snapping_tolerance: 0.01,

            along_wind_zone_extend: 2.0,
            cross_wind_zone_extend: 2.0,

            rooftop_perp_length_factor: 0.5,
            rooftop_perp_height_factor: 0.22,
            rooftop_corner_length_factor: 0.7,
            rooftop_corner_facade_factor: 0.4,

            c_dz: 1.0,
            p_dz: 0.25,
            p_rtp: 1.5,

            default_veg_atten_fact: 0.5,

            omega: 1.78,
            alpha1: 1.0,
            alpha2: 1.0,
            eta: 1.0,
            max_iterations: 300,
            convergence_threshold: 5e-3,

            max_grid_cells: 20_000_000,
        }
    }
}

impl WindFieldConfig {
    /// Same thresholds, shifted to a different reference wind.
    pub fn with_reference_wind(mut self, v_ref: f32, z_ref: f32, direction_deg: f32) -> Self {
        self.v_ref = v_ref;
        self.z_ref = z_ref;
        self.wind_direction_deg = direction_deg;
        self
    }

    /// Coarser mesh for large domains where a faster, lower-fidelity run is
    /// acceptable.
    pub fn for_large_domain() -> Self {
        Self {
            mesh_size: 4.0,
            dz: 4.0,
            max_iterations: 150,
            ..Self::default()
        }
    }

    /// Finer mesh for small, detail-sensitive domains (single courtyards,
    /// isolated buildings).
    pub fn for_fine_detail() -> Self {
        Self {
            mesh_size: 1.0,
            dz: 1.0,
            max_iterations: 500,
            convergence_threshold: 1e-3,
            ..Self::default()
        }
    }

    pub fn wind_direction_rad(&self) -> f32 {
        self.wind_direction_deg.to_radians()
    }
}
