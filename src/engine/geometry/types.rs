// ABOUTME: Input data model - stacked blocks, upwind facets, vegetation patches
// ABOUTME: Validation lives here so every downstream stage can assume consistent heights

use geo_types::{LineString, Polygon};
use serde::{Deserialize, Serialize};

use crate::engine::error::{Result, WindFieldError};

/// A vertical prism produced upstream by slicing a real building into
/// constant-height slabs. Already rotated so wind blows along +Y.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackedBlock {
    pub id: i64,
    pub footprint: Polygon<f64>,
    pub base_height: f32,
    pub top_height: f32,
    /// Effective along-wind length used by the displacement zone.
    pub displacement_length: f32,
    pub cavity_length: f32,
    pub wake_length: f32,
}

impl StackedBlock {
    pub fn height(&self) -> f32 {
        self.top_height - self.base_height
    }

    /// Checks the invariants from the data model: `base < top`, and all
    /// three along-wind lengths positive. Does not check the footprint
    /// itself; see [`validate_inputs`].
    pub fn validate(&self) -> Result<()> {
        if self.base_height >= self.top_height {
            return Err(WindFieldError::InconsistentHeights {
                block_id: self.id,
                base: self.base_height,
                top: self.top_height,
            });
        }
        if self.displacement_length <= 0.0 || self.cavity_length <= 0.0 || self.wake_length <= 0.0
        {
            return Err(WindFieldError::InvalidGeometry {
                entity_id: self.id,
                reason: "along-wind lengths must be positive".to_string(),
            });
        }
        if self.wake_length < self.cavity_length {
            return Err(WindFieldError::InvalidGeometry {
                entity_id: self.id,
                reason: "wake length must be >= cavity length".to_string(),
            });
        }
        Ok(())
    }
}

/// A single facade segment of a stacked block, tagged with its wind-relative
/// angle and whether it faces into the wind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpwindFacet {
    pub facet_id: i64,
    pub stacked_block_id: i64,
    pub segment: LineString<f64>,
    /// Wind-relative angle in radians, in `(0, pi)`. `pi/2` is perpendicular
    /// to the wind.
    pub theta: f32,
}

impl UpwindFacet {
    pub fn validate(&self) -> Result<()> {
        if self.segment.0.len() < 2 {
            return Err(WindFieldError::InvalidGeometry {
                entity_id: self.facet_id,
                reason: "facet segment needs at least two points".to_string(),
            });
        }
        if !(self.theta > 0.0 && self.theta < std::f32::consts::PI) {
            return Err(WindFieldError::InvalidGeometry {
                entity_id: self.facet_id,
                reason: format!("theta {} out of range (0, pi)", self.theta),
            });
        }
        Ok(())
    }

    pub fn length(&self) -> f64 {
        use geo::algorithm::euclidean_length::EuclideanLength;
        self.segment.euclidean_length()
    }

    pub fn is_near_perpendicular(&self, threshold_rad: f32) -> bool {
        (self.theta - std::f32::consts::FRAC_PI_2).abs() < threshold_rad
    }
}

/// A patch of vegetation with a crown base/top and an attenuation factor
/// applied to wind speed inside the crown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VegetationPatch {
    pub veg_id: i64,
    pub footprint: Polygon<f64>,
    pub crown_base: f32,
    pub crown_top: f32,
    pub attenuation: f32,
}

impl VegetationPatch {
    pub fn validate(&self) -> Result<()> {
        if !(self.crown_base >= 0.0 && self.crown_base < self.crown_top) {
            return Err(WindFieldError::InvalidGeometry {
                entity_id: self.veg_id,
                reason: format!(
                    "crown_base {} must be >= 0 and < crown_top {}",
                    self.crown_base, self.crown_top
                ),
            });
        }
        if self.attenuation < 0.0 {
            return Err(WindFieldError::InvalidGeometry {
                entity_id: self.veg_id,
                reason: "attenuation must be >= 0".to_string(),
            });
        }
        Ok(())
    }
}

/// Validates every block, facet, and vegetation patch, dropping entities
/// that fail a recoverable check and returning only those that survive.
/// `InconsistentHeights` aborts the whole run; `InvalidGeometry` just drops
/// the one entity and is reported via `skipped`.
pub fn validate_inputs(
    blocks: Vec<StackedBlock>,
    facets: Vec<UpwindFacet>,
    vegetation: Vec<VegetationPatch>,
) -> Result<(Vec<StackedBlock>, Vec<UpwindFacet>, Vec<VegetationPatch>, usize)> {
    let mut skipped = 0usize;
    let mut out_blocks = Vec::with_capacity(blocks.len());
    for block in blocks {
        match block.validate() {
            Ok(()) => out_blocks.push(block),
            Err(err @ WindFieldError::InconsistentHeights { .. }) => return Err(err),
            Err(_) => {
                log::warn!("skipping block {} with invalid geometry", block.id);
                skipped += 1;
            }
        }
    }

    let mut out_facets = Vec::with_capacity(facets.len());
    for facet in facets {
        match facet.validate() {
            Ok(()) => out_facets.push(facet),
            Err(_) => {
                log::warn!("skipping facet {} with invalid geometry", facet.facet_id);
                skipped += 1;
            }
        }
    }

    let mut out_veg = Vec::with_capacity(vegetation.len());
    for patch in vegetation {
        match patch.validate() {
            Ok(()) => out_veg.push(patch),
            Err(_) => {
                log::warn!("skipping vegetation patch {} with invalid geometry", patch.veg_id);
                skipped += 1;
            }
        }
    }

    Ok((out_blocks, out_facets, out_veg, skipped))
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
    fn block_rejects_base_above_top() {
        let block = StackedBlock {
            id: 1,
            footprint: square(0.0, 0.0, 10.0),
            base_height: 5.0,
            top_height: 5.0,
            displacement_length: 1.0,
            cavity_length: 1.0,
            wake_length: 1.0,
        };
        assert!(matches!(
            block.validate(),
            Err(WindFieldError::InconsistentHeights { .. })
        ));
    }

    #[test]
    fn block_rejects_wake_shorter_than_cavity() {
        let block = StackedBlock {
            id: 2,
            footprint: square(0.0, 0.0, 10.0),
            base_height: 0.0,
            top_height: 10.0,
            displacement_length: 5.0,
            cavity_length: 10.0,
            wake_length: 5.0,
        };
        assert!(block.validate().is_err());
    }

    #[test]
    fn validate_inputs_drops_invalid_facet_but_keeps_valid_block() {
        let block = StackedBlock {
            id: 1,
            footprint: square(0.0, 0.0, 10.0),
            base_height: 0.0,
            top_height: 10.0,
            displacement_length: 5.0,
            cavity_length: 5.0,
            wake_length: 8.0,
        };
        let bad_facet = UpwindFacet {
            facet_id: 1,
            stacked_block_id: 1,
            segment: LineString(vec![coord! { x: 0.0, y: 0.0 }]),
            theta: 1.0,
        };
        let (blocks, facets, veg, skipped) =
            validate_inputs(vec![block], vec![bad_facet], vec![]).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(facets.len(), 0);
        assert!(veg.is_empty());
        assert_eq!(skipped, 1);
    }
}
