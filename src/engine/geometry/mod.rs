// ABOUTME: Zone geometry builder - data model, geometric kernel wrapper, and zone construction
// ABOUTME: ops.rs is the only file naming a geometry engine; everything else works through Zone/ZoneKind

pub mod builder;
pub mod ellipse;
pub mod ops;
pub mod types;
pub mod zone;

pub use builder::build_all_zones;
pub use types::{validate_inputs, StackedBlock, UpwindFacet, VegetationPatch};
pub use zone::{ReferenceHeightSelector, SuperimpositionRole, Zone, ZoneAttributes, ZoneKind};
