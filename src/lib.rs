// ABOUTME: Library interface for the urock diagnostic wind field solver
// ABOUTME: Exposes the pipeline entry point and public data model for external use

pub mod engine;

pub use engine::core::{Grid3, PhysicsGrid, Vec2};
pub use engine::field::{SolidMask, VelocityField};
pub use engine::geometry::types::{StackedBlock, UpwindFacet, VegetationPatch};
pub use engine::{run, PipelineInputs, RunDiagnostics, WindFieldConfig, WindFieldError};
