// ABOUTME: Core engine foundation - fundamental data structures shared by every stage
// ABOUTME: Flat-memory grids and vector math used from geometry construction through the solver

pub mod grid3;
pub mod math;
pub mod physics_grid;

// Re-export key types for convenience
pub use grid3::Grid3;
pub use math::Vec2;
pub use physics_grid::PhysicsGrid;
