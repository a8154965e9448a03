// ABOUTME: Error taxonomy for the wind field pipeline - recoverable skips vs aborting failures
// ABOUTME: Recoverable kinds are logged and counted in RunDiagnostics rather than returned

use thiserror::Error;

/// Errors raised while building zones, assembling the initial field, or solving.
///
/// `InvalidGeometry` is recoverable: the entity that triggered it is
/// skipped, a warning is logged, and the run continues. `DegenerateZone`
/// names the same recoverable category for zone construction but is never
/// actually raised (see its own doc comment). `InconsistentHeights`,
/// `GridTooLarge`, and `SolverDiverged` abort the run.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum WindFieldError {
    #[error("entity {entity_id} has invalid geometry: {reason}")]
    InvalidGeometry { entity_id: i64, reason: String },

    #[error("stacked block {block_id} has base_height >= top_height ({base} >= {top})")]
    InconsistentHeights { block_id: i64, base: f32, top: f32 },

    /// Reserved: zone construction never returns this variant. A degenerate
    /// result (empty footprint, collapsed ellipse, failed split) is a routine
    /// geometric outcome, not a failure, so `geometry::builder` returns
    /// `Ok(None)` and the caller counts it in `RunDiagnostics` instead of
    /// raising this error. Kept for callers that want a typed variant to
    /// match on if that silent-skip policy ever changes.
    #[error("zone construction for {kind} on entity {entity_id} produced an empty result: {reason}")]
    DegenerateZone {
        kind: String,
        entity_id: i64,
        reason: String,
    },

    #[error("grid of {nx}x{ny}x{nz} = {cells} cells exceeds the configured cap of {cap}")]
    GridTooLarge {
        nx: usize,
        ny: usize,
        nz: usize,
        cells: usize,
        cap: usize,
    },

    #[error("SOR solver diverged at iteration {iteration}: sum|lambda'| = {sum_lambda}")]
    SolverDiverged { iteration: usize, sum_lambda: f64 },
}

pub type Result<T> = std::result::Result<T, WindFieldError>;
