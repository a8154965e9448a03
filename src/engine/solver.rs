// ABOUTME: SOR solver - Lagrange-multiplier Poisson relaxation driving the field toward zero divergence
// ABOUTME: Sequential by construction (Gauss-Seidel); everything upstream of this module may run in parallel

use crate::engine::config::WindFieldConfig;
use crate::engine::core::Grid3;
use crate::engine::diagnostics::RunDiagnostics;
use crate::engine::error::{Result, WindFieldError};
use crate::engine::field::{SolidMask, VelocityField};

/// The nine coefficient masks from the boundary-condition table, each shape
/// `(nx, ny, nz)` and initialized to 1 before solid cells punch holes in
/// them. `n`/`q` are deliberately asymmetric relative to the others: a
/// ceiling cell is only penalized looking up (`k+1`), never looking down.
struct Coefficients {
    e: Grid3<f32>,
    f: Grid3<f32>,
    g: Grid3<f32>,
    h: Grid3<f32>,
    m: Grid3<f32>,
    n: Grid3<f32>,
    o: Grid3<f32>,
    p: Grid3<f32>,
    q: Grid3<f32>,
}

impl Coefficients {
    fn build(nx: usize, ny: usize, nz: usize, mask: &SolidMask) -> Self {
        let mut c = Coefficients {
            e: Grid3::new(nx, ny, nz, 1.0),
            f: Grid3::new(nx, ny, nz, 1.0),
            g: Grid3::new(nx, ny, nz, 1.0),
            h: Grid3::new(nx, ny, nz, 1.0),
            m: Grid3::new(nx, ny, nz, 1.0),
            n: Grid3::new(nx, ny, nz, 1.0),
            o: Grid3::new(nx, ny, nz, 1.0),
            p: Grid3::new(nx, ny, nz, 1.0),
            q: Grid3::new(nx, ny, nz, 1.0),
        };
        for &(i, j, k) in mask.iter() {
            if i > 0 {
                c.e.set(i - 1, j, k, 0.0);
                c.o.set(i - 1, j, k, 0.5);
            }
            if i + 1 < nx {
                c.f.set(i + 1, j, k, 0.0);
                c.o.set(i + 1, j, k, 0.5);
            }
            if j > 0 {
                c.g.set(i, j - 1, k, 0.0);
                c.p.set(i, j - 1, k, 0.5);
            }
            if j + 1 < ny {
                c.h.set(i, j + 1, k, 0.0);
                c.p.set(i, j + 1, k, 0.5);
            }
            if k + 1 < nz {
                c.n.set(i, j, k + 1, 0.0);
                c.q.set(i, j, k + 1, 0.5);
            }
        }
        c
    }
}

/// Outcome of a completed SOR solve: the face velocities live in `field`
/// already; this just reports whether the stopping condition was
/// convergence or the iteration cap.
pub struct SolveOutcome {
    pub iterations_run: usize,
    pub converged: bool,
}

/// Runs the SOR relaxation to convergence or `cfg.max_iterations`, then
/// applies the velocity correction and recenters to cell centers.
pub fn solve(
    field: &mut VelocityField,
    mask: &SolidMask,
    cfg: &WindFieldConfig,
    diagnostics: &mut RunDiagnostics,
) -> Result<SolveOutcome> {
    let (nx, ny, nz) = (field.nx, field.ny, field.nz);
    let coeffs = Coefficients::build(nx, ny, nz, mask);

    let mut lambda = Grid3::new(nx, ny, nz, 1.0f32);
    let mut lambda_prime = Grid3::new(nx, ny, nz, 1.0f32);
    zero_boundary_faces(&mut lambda, nx, ny, nz);
    zero_boundary_faces(&mut lambda_prime, nx, ny, nz);

    let dx = field.dx as f64;
    let dy = field.dy as f64;
    let dz = field.dz as f64;
    let a_coeff = (dx * dx) / (dy * dy);
    let b_coeff = (cfg.eta as f64).powi(2) * (dx * dx) / (dz * dz);

    let mut iterations_run = 0usize;
    let mut converged = false;

    for _iter in 0..cfg.max_iterations {
        lambda.data_mut().copy_from_slice(lambda_prime.data());

        for k in 1..nz.saturating_sub(1) {
            for j in 1..ny.saturating_sub(1) {
                for i in 1..nx.saturating_sub(1) {
                    let div = (field.un.get(i + 1, j, k) - field.un.get(i, j, k)) / field.dx
                        + (field.vn.get(i, j + 1, k) - field.vn.get(i, j, k)) / field.dy
                        + (field.wn.get(i, j, k + 1) - field.wn.get(i, j, k)) / field.dz;

                    let num = 2.0 * (cfg.alpha1 as f64).powi(2) * dx * dx * (div as f64)
                        + (*coeffs.e.get(i, j, k) as f64) * (*lambda.get(i + 1, j, k) as f64)
                        + (*coeffs.f.get(i, j, k) as f64) * (*lambda_prime.get(i - 1, j, k) as f64)
                        + a_coeff
                            * ((*coeffs.g.get(i, j, k) as f64) * (*lambda.get(i, j + 1, k) as f64)
                                + (*coeffs.h.get(i, j, k) as f64) * (*lambda_prime.get(i, j - 1, k) as f64))
                        + b_coeff
                            * ((*coeffs.m.get(i, j, k) as f64) * (*lambda.get(i, j, k + 1) as f64)
                                + (*coeffs.n.get(i, j, k) as f64) * (*lambda_prime.get(i, j, k - 1) as f64));

                    let den = 2.0
                        * ((*coeffs.o.get(i, j, k) as f64)
                            + a_coeff * (*coeffs.p.get(i, j, k) as f64)
                            + b_coeff * (*coeffs.q.get(i, j, k) as f64));

                    let updated = if den.abs() > f64::EPSILON {
                        (cfg.omega as f64) * (num / den)
                            + (1.0 - cfg.omega as f64) * (*lambda_prime.get(i, j, k) as f64)
                    } else {
                        *lambda_prime.get(i, j, k) as f64
                    };
                    lambda_prime.set(i, j, k, updated as f32);
                }
            }
        }
        zero_boundary_faces(&mut lambda_prime, nx, ny, nz);

        iterations_run += 1;
        let sum_lambda_prime = lambda_prime.sum_abs();
        log::debug!("SOR iteration {iterations_run}: sum|lambda'| = {sum_lambda_prime}");
        diagnostics.record_solver_iteration(sum_lambda_prime);

        if !sum_lambda_prime.is_finite() || sum_lambda_prime == 0.0 {
            if iterations_run > 1 {
                return Err(WindFieldError::SolverDiverged {
                    iteration: iterations_run,
                    sum_lambda: sum_lambda_prime,
                });
            }
        }

        let diff: f64 = lambda
            .data()
            .iter()
            .zip(lambda_prime.data().iter())
            .map(|(a, b)| ((*b - *a) as f64).abs())
            .sum();
        let denom = lambda_prime.sum_abs();
        let rel_change = if denom > 0.0 { diff / denom } else { 0.0 };
        if rel_change < cfg.convergence_threshold {
            converged = true;
            diagnostics.converged = true;
            diagnostics.converged_at_iteration = Some(iterations_run);
            break;
        }
    }

    apply_correction(field, &lambda_prime, cfg);
    zero_solid_faces(field, mask);
    recenter(field);

    Ok(SolveOutcome {
        iterations_run,
        converged,
    })
}

fn zero_boundary_faces(grid: &mut Grid3<f32>, nx: usize, ny: usize, nz: usize) {
    for k in 0..nz {
        for j in 0..ny {
            grid.set(0, j, k, 0.0);
            grid.set(nx - 1, j, k, 0.0);
        }
    }
    for k in 0..nz {
        for i in 0..nx {
            grid.set(i, 0, k, 0.0);
            grid.set(i, ny - 1, k, 0.0);
        }
    }
    for j in 0..ny {
        for i in 0..nx {
            grid.set(i, j, 0, 0.0);
            grid.set(i, j, nz - 1, 0.0);
        }
    }
}

fn apply_correction(field: &mut VelocityField, lambda_prime: &Grid3<f32>, cfg: &WindFieldConfig) {
    let (nx, ny, nz) = (field.nx, field.ny, field.nz);
    for k in 0..nz {
        for j in 0..ny {
            for i in 1..nx {
                let corr = 0.5 / (cfg.alpha1 * cfg.alpha1)
                    * (lambda_prime.get(i, j, k) - lambda_prime.get(i - 1, j, k))
                    / field.dx;
                let un = *field.un.get(i, j, k);
                field.u.set(i, j, k, un + corr);
            }
        }
    }
    for k in 0..nz {
        for j in 1..ny {
            for i in 0..nx {
                let corr = 0.5 / (cfg.alpha1 * cfg.alpha1)
                    * (lambda_prime.get(i, j, k) - lambda_prime.get(i, j - 1, k))
                    / field.dy;
                let vn = *field.vn.get(i, j, k);
                field.v.set(i, j, k, vn + corr);
            }
        }
    }
    for k in 1..nz {
        for j in 0..ny {
            for i in 0..nx {
                let corr = 0.5 / (cfg.alpha2 * cfg.alpha2)
                    * (lambda_prime.get(i, j, k) - lambda_prime.get(i, j, k - 1))
                    / field.dz;
                let wn = *field.wn.get(i, j, k);
                field.w.set(i, j, k, wn + corr);
            }
        }
    }
}

fn zero_solid_faces(field: &mut VelocityField, mask: &SolidMask) {
    for &(i, j, k) in mask.iter() {
        field.u.set(i, j, k, 0.0);
        field.v.set(i, j, k, 0.0);
        field.w.set(i, j, k, 0.0);
        if i + 1 < field.nx {
            field.u.set(i + 1, j, k, 0.0);
        }
        if j + 1 < field.ny {
            field.v.set(i, j + 1, k, 0.0);
        }
        if k + 1 < field.nz {
            field.w.set(i, j, k + 1, 0.0);
        }
    }
}

fn recenter(field: &mut VelocityField) {
    recenter_grid(&mut field.u, field.nx, field.ny, field.nz);
    recenter_grid(&mut field.v, field.nx, field.ny, field.nz);
    recenter_grid(&mut field.w, field.nx, field.ny, field.nz);
    recenter_grid(&mut field.un, field.nx, field.ny, field.nz);
    recenter_grid(&mut field.vn, field.nx, field.ny, field.nz);
    recenter_grid(&mut field.wn, field.nx, field.ny, field.nz);
}

fn recenter_grid(grid: &mut Grid3<f32>, nx: usize, ny: usize, nz: usize) {
    let mut centered = Grid3::new(nx, ny, nz, 0.0);
    for k in 0..nz {
        for j in 0..ny {
            for i in 0..nx.saturating_sub(1) {
                let v = (grid.get(i, j, k) + grid.get(i + 1, j, k)) / 2.0;
                centered.set(i, j, k, v);
            }
            if nx > 0 {
                centered.set(nx - 1, j, k, *grid.get(nx - 1, j, k));
            }
        }
    }
    grid.data_mut().copy_from_slice(centered.data());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_domain_with_zero_initial_guess_stays_at_zero() {
        let cfg = WindFieldConfig::default();
        let mut field = VelocityField::new(6, 6, 4, 0.0, 0.0, 2.0, 2.0, 2.0);
        let mask = SolidMask::default();
        let mut diagnostics = RunDiagnostics::default();
        let mut local_cfg = cfg.clone();
        local_cfg.max_iterations = 1;
        let outcome = solve(&mut field, &mask, &local_cfg, &mut diagnostics).unwrap();
        assert_eq!(outcome.iterations_run, 1);
        for v in field.u.data() {
            assert!((*v).abs() < 1e-6);
        }
        for v in field.v.data() {
            assert!((*v).abs() < 1e-6);
        }
    }

    #[test]
    fn zero_iterations_leaves_velocities_as_cell_centered_average_of_initial_guess() {
        let cfg = WindFieldConfig {
            max_iterations: 0,
            ..WindFieldConfig::default()
        };
        let mut field = VelocityField::new(4, 4, 3, 0.0, 0.0, 2.0, 2.0, 2.0);
        for k in 0..3 {
            for j in 0..4 {
                for i in 0..4 {
                    field.un.set(i, j, k, 1.0);
                    field.vn.set(i, j, k, 2.0);
                    field.wn.set(i, j, k, 3.0);
                }
            }
        }
        let mask = SolidMask::default();
        let mut diagnostics = RunDiagnostics::default();
        solve(&mut field, &mask, &cfg, &mut diagnostics).unwrap();
        assert!((field.un.get(0, 0, 0) - 1.0).abs() < 1e-6);
        assert!((field.vn.get(0, 0, 0) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn solid_cells_have_zero_velocity_on_all_touching_faces() {
        let cfg = WindFieldConfig {
            max_iterations: 2,
            ..WindFieldConfig::default()
        };
        let mut field = VelocityField::new(6, 6, 4, 0.0, 0.0, 2.0, 2.0, 2.0);
        let mut mask = SolidMask::default();
        mask.insert(2, 2, 1);
        let mut diagnostics = RunDiagnostics::default();
        solve(&mut field, &mask, &cfg, &mut diagnostics).unwrap();
        assert_eq!(*field.u.get(2, 2, 1), 0.0);
        assert_eq!(*field.v.get(2, 2, 1), 0.0);
        assert_eq!(*field.w.get(2, 2, 1), 0.0);
    }
}
