use offload_core::{EigenPair, Matrix};
use tracing::debug;

use crate::error::KernelError;
use crate::progress::Progress;
use crate::EPSILON;

/// Iteration cap for power iteration.
pub const MAX_ITERATIONS: usize = 100;

/// Convergence tolerance on the eigenvalue estimate.
pub const TOLERANCE: f64 = 1e-10;

/// Estimate the dominant eigenvalue and eigenvector by power iteration.
///
/// Starts from the all-ones vector, repeatedly applies `a`, normalizes by
/// the Euclidean norm, and estimates the eigenvalue with the Rayleigh
/// quotient `(Av·v)/(v·v)`. Stops when the estimate moves less than
/// [`TOLERANCE`] or after [`MAX_ITERATIONS`], whichever comes first; the
/// returned [`EigenPair`] says which via `converged`/`iterations`.
pub fn dominant_eigenvalue(a: &Matrix, progress: &mut Progress) -> Result<EigenPair, KernelError> {
    if !a.is_square() {
        return Err(KernelError::NotSquare {
            rows: a.rows(),
            cols: a.cols(),
        });
    }

    let n = a.rows();
    if n == 0 {
        return Ok(EigenPair {
            value: 0.0,
            vector: Vec::new(),
            iterations: 0,
            converged: true,
        });
    }

    let mut vector = vec![1.0; n];
    let mut value = 0.0;

    for iteration in 1..=MAX_ITERATIONS {
        let applied = apply(a, &vector);
        let norm = applied.iter().map(|x| x * x).sum::<f64>().sqrt();
        if norm < EPSILON {
            // A·v vanished: v is in the null space, eigenvalue estimate 0.
            debug!(iteration, "power iteration hit the null space");
            return Ok(EigenPair {
                value: 0.0,
                vector,
                iterations: iteration,
                converged: true,
            });
        }

        let next = dot(&applied, &vector) / dot(&vector, &vector);
        vector = applied.into_iter().map(|x| x / norm).collect();
        progress.checkpoint(iteration, MAX_ITERATIONS);

        if (next - value).abs() < TOLERANCE {
            debug!(iteration, value = next, "power iteration converged");
            return Ok(EigenPair {
                value: next,
                vector,
                iterations: iteration,
                converged: true,
            });
        }
        value = next;
    }

    debug!(value, "power iteration exhausted its iteration cap");
    Ok(EigenPair {
        value,
        vector,
        iterations: MAX_ITERATIONS,
        converged: false,
    })
}

fn apply(a: &Matrix, v: &[f64]) -> Vec<f64> {
    a.as_rows().iter().map(|row| dot(row, v)).collect()
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
