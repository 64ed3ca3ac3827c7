use offload_core::Matrix;

use crate::error::KernelError;
use crate::progress::Progress;
use crate::EPSILON;

/// Determinant by LU decomposition with partial pivoting: the product of
/// the pivots, negated once per row swap. A pivot below [`EPSILON`] means
/// the matrix is singular, for which the determinant is zero by
/// definition — that is a result, not an error.
pub fn determinant(a: &Matrix, progress: &mut Progress) -> Result<f64, KernelError> {
    if !a.is_square() {
        return Err(KernelError::NotSquare {
            rows: a.rows(),
            cols: a.cols(),
        });
    }

    let n = a.rows();
    let mut lu: Vec<Vec<f64>> = a.as_rows().to_vec();
    let mut det = 1.0;

    for col in 0..n {
        let pivot_row = (col..n)
            .max_by(|&x, &y| lu[x][col].abs().total_cmp(&lu[y][col].abs()))
            .unwrap_or(col);
        if lu[pivot_row][col].abs() < EPSILON {
            return Ok(0.0);
        }
        if pivot_row != col {
            lu.swap(col, pivot_row);
            det = -det;
        }

        det *= lu[col][col];

        let pivot_values = lu[col].clone();
        for row in lu.iter_mut().skip(col + 1) {
            let factor = row[col] / pivot_values[col];
            if factor == 0.0 {
                continue;
            }
            for (v, p) in row.iter_mut().zip(&pivot_values).skip(col) {
                *v -= factor * p;
            }
        }

        progress.checkpoint(col + 1, n);
    }

    Ok(det)
}
