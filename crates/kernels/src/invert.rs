use offload_core::Matrix;

use crate::error::KernelError;
use crate::progress::Progress;
use crate::EPSILON;

/// Invert a square matrix by Gauss-Jordan elimination on the augmented
/// `[A | I]`, with partial pivoting: each step pivots on the row holding
/// the largest absolute value in the pivot column among the remaining
/// rows. A pivot magnitude below [`EPSILON`] means no inverse exists.
pub fn invert(a: &Matrix, progress: &mut Progress) -> Result<Matrix, KernelError> {
    if !a.is_square() {
        return Err(KernelError::NotSquare {
            rows: a.rows(),
            cols: a.cols(),
        });
    }

    let n = a.rows();
    let mut aug: Vec<Vec<f64>> = a
        .as_rows()
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let mut r = row.clone();
            r.extend((0..n).map(|j| if i == j { 1.0 } else { 0.0 }));
            r
        })
        .collect();

    for col in 0..n {
        let pivot_row = (col..n)
            .max_by(|&x, &y| aug[x][col].abs().total_cmp(&aug[y][col].abs()))
            .unwrap_or(col);
        if aug[pivot_row][col].abs() < EPSILON {
            return Err(KernelError::Singular);
        }
        aug.swap(col, pivot_row);

        let pivot = aug[col][col];
        for v in aug[col].iter_mut() {
            *v /= pivot;
        }

        let pivot_row_values = aug[col].clone();
        for (row, values) in aug.iter_mut().enumerate() {
            if row == col {
                continue;
            }
            let factor = values[col];
            if factor == 0.0 {
                continue;
            }
            for (v, p) in values.iter_mut().zip(&pivot_row_values) {
                *v -= factor * p;
            }
        }

        progress.checkpoint(col + 1, n);
    }

    let inverse = aug.into_iter().map(|row| row[n..].to_vec()).collect();
    Ok(Matrix::from_rows(inverse).expect("augmented rows stay rectangular"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::multiply::multiply;

    fn matrix(rows: &[&[f64]]) -> Matrix {
        Matrix::from_rows(rows.iter().map(|r| r.to_vec()).collect()).unwrap()
    }

    #[test]
    fn inverse_roundtrips_to_identity() {
        let a = matrix(&[&[4.0, 7.0], &[2.0, 6.0]]);
        let inv = invert(&a, &mut Progress::none()).unwrap();
        let product = multiply(&a, &inv, &mut Progress::none()).unwrap();
        assert!(product.approx_eq(&Matrix::identity(2), 1e-6));
    }

    #[test]
    fn three_by_three_roundtrip() {
        let a = matrix(&[&[2.0, -1.0, 0.0], &[-1.0, 2.0, -1.0], &[0.0, -1.0, 2.0]]);
        let inv = invert(&a, &mut Progress::none()).unwrap();
        let product = multiply(&a, &inv, &mut Progress::none()).unwrap();
        assert!(product.approx_eq(&Matrix::identity(3), 1e-6));
    }

    /// Pivoting must rescue a matrix whose leading entry is zero.
    #[test]
    fn zero_leading_entry_needs_pivoting() {
        let a = matrix(&[&[0.0, 1.0], &[1.0, 0.0]]);
        let inv = invert(&a, &mut Progress::none()).unwrap();
        assert!(inv.approx_eq(&a, 1e-12));
    }

    #[test]
    fn singular_matrix_is_rejected() {
        let a = matrix(&[&[1.0, 2.0], &[2.0, 4.0]]);
        assert_eq!(invert(&a, &mut Progress::none()).unwrap_err(), KernelError::Singular);
    }

    #[test]
    fn zero_row_is_rejected() {
        let a = matrix(&[&[1.0, 2.0], &[0.0, 0.0]]);
        assert_eq!(invert(&a, &mut Progress::none()).unwrap_err(), KernelError::Singular);
    }

    #[test]
    fn non_square_is_rejected() {
        let a = matrix(&[&[1.0, 2.0, 3.0]]);
        assert_eq!(
            invert(&a, &mut Progress::none()).unwrap_err(),
            KernelError::NotSquare { rows: 1, cols: 3 }
        );
    }
}
