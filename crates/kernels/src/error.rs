use thiserror::Error;

/// Errors from the numeric kernels.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum KernelError {
    #[error("matrix dimension mismatch: left has {left_cols} columns, right has {right_rows} rows")]
    Dimension { left_cols: usize, right_rows: usize },

    #[error("matrix must be square, got {rows}x{cols}")]
    NotSquare { rows: usize, cols: usize },

    #[error("matrix is singular")]
    Singular,
}
