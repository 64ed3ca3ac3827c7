use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::DecodeError;

/// A rectangular numeric grid stored as rows of equal length.
///
/// `rows`/`cols` are always derived from the data, never stored, so the
/// dimensions cannot drift out of sync. On the wire the matrix travels as
/// `{ data, rows, cols }`; declared dimensions are validated on ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    data: Vec<Vec<f64>>,
}

impl Matrix {
    /// Build a matrix from rows, rejecting ragged input.
    pub fn from_rows(data: Vec<Vec<f64>>) -> Result<Self, DecodeError> {
        let cols = data.first().map_or(0, |r| r.len());
        if let Some(bad) = data.iter().position(|r| r.len() != cols) {
            return Err(DecodeError::Shape(format!(
                "row {} has {} columns, expected {}",
                bad,
                data[bad].len(),
                cols
            )));
        }
        Ok(Self { data })
    }

    /// An all-zero matrix of the given dimensions.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            data: vec![vec![0.0; cols]; rows],
        }
    }

    /// The n×n identity matrix.
    pub fn identity(n: usize) -> Self {
        let mut m = Self::zeros(n, n);
        for i in 0..n {
            m.data[i][i] = 1.0;
        }
        m
    }

    pub fn rows(&self) -> usize {
        self.data.len()
    }

    pub fn cols(&self) -> usize {
        self.data.first().map_or(0, |r| r.len())
    }

    pub fn is_square(&self) -> bool {
        self.rows() == self.cols()
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row][col]
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i]
    }

    /// Borrow the underlying rows.
    pub fn as_rows(&self) -> &[Vec<f64>] {
        &self.data
    }

    /// Consume the matrix, yielding its rows.
    pub fn into_rows(self) -> Vec<Vec<f64>> {
        self.data
    }

    /// Element-wise comparison within an absolute tolerance.
    pub fn approx_eq(&self, other: &Matrix, tol: f64) -> bool {
        self.rows() == other.rows()
            && self.cols() == other.cols()
            && self
                .data
                .iter()
                .zip(&other.data)
                .all(|(a, b)| a.iter().zip(b).all(|(x, y)| (x - y).abs() <= tol))
    }
}

// ── Wire shape ───────────────────────────────────────────────────────

#[derive(Serialize)]
struct WireRef<'a> {
    data: &'a [Vec<f64>],
    rows: usize,
    cols: usize,
}

#[derive(Deserialize)]
struct Wire {
    data: Vec<Vec<f64>>,
    rows: Option<usize>,
    cols: Option<usize>,
}

impl Serialize for Matrix {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        WireRef {
            data: &self.data,
            rows: self.rows(),
            cols: self.cols(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Matrix {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error;

        let wire = Wire::deserialize(deserializer)?;
        let matrix = Matrix::from_rows(wire.data).map_err(D::Error::custom)?;

        // Declared dims are redundant on the wire; reject if they disagree.
        if let Some(rows) = wire.rows {
            if rows != matrix.rows() {
                return Err(D::Error::custom(format!(
                    "declared rows={} but data has {}",
                    rows,
                    matrix.rows()
                )));
            }
        }
        if let Some(cols) = wire.cols {
            if cols != matrix.cols() {
                return Err(D::Error::custom(format!(
                    "declared cols={} but data has {}",
                    cols,
                    matrix.cols()
                )));
            }
        }
        Ok(matrix)
    }
}
