//! Pure numeric kernels hosted by the compute-offload engine.
//!
//! All kernels are synchronous and side-effect-free apart from an optional
//! progress callback invoked at coarse checkpoints (one per outer-loop
//! iteration, rescaled into the 10..=95 percent band so the surrounding
//! execution context can frame setup and teardown).

pub mod determinant;
pub mod eigen;
pub mod error;
pub mod invert;
pub mod multiply;
pub mod progress;

pub use determinant::determinant;
pub use eigen::dominant_eigenvalue;
pub use error::KernelError;
pub use invert::invert;
pub use multiply::multiply;
pub use progress::Progress;

/// Pivot magnitudes below this are treated as zero (singular).
pub const EPSILON: f64 = 1e-10;
