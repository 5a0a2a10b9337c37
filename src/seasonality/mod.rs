//! Seasonal decomposition.
//!
//! Classical moving-average decomposition into trend, seasonal and residual
//! components, with trend and seasonal strength scores.

mod decompose;

pub use decompose::{seasonal_decompose, Decomposition, DecompositionModel};
