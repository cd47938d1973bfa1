//! # Obstacle pipeline
//!
//! Turns the raw set of observed obstacles into the fixed size set the solver
//! expects, and grows the positional uncertainty of Gaussian predictions over
//! the horizon.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod normalise;
mod uncertainty;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use normalise::*;
pub use uncertainty::*;
