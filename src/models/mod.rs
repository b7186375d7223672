//! Data models for scraped chains and volatility surfaces
//!
//! This module contains the raw chain rows, the cleaned volatility points,
//! and the assembled volatility surface.

mod option;
pub mod surface_update;
pub mod volatility;

pub use option::*;
pub use surface_update::SurfaceUpdate;
pub use volatility::*;
