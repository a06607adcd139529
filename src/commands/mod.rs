//! Command implementations

pub mod build;
pub mod plot;
pub mod util;

// Re-export command functions
pub use build::*;
pub use plot::*;
pub use util::*;
