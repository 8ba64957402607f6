//! Protocol module - Vigor console dialogue definitions.

pub mod constants;

pub use constants::*;
