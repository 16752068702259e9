//! # Vermilion Engine Core
//!
//! Core crate for Vermilion Engine basic utilities.

pub mod arena;

/// Core library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the core subsystem.
pub fn init() {
    log::info!("Vermilion Core v{} initialized", VERSION);
}
