//! Command handlers for the qanun binary.
//!
//! This module organizes all commands into separate submodules.

pub mod build_index;
pub mod serve;

// Re-export command types for convenience
pub use build_index::BuildIndexCommand;
pub use serve::ServeCommand;
