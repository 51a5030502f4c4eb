// All classification functionality is in doclass-core
// This CLI acts as a thin wrapper around the core library

// CLI-specific modules
pub mod logging;
pub mod overrides;
pub mod stages;

// Re-export core types for convenience
pub use doclass_core::*;

// Re-export CLI utilities
pub use overrides::ConfigOverrides;
pub use stages::save_stages;
