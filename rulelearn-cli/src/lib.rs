// All core functionality is in rulelearn-core
// This CLI acts as a thin wrapper around the core library

// CLI-specific modules
pub mod tools;

// Re-export core types for convenience
pub use rulelearn_core::*;

// Re-export CLI utilities
pub use tools::ToolLocator;
