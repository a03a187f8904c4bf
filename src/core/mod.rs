/*!
 * Core Module
 * Fundamental runtime types, identifiers, limits, configuration and errors
 */

pub mod config;
pub mod errors;
pub mod id;
pub mod limits;
pub mod types;

// Re-export for convenience
pub use config::RuntimeConfig;
pub use errors::*;
pub use id::{AtomicGenerator, IdGenerator, PidGenerator, RefGenerator};
pub use types::*;
