// This module re-exports important pieces for convenience,
// so we can "use crate::config::*" easily.
pub mod callers;
pub mod logging;
pub mod store;
pub mod types;

pub use callers::*;
pub use logging::*;
pub use store::*;
pub use types::*;
