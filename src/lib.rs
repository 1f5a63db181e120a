// Library surface for headless/integration tests and reuse.
// Keep this lean to avoid coupling to bin-only types in main.rs.
pub mod app_dirs;
pub mod chart;
pub mod clock;
pub mod config;
pub mod error;
pub mod ghost;
pub mod logging;
pub mod profile;
pub mod pulse;
pub mod recorder;
pub mod rhythm;
pub mod runtime;
pub mod scheduler;
pub mod session;
pub mod transition;
pub mod util;
pub mod words;

pub use error::{GhostError, Result};
