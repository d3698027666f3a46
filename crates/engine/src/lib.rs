//! Engine crate – scripting bridge to the Music app.
//!
//! Turns the app's text-in/text-out automation channel into typed
//! operations. Nothing here depends on the CLI, so the same logic backs
//! one-shot calls, scenarios and the socket daemon.

pub mod commands;
pub mod context;
pub mod doctor;
pub mod music;
pub mod platform;
pub mod probes;
pub mod query;
pub mod scenario;
pub mod track;
pub mod traits;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports for convenience
pub use commands::CommandRegistry;
pub use context::AppContext;
pub use music::{MusicConfig, MusicRemote};
pub use track::{star_value_fits_scale, Stars, Track, MAX_SCALE, MAX_STARS};
pub use traits::{ScriptError, ScriptErrorKind, ScriptRunner};
pub use types::{CommandResult, ErrorCode, ErrorInfo, Status};
