//! Application context – holds the automation runner and its target config.

use crate::music::{MusicConfig, MusicRemote};
use crate::platform::{OsascriptRunner, UnsupportedRunner};
use crate::traits::ScriptRunner;

/// Central context passed to all engine operations.
///
/// Holds the runner as a trait object so callers can swap in a stub or a
/// platform without an automation runtime.
pub struct AppContext {
    runner: Box<dyn ScriptRunner>,
    music: MusicConfig,
}

impl AppContext {
    pub fn new(runner: Box<dyn ScriptRunner>, music: MusicConfig) -> Self {
        Self { runner, music }
    }

    /// Real `osascript` on macOS, an always-failing runner elsewhere.
    pub fn default_platform(music: MusicConfig) -> Self {
        let runner: Box<dyn ScriptRunner> = if cfg!(target_os = "macos") {
            Box::new(OsascriptRunner::new())
        } else {
            Box::new(UnsupportedRunner)
        };
        Self::new(runner, music)
    }

    /// Context without any automation runtime, for CI.
    pub fn default_headless() -> Self {
        Self::new(Box::new(UnsupportedRunner), MusicConfig::default())
    }

    pub fn runner(&self) -> &dyn ScriptRunner {
        self.runner.as_ref()
    }

    pub fn music_config(&self) -> &MusicConfig {
        &self.music
    }

    pub fn music(&self) -> MusicRemote<'_> {
        MusicRemote::new(self.runner.as_ref(), &self.music)
    }
}
