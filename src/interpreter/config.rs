//! Engine configuration

use super::constants::DEFAULT_TICK_DURATION;

/// Tunables fixed for the lifetime of an [`Engine`](super::engine::Engine)
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Seconds per scheduler tick, used by `SLEEP`
    pub tick_duration: f32,
    /// Emit a `trace` event for every executed instruction
    pub trace_instructions: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            tick_duration: DEFAULT_TICK_DURATION,
            trace_instructions: false,
        }
    }
}

impl EngineConfig {
    pub fn with_tick_duration(mut self, seconds: f32) -> Self {
        self.tick_duration = seconds;
        self
    }

    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.trace_instructions = enabled;
        self
    }
}
