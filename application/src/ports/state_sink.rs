//! State emission port
//!
//! Push-based observer for progressive run state. Implementations live
//! outside this core (web transport, UI adapter); tests use a recording
//! sink. Each emitted [`StatePatch`] is an independent best-effort
//! snapshot; receivers merge patches themselves.

use tribunal_domain::StatePatch;

/// Callback for progressive state updates during a grading run
pub trait StateSink: Send + Sync {
    /// Called once per state change; must not block
    fn emit(&self, patch: StatePatch);
}

/// No-op sink for when state reporting is not needed
pub struct NoSink;

impl StateSink for NoSink {
    fn emit(&self, _patch: StatePatch) {}
}
