//! Error types for the frame buffer and its render backends.
//!
//! All fallible operations return `Result<T, RenderError>`.
//! Only [`RenderError::ConstructionFailed`] is ever handled internally
//! (the single hardware → software fallback); every other error reaches
//! the caller unchanged.

use thiserror::Error;

use crate::engine::RenderMode;
use crate::window::WindowHandle;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, RenderError>;

/// The canonical error type for frame buffer rendering.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    // ── Engine lifecycle ─────────────────────────────────────────
    /// A render engine could not acquire its presentation resources.
    #[error("{mode} engine construction failed: {reason}")]
    ConstructionFailed { mode: RenderMode, reason: String },

    /// The active backend does not implement the requested operation.
    #[error("{operation} is not supported by the {mode} engine")]
    Unsupported {
        operation: &'static str,
        mode: RenderMode,
    },

    /// A presentation call was made before an engine exists, or after
    /// it was torn down.
    #[error("not initialized: {0}")]
    Uninitialized(&'static str),

    // ── Caller errors ────────────────────────────────────────────
    /// A structural mutation that is never permitted on this surface.
    #[error("invalid operation: {0}")]
    InvalidOperation(&'static str),

    /// Two surfaces with different pixel layouts were combined.
    #[error("pixel format mismatch: {0}")]
    FormatMismatch(&'static str),

    /// The pixel memory is already borrowed by an enclosing operation.
    #[error("pixel buffer is busy")]
    BufferBusy,

    // ── Per-call failures ────────────────────────────────────────
    /// A single capture/present call failed; the engine stays usable.
    #[error("{operation} failed: {reason}")]
    TransientFailure {
        operation: &'static str,
        reason: String,
    },

    /// The target window was destroyed underneath the engine.
    #[error("target window {0} is no longer valid")]
    StaleWindow(WindowHandle),
}

impl RenderError {
    /// Shorthand for a construction failure.
    pub fn construction(mode: RenderMode, reason: impl Into<String>) -> Self {
        RenderError::ConstructionFailed {
            mode,
            reason: reason.into(),
        }
    }

    /// Shorthand for a transient capture/present failure.
    pub fn transient(operation: &'static str, reason: impl Into<String>) -> Self {
        RenderError::TransientFailure {
            operation,
            reason: reason.into(),
        }
    }

    /// Returns `true` for failures that leave the active engine intact,
    /// so the same call may succeed next time.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            RenderError::TransientFailure { .. }
                | RenderError::StaleWindow(_)
                | RenderError::BufferBusy
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let e = RenderError::construction(RenderMode::Hardware, "no factory");
        assert!(e.to_string().contains("hardware"));
        assert!(e.to_string().contains("no factory"));

        let e = RenderError::Unsupported {
            operation: "capture",
            mode: RenderMode::Software,
        };
        assert!(e.to_string().contains("capture"));
    }

    #[test]
    fn recoverable_kinds() {
        assert!(RenderError::transient("present", "EndDraw").is_recoverable());
        assert!(RenderError::StaleWindow(WindowHandle::NULL).is_recoverable());
        assert!(!RenderError::Uninitialized("no engine").is_recoverable());
        assert!(!RenderError::InvalidOperation("set_buffer").is_recoverable());
    }
}
