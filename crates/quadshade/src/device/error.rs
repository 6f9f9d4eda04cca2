use crate::error::{EngineError, EngineResult};

/// Outcome of recovering from a failed surface acquire.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceErrorAction {
    /// Surface reconfigured. This frame is lost; the next callback draws.
    Reconfigured,
    /// Transient; drop this frame.
    SkipFrame,
    /// Out of memory. The window cannot be drawn to again.
    Fatal,
}

impl SurfaceErrorAction {
    /// Frame result for a skipped draw. Only `Fatal` reaches the engine, as
    /// [`EngineError::Surface`] carrying `reason`.
    pub fn into_frame_result(self, reason: String) -> EngineResult<()> {
        match self {
            Self::Fatal => Err(EngineError::Surface(reason)),
            action => {
                log::debug!("frame skipped after surface error ({reason}): {action:?}");
                Ok(())
            }
        }
    }
}
