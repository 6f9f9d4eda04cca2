use crate::context::ShaderStage;

pub type EngineResult<T> = Result<T, EngineError>;

/// Failures surfaced by the engine.
///
/// Everything except `Producer` and `Surface` can only occur during
/// `attach`/`animate`, before any frame is scheduled.
#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    /// The drawable could not produce a rendering context.
    #[error("rendering context unavailable: {0}")]
    ContextUnavailable(String),

    /// A stage failed to compile; `log` carries the compiler diagnostics.
    #[error("{stage} stage failed to compile:\n{log}")]
    Compile { stage: ShaderStage, log: String },

    /// The program failed to link; `log` carries the linker diagnostics.
    #[error("program failed to link:\n{log}")]
    Link { log: String },

    /// A GPU object allocation returned no handle.
    #[error("could not create {0}")]
    ResourceCreation(&'static str),

    /// A dynamic uniform producer failed while evaluating a frame.
    #[error("uniform producer for `{name}` failed")]
    Producer {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    /// The presentation surface is gone and cannot be reconfigured.
    #[error("surface error: {0}")]
    Surface(String),
}

impl EngineError {
    pub fn context_unavailable(msg: impl Into<String>) -> Self {
        Self::ContextUnavailable(msg.into())
    }

    /// Returns `true` for errors raised while setting up an instance.
    pub fn is_setup_error(&self) -> bool {
        !matches!(self, Self::Producer { .. } | Self::Surface(_))
    }

    /// Returns `true` when the instance cannot draw again. A failed producer
    /// only halts the loop until it is resumed.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Surface(_))
    }
}
