/// Convenience result type used across amrpost.
pub type AmrResult<T> = Result<T, AmrError>;

/// Top-level error taxonomy used by the post-processing stages.
#[derive(thiserror::Error, Debug)]
pub enum AmrError {
    /// A case folder or its run configuration is missing or unusable.
    #[error("setup error: {0}")]
    Setup(String),

    /// A checkpoint file is missing, truncated or inconsistent.
    #[error("decode error: {0}")]
    Decode(String),

    /// One or more render workers failed.
    #[error("render error: {0}")]
    Render(String),

    /// An external program (the solver) exited unsuccessfully.
    #[error("external tool error: {0}")]
    ExternalTool(String),

    /// Invalid user-provided parameters.
    #[error("validation error: {0}")]
    Validation(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AmrError {
    /// Build an [`AmrError::Setup`] value.
    pub fn setup(msg: impl Into<String>) -> Self {
        Self::Setup(msg.into())
    }

    /// Build an [`AmrError::Decode`] value.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Build an [`AmrError::Render`] value.
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Build an [`AmrError::ExternalTool`] value.
    pub fn external_tool(msg: impl Into<String>) -> Self {
        Self::ExternalTool(msg.into())
    }

    /// Build an [`AmrError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
