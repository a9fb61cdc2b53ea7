use crate::catalog::CatalogError;
use crate::clock::ClockError;

/// Fatal conditions that stop a benchmark before or while it runs.
///
/// None of these are retried; callers print a diagnostic and exit.
#[derive(Debug, thiserror::Error)]
pub enum BenchError {
    /// The graphics adapter lacks a capability the lesson depends on.
    #[error("adapter `{adapter}` does not provide {capability}")]
    FatalPrecondition { adapter: String, capability: String },
    #[error("high resolution timer unavailable: {0}")]
    UnavailableTimer(#[from] ClockError),
    #[error("failed to create {resource}: {reason}")]
    ResourceCreation { resource: String, reason: String },
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

impl BenchError {
    pub fn precondition(adapter: impl Into<String>, capability: impl Into<String>) -> Self {
        Self::FatalPrecondition {
            adapter: adapter.into(),
            capability: capability.into(),
        }
    }

    pub fn resource(resource: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::ResourceCreation {
            resource: resource.into(),
            reason: reason.to_string(),
        }
    }

    /// Process exit code used when this error terminates a lesson.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::FatalPrecondition { .. } => 2,
            Self::UnavailableTimer(_) => 3,
            Self::ResourceCreation { .. } | Self::Catalog(_) => 1,
        }
    }
}
