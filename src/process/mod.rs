//! Process implementation contract

pub mod registry;
pub mod value;

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

pub use registry::{ProcessConstructor, ProcessRegistry};
pub use value::{ParameterKind, ParameterSpec, TypedValue};

/// Error types for process construction and execution
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("no process registered for implementation '{0}'")]
    UnknownImplementation(String),

    #[error("invalid process configuration: {0}")]
    Configuration(String),

    #[error("process cancelled")]
    Cancelled,

    #[error("process execution failed: {0}")]
    Execution(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Trait for process implementations - the single seam between the engine
/// and concrete units of work.
///
/// An implementation declares the named, typed parameter list of its run
/// operation via [`Process::parameters`]; the engine binds and type-checks
/// pipeline inputs against that schema before invoking [`Process::run`].
/// The run operation returns a mapping from process-local output names to
/// values. Implementations must honor the cancellation token and suspend
/// cooperatively rather than block.
#[async_trait]
pub trait Process: Send + Sync {
    /// The declared parameter schema of the run operation.
    fn parameters(&self) -> Vec<ParameterSpec>;

    /// Execute with pre-bound, type-checked named arguments.
    async fn run(
        &self,
        inputs: HashMap<String, TypedValue>,
        cancel: CancellationToken,
    ) -> Result<HashMap<String, TypedValue>, ProcessError>;
}
