//! Pipeline domain model and sequential runner

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::core::config::FileMapping;
use crate::core::context::{PipelineContext, StepOutput, StepResult};
use crate::core::state::PipelineState;
use crate::execution::step::Step;
use crate::process::TypedValue;

/// The externally supplied file a pipeline run starts from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    path: PathBuf,
}

impl UploadedFile {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The file's extension with a leading dot, lowercased.
    pub fn extension(&self) -> Option<String> {
        self.path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{}", ext.to_lowercase()))
    }
}

/// An ordered composition of steps plus upload parameters, representing one
/// runnable workflow instance.
///
/// A pipeline is single-use: create a fresh instance per run through
/// [`crate::execution::PipelineFactory::create_pipeline`] and discard it
/// afterwards. Dropping the pipeline releases its process instances.
pub struct Pipeline {
    /// Globally unique pipeline identifier
    pub id: String,

    /// Localized display name, keyed by language code
    pub display_name: HashMap<String, String>,

    /// Unique id of this run instance
    pub execution_id: Uuid,

    upload_step: String,
    file_mappings: Vec<FileMapping>,
    steps: Vec<Step>,
}

impl Pipeline {
    pub(crate) fn new(
        id: String,
        display_name: HashMap<String, String>,
        upload_step: String,
        file_mappings: Vec<FileMapping>,
        steps: Vec<Step>,
    ) -> Self {
        Self {
            id,
            display_name,
            execution_id: Uuid::new_v4(),
            upload_step,
            file_mappings,
            steps,
        }
    }

    /// The contained steps, in execution order.
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// The token the upload step's result is recorded under.
    pub fn upload_step(&self) -> &str {
        &self.upload_step
    }

    /// Aggregate state, derived from the step states.
    pub fn state(&self) -> PipelineState {
        PipelineState::derive(self.steps.iter().map(|step| &step.state))
    }

    /// Execute the pipeline against an uploaded file.
    ///
    /// Seeds the context with the upload step's synthetic result, then runs
    /// each step sequentially in declaration order. Execution stops at the
    /// first failed step; no later dependency could be satisfied from a
    /// state that never changes again. Returns the final context, with an
    /// entry (empty on failure) for every step that ran.
    pub async fn run(
        &mut self,
        uploaded_file: &UploadedFile,
        cancel: CancellationToken,
    ) -> PipelineContext {
        info!(
            "Starting pipeline run: {} ({})",
            self.id, self.execution_id
        );

        let mut context = PipelineContext::new();
        let upload_result = self.seed_upload(uploaded_file);
        context.insert(&self.upload_step, upload_result);

        for index in 0..self.steps.len() {
            let step = &mut self.steps[index];
            let result = step.run(&context, cancel.clone()).await;
            let failed = step.state.is_failed();
            let step_id = step.id.clone();
            context.insert(&step_id, result);

            if failed {
                warn!(
                    "Pipeline {} failed at step {}; skipping remaining steps",
                    self.id, step_id
                );
                break;
            }
        }

        info!("Pipeline run {} finished: {}", self.execution_id, self.state());
        context
    }

    /// Build the upload step's synthetic result from the uploaded file.
    ///
    /// The file's extension selects the attribute it is published under; an
    /// unmatched extension seeds an empty result and dependent steps fail
    /// through the ordinary missing-attribute path.
    fn seed_upload(&self, uploaded_file: &UploadedFile) -> StepResult {
        let mut result = StepResult::new();

        let extension = uploaded_file.extension().unwrap_or_default();
        let mapping = self
            .file_mappings
            .iter()
            .find(|m| m.file_extension.eq_ignore_ascii_case(&extension));

        match mapping {
            Some(mapping) => {
                result.insert(
                    &mapping.attribute,
                    StepOutput::new(TypedValue::String(
                        uploaded_file.path().display().to_string(),
                    )),
                );
            }
            None => {
                warn!(
                    "No file mapping for extension '{}' in pipeline {}",
                    extension, self.id
                );
            }
        }

        result
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("id", &self.id)
            .field("execution_id", &self.execution_id)
            .field("upload_step", &self.upload_step)
            .field("steps", &self.steps.len())
            .field("state", &self.state())
            .finish()
    }
}
