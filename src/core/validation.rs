//! Static validation of the configuration document
//!
//! Every structural and referential check runs over the whole document and
//! collects every violation, so a pipeline author can fix a broken document
//! in one pass. Messages are emitted in source order of the definitions.

use std::collections::BTreeSet;

use crate::core::config::{PipelineDefinition, PipelineProcessConfig, StepDefinition};
use crate::process::ProcessRegistry;

/// Outcome of validating a configuration document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    errors: Vec<String>,
}

impl ValidationResult {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// All violations joined into one multi-line report.
    pub fn error_message(&self) -> String {
        self.errors.join("\n")
    }

    /// The individual violations, in source order.
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    fn push(&mut self, message: String) {
        self.errors.push(message);
    }
}

/// Read-only static analysis over a [`PipelineProcessConfig`]
///
/// Implementation-name resolution is only performed when the validator is
/// built [`Validator::for_registry`]; the structural and referential checks
/// run either way.
#[derive(Debug, Default)]
pub struct Validator {
    known_implementations: Option<BTreeSet<String>>,
}

impl Validator {
    /// Structural and referential checks only.
    pub fn new() -> Self {
        Self {
            known_implementations: None,
        }
    }

    /// Additionally resolve `implementation` names against the registry.
    pub fn for_registry(registry: &ProcessRegistry) -> Self {
        Self {
            known_implementations: Some(registry.names()),
        }
    }

    /// Run every check and collect every violation.
    pub fn validate(&self, config: &PipelineProcessConfig) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.check_processes(config, &mut result);
        self.check_pipelines(config, &mut result);

        result
    }

    fn check_processes(&self, config: &PipelineProcessConfig, result: &mut ValidationResult) {
        let mut seen_ids = BTreeSet::new();

        for (position, process) in config.processes.iter().enumerate() {
            if process.id.is_empty() {
                result.push(format!(
                    "missing required field 'id' on process definition at position {}",
                    position
                ));
            } else if !seen_ids.insert(process.id.as_str()) {
                result.push(format!("not unique process id: '{}'", process.id));
            }

            if process.implementation.is_empty() {
                if !process.id.is_empty() {
                    result.push(format!(
                        "missing required field 'implementation' on process '{}'",
                        process.id
                    ));
                }
            } else if let Some(known) = &self.known_implementations {
                if !known.contains(&process.implementation) {
                    result.push(format!(
                        "unknown implementation '{}' for process '{}'",
                        process.implementation, process.id
                    ));
                }
            }
        }
    }

    fn check_pipelines(&self, config: &PipelineProcessConfig, result: &mut ValidationResult) {
        let mut seen_pipeline_ids = BTreeSet::new();
        // Step ids are unique across the whole document.
        let mut seen_step_ids = BTreeSet::new();

        for (position, pipeline) in config.pipelines.iter().enumerate() {
            if pipeline.id.is_empty() {
                result.push(format!(
                    "missing required field 'id' on pipeline definition at position {}",
                    position
                ));
            } else if !seen_pipeline_ids.insert(pipeline.id.as_str()) {
                result.push(format!("not unique pipeline id: '{}'", pipeline.id));
            }

            self.check_parameters(pipeline, result);
            self.check_steps(config, pipeline, &mut seen_step_ids, result);
        }
    }

    fn check_parameters(&self, pipeline: &PipelineDefinition, result: &mut ValidationResult) {
        if pipeline.parameters.upload_step.is_empty() {
            result.push(format!(
                "missing required field 'uploadStep' in pipeline '{}'",
                pipeline.id
            ));
        }

        for mapping in &pipeline.parameters.file_mappings {
            if !mapping.file_extension.starts_with('.') {
                result.push(format!(
                    "file extension '{}' in pipeline '{}' must start with '.'",
                    mapping.file_extension, pipeline.id
                ));
            }
            if mapping.attribute.is_empty() {
                result.push(format!(
                    "missing required field 'attribute' for file mapping in pipeline '{}'",
                    pipeline.id
                ));
            }
        }
    }

    fn check_steps<'a>(
        &self,
        config: &PipelineProcessConfig,
        pipeline: &'a PipelineDefinition,
        seen_step_ids: &mut BTreeSet<&'a str>,
        result: &mut ValidationResult,
    ) {
        for (position, step) in pipeline.steps.iter().enumerate() {
            if step.id.is_empty() {
                result.push(format!(
                    "missing required field 'id' on step definition at position {} in pipeline '{}'",
                    position, pipeline.id
                ));
            } else if !seen_step_ids.insert(step.id.as_str()) {
                result.push(format!("not unique step id: '{}'", step.id));
            }

            if step.process_id.is_empty() {
                result.push(format!(
                    "missing required field 'processId' in step '{}'",
                    step.id
                ));
            } else if config.process(&step.process_id).is_none() {
                result.push(format!(
                    "unknown process reference for '{}' in step '{}'",
                    step.process_id, step.id
                ));
            }

            self.check_inputs(pipeline, position, step, result);
            self.check_outputs(step, result);
        }
    }

    fn check_inputs(
        &self,
        pipeline: &PipelineDefinition,
        step_position: usize,
        step: &StepDefinition,
        result: &mut ValidationResult,
    ) {
        for input in &step.inputs {
            let mut missing_field = false;
            for (field, value) in [
                ("from", &input.from),
                ("take", &input.take),
                ("as", &input.as_name),
            ] {
                if value.is_empty() {
                    result.push(format!(
                        "missing required field '{}' on input in step '{}'",
                        field, step.id
                    ));
                    missing_field = true;
                }
            }
            if missing_field {
                continue;
            }

            // A reachable attribute comes from the upload step or from a
            // step declared earlier in the same pipeline.
            let resolvable = if input.from == pipeline.parameters.upload_step {
                pipeline
                    .parameters
                    .upload_attributes()
                    .contains(input.take.as_str())
            } else {
                pipeline.steps[..step_position]
                    .iter()
                    .find(|s| s.id == input.from)
                    .map(|s| s.published_attributes().contains(input.take.as_str()))
                    .unwrap_or(false)
            };

            if !resolvable {
                result.push(format!(
                    "illegal input from reference from: '{}', take: '{}' in step '{}'",
                    input.from, input.take, step.id
                ));
            }
        }
    }

    fn check_outputs(&self, step: &StepDefinition, result: &mut ValidationResult) {
        let mut seen_as = BTreeSet::new();

        for output in &step.outputs {
            for (field, value) in [("take", &output.take), ("as", &output.as_name)] {
                if value.is_empty() {
                    result.push(format!(
                        "missing required field '{}' on output in step '{}'",
                        field, step.id
                    ));
                }
            }

            if !output.as_name.is_empty() && !seen_as.insert(output.as_name.as_str()) {
                result.push(format!(
                    "not unique output as: '{}' in step '{}'",
                    output.as_name, step.id
                ));
            }
        }
    }
}
