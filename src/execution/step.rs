//! Step execution - binding resolution, type checking, process invocation

use std::collections::{BTreeSet, HashMap};

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::core::config::{OutputAction, ProcessDefinition, StepDefinition};
use crate::core::context::{PipelineContext, StepOutput, StepResult};
use crate::core::state::StepState;
use crate::process::{value, Process, TypedValue};

/// A resolved input binding: where a value comes from
#[derive(Debug, Clone)]
pub struct InputBinding {
    /// Step id (or upload token) the value is taken from
    pub from: String,
    /// Attribute name published by the referenced step
    pub take: String,
    /// Pipeline-facing parameter name the value is bound to
    pub parameter: String,
}

/// A resolved output binding: where a value goes
#[derive(Debug, Clone)]
pub struct OutputBinding {
    /// Pipeline-facing output name produced by the process
    pub take: String,
    /// Attribute name the value is published under
    pub publish_as: String,
    /// Declared post-processing actions
    pub actions: BTreeSet<OutputAction>,
}

/// A constructed, executable step: resolved bindings plus a bound process
/// instance and its per-run state.
///
/// The step is a pure adapter between the generic context model and the
/// process implementation's declared call shape; it performs no I/O itself.
pub struct Step {
    /// Unique step identifier
    pub id: String,

    /// Localized display name, keyed by language code
    pub display_name: HashMap<String, String>,

    inputs: Vec<InputBinding>,
    outputs: Vec<OutputBinding>,

    /// Pipeline-facing parameter name to process-local parameter name
    input_mapping: HashMap<String, String>,

    /// Process-local output name to pipeline-facing attribute name
    output_mapping: HashMap<String, String>,

    process: Box<dyn Process>,

    /// Runtime state
    pub state: StepState,
}

impl Step {
    /// Wire a step from its definition, the owning process definition, and
    /// a freshly constructed process instance.
    pub(crate) fn new(
        definition: &StepDefinition,
        process_definition: &ProcessDefinition,
        process: Box<dyn Process>,
    ) -> Self {
        let inputs = definition
            .inputs
            .iter()
            .map(|input| InputBinding {
                from: input.from.clone(),
                take: input.take.clone(),
                parameter: input.as_name.clone(),
            })
            .collect();

        let outputs = definition
            .outputs
            .iter()
            .map(|output| OutputBinding {
                take: output.take.clone(),
                publish_as: output.as_name.clone(),
                actions: output.actions.clone(),
            })
            .collect();

        Step {
            id: definition.id.clone(),
            display_name: definition.display_name.clone(),
            inputs,
            outputs,
            input_mapping: process_definition.data_handling.input_mapping.clone(),
            output_mapping: process_definition.data_handling.output_mapping.clone(),
            process,
            state: StepState::Pending,
        }
    }

    /// Execute the step against the growing pipeline context.
    ///
    /// Every failure mode (unresolved input, type mismatch, process error,
    /// missing declared output, cancellation) is normalized into a `Failed`
    /// state with an empty result; nothing is thrown past this method.
    pub async fn run(
        &mut self,
        context: &PipelineContext,
        cancel: CancellationToken,
    ) -> StepResult {
        let started_at = Utc::now();
        self.state = StepState::Running { started_at };
        info!("Executing step: {}", self.id);

        match self.execute(context, cancel).await {
            Ok(result) => {
                self.state = StepState::Success {
                    started_at,
                    completed_at: Utc::now(),
                };
                info!("Step {} completed successfully", self.id);
                result
            }
            Err(error) => {
                warn!("Step {} failed: {}", self.id, error);
                self.state = StepState::Failed {
                    error,
                    started_at: Some(started_at),
                    failed_at: Utc::now(),
                };
                StepResult::new()
            }
        }
    }

    async fn execute(
        &self,
        context: &PipelineContext,
        cancel: CancellationToken,
    ) -> Result<StepResult, String> {
        if cancel.is_cancelled() {
            return Err("cancelled before execution".to_string());
        }

        // Resolve every input binding before touching the process.
        let mut resolved: Vec<(String, TypedValue)> = Vec::with_capacity(self.inputs.len());
        for binding in &self.inputs {
            let result = context.result(&binding.from).ok_or_else(|| {
                format!(
                    "input step '{}' has no result in the pipeline context",
                    binding.from
                )
            })?;
            let output = result.get(&binding.take).ok_or_else(|| {
                format!(
                    "input step '{}' did not publish attribute '{}'",
                    binding.from, binding.take
                )
            })?;

            // Translate the pipeline-facing parameter name to the
            // process-local one declared in the schema.
            let local_name = self
                .input_mapping
                .get(&binding.parameter)
                .unwrap_or(&binding.parameter)
                .clone();
            resolved.push((local_name, output.data.clone()));
        }

        let arguments = bind_arguments(&self.process.parameters(), resolved)?;

        debug!("Invoking process for step {}", self.id);
        let raw_outputs = self
            .process
            .run(arguments, cancel)
            .await
            .map_err(|e| format!("process failed: {}", e))?;

        // Translate process-local output names to pipeline-facing ones.
        let mut outputs: HashMap<String, TypedValue> = HashMap::with_capacity(raw_outputs.len());
        for (name, value) in raw_outputs {
            let published = self.output_mapping.get(&name).unwrap_or(&name).clone();
            outputs.insert(published, value);
        }

        let mut result = StepResult::new();
        for binding in &self.outputs {
            let value = outputs.get(&binding.take).ok_or_else(|| {
                format!(
                    "process did not produce declared output '{}'",
                    binding.take
                )
            })?;
            result.insert(
                &binding.publish_as,
                StepOutput::with_actions(value.clone(), binding.actions.clone()),
            );
        }

        Ok(result)
    }
}

impl std::fmt::Debug for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Step")
            .field("id", &self.id)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .field("state", &self.state)
            .finish()
    }
}

/// Assemble the named-argument map for a process invocation.
///
/// `resolved` carries the bound values keyed by process-local parameter
/// name, in binding declaration order. Type checking is strict: no value
/// may cross kinds, `Null` only binds to nullable parameters, and array
/// parameters gather every same-named binding in declaration order.
fn bind_arguments(
    specs: &[crate::process::ParameterSpec],
    resolved: Vec<(String, TypedValue)>,
) -> Result<HashMap<String, TypedValue>, String> {
    // Group by parameter name, preserving declaration order within a group.
    let mut grouped: HashMap<&str, Vec<&TypedValue>> = HashMap::new();
    for (name, value) in &resolved {
        grouped.entry(name.as_str()).or_default().push(value);
    }

    for (name, _) in &resolved {
        if !specs.iter().any(|spec| spec.name == *name) {
            return Err(format!(
                "no parameter '{}' declared by the process",
                name
            ));
        }
    }

    let mut arguments = HashMap::with_capacity(specs.len());
    for spec in specs {
        let values = grouped.remove(spec.name.as_str()).unwrap_or_default();

        if values.is_empty() {
            if spec.nullable {
                arguments.insert(spec.name.clone(), TypedValue::Null);
                continue;
            }
            return Err(format!(
                "no value bound to required parameter '{}'",
                spec.name
            ));
        }

        if spec.array {
            // A single binding that already carries a matching array passes
            // through unchanged.
            if values.len() == 1 && values[0].matches_array(spec.kind) {
                arguments.insert(spec.name.clone(), values[0].clone());
                continue;
            }
            if values.len() == 1 && values[0].is_null() {
                if spec.nullable {
                    arguments.insert(spec.name.clone(), TypedValue::Null);
                    continue;
                }
                return Err(format!(
                    "null value bound to non-nullable parameter '{}'",
                    spec.name
                ));
            }
            let owned: Vec<TypedValue> = values.iter().map(|v| (*v).clone()).collect();
            match value::collect_array(spec.kind, &owned) {
                Some(array) => {
                    arguments.insert(spec.name.clone(), array);
                }
                None => {
                    return Err(format!(
                        "values bound to array parameter '{}' do not all match kind {}",
                        spec.name, spec.kind
                    ));
                }
            }
            continue;
        }

        if values.len() > 1 {
            return Err(format!(
                "multiple values bound to scalar parameter '{}'",
                spec.name
            ));
        }

        let value = values[0];
        if value.is_null() {
            if spec.nullable {
                arguments.insert(spec.name.clone(), TypedValue::Null);
                continue;
            }
            return Err(format!(
                "null value bound to non-nullable parameter '{}'",
                spec.name
            ));
        }

        if !value.matches_scalar(spec.kind) {
            return Err(format!(
                "value of kind {} bound to parameter '{}' of kind {}",
                value.kind_label(),
                spec.name,
                spec.kind
            ));
        }

        arguments.insert(spec.name.clone(), value.clone());
    }

    Ok(arguments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{ParameterKind, ParameterSpec};

    fn bind(
        specs: &[ParameterSpec],
        resolved: Vec<(&str, TypedValue)>,
    ) -> Result<HashMap<String, TypedValue>, String> {
        bind_arguments(
            specs,
            resolved
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
        )
    }

    #[test]
    fn test_bind_scalar() {
        let specs = [ParameterSpec::required("file", ParameterKind::String)];
        let arguments = bind(&specs, vec![("file", TypedValue::String("a.xtf".into()))]).unwrap();
        assert_eq!(
            arguments.get("file"),
            Some(&TypedValue::String("a.xtf".into()))
        );
    }

    #[test]
    fn test_bind_rejects_wrong_kind() {
        let specs = [ParameterSpec::required("strict", ParameterKind::Bool)];
        let err = bind(&specs, vec![("strict", TypedValue::String("yes".into()))]).unwrap_err();
        assert!(err.contains("'strict'"), "unexpected: {}", err);
    }

    #[test]
    fn test_bind_rejects_null_for_non_nullable() {
        let specs = [ParameterSpec::required("file", ParameterKind::String)];
        let err = bind(&specs, vec![("file", TypedValue::Null)]).unwrap_err();
        assert!(err.contains("non-nullable"), "unexpected: {}", err);
    }

    #[test]
    fn test_bind_null_for_nullable() {
        let specs = [ParameterSpec::nullable("profile", ParameterKind::String)];
        let arguments = bind(&specs, vec![("profile", TypedValue::Null)]).unwrap();
        assert_eq!(arguments.get("profile"), Some(&TypedValue::Null));
    }

    #[test]
    fn test_bind_missing_nullable_defaults_to_null() {
        let specs = [ParameterSpec::nullable("profile", ParameterKind::String)];
        let arguments = bind(&specs, vec![]).unwrap();
        assert_eq!(arguments.get("profile"), Some(&TypedValue::Null));
    }

    #[test]
    fn test_bind_missing_required_fails() {
        let specs = [ParameterSpec::required("file", ParameterKind::String)];
        let err = bind(&specs, vec![]).unwrap_err();
        assert!(err.contains("required parameter 'file'"), "unexpected: {}", err);
    }

    #[test]
    fn test_bind_unknown_parameter_fails() {
        let specs = [ParameterSpec::required("file", ParameterKind::String)];
        let err = bind(
            &specs,
            vec![
                ("file", TypedValue::String("a".into())),
                ("extra", TypedValue::Int(1)),
            ],
        )
        .unwrap_err();
        assert!(err.contains("'extra'"), "unexpected: {}", err);
    }

    #[test]
    fn test_bind_array_gathers_in_declaration_order() {
        let specs = [ParameterSpec::array("files", ParameterKind::String)];
        let arguments = bind(
            &specs,
            vec![
                ("files", TypedValue::String("first.xtf".into())),
                ("files", TypedValue::String("second.xtf".into())),
            ],
        )
        .unwrap();
        assert_eq!(
            arguments.get("files"),
            Some(&TypedValue::StringArray(vec![
                "first.xtf".into(),
                "second.xtf".into()
            ]))
        );
    }

    #[test]
    fn test_bind_array_passthrough() {
        let specs = [ParameterSpec::array("codes", ParameterKind::Int)];
        let arguments = bind(&specs, vec![("codes", TypedValue::IntArray(vec![1, 2]))]).unwrap();
        assert_eq!(arguments.get("codes"), Some(&TypedValue::IntArray(vec![1, 2])));
    }

    #[test]
    fn test_bind_scalar_where_array_value_given() {
        let specs = [ParameterSpec::required("file", ParameterKind::String)];
        let err = bind(
            &specs,
            vec![("file", TypedValue::StringArray(vec!["a".into()]))],
        )
        .unwrap_err();
        assert!(err.contains("'file'"), "unexpected: {}", err);
    }

    #[test]
    fn test_bind_multiple_values_for_scalar_fails() {
        let specs = [ParameterSpec::required("file", ParameterKind::String)];
        let err = bind(
            &specs,
            vec![
                ("file", TypedValue::String("a".into())),
                ("file", TypedValue::String("b".into())),
            ],
        )
        .unwrap_err();
        assert!(err.contains("multiple values"), "unexpected: {}", err);
    }

    #[test]
    fn test_bind_array_mixed_kinds_fails() {
        let specs = [ParameterSpec::array("codes", ParameterKind::Int)];
        let err = bind(
            &specs,
            vec![
                ("codes", TypedValue::Int(1)),
                ("codes", TypedValue::String("two".into())),
            ],
        )
        .unwrap_err();
        assert!(err.contains("'codes'"), "unexpected: {}", err);
    }
}
