//! Pipeline context - per-run store of published step outputs

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use crate::core::config::OutputAction;
use crate::process::TypedValue;

/// One published output: the value plus its declared post-processing actions
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepOutput {
    pub data: TypedValue,
    pub actions: BTreeSet<OutputAction>,
}

impl StepOutput {
    pub fn new(data: TypedValue) -> Self {
        Self {
            data,
            actions: BTreeSet::new(),
        }
    }

    pub fn with_actions(data: TypedValue, actions: BTreeSet<OutputAction>) -> Self {
        Self { data, actions }
    }
}

/// The outputs one step published, keyed by attribute name
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StepResult {
    outputs: HashMap<String, StepOutput>,
}

impl StepResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, attribute: &str, output: StepOutput) {
        self.outputs.insert(attribute.to_string(), output);
    }

    pub fn get(&self, attribute: &str) -> Option<&StepOutput> {
        self.outputs.get(attribute)
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    /// Published attribute names, sorted for stable output.
    pub fn attributes(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.outputs.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &StepOutput)> {
        self.outputs.iter()
    }
}

/// Execution context for a pipeline run
///
/// Maps step ids (including the upload step's token) to their results.
/// Grows monotonically as steps complete; an entry is never mutated after
/// the step's result is written.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineContext {
    results: HashMap<String, StepResult>,
}

impl PipelineContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a step's result. First write per step id wins.
    pub fn insert(&mut self, step_id: &str, result: StepResult) {
        self.results.entry(step_id.to_string()).or_insert(result);
    }

    pub fn result(&self, step_id: &str) -> Option<&StepResult> {
        self.results.get(step_id)
    }

    pub fn contains(&self, step_id: &str) -> bool {
        self.results.contains_key(step_id)
    }

    /// Convenience lookup of one published value.
    pub fn value(&self, step_id: &str, attribute: &str) -> Option<&TypedValue> {
        self.results
            .get(step_id)?
            .get(attribute)
            .map(|output| &output.data)
    }

    /// Step ids with a recorded result, sorted for stable output.
    pub fn step_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.results.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}
