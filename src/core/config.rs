//! Pipeline and process configuration from YAML

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Post-processing instruction attached to a published output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputAction {
    /// Retain the value for download by the caller
    Download,
    /// Discard the value after the run
    Ignore,
}

/// Declaration of a reusable process: an implementation name plus defaults
///
/// Every field defaults when absent so that an incomplete document still
/// parses; the validator reports all missing fields in one aggregated pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessDefinition {
    /// Unique process identifier
    #[serde(default)]
    pub id: String,

    /// Implementation name resolved through the process registry
    #[serde(default)]
    pub implementation: String,

    /// Default parameters passed to the implementation's constructor
    #[serde(default)]
    pub config: HashMap<String, String>,

    /// Name translation between process-local and pipeline-facing names
    #[serde(default)]
    pub data_handling: DataHandling,
}

/// Attribute-name remapping for one process
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataHandling {
    /// Pipeline-facing parameter name to process-local parameter name
    #[serde(default)]
    pub input_mapping: HashMap<String, String>,

    /// Process-local output name to pipeline-facing attribute name
    #[serde(default)]
    pub output_mapping: HashMap<String, String>,
}

/// One declared input binding: where a value comes from
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InputConfig {
    /// Step id (or the pipeline's upload step token) publishing the value
    #[serde(default)]
    pub from: String,

    /// Attribute name published by the referenced step
    #[serde(default)]
    pub take: String,

    /// Parameter name the value is bound to
    #[serde(default, rename = "as")]
    pub as_name: String,
}

/// One declared output binding: where a value goes and what to do with it
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Process output name to take the value from
    #[serde(default)]
    pub take: String,

    /// Pipeline-facing attribute name to publish the value under
    #[serde(default, rename = "as")]
    pub as_name: String,

    /// Declared post-processing actions
    #[serde(default)]
    pub actions: BTreeSet<OutputAction>,
}

/// Step configuration as defined in YAML
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepDefinition {
    /// Unique step identifier
    #[serde(default)]
    pub id: String,

    /// Localized display name, keyed by language code
    #[serde(default)]
    pub display_name: HashMap<String, String>,

    /// Reference into the process definition set
    #[serde(default)]
    pub process_id: String,

    /// Ordered input bindings
    #[serde(default)]
    pub inputs: Vec<InputConfig>,

    /// Ordered output bindings
    #[serde(default)]
    pub outputs: Vec<OutputConfig>,
}

/// Upload parameters of a pipeline
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineParameters {
    /// Token identifying the implicit first context entry
    #[serde(default)]
    pub upload_step: String,

    /// File-extension to attribute-name mappings for the uploaded file
    #[serde(default)]
    pub file_mappings: Vec<FileMapping>,
}

/// Maps an uploaded file extension to the attribute name it is published as
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMapping {
    /// File extension including the leading dot
    #[serde(default)]
    pub file_extension: String,

    /// Attribute name published under the upload step token
    #[serde(default)]
    pub attribute: String,
}

/// Pipeline configuration as defined in YAML
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineDefinition {
    /// Globally unique pipeline identifier
    #[serde(default)]
    pub id: String,

    /// Localized display name, keyed by language code
    #[serde(default)]
    pub display_name: HashMap<String, String>,

    /// Ordered steps, defining execution order
    #[serde(default)]
    pub steps: Vec<StepDefinition>,

    /// Upload parameters
    #[serde(default)]
    pub parameters: PipelineParameters,
}

/// Top-level configuration document loaded from YAML
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineProcessConfig {
    /// Declared processes
    #[serde(default)]
    pub processes: Vec<ProcessDefinition>,

    /// Declared pipelines
    #[serde(default)]
    pub pipelines: Vec<PipelineDefinition>,
}

impl PipelineProcessConfig {
    /// Load the configuration document from a YAML file.
    ///
    /// Parsing only; run [`crate::core::validation::Validator`] before
    /// building pipelines from the result.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).with_context(|| {
            format!(
                "Failed to read pipeline configuration from {}",
                path.as_ref().display()
            )
        })?;
        Self::from_yaml(&content)
    }

    /// Parse the configuration document from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: PipelineProcessConfig =
            serde_yaml::from_str(yaml).context("Failed to parse pipeline configuration")?;
        Ok(config)
    }

    /// Look up a process definition by id.
    pub fn process(&self, id: &str) -> Option<&ProcessDefinition> {
        self.processes.iter().find(|p| p.id == id)
    }

    /// Look up a pipeline definition by id.
    pub fn pipeline(&self, id: &str) -> Option<&PipelineDefinition> {
        self.pipelines.iter().find(|p| p.id == id)
    }
}

impl StepDefinition {
    /// The attribute names this step publishes (its outputs' `as` names).
    pub fn published_attributes(&self) -> BTreeSet<&str> {
        self.outputs.iter().map(|o| o.as_name.as_str()).collect()
    }
}

impl PipelineParameters {
    /// The attribute names the upload step publishes.
    pub fn upload_attributes(&self) -> BTreeSet<&str> {
        self.file_mappings
            .iter()
            .map(|m| m.attribute.as_str())
            .collect()
    }
}
