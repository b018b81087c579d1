//! Pipeline factory - validated construction of runnable object graphs

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::core::config::PipelineProcessConfig;
use crate::core::validation::Validator;
use crate::execution::pipeline::Pipeline;
use crate::execution::step::Step;
use crate::process::{ProcessError, ProcessRegistry};

/// Error types for factory construction and pipeline instantiation
#[derive(Debug, Error)]
pub enum FactoryError {
    #[error("invalid pipeline configuration:\n{0}")]
    InvalidConfiguration(String),

    #[error("pipeline for '{0}' not found")]
    PipelineNotFound(String),

    #[error("failed to load pipeline configuration: {0}")]
    Load(#[from] anyhow::Error),

    #[error(transparent)]
    Process(#[from] ProcessError),
}

/// Catalog entry describing one available pipeline
#[derive(Debug, Clone, Serialize)]
pub struct PipelineInfo {
    pub id: String,
    pub display_name: HashMap<String, String>,
}

impl PipelineInfo {
    /// Display name for a language code, falling back to any available one.
    pub fn localized_name(&self, lang: &str) -> Option<&str> {
        self.display_name
            .get(lang)
            .or_else(|| self.display_name.values().next())
            .map(String::as_str)
    }
}

/// Top-level builder: holds a validated configuration document and the
/// process registry, and instantiates a fresh, runnable [`Pipeline`] per
/// [`PipelineFactory::create_pipeline`] call.
pub struct PipelineFactory {
    config: PipelineProcessConfig,
    registry: Arc<ProcessRegistry>,
}

impl PipelineFactory {
    /// Build a factory from an already-parsed configuration document.
    ///
    /// Fails fast with the aggregated validation report; a hosting
    /// application should refuse to start on this error.
    pub fn new(
        config: PipelineProcessConfig,
        registry: Arc<ProcessRegistry>,
    ) -> Result<Self, FactoryError> {
        let result = Validator::for_registry(&registry).validate(&config);
        if result.has_errors() {
            return Err(FactoryError::InvalidConfiguration(result.error_message()));
        }

        info!(
            "Pipeline configuration valid: {} processes, {} pipelines",
            config.processes.len(),
            config.pipelines.len()
        );
        Ok(Self { config, registry })
    }

    /// Parse and validate a configuration document from a YAML string.
    pub fn from_yaml(yaml: &str, registry: Arc<ProcessRegistry>) -> Result<Self, FactoryError> {
        let config = PipelineProcessConfig::from_yaml(yaml)?;
        Self::new(config, registry)
    }

    /// Parse and validate a configuration document from a YAML file.
    pub fn from_file<P: AsRef<Path>>(
        path: P,
        registry: Arc<ProcessRegistry>,
    ) -> Result<Self, FactoryError> {
        let config = PipelineProcessConfig::from_file(path)?;
        Self::new(config, registry)
    }

    /// Instantiate a fresh, runnable pipeline for the given id.
    ///
    /// Every step receives a newly constructed process instance, so
    /// unrelated runs never share mutable process state. Never returns a
    /// partially-built pipeline: the first construction error aborts.
    pub fn create_pipeline(&self, id: &str) -> Result<Pipeline, FactoryError> {
        let definition = self
            .config
            .pipeline(id)
            .ok_or_else(|| FactoryError::PipelineNotFound(id.to_string()))?;

        let mut steps = Vec::with_capacity(definition.steps.len());
        for step_definition in &definition.steps {
            // The validator guarantees the process reference resolves.
            let process_definition = self
                .config
                .process(&step_definition.process_id)
                .expect("validated process reference");

            let process = self.registry.create(
                &process_definition.implementation,
                &process_definition.config,
            )?;

            debug!(
                "Bound step '{}' to implementation '{}'",
                step_definition.id, process_definition.implementation
            );
            steps.push(Step::new(step_definition, process_definition, process));
        }

        Ok(Pipeline::new(
            definition.id.clone(),
            definition.display_name.clone(),
            definition.parameters.upload_step.clone(),
            definition.parameters.file_mappings.clone(),
            steps,
        ))
    }

    /// The available pipelines and their localized display names.
    ///
    /// This is the catalog surface a hosting application lists towards its
    /// users.
    pub fn catalog(&self) -> Vec<PipelineInfo> {
        self.config
            .pipelines
            .iter()
            .map(|pipeline| PipelineInfo {
                id: pipeline.id.clone(),
                display_name: pipeline.display_name.clone(),
            })
            .collect()
    }
}

impl std::fmt::Debug for PipelineFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineFactory")
            .field(
                "pipelines",
                &self
                    .config
                    .pipelines
                    .iter()
                    .map(|p| p.id.as_str())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}
