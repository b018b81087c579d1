//! Shared test doubles for the integration tests
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use geopipe::process::{ParameterSpec, Process, ProcessError, ProcessRegistry, TypedValue};

/// Behavior of a [`MockProcess`] instance
#[derive(Clone, Default)]
pub struct MockSpec {
    /// Declared parameter schema
    pub parameters: Vec<ParameterSpec>,

    /// Canned outputs returned on success, keyed by process-local name
    pub outputs: HashMap<String, TypedValue>,

    /// Fail every invocation with this message
    pub fail: Option<String>,

    /// Suspend until the cancellation token fires, then report cancellation
    pub wait_for_cancel: bool,
}

impl MockSpec {
    pub fn with_parameter(mut self, spec: ParameterSpec) -> Self {
        self.parameters.push(spec);
        self
    }

    pub fn with_output(mut self, name: &str, value: TypedValue) -> Self {
        self.outputs.insert(name.to_string(), value);
        self
    }

    pub fn failing(mut self, message: &str) -> Self {
        self.fail = Some(message.to_string());
        self
    }

    pub fn waiting_for_cancel(mut self) -> Self {
        self.wait_for_cancel = true;
        self
    }
}

/// Observation handle shared by every instance a registration constructs
#[derive(Clone, Default)]
pub struct MockHandle {
    /// Constructor calls (one per step per `create_pipeline`)
    pub constructions: Arc<AtomicUsize>,

    /// Run invocations across all instances
    pub invocations: Arc<AtomicUsize>,

    /// The arguments of the most recent invocation
    pub last_inputs: Arc<Mutex<Option<HashMap<String, TypedValue>>>>,
}

impl MockHandle {
    pub fn construction_count(&self) -> usize {
        self.constructions.load(Ordering::SeqCst)
    }

    pub fn invocation_count(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }

    pub fn last_inputs(&self) -> Option<HashMap<String, TypedValue>> {
        self.last_inputs.lock().unwrap().clone()
    }
}

/// Process double with a declared schema, canned outputs, and counters
pub struct MockProcess {
    spec: MockSpec,
    handle: MockHandle,
}

#[async_trait]
impl Process for MockProcess {
    fn parameters(&self) -> Vec<ParameterSpec> {
        self.spec.parameters.clone()
    }

    async fn run(
        &self,
        inputs: HashMap<String, TypedValue>,
        cancel: CancellationToken,
    ) -> Result<HashMap<String, TypedValue>, ProcessError> {
        self.handle.invocations.fetch_add(1, Ordering::SeqCst);
        *self.handle.last_inputs.lock().unwrap() = Some(inputs);

        if self.spec.wait_for_cancel {
            cancel.cancelled().await;
            return Err(ProcessError::Cancelled);
        }

        if let Some(message) = &self.spec.fail {
            return Err(ProcessError::Execution(message.clone()));
        }

        Ok(self.spec.outputs.clone())
    }
}

/// Register a mock implementation and return its observation handle.
pub fn register_mock(registry: &mut ProcessRegistry, name: &str, spec: MockSpec) -> MockHandle {
    let handle = MockHandle::default();
    let constructor_handle = handle.clone();
    registry.register(name, move |_config| {
        constructor_handle
            .constructions
            .fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockProcess {
            spec: spec.clone(),
            handle: constructor_handle.clone(),
        }) as Box<dyn Process>)
    });
    handle
}
