//! Name-to-constructor registry for process implementations

use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use crate::process::{Process, ProcessError};

/// Constructor for a process implementation.
///
/// Receives the process definition's default configuration and returns a
/// fresh instance. Called once per step per `create_pipeline`, so unrelated
/// pipeline runs never share mutable process state.
pub type ProcessConstructor =
    Box<dyn Fn(&HashMap<String, String>) -> Result<Box<dyn Process>, ProcessError> + Send + Sync>;

/// Registration table mapping implementation names to constructors.
///
/// Populated once at application startup and read-only afterwards.
#[derive(Default)]
pub struct ProcessRegistry {
    constructors: HashMap<String, ProcessConstructor>,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// Register a constructor under an implementation name.
    ///
    /// A later registration under the same name replaces the earlier one.
    pub fn register<F>(&mut self, name: &str, constructor: F)
    where
        F: Fn(&HashMap<String, String>) -> Result<Box<dyn Process>, ProcessError>
            + Send
            + Sync
            + 'static,
    {
        debug!("Registering process implementation '{}'", name);
        self.constructors
            .insert(name.to_string(), Box::new(constructor));
    }

    /// Check whether an implementation name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// The registered implementation names, sorted for stable diagnostics.
    pub fn names(&self) -> BTreeSet<String> {
        self.constructors.keys().cloned().collect()
    }

    /// Construct a fresh process instance for an implementation name.
    pub fn create(
        &self,
        name: &str,
        config: &HashMap<String, String>,
    ) -> Result<Box<dyn Process>, ProcessError> {
        let constructor = self
            .constructors
            .get(name)
            .ok_or_else(|| ProcessError::UnknownImplementation(name.to_string()))?;
        constructor(config)
    }
}

impl std::fmt::Debug for ProcessRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessRegistry")
            .field("implementations", &self.names())
            .finish()
    }
}
