//! Module composition: a named bundle of endpoints and triggers.

use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;

use crate::callable::CallableFunction;
use crate::http::HttpFunction;
use crate::trigger::DocumentTrigger;

/// An exposed function, keyed by its public name.
#[derive(Clone)]
pub enum Endpoint {
    Http(Arc<dyn HttpFunction>),
    Callable(Arc<dyn CallableFunction>),
}

impl Endpoint {
    pub fn http(function: impl HttpFunction + 'static) -> Self {
        Endpoint::Http(Arc::new(function))
    }

    pub fn callable(function: impl CallableFunction + 'static) -> Self {
        Endpoint::Callable(Arc::new(function))
    }
}

impl core::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Endpoint::Http(_) => f.write_str("Endpoint::Http"),
            Endpoint::Callable(_) => f.write_str("Endpoint::Callable"),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("export '{0}' is defined by more than one module")]
pub struct DuplicateExport(pub String);

/// What a module exposes: endpoints by name and document triggers by name.
#[derive(Debug, Clone, Default)]
pub struct ModuleExports {
    pub functions: BTreeMap<String, Endpoint>,
    pub triggers: BTreeMap<String, DocumentTrigger>,
}

impl ModuleExports {
    pub fn function(mut self, name: impl Into<String>, endpoint: Endpoint) -> Self {
        self.functions.insert(name.into(), endpoint);
        self
    }

    pub fn trigger(mut self, name: impl Into<String>, trigger: DocumentTrigger) -> Self {
        self.triggers.insert(name.into(), trigger);
        self
    }

    /// Fold another module's exports in. Names are global across modules.
    ///
    /// On a clash nothing is merged.
    pub fn merge(&mut self, other: ModuleExports) -> Result<(), DuplicateExport> {
        let taken = |name: &String| self.functions.contains_key(name) || self.triggers.contains_key(name);
        if let Some(name) = other
            .functions
            .keys()
            .chain(other.triggers.keys())
            .find(|name| taken(*name))
        {
            return Err(DuplicateExport(name.clone()));
        }
        if let Some(name) = other.functions.keys().find(|name| other.triggers.contains_key(*name)) {
            return Err(DuplicateExport(name.clone()));
        }

        self.functions.extend(other.functions);
        self.triggers.extend(other.triggers);
        Ok(())
    }
}

/// A feature module assembled once at startup from its dependencies.
pub trait Module: Send + Sync {
    fn name(&self) -> &str;

    fn exports(&self) -> ModuleExports;
}
