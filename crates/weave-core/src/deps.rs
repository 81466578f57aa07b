//! Dependencies accumulated while synthesizing bindings

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::module_path::ModulePath;
use crate::symbols::Ident;

/// Request for a synthesized implementation of a generic interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredGenericImpl {
    /// Stable key; each distinct key is synthesized at most once.
    pub key: String,
    pub interface: Ident,
}

impl RequiredGenericImpl {
    pub fn for_interface(interface: &Ident) -> Self {
        Self {
            key: interface.to_string(),
            interface: interface.clone(),
        }
    }
}

/// Imports plus generic-implementation requests. Grows during binding
/// generation; read-only once the closure has reached its fixpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependencies {
    pub imports: BTreeSet<ModulePath>,
    pub generic_impls: BTreeMap<String, RequiredGenericImpl>,
}

impl Dependencies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_import(&mut self, module: ModulePath) {
        self.imports.insert(module);
    }

    /// Returns true if the request was not known before.
    pub fn require_generic_impl(&mut self, request: RequiredGenericImpl) -> bool {
        if self.generic_impls.contains_key(&request.key) {
            return false;
        }
        self.generic_impls.insert(request.key.clone(), request);
        true
    }

    pub fn merge(&mut self, other: Dependencies) {
        self.imports.extend(other.imports);
        for (key, request) in other.generic_impls {
            self.generic_impls.entry(key).or_insert(request);
        }
    }
}
