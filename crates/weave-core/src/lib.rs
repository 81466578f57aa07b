//! Core model and naming for the weave binding generator
//!
//! Everything here is deterministic and free of ambient state: module ordering,
//! unique module naming, the symbol model, diagnostics, the persisted binding
//! list and run configuration.

pub mod binding;
pub mod config;
pub mod deps;
pub mod diagnostics;
pub mod error;
pub mod module_graph;
pub mod module_names;
pub mod module_order;
pub mod module_path;
pub mod naming;
pub mod outcome;
pub mod overrides;
pub mod source;
pub mod symbols;

pub use binding::{BindingCandidate, BindingKey, Category, NamedBinding, Priority, NAME_PLACEHOLDER};
pub use config::{is_env_enabled, Config};
pub use deps::{Dependencies, RequiredGenericImpl};
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
pub use error::CoreError;
pub use module_graph::ModuleGraph;
pub use module_names::{TakenNames, UniqueModuleNames};
pub use module_order::ModuleOrder;
pub use module_path::ModulePath;
pub use outcome::Outcome;
pub use overrides::{BindingList, BindingStore, PersistedOverride, ReconcileSummary, TomlBindingStore};
pub use source::{ModelBuilder, ModelInput, ModuleParser, ModuleRequirement, ParsedModules, SourceFetcher};
pub use symbols::{Ident, Symbol, SymbolTable, TypeRef};
