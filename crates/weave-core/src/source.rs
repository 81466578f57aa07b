//! Collaborators that supply source modules and the symbol model
//!
//! Fetching module trees, parsing them and building the semantic model happen
//! outside the core. These traits are the boundary the orchestrator drives.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::module_names::UniqueModuleNames;
use crate::module_path::ModulePath;
use crate::outcome::Outcome;
use crate::symbols::SymbolTable;

/// Retrieves module source trees into a local directory.
pub trait SourceFetcher {
    /// Directory `module@version` occupies under `dest`, present or not.
    fn dir(&self, dest: &Path, module: &ModulePath, version: &str) -> PathBuf;

    /// Whether `module@version` is already present under `dest`. No side effects.
    fn have(&self, dest: &Path, module: &ModulePath, version: &str) -> Result<bool, CoreError>;

    /// Makes `module@version` available under `dest` and returns its directory.
    fn get(&self, dest: &Path, module: &ModulePath, version: &str) -> Result<PathBuf, CoreError>;
}

/// A module required by a parsed module.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModuleRequirement {
    pub path: ModulePath,
    pub version: String,
}

/// Result of parsing one fetched module tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedModules {
    /// Declared short name of every discovered sub-module.
    pub declared_names: BTreeMap<ModulePath, String>,
    /// Directory of every discovered sub-module.
    pub dirs: BTreeMap<ModulePath, PathBuf>,
    /// Minimum host-language version the module asks for.
    pub min_host_version: Option<String>,
    pub requires: Vec<ModuleRequirement>,
}

impl ParsedModules {
    pub fn merge(&mut self, other: ParsedModules) {
        for (path, name) in other.declared_names {
            self.declared_names.entry(path).or_insert(name);
        }
        for (path, dir) in other.dirs {
            self.dirs.entry(path).or_insert(dir);
        }
        self.requires.extend(other.requires);
    }
}

pub trait ModuleParser {
    /// Parses the module tree at `dir` whose root module path is `module`.
    /// Sub-modules listed in `exclude` are not reported.
    fn parse_modules(
        &self,
        dir: &Path,
        module: &ModulePath,
        exclude: &[String],
    ) -> Result<ParsedModules, CoreError>;
}

/// Everything the model builder sees.
#[derive(Debug, Clone, Copy)]
pub struct ModelInput<'a> {
    pub modules: &'a ParsedModules,
    pub module_names: &'a UniqueModuleNames,
}

pub trait ModelBuilder {
    /// Builds the symbol table. Parts that cannot be loaded are reported as
    /// diagnostics alongside a partial table.
    fn build(&self, input: ModelInput<'_>) -> Outcome<SymbolTable, CoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_keeps_first_declaration() {
        let mut a = ParsedModules::default();
        a.declared_names.insert("x.io/a".into(), "a".to_string());
        let mut b = ParsedModules::default();
        b.declared_names.insert("x.io/a".into(), "other".to_string());
        b.declared_names.insert("x.io/b".into(), "b".to_string());
        b.requires.push(ModuleRequirement {
            path: "x.io/c".into(),
            version: "v1.0.0".to_string(),
        });

        a.merge(b);
        assert_eq!(a.declared_names[&ModulePath::new("x.io/a")], "a");
        assert_eq!(a.declared_names.len(), 2);
        assert_eq!(a.requires.len(), 1);
    }
}
