//! Collision-free flat names for source modules
//!
//! Modules are visited in [`ModuleOrder`]. Each starts with its declared short
//! name; while that is taken, the next unused path segment (right to left,
//! version segments removed, snake_cased) is prepended. For example, with
//! `audio` taken, `example.com/app/resources/audio` becomes `resources_audio`,
//! then `app_resources_audio`.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace};

use crate::error::CoreError;
use crate::module_order::ModuleOrder;
use crate::module_path::{ModulePath, NATIVE_MODULE};
use crate::naming::to_snake_case;

/// Names already handed out during one naming pass.
#[derive(Debug, Clone, Default)]
pub struct TakenNames {
    names: HashSet<String>,
}

impl TakenNames {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Returns false if the name was already taken.
    pub fn insert(&mut self, name: impl Into<String>) -> bool {
        self.names.insert(name.into())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Module path to unique module name, injective over one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniqueModuleNames {
    names: BTreeMap<ModulePath, String>,
}

impl UniqueModuleNames {
    /// Assigns names to every module with a non-empty declared name.
    pub fn assign(
        declared: &BTreeMap<ModulePath, String>,
        order: &ModuleOrder,
    ) -> Result<Self, CoreError> {
        let mut taken = TakenNames::new();
        Self::assign_into(declared, order, &mut taken)
    }

    /// Like [`UniqueModuleNames::assign`], recording into a caller-owned
    /// accumulator so names reserved beforehand are respected.
    #[instrument(skip(declared, taken), fields(modules = declared.len(), preferred = order.preferred()), level = "debug")]
    pub fn assign_into(
        declared: &BTreeMap<ModulePath, String>,
        order: &ModuleOrder,
        taken: &mut TakenNames,
    ) -> Result<Self, CoreError> {
        let mut result = Self::default();
        result
            .names
            .insert(ModulePath::new(NATIVE_MODULE), NATIVE_MODULE.to_string());
        taken.insert(NATIVE_MODULE);

        let mut paths: Vec<ModulePath> = declared
            .iter()
            .filter(|(_, name)| !name.is_empty())
            .map(|(path, _)| path.clone())
            .collect();
        order.sort(&mut paths);

        for path in paths {
            let declared_name = &declared[&path];
            let name = unique_name_for(&path, declared_name, taken)?;
            debug!("module {} -> {}", path, name);
            taken.insert(name.clone());
            result.names.insert(path, name);
        }

        Ok(result)
    }

    pub fn get(&self, path: &ModulePath) -> Option<&str> {
        self.names.get(path).map(String::as_str)
    }

    pub fn contains(&self, path: &ModulePath) -> bool {
        self.names.contains_key(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ModulePath, &str)> {
        self.names.iter().map(|(p, n)| (p, n.as_str()))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

fn unique_name_for(
    path: &ModulePath,
    declared_name: &str,
    taken: &TakenNames,
) -> Result<String, CoreError> {
    let mut remaining: Vec<String> = path.stripped().split('/').map(str::to_string).collect();
    let mut components = vec![declared_name.to_string()];

    while taken.contains(&components.join("_")) {
        let Some(segment) = remaining.pop() else {
            return Err(CoreError::ModuleNameExhausted(path.clone()));
        };
        let segment = to_snake_case(&segment);
        if components.contains(&segment) {
            continue;
        }
        trace!("{} taken, prepending {}", components.join("_"), segment);
        components.insert(0, segment);
    }

    Ok(components.join("_"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn declared(entries: &[(&str, &str)]) -> BTreeMap<ModulePath, String> {
        entries
            .iter()
            .map(|(p, n)| (ModulePath::new(*p), n.to_string()))
            .collect()
    }

    #[test]
    fn test_declared_name_used_when_free() {
        let names =
            UniqueModuleNames::assign(&declared(&[("fmt", "fmt")]), &ModuleOrder::default())
                .unwrap();
        assert_eq!(names.get(&"fmt".into()), Some("fmt"));
        assert_eq!(names.get(&NATIVE_MODULE.into()), Some("C"));
    }

    #[test]
    fn test_prepends_path_segments_until_free() {
        let mut taken = TakenNames::new();
        taken.insert("audio");
        taken.insert("resources_audio");
        let names = UniqueModuleNames::assign_into(
            &declared(&[("example.com/app/resources/audio", "audio")]),
            &ModuleOrder::default(),
            &mut taken,
        )
        .unwrap();
        assert_eq!(
            names.get(&"example.com/app/resources/audio".into()),
            Some("app_resources_audio")
        );
    }

    #[test]
    fn test_single_step_prefix() {
        let mut taken = TakenNames::new();
        taken.insert("audio");
        let names = UniqueModuleNames::assign_into(
            &declared(&[("example.com/app/resources/audio", "audio")]),
            &ModuleOrder::default(),
            &mut taken,
        )
        .unwrap();
        assert_eq!(
            names.get(&"example.com/app/resources/audio".into()),
            Some("resources_audio")
        );
    }

    #[test]
    fn test_std_wins_short_name() {
        let names = UniqueModuleNames::assign(
            &declared(&[("example.com/tools/errors", "errors"), ("errors", "errors")]),
            &ModuleOrder::new("example.com/tools"),
        )
        .unwrap();
        assert_eq!(names.get(&"errors".into()), Some("errors"));
        assert_eq!(
            names.get(&"example.com/tools/errors".into()),
            Some("tools_errors")
        );
    }

    #[test]
    fn test_versions_are_not_name_components() {
        let names = UniqueModuleNames::assign(
            &declared(&[("example.com/lib", "lib"), ("example.com/lib/v2", "lib")]),
            &ModuleOrder::default(),
        )
        .unwrap();
        assert_eq!(names.get(&"example.com/lib/v2".into()), Some("lib"));
        assert_eq!(names.get(&"example.com/lib".into()), Some("example_com_lib"));
    }

    #[test]
    fn test_exhausted_path_is_fatal() {
        let mut taken = TakenNames::new();
        taken.insert("x");
        taken.insert("a_x");
        let err = UniqueModuleNames::assign_into(
            &declared(&[("a/x", "x")]),
            &ModuleOrder::default(),
            &mut taken,
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::ModuleNameExhausted(p) if p.as_str() == "a/x"));
    }

    #[test]
    fn test_native_name_is_reserved() {
        let names = UniqueModuleNames::assign(
            &declared(&[("example.com/c", "C")]),
            &ModuleOrder::default(),
        )
        .unwrap();
        assert_eq!(names.get(&"example.com/c".into()), Some("c_C"));
    }

    #[test]
    fn test_empty_declared_names_skipped() {
        let names = UniqueModuleNames::assign(
            &declared(&[("example.com/tools", "")]),
            &ModuleOrder::default(),
        )
        .unwrap();
        assert!(!names.contains(&"example.com/tools".into()));
        assert_eq!(names.len(), 1);
    }
}
