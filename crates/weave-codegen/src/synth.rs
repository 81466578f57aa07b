//! The per-symbol synthesizer boundary
//!
//! A [`Synthesizer`] turns one [`Symbol`] into a [`BindingCandidate`] and one
//! [`RequiredGenericImpl`] into adapter source text. Both may record further
//! imports and generic-implementation requests in the shared [`Dependencies`].

use std::collections::BTreeMap;

use weave_core::naming::{strip_new_prefix, to_kebab_case};
use weave_core::{
    BindingCandidate, BindingList, Config, Dependencies, ModulePath, Priority,
    RequiredGenericImpl, Symbol, SymbolTable, UniqueModuleNames,
};

use crate::error::SynthError;

/// Display-name rules taken from the run configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamingPolicy {
    /// Descending priority; listed modules get unprefixed names.
    pub no_prefix: Vec<ModulePath>,
    pub custom_prefixes: BTreeMap<ModulePath, String>,
    pub cut_new: bool,
}

impl NamingPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            no_prefix: config.no_prefix.iter().map(|m| ModulePath::new(m.clone())).collect(),
            custom_prefixes: config
                .custom_prefixes
                .iter()
                .map(|[prefix, module]| (ModulePath::from(module.as_str()), prefix.clone()))
                .collect(),
            cut_new: config.cut_new,
        }
    }

    /// Index in `no_prefix`, lowest priority when unlisted.
    pub fn priority_of(&self, module: &ModulePath) -> Priority {
        self.no_prefix
            .iter()
            .position(|m| m == module)
            .map_or(Priority::LOWEST, Priority)
    }

    pub fn is_unprefixed(&self, module: &ModulePath) -> bool {
        !self.priority_of(module).is_lowest()
    }

    /// Display-name prefix: the custom prefix, else the kebab-cased unique
    /// module name.
    pub fn prefix_for(
        &self,
        module: &ModulePath,
        module_names: &UniqueModuleNames,
    ) -> Result<String, SynthError> {
        if let Some(prefix) = self.custom_prefixes.get(module) {
            return Ok(prefix.clone());
        }
        module_names
            .get(module)
            .map(to_kebab_case)
            .ok_or_else(|| SynthError::MissingModuleName(module.clone()))
    }

    /// Ordered, de-duplicated display-name candidates for `member`, a symbol
    /// name that is already kebab-cased and may be empty (`app.New` with
    /// `cut_new`).
    pub fn name_candidates(
        &self,
        module: &ModulePath,
        member: &str,
        rename: Option<&str>,
        module_names: &UniqueModuleNames,
    ) -> Result<Vec<String>, SynthError> {
        let join = |prefix: &str| {
            if member.is_empty() {
                prefix.to_string()
            } else if prefix.is_empty() {
                member.to_string()
            } else {
                format!("{}-{}", prefix, member)
            }
        };

        let mut candidates: Vec<String> = Vec::with_capacity(4);
        let mut push = |name: String| {
            if !name.is_empty() && !candidates.contains(&name) {
                candidates.push(name);
            }
        };

        if let Some(rename) = rename {
            push(rename.to_string());
        }
        if self.is_unprefixed(module) {
            push(member.to_string());
        }
        push(join(&self.prefix_for(module, module_names)?));
        push(join(&to_kebab_case(&module.stripped())));

        Ok(candidates)
    }

    /// Kebab-cased function name, with a leading `New` removed when enabled.
    pub fn function_name(&self, name: &str) -> String {
        if self.cut_new {
            to_kebab_case(strip_new_prefix(name))
        } else {
            to_kebab_case(name)
        }
    }
}

/// Everything a synthesizer may consult besides the symbol itself.
#[derive(Debug, Clone, Copy)]
pub struct SynthContext<'a> {
    pub table: &'a SymbolTable,
    pub module_names: &'a UniqueModuleNames,
    pub policy: &'a NamingPolicy,
    /// Loaded user overrides; renames become the first name candidate.
    pub binding_list: &'a BindingList,
}

pub trait Synthesizer {
    fn synthesize(
        &self,
        symbol: Symbol<'_>,
        ctx: &SynthContext<'_>,
        deps: &mut Dependencies,
    ) -> Result<BindingCandidate, SynthError>;

    /// Source text of the adapter for `request`, containing the name
    /// placeholder where the adapter reports errors.
    fn synthesize_generic_impl(
        &self,
        request: &RequiredGenericImpl,
        ctx: &SynthContext<'_>,
        deps: &mut Dependencies,
    ) -> Result<String, SynthError>;
}
