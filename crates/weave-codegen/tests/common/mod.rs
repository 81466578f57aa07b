//! Shared fakes for the codegen integration tests

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};

use weave_codegen::{NamingPolicy, SynthContext, SynthError, Synthesizer};
use weave_core::symbols::{Field, Func, Interface, Struct, Value};
use weave_core::{
    BindingCandidate, BindingKey, BindingList, Category, Dependencies, Ident, ModuleOrder,
    ModulePath, RequiredGenericImpl, Symbol, SymbolTable, TypeRef, UniqueModuleNames,
    NAME_PLACEHOLDER,
};

/// Synthesizer driven by a script instead of templates.
#[derive(Default)]
pub struct ScriptedSynth {
    /// Symbol identities that fail.
    pub failing: BTreeSet<String>,
    /// Symbol identity -> interfaces its binding requires.
    pub binding_requires: BTreeMap<String, Vec<Ident>>,
    /// Interface key -> interfaces its adapter requires.
    pub impl_requires: BTreeMap<String, Vec<Ident>>,
    /// Interface keys whose adapter fails.
    pub failing_impls: BTreeSet<String>,
    /// Adapter keys in synthesis order.
    pub impl_calls: RefCell<Vec<String>>,
}

impl ScriptedSynth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(mut self, identity: &str) -> Self {
        self.failing.insert(identity.to_string());
        self
    }

    pub fn binding_requires(mut self, identity: &str, iface: Ident) -> Self {
        self.binding_requires
            .entry(identity.to_string())
            .or_default()
            .push(iface);
        self
    }

    pub fn impl_requires(mut self, key: &str, iface: Ident) -> Self {
        self.impl_requires.entry(key.to_string()).or_default().push(iface);
        self
    }
}

fn category_of(symbol: &Symbol<'_>) -> Category {
    match symbol {
        Symbol::InterfaceMethod { .. } => Category::InterfaceMethod,
        Symbol::Func(f) if f.recv.is_some() => Category::Method,
        Symbol::Func(_) => Category::Function,
        Symbol::FieldAccessor { setter: false, .. } => Category::Getter,
        Symbol::FieldAccessor { setter: true, .. } => Category::Setter,
        Symbol::Value(_) => Category::Value,
        Symbol::Constructor(_) => Category::Constructor,
    }
}

impl Synthesizer for ScriptedSynth {
    fn synthesize(
        &self,
        symbol: Symbol<'_>,
        ctx: &SynthContext<'_>,
        deps: &mut Dependencies,
    ) -> Result<BindingCandidate, SynthError> {
        let identity = symbol.identity();
        if self.failing.contains(&identity) {
            return Err(SynthError::Other(format!("scripted failure for {}", identity)));
        }
        for iface in self.binding_requires.get(&identity).into_iter().flatten() {
            deps.require_generic_impl(RequiredGenericImpl::for_interface(iface));
        }
        deps.add_import(symbol.module().clone());

        let member = identity.rsplit(['.', '/']).next().unwrap_or(&identity).to_lowercase();
        let key = BindingKey::new(identity.clone());
        let name_candidates = ctx.policy.name_candidates(
            symbol.module(),
            &member,
            ctx.binding_list.rename(&key),
            ctx.module_names,
        )?;
        Ok(BindingCandidate {
            key,
            module: symbol.module().clone(),
            name_candidates,
            priority: ctx.policy.priority_of(symbol.module()),
            category: category_of(&symbol),
            doc: format!("Binding for {}.", identity),
            doc_comment: String::new(),
            source_name: String::new(),
            argsn: 0,
            body: format!("return fail(\"{}\")", NAME_PLACEHOLDER),
        })
    }

    fn synthesize_generic_impl(
        &self,
        request: &RequiredGenericImpl,
        _ctx: &SynthContext<'_>,
        deps: &mut Dependencies,
    ) -> Result<String, SynthError> {
        self.impl_calls.borrow_mut().push(request.key.clone());
        if self.failing_impls.contains(&request.key) {
            return Err(SynthError::UnknownInterface(request.interface.clone()));
        }
        for iface in self.impl_requires.get(&request.key).into_iter().flatten() {
            deps.require_generic_impl(RequiredGenericImpl::for_interface(iface));
        }
        Ok(format!("// adapter {} ({})\n", request.key, NAME_PLACEHOLDER))
    }
}

pub fn func(module: &str, name: &str) -> Func {
    Func {
        name: Ident::new(module, name),
        recv: None,
        params: Vec::new(),
        results: Vec::new(),
        variadic: false,
        doc: String::new(),
        internal: false,
    }
}

pub fn strukt(module: &str, name: &str, fields: &[&str]) -> Struct {
    Struct {
        name: Ident::new(module, name),
        fields: fields
            .iter()
            .map(|f| Field {
                name: f.to_string(),
                ty: TypeRef::builtin("int"),
                doc: String::new(),
            })
            .collect(),
        doc: String::new(),
        internal: false,
    }
}

pub fn interface(module: &str, name: &str, methods: &[&str]) -> Interface {
    Interface {
        name: Ident::new(module, name),
        methods: methods.iter().map(|m| func(module, m)).collect(),
        doc: String::new(),
        internal: false,
    }
}

pub fn value(module: &str, name: &str) -> Value {
    Value {
        name: Ident::new(module, name),
        ty: TypeRef::builtin("int"),
        doc: String::new(),
        constant: true,
        internal: false,
    }
}

pub fn module_names(modules: &[(&str, &str)]) -> UniqueModuleNames {
    let declared: BTreeMap<ModulePath, String> = modules
        .iter()
        .map(|(p, n)| (ModulePath::new(*p), n.to_string()))
        .collect();
    UniqueModuleNames::assign(&declared, &ModuleOrder::default()).expect("module names")
}

/// Owned pieces of a [`SynthContext`].
pub struct World {
    pub table: SymbolTable,
    pub names: UniqueModuleNames,
    pub policy: NamingPolicy,
    pub list: BindingList,
}

impl World {
    pub fn new(table: SymbolTable, names: UniqueModuleNames) -> Self {
        Self {
            table,
            names,
            policy: NamingPolicy::default(),
            list: BindingList::new(),
        }
    }

    pub fn ctx(&self) -> SynthContext<'_> {
        SynthContext {
            table: &self.table,
            module_names: &self.names,
            policy: &self.policy,
            binding_list: &self.list,
        }
    }
}

pub fn targets(modules: &[&str]) -> BTreeSet<ModulePath> {
    modules.iter().map(|m| ModulePath::new(*m)).collect()
}
