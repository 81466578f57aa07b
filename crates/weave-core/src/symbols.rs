//! Semantic model of the host API surface
//!
//! The table is produced by an external model builder. Maps are keyed by the
//! declaration's qualified identity so iteration is always in sorted order.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::module_path::ModulePath;

/// Qualified identity of a declaration: declaring module plus name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Ident {
    pub module: ModulePath,
    pub name: String,
}

impl Ident {
    pub fn new(module: impl Into<ModulePath>, name: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            name: name.into(),
        }
    }

    /// Exported declarations start with an upper-case letter.
    pub fn is_exported(&self) -> bool {
        self.name.chars().next().is_some_and(char::is_uppercase)
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.module, self.name)
    }
}

/// Type expression as seen in exported signatures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeRef {
    /// Predeclared type such as `int`, `string`, `error`.
    Builtin(String),
    Named(Ident),
    Pointer(Box<TypeRef>),
    Slice(Box<TypeRef>),
    Map { key: Box<TypeRef>, value: Box<TypeRef> },
    Chan(Box<TypeRef>),
    Func {
        params: Vec<TypeRef>,
        results: Vec<TypeRef>,
    },
}

impl TypeRef {
    pub fn builtin(name: &str) -> Self {
        TypeRef::Builtin(name.to_string())
    }

    pub fn named(module: &str, name: &str) -> Self {
        TypeRef::Named(Ident::new(module, name))
    }

    /// Every named type reachable from this expression.
    pub fn named_idents(&self) -> Vec<&Ident> {
        let mut out = Vec::new();
        self.collect_named(&mut out);
        out
    }

    fn collect_named<'a>(&'a self, out: &mut Vec<&'a Ident>) {
        match self {
            TypeRef::Builtin(_) => {}
            TypeRef::Named(id) => out.push(id),
            TypeRef::Pointer(t) | TypeRef::Slice(t) | TypeRef::Chan(t) => t.collect_named(out),
            TypeRef::Map { key, value } => {
                key.collect_named(out);
                value.collect_named(out);
            }
            TypeRef::Func { params, results } => {
                for t in params.iter().chain(results) {
                    t.collect_named(out);
                }
            }
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Builtin(name) => f.write_str(name),
            TypeRef::Named(id) => write!(f, "{}", id),
            TypeRef::Pointer(t) => write!(f, "*{}", t),
            TypeRef::Slice(t) => write!(f, "[]{}", t),
            TypeRef::Map { key, value } => write!(f, "map[{}]{}", key, value),
            TypeRef::Chan(t) => write!(f, "chan {}", t),
            TypeRef::Func { params, results } => {
                let join = |ts: &[TypeRef]| {
                    ts.iter().map(|t| t.to_string()).collect::<Vec<_>>().join(", ")
                };
                write!(f, "func({}) ({})", join(params), join(results))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub ty: TypeRef,
}

impl Param {
    pub fn new(name: &str, ty: TypeRef) -> Self {
        Self {
            name: name.to_string(),
            ty,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receiver {
    pub ty: Ident,
    #[serde(default)]
    pub pointer: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Func {
    pub name: Ident,
    #[serde(default)]
    pub recv: Option<Receiver>,
    #[serde(default)]
    pub params: Vec<Param>,
    #[serde(default)]
    pub results: Vec<TypeRef>,
    #[serde(default)]
    pub variadic: bool,
    #[serde(default)]
    pub doc: String,
    #[serde(default)]
    pub internal: bool,
}

impl Func {
    /// Stable identity: `mod.Name` or `mod.*Recv//Name`.
    pub fn identity(&self) -> String {
        match &self.recv {
            None => self.name.to_string(),
            Some(recv) => format!(
                "{}.{}{}//{}",
                recv.ty.module,
                if recv.pointer { "*" } else { "" },
                recv.ty.name,
                self.name.name
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interface {
    pub name: Ident,
    #[serde(default)]
    pub methods: Vec<Func>,
    #[serde(default)]
    pub doc: String,
    #[serde(default)]
    pub internal: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub ty: TypeRef,
    #[serde(default)]
    pub doc: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Struct {
    pub name: Ident,
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(default)]
    pub doc: String,
    #[serde(default)]
    pub internal: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Value {
    pub name: Ident,
    pub ty: TypeRef,
    #[serde(default)]
    pub doc: String,
    #[serde(default)]
    pub constant: bool,
    #[serde(default)]
    pub internal: bool,
}

/// Every exported declaration of the modules being bound.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SymbolTable {
    #[serde(default)]
    pub interfaces: BTreeMap<String, Interface>,
    #[serde(default)]
    pub funcs: BTreeMap<String, Func>,
    #[serde(default)]
    pub structs: BTreeMap<String, Struct>,
    #[serde(default)]
    pub values: BTreeMap<String, Value>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_interface(&mut self, iface: Interface) {
        self.interfaces.insert(iface.name.to_string(), iface);
    }

    pub fn add_func(&mut self, func: Func) {
        self.funcs.insert(func.identity(), func);
    }

    pub fn add_struct(&mut self, strukt: Struct) {
        self.structs.insert(strukt.name.to_string(), strukt);
    }

    pub fn add_value(&mut self, value: Value) {
        self.values.insert(value.name.to_string(), value);
    }

    pub fn interface(&self, id: &Ident) -> Option<&Interface> {
        self.interfaces.get(&id.to_string())
    }

    pub fn strukt(&self, id: &Ident) -> Option<&Struct> {
        self.structs.get(&id.to_string())
    }

    /// Whether a named type is declared anywhere in the table.
    pub fn knows_type(&self, id: &Ident) -> bool {
        self.interface(id).is_some() || self.strukt(id).is_some()
    }

    /// Whether a type is declared internal, by flag or by module path.
    pub fn type_is_internal(&self, id: &Ident) -> bool {
        if id.module.is_internal() {
            return true;
        }
        self.interface(id).is_some_and(|i| i.internal) || self.strukt(id).is_some_and(|s| s.internal)
    }

    pub fn merge(&mut self, other: SymbolTable) {
        self.interfaces.extend(other.interfaces);
        self.funcs.extend(other.funcs);
        self.structs.extend(other.structs);
        self.values.extend(other.values);
    }

    pub fn len(&self) -> usize {
        self.interfaces.len() + self.funcs.len() + self.structs.len() + self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One declaration eligible for binding.
#[derive(Debug, Clone, Copy)]
pub enum Symbol<'a> {
    InterfaceMethod {
        iface: &'a Interface,
        method: &'a Func,
    },
    Func(&'a Func),
    FieldAccessor {
        owner: &'a Struct,
        field: &'a Field,
        setter: bool,
    },
    Value(&'a Value),
    Constructor(&'a Struct),
}

impl Symbol<'_> {
    /// Stable identity, also used as the binding key.
    pub fn identity(&self) -> String {
        match self {
            Symbol::InterfaceMethod { iface, method } => {
                format!("{}//{}", iface.name, method.name.name)
            }
            Symbol::Func(func) => func.identity(),
            Symbol::FieldAccessor {
                owner,
                field,
                setter,
            } => format!(
                "{}//{}{}",
                owner.name,
                field.name,
                if *setter { "!" } else { "?" }
            ),
            Symbol::Value(value) => value.name.to_string(),
            Symbol::Constructor(strukt) => {
                format!("{}.New{}", strukt.name.module, strukt.name.name)
            }
        }
    }

    /// Declaring module.
    pub fn module(&self) -> &ModulePath {
        match self {
            Symbol::InterfaceMethod { iface, .. } => &iface.name.module,
            Symbol::Func(func) => match &func.recv {
                Some(recv) => &recv.ty.module,
                None => &func.name.module,
            },
            Symbol::FieldAccessor { owner, .. } => &owner.name.module,
            Symbol::Value(value) => &value.name.module,
            Symbol::Constructor(strukt) => &strukt.name.module,
        }
    }

    /// Internal to its module: flagged, under an `internal` path, or a method
    /// on an internal receiver.
    pub fn is_internal(&self, table: &SymbolTable) -> bool {
        if self.module().is_internal() {
            return true;
        }
        match self {
            Symbol::InterfaceMethod { iface, .. } => iface.internal,
            Symbol::Func(func) => {
                func.internal
                    || func
                        .recv
                        .as_ref()
                        .is_some_and(|recv| table.type_is_internal(&recv.ty))
            }
            Symbol::FieldAccessor { owner, .. } | Symbol::Constructor(owner) => owner.internal,
            Symbol::Value(value) => value.internal,
        }
    }
}

impl fmt::Display for Symbol<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identity())
    }
}
