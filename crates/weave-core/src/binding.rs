//! Synthesized bindings and their display-name candidates

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::module_path::ModulePath;

/// Placeholder in synthesized code that is replaced by the final display name.
pub const NAME_PLACEHOLDER: &str = "((WEAVE:FUNCNAME))";

/// Stable internal key of a binding; correlates with persisted overrides.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BindingKey(String);

impl BindingKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BindingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BindingKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Naming priority; lower wins a collision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Priority(pub usize);

impl Priority {
    /// Priority of modules that were not listed as unprefixed.
    pub const LOWEST: Priority = Priority(usize::MAX);

    pub fn is_lowest(self) -> bool {
        self == Self::LOWEST
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_lowest() {
            f.write_str("lowest")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Kind of symbol a binding was generated from, used for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    InterfaceMethod,
    Function,
    Method,
    Getter,
    Setter,
    Value,
    Constructor,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Category::InterfaceMethod => "interface method",
            Category::Function => "function",
            Category::Method => "method",
            Category::Getter => "getter",
            Category::Setter => "setter",
            Category::Value => "value",
            Category::Constructor => "constructor",
        };
        f.write_str(s)
    }
}

/// Output of synthesizing one symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingCandidate {
    pub key: BindingKey,
    pub module: ModulePath,
    /// Most preferred first; never empty when produced by a synthesizer.
    pub name_candidates: Vec<String>,
    pub priority: Priority,
    pub category: Category,
    /// One-line documentation exposed to the runtime.
    pub doc: String,
    /// Source doc comment, emitted above the binding.
    pub doc_comment: String,
    /// Name of the declaration as written in the source, replaced in doc comments.
    pub source_name: String,
    pub argsn: usize,
    /// Code body containing [`NAME_PLACEHOLDER`].
    pub body: String,
}

impl BindingCandidate {
    /// The code body with the placeholder replaced.
    pub fn render_body(&self, display_name: &str) -> String {
        self.body.replace(NAME_PLACEHOLDER, display_name)
    }
}

/// A binding with its final, globally unique display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedBinding {
    pub name: String,
    pub binding: BindingCandidate,
}

impl NamedBinding {
    pub fn key(&self) -> &BindingKey {
        &self.binding.key
    }

    pub fn render_body(&self) -> String {
        self.binding.render_body(&self.name)
    }
}
