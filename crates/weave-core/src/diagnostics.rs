//! Non-fatal diagnostics collected across a run
//!
//! Per-symbol failures and naming conflicts do not stop a run. They are
//! accumulated here, attributed to the symbol or binding they concern, and
//! reported together once the run completes.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Category of diagnostic for grouping in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DiagnosticKind {
    /// A symbol could not be synthesized and was skipped
    SymbolFailed,
    /// Two equal-priority bindings collided and one was renamed
    NameConflict,
    /// The model builder could not load part of the symbol table
    ModelBuild,
    /// Output was written but something about it is degraded
    Emit,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticKind::SymbolFailed => write!(f, "SYMBOL_FAILED"),
            DiagnosticKind::NameConflict => write!(f, "NAME_CONFLICT"),
            DiagnosticKind::ModelBuild => write!(f, "MODEL_BUILD"),
            DiagnosticKind::Emit => write!(f, "EMIT"),
        }
    }
}

/// A single diagnostic entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// Symbol identity, binding key or module path the entry is about
    pub subject: String,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            subject: subject.into(),
            message: message.into(),
        }
    }

    pub fn symbol_failed(symbol: impl Into<String>, cause: impl fmt::Display) -> Self {
        Self::new(DiagnosticKind::SymbolFailed, symbol, cause.to_string())
    }

    pub fn name_conflict(kept: &str, renamed: &str, from: &str, to: &str) -> Self {
        Self::new(
            DiagnosticKind::NameConflict,
            renamed,
            format!(
                "unable to resolve naming conflict between {} and {}, renaming {} to {}",
                renamed, kept, from, to
            ),
        )
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.subject, self.message)
    }
}

/// Batch of diagnostics in the order they were recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: Diagnostic) {
        tracing::warn!("{} {}", entry.kind, entry);
        self.entries.push(entry);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn by_kind(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(move |e| e.kind == kind)
    }

    pub fn merge(&mut self, other: Diagnostics) {
        self.entries.extend(other.entries);
    }

    /// Grouped report, at most ten entries per kind.
    pub fn format_summary(&self) -> String {
        if self.entries.is_empty() {
            return "No warnings".to_string();
        }

        let mut by_kind: BTreeMap<DiagnosticKind, Vec<&Diagnostic>> = BTreeMap::new();
        for entry in &self.entries {
            by_kind.entry(entry.kind).or_default().push(entry);
        }

        let mut lines = vec![format!("{} warning(s):", self.entries.len()), String::new()];
        for (kind, entries) in by_kind {
            lines.push(format!("## {} ({}):", kind, entries.len()));
            for entry in entries.iter().take(10) {
                lines.push(format!("  * {}", entry));
            }
            if entries.len() > 10 {
                lines.push(format!("  ... and {} more", entries.len() - 10));
            }
            lines.push(String::new());
        }
        lines.join("\n")
    }

    pub fn format_compact(&self) -> String {
        self.entries
            .iter()
            .map(|e| format!("  * {}", e))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl FromIterator<Diagnostic> for Diagnostics {
    fn from_iter<I: IntoIterator<Item = Diagnostic>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_summary())
    }
}
