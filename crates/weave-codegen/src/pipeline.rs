//! Binding generation over the symbol table
//!
//! Categories are visited in a fixed order (interface methods, functions,
//! field accessors, values, constructors) and symbols inside a category in
//! identity order. A failing symbol becomes a diagnostic; the walk goes on.

use std::collections::{BTreeSet, HashSet};

use tracing::{debug, info, instrument, trace};
use weave_core::{
    BindingCandidate, BindingKey, Dependencies, Diagnostic, Diagnostics, ModulePath, Outcome,
    Symbol, SymbolTable,
};

use crate::error::CodegenError;
use crate::synth::{SynthContext, Synthesizer};

/// Every symbol eligible for binding, in generation order. Constructors are
/// last so they can be skipped when a function already claims their key.
pub fn symbols_in_order(table: &SymbolTable) -> Vec<Symbol<'_>> {
    let mut symbols = Vec::new();

    for iface in table.interfaces.values() {
        for method in &iface.methods {
            symbols.push(Symbol::InterfaceMethod { iface, method });
        }
    }
    symbols.extend(table.funcs.values().map(Symbol::Func));
    for owner in table.structs.values() {
        for field in &owner.fields {
            for setter in [false, true] {
                symbols.push(Symbol::FieldAccessor {
                    owner,
                    field,
                    setter,
                });
            }
        }
    }
    symbols.extend(table.values.values().map(Symbol::Value));
    symbols.extend(table.structs.values().map(Symbol::Constructor));

    symbols
}

/// Generated bindings in generation order.
#[derive(Debug, Clone, Default)]
pub struct GeneratedBindings {
    pub bindings: Vec<BindingCandidate>,
    /// Symbols skipped as internal or outside the targets.
    pub skipped: usize,
    /// Constructors suppressed by an existing binding with the same key.
    pub shadowed_constructors: usize,
}

/// Runs the synthesizer over every eligible symbol of `targets`.
#[instrument(skip_all, fields(targets = targets.len(), symbols = ctx.table.len()), level = "info")]
pub fn generate_bindings(
    targets: &BTreeSet<ModulePath>,
    ctx: &SynthContext<'_>,
    synth: &dyn Synthesizer,
    deps: &mut Dependencies,
) -> Outcome<GeneratedBindings, CodegenError> {
    let mut out = GeneratedBindings::default();
    let mut diagnostics = Diagnostics::new();
    let mut keys: HashSet<BindingKey> = HashSet::new();

    for symbol in symbols_in_order(ctx.table) {
        if symbol.is_internal(ctx.table) || !targets.contains(symbol.module()) {
            trace!("skipping {}", symbol);
            out.skipped += 1;
            continue;
        }
        if let Symbol::Constructor(_) = symbol {
            if keys.contains(&BindingKey::new(symbol.identity())) {
                debug!("constructor {} shadowed by an existing binding", symbol);
                out.shadowed_constructors += 1;
                continue;
            }
        }

        match synth.synthesize(symbol, ctx, deps) {
            Ok(binding) => {
                trace!("generated {}", binding.key);
                keys.insert(binding.key.clone());
                out.bindings.push(binding);
            }
            Err(e) => diagnostics.push(Diagnostic::symbol_failed(symbol.identity(), e)),
        }
    }

    info!(
        "generated {} bindings ({} failed, {} skipped)",
        out.bindings.len(),
        diagnostics.len(),
        out.skipped
    );
    Outcome::from_parts(out, diagnostics)
}
