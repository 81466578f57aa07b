//! Fixpoint synthesis of generic interface implementations
//!
//! Requests live in [`Dependencies::generic_impls`]; resolved adapters live in
//! the closure's results map. Each [`GenericImplClosure::step`] drains the
//! requests that were pending when it started. Synthesizing one adapter may add
//! new requests, which the next step picks up. A step that resolves nothing
//! means the fixpoint is reached.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use weave_core::{Dependencies, Ident, RequiredGenericImpl, NAME_PLACEHOLDER};

use crate::error::CodegenError;
use crate::synth::{SynthContext, Synthesizer};

/// A synthesized adapter with its placeholder already substituted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenericImpl {
    pub key: String,
    pub interface: Ident,
    pub code: String,
}

#[derive(Debug, Default)]
pub struct GenericImplClosure {
    resolved: BTreeMap<String, GenericImpl>,
    rounds: usize,
}

impl GenericImplClosure {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests not resolved yet, in key order.
    pub fn pending(&self, deps: &Dependencies) -> Vec<RequiredGenericImpl> {
        deps.generic_impls
            .values()
            .filter(|r| !self.resolved.contains_key(&r.key))
            .cloned()
            .collect()
    }

    pub fn is_resolved(&self, key: &str) -> bool {
        self.resolved.contains_key(key)
    }

    pub fn rounds(&self) -> usize {
        self.rounds
    }

    /// One scan: synthesizes every request pending at the start and returns how
    /// many were resolved. Any synthesis error is fatal.
    pub fn step(
        &mut self,
        synth: &dyn Synthesizer,
        ctx: &SynthContext<'_>,
        deps: &mut Dependencies,
    ) -> Result<usize, CodegenError> {
        let pending = self.pending(deps);
        self.rounds += 1;

        for request in &pending {
            let text = synth
                .synthesize_generic_impl(request, ctx, deps)
                .map_err(|source| CodegenError::GenericImpl {
                    key: request.key.clone(),
                    source,
                })?;
            debug!("resolved generic impl {}", request.key);
            let code = text.replace(
                NAME_PLACEHOLDER,
                &format!("context to {}", request.interface.name),
            );
            self.resolved.insert(
                request.key.clone(),
                GenericImpl {
                    key: request.key.clone(),
                    interface: request.interface.clone(),
                    code,
                },
            );
        }

        Ok(pending.len())
    }

    /// Steps until a scan resolves nothing. Terminates as long as the
    /// synthesizer stops discovering new keys.
    #[instrument(skip_all, level = "info")]
    pub fn run(
        mut self,
        synth: &dyn Synthesizer,
        ctx: &SynthContext<'_>,
        deps: &mut Dependencies,
    ) -> Result<Vec<GenericImpl>, CodegenError> {
        while self.step(synth, ctx, deps)? > 0 {}
        info!(
            "resolved {} generic impls in {} rounds",
            self.resolved.len(),
            self.rounds
        );
        Ok(self.into_impls())
    }

    /// Resolved adapters in key order.
    pub fn into_impls(self) -> Vec<GenericImpl> {
        self.resolved.into_values().collect()
    }
}

/// Resolves every generic implementation reachable from the requests in `deps`.
pub fn resolve_generic_impls(
    synth: &dyn Synthesizer,
    ctx: &SynthContext<'_>,
    deps: &mut Dependencies,
) -> Result<Vec<GenericImpl>, CodegenError> {
    GenericImplClosure::new().run(synth, ctx, deps)
}
