//! Final display names for generated bindings
//!
//! Bindings are processed in key order. Each pass groups them by their current
//! top name candidate. In a group with several members, the member with the
//! lowest priority keeps the name and the others fall through to their next
//! candidate. Members that tie with the winner on priority are renamed with a
//! numeric suffix instead and a warning is recorded. Passes repeat until one
//! changes nothing.

use std::collections::{BTreeMap, HashSet};

use tracing::{debug, instrument, trace};
use weave_core::{BindingCandidate, Diagnostic, Diagnostics, NamedBinding, Outcome, Priority};

use crate::error::CodegenError;

/// Remaining candidates of one binding. The slice only ever shrinks from the
/// front; a suffix rename replaces the current head without touching the rest.
struct Remaining<'a> {
    names: &'a [String],
    renamed_head: Option<String>,
}

impl<'a> Remaining<'a> {
    fn top(&self) -> Option<&str> {
        self.renamed_head
            .as_deref()
            .or_else(|| self.names.first().map(String::as_str))
    }

    fn pop(&mut self) {
        self.renamed_head = None;
        self.names = self.names.get(1..).unwrap_or(&[]);
    }
}

/// Assigns every binding a globally unique display name.
#[instrument(skip_all, fields(bindings = bindings.len()), level = "info")]
pub fn name_bindings(mut bindings: Vec<BindingCandidate>) -> Outcome<Vec<NamedBinding>, CodegenError> {
    bindings.sort_by(|a, b| a.key.cmp(&b.key));

    let mut diagnostics = Diagnostics::new();
    let mut remaining: Vec<Remaining<'_>> = bindings
        .iter()
        .map(|b| Remaining {
            names: &b.name_candidates,
            renamed_head: None,
        })
        .collect();

    let mut passes = 0usize;
    loop {
        passes += 1;

        // Group by current top name; indices stay in key order.
        let mut groups: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (i, r) in remaining.iter().enumerate() {
            let Some(top) = r.top() else {
                return Outcome::Err(CodegenError::NamingExhausted {
                    key: bindings[i].key.to_string(),
                });
            };
            groups.entry(top.to_string()).or_default().push(i);
        }

        let mut reserved: HashSet<String> = groups.keys().cloned().collect();
        let mut changed = false;

        for (top, members) in &groups {
            if members.len() < 2 {
                continue;
            }
            changed = true;

            let best = members
                .iter()
                .map(|&i| bindings[i].priority)
                .min()
                .unwrap_or(Priority::LOWEST);
            let winner = members
                .iter()
                .copied()
                .find(|&i| bindings[i].priority == best)
                .unwrap_or(members[0]);
            trace!("{} keeps {}", bindings[winner].key, top);

            for &i in members {
                if i == winner {
                    continue;
                }
                if bindings[i].priority == best {
                    let renamed = suffixed(top, &reserved);
                    diagnostics.push(Diagnostic::name_conflict(
                        bindings[winner].key.as_str(),
                        bindings[i].key.as_str(),
                        top,
                        &renamed,
                    ));
                    reserved.insert(renamed.clone());
                    remaining[i].renamed_head = Some(renamed);
                } else {
                    trace!("{} loses {} to {}", bindings[i].key, top, bindings[winner].key);
                    remaining[i].pop();
                    if remaining[i].top().is_none() {
                        return Outcome::Err(CodegenError::NamingExhausted {
                            key: bindings[i].key.to_string(),
                        });
                    }
                }
            }
        }

        if !changed {
            break;
        }
    }
    debug!("binding names settled after {} passes", passes);

    let names: Vec<String> = remaining
        .iter()
        .map(|r| r.top().unwrap_or_default().to_string())
        .collect();
    drop(remaining);

    let named = bindings
        .into_iter()
        .zip(names)
        .map(|(binding, name)| NamedBinding { name, binding })
        .collect();
    Outcome::from_parts(named, diagnostics)
}

/// `top-n` for the smallest `n >= 1` not in `reserved`.
fn suffixed(top: &str, reserved: &HashSet<String>) -> String {
    (1usize..)
        .map(|n| format!("{}-{}", top, n))
        .find(|name| !reserved.contains(name))
        .unwrap_or_else(|| format!("{}-{}", top, reserved.len() + 1))
}
