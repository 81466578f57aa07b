//! Three-way result carried across stage boundaries
//!
//! A stage either succeeds cleanly, succeeds with non-fatal diagnostics, or
//! fails. `PartialOk` propagates upward untouched until a boundary decides
//! whether the diagnostics should be treated as fatal.

use crate::diagnostics::{Diagnostic, Diagnostics};

#[derive(Debug)]
#[must_use]
pub enum Outcome<T, E> {
    Ok(T),
    PartialOk(T, Diagnostics),
    Err(E),
}

impl<T, E> Outcome<T, E> {
    /// `Ok` when there are no diagnostics, `PartialOk` otherwise.
    pub fn from_parts(value: T, diagnostics: Diagnostics) -> Self {
        if diagnostics.is_empty() {
            Outcome::Ok(value)
        } else {
            Outcome::PartialOk(value, diagnostics)
        }
    }

    pub fn is_err(&self) -> bool {
        matches!(self, Outcome::Err(_))
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Outcome::Ok(v) | Outcome::PartialOk(v, _) => Some(v),
            Outcome::Err(_) => None,
        }
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            Outcome::PartialOk(_, d) => d.entries(),
            _ => &[],
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U, E> {
        match self {
            Outcome::Ok(v) => Outcome::Ok(f(v)),
            Outcome::PartialOk(v, d) => Outcome::PartialOk(f(v), d),
            Outcome::Err(e) => Outcome::Err(e),
        }
    }

    pub fn map_err<F>(self, f: impl FnOnce(E) -> F) -> Outcome<T, F> {
        match self {
            Outcome::Ok(v) => Outcome::Ok(v),
            Outcome::PartialOk(v, d) => Outcome::PartialOk(v, d),
            Outcome::Err(e) => Outcome::Err(f(e)),
        }
    }

    /// Splits into a plain `Result`, keeping diagnostics alongside the value.
    pub fn into_result(self) -> Result<(T, Diagnostics), E> {
        match self {
            Outcome::Ok(v) => Ok((v, Diagnostics::new())),
            Outcome::PartialOk(v, d) => Ok((v, d)),
            Outcome::Err(e) => Err(e),
        }
    }

    /// Treats any diagnostic as fatal.
    pub fn into_strict(self, to_err: impl FnOnce(Diagnostics) -> E) -> Result<T, E> {
        match self {
            Outcome::Ok(v) => Ok(v),
            Outcome::PartialOk(_, d) => Err(to_err(d)),
            Outcome::Err(e) => Err(e),
        }
    }
}

impl<T, E> From<Result<(T, Diagnostics), E>> for Outcome<T, E> {
    fn from(result: Result<(T, Diagnostics), E>) -> Self {
        match result {
            Ok((v, d)) => Outcome::from_parts(v, d),
            Err(e) => Outcome::Err(e),
        }
    }
}
