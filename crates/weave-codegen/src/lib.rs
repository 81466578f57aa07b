//! Binding synthesis, naming and emission
//!
//! The stages run in order and each settles before the next starts:
//! [`pipeline::generate_bindings`] walks the symbol table,
//! [`closure::resolve_generic_impls`] synthesizes every adapter the bindings
//! asked for, [`binding_namer::name_bindings`] picks final display names and an
//! [`Emitter`] writes the package.

pub mod binding_namer;
pub mod closure;
pub mod code_builder;
pub mod emitter;
pub mod error;
pub mod pipeline;
pub mod synth;
pub mod template;

pub use binding_namer::name_bindings;
pub use closure::{resolve_generic_impls, GenericImpl, GenericImplClosure};
pub use emitter::{CategoryCount, EmitInput, EmitReport, Emitter, SourceEmitter};
pub use error::{CodegenError, SynthError};
pub use pipeline::{generate_bindings, GeneratedBindings};
pub use synth::{NamingPolicy, SynthContext, Synthesizer};
pub use template::TemplateSynthesizer;
