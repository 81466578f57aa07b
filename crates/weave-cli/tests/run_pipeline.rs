//! End-to-end runs over the in-memory app scenario

use std::path::Path;

use pretty_assertions::assert_eq;
use weave::{run, Collaborators, RunError, RunOutput, RunRequest};
use weave_codegen::{CodegenError, SynthContext, SynthError, Synthesizer, TemplateSynthesizer};
use weave_core::{
    BindingCandidate, BindingKey, BindingList, Config, Dependencies, DiagnosticKind, Ident,
    ModulePath, Outcome, PersistedOverride, RequiredGenericImpl, Symbol,
};
use weave_test_fixtures::{
    app_config, app_scenario, MemoryBindingStore, MemoryFetcher, MemoryModelBuilder, MemoryParser,
    RecordingEmitter, ScriptedSynthesizer, APP_MODULE, LIB_MODULE,
};

struct Harness {
    config: Config,
    fetcher: MemoryFetcher,
    parser: MemoryParser,
    model_builder: MemoryModelBuilder,
    store: MemoryBindingStore,
    emitter: RecordingEmitter,
}

/// Unwraps a run that must not report any diagnostic.
fn clean(outcome: Outcome<RunOutput, RunError>) -> RunOutput {
    let (output, diagnostics) = outcome.into_result().unwrap();
    assert!(diagnostics.is_empty(), "{}", diagnostics.format_summary());
    output
}

/// Gives every binding the same single display name.
struct SingleName(ScriptedSynthesizer);

impl Synthesizer for SingleName {
    fn synthesize(
        &self,
        symbol: Symbol<'_>,
        ctx: &SynthContext<'_>,
        deps: &mut Dependencies,
    ) -> Result<BindingCandidate, SynthError> {
        let mut candidate = self.0.synthesize(symbol, ctx, deps)?;
        candidate.name_candidates = vec!["dup".to_string()];
        Ok(candidate)
    }

    fn synthesize_generic_impl(
        &self,
        request: &RequiredGenericImpl,
        ctx: &SynthContext<'_>,
        deps: &mut Dependencies,
    ) -> Result<String, SynthError> {
        self.0.synthesize_generic_impl(request, ctx, deps)
    }
}

impl Harness {
    fn new() -> Self {
        let modules = app_scenario();
        Self {
            config: app_config(Path::new("out")),
            fetcher: MemoryFetcher::new(&modules),
            parser: MemoryParser::new(&modules),
            model_builder: MemoryModelBuilder::new(&modules),
            store: MemoryBindingStore::default(),
            emitter: RecordingEmitter::new(),
        }
    }

    fn run(&self, synthesizer: &dyn Synthesizer) -> Outcome<RunOutput, RunError> {
        let request = RunRequest {
            config: &self.config,
            src_dir: Path::new("src"),
        };
        let collaborators = Collaborators {
            fetcher: &self.fetcher,
            parser: &self.parser,
            model_builder: &self.model_builder,
            synthesizer,
            binding_store: &self.store,
            emitter: &self.emitter,
        };
        run(&request, &collaborators)
    }
}

#[test]
fn test_names_across_modules() {
    let harness = Harness::new();
    let output = clean(harness.run(&ScriptedSynthesizer::new()));

    assert_eq!(output.name_of("example.com/app.Run"), Some("app-run"));
    assert_eq!(output.name_of("example.com/app.Version"), Some("app-version"));
    // fmt is listed in no_prefix
    assert_eq!(output.name_of("fmt.Sprint"), Some("sprint"));
    // std errors claims the short module name first
    assert_eq!(
        output.module_names.get(&ModulePath::new("example.com/app/errors")),
        Some("app_errors")
    );
    assert_eq!(output.module_names.get(&ModulePath::new("errors")), Some("errors"));
    assert_eq!(
        output.name_of("example.com/app/errors.Wrap"),
        Some("app-errors-wrap")
    );
}

#[test]
fn test_skips_internal_and_foreign_symbols() {
    let harness = Harness::new();
    let output = clean(harness.run(&ScriptedSynthesizer::new()));

    assert_eq!(output.name_of("example.com/app/internal/secret.Key"), None);
    assert_eq!(output.name_of("example.com/lib.Helper"), None);
    assert_eq!(output.name_of("errors.New"), None);
}

#[test]
fn test_declared_constructor_wins() {
    let harness = Harness::new();
    let output = clean(harness.run(&ScriptedSynthesizer::new()));

    let keys: Vec<&str> = output
        .bindings
        .iter()
        .filter(|b| b.key().as_str() == "example.com/app.NewConfig")
        .map(|b| b.name.as_str())
        .collect();
    assert_eq!(keys, vec!["app-new-config"]);
}

#[test]
fn test_fetches_requirements_and_std() {
    let harness = Harness::new();
    let output = clean(harness.run(&ScriptedSynthesizer::new()));

    let fetched: Vec<String> = harness
        .fetcher
        .fetched
        .borrow()
        .iter()
        .map(|m| m.to_string())
        .collect();
    assert_eq!(fetched, vec![APP_MODULE, LIB_MODULE, "std"]);
    assert_eq!(
        output.module_graph.required_by(&ModulePath::new(LIB_MODULE)),
        vec![&ModulePath::new(APP_MODULE)]
    );
}

#[test]
fn test_generic_impl_for_interface_param() {
    let harness = Harness::new();
    let (output, _) = harness.run(&TemplateSynthesizer::new()).into_result().unwrap();

    let impls: Vec<&str> = output.generic_impls.iter().map(|g| g.key.as_str()).collect();
    assert_eq!(impls, vec!["io.Writer"]);
    assert_eq!(output.name_of("example.com/app.Fprint"), Some("app-fprint"));
    assert!(output.imports.contains(&ModulePath::new("io")));
    let emitted = harness.emitter.last().unwrap();
    assert_eq!(emitted.generic_impls, vec!["io.Writer".to_string()]);
}

#[test]
fn test_missing_requirement_names_requirer() {
    let modules = app_scenario();
    let mut harness = Harness::new();
    harness.fetcher = MemoryFetcher::new(&modules).without(LIB_MODULE);

    match harness.run(&ScriptedSynthesizer::new()) {
        Outcome::Err(RunError::Fetch {
            module,
            required_by,
            ..
        }) => {
            assert_eq!(module, ModulePath::new(LIB_MODULE));
            assert_eq!(required_by, APP_MODULE);
        }
        other => panic!("expected fetch error, got {:?}", other.into_result().err()),
    }
    assert!(harness.emitter.last().is_none());
}

#[test]
fn test_failing_package_is_reported() {
    let modules = app_scenario();
    let mut harness = Harness::new();
    harness.model_builder = MemoryModelBuilder::new(&modules).failing("example.com/app/errors");

    let (output, diagnostics) = harness.run(&ScriptedSynthesizer::new()).into_result().unwrap();
    let failures: Vec<_> = diagnostics.by_kind(DiagnosticKind::ModelBuild).collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].subject, "example.com/app/errors");
    assert_eq!(output.name_of("example.com/app/errors.Wrap"), None);
    assert_eq!(output.name_of("example.com/app.Run"), Some("app-run"));
}

#[test]
fn test_failing_symbol_is_isolated() {
    let harness = Harness::new();
    let synth = ScriptedSynthesizer::new().fail("example.com/app.Run");

    let (output, diagnostics) = harness.run(&synth).into_result().unwrap();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics.entries()[0].kind, DiagnosticKind::SymbolFailed);
    assert_eq!(diagnostics.entries()[0].subject, "example.com/app.Run");
    assert_eq!(output.name_of("example.com/app.Run"), None);
    assert_eq!(output.name_of("example.com/app.Fprint"), Some("app-fprint"));
    assert_eq!(output.stats.warnings, 1);
}

#[test]
fn test_failing_adapter_aborts_before_writing() {
    let harness = Harness::new();
    let synth = ScriptedSynthesizer::new()
        .binding_requires("example.com/app.Fprint", Ident::new("io", "Writer"))
        .fail_impl("io.Writer");

    match harness.run(&synth) {
        Outcome::Err(RunError::Codegen(CodegenError::GenericImpl { key, .. })) => {
            assert_eq!(key, "io.Writer");
        }
        other => panic!("expected generic impl error, got {:?}", other.into_result().err()),
    }
    assert_eq!(harness.store.saves.get(), 0);
    assert!(harness.emitter.last().is_none());
}

#[test]
fn test_runs_are_deterministic() {
    let first = Harness::new();
    let second = Harness::new();
    clean(first.run(&ScriptedSynthesizer::new()));
    clean(second.run(&ScriptedSynthesizer::new()));

    assert_eq!(first.emitter.last(), second.emitter.last());
}

#[test]
fn test_binding_list_round_trip() {
    let harness = Harness::new();
    let output = clean(harness.run(&ScriptedSynthesizer::new()));

    assert_eq!(harness.store.saves.get(), 1);
    assert_eq!(output.binding_list.added, output.bindings.len());
    assert_eq!(output.binding_list.removed, 0);

    let saved: BindingList = harness.store.list.borrow().clone();
    assert_eq!(saved.bindings.len(), output.bindings.len());

    // A second run over the saved list has nothing to add.
    let output = clean(harness.run(&ScriptedSynthesizer::new()));
    assert_eq!(output.binding_list.added, 0);
    assert_eq!(harness.store.saves.get(), 2);
}

#[test]
fn test_emits_into_binding_package() {
    let harness = Harness::new();
    clean(harness.run(&ScriptedSynthesizer::new()));

    let emitted = harness.emitter.last().unwrap();
    assert_eq!(emitted.package, harness.config.binding_package());
    assert_eq!(emitted.dont_build_flag, None);
    assert!(emitted
        .names
        .iter()
        .any(|(key, name)| key == "fmt.Sprint" && name == "sprint"));
}

#[test]
fn test_naming_exhaustion_leaves_binding_list_alone() {
    let harness = Harness::new();

    // fmt.Sprint outranks every app binding for "dup"; the losers run out of names.
    match harness.run(&SingleName(ScriptedSynthesizer::new())) {
        Outcome::Err(RunError::Codegen(CodegenError::NamingExhausted { .. })) => {}
        other => panic!("expected naming exhaustion, got {:?}", other.into_result().err()),
    }
    assert_eq!(harness.store.saves.get(), 0);
    assert!(harness.store.list.borrow().is_empty());
    assert!(harness.emitter.last().is_none());
}

#[test]
fn test_override_survives_failed_symbol() {
    let key = BindingKey::new("example.com/app.Run");
    let custom = PersistedOverride {
        enabled: false,
        rename: Some("go".to_string()),
        exported: true,
        doc: "Calls example.com/app.Run.".to_string(),
    };
    let mut list = BindingList::new();
    list.bindings.insert(key.clone(), custom.clone());

    let mut harness = Harness::new();
    harness.store = MemoryBindingStore::new(list);
    let synth = ScriptedSynthesizer::new().fail("example.com/app.Run");

    let (output, diagnostics) = harness.run(&synth).into_result().unwrap();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(output.binding_list.removed, 0);
    assert_eq!(harness.store.saves.get(), 1);
    assert_eq!(harness.store.list.borrow().get(&key), Some(&custom));

    // Once the symbol generates again, the rename applies.
    let output = clean(harness.run(&ScriptedSynthesizer::new()));
    assert_eq!(output.name_of("example.com/app.Run"), Some("go"));
    assert_eq!(harness.store.list.borrow().get(&key), Some(&custom));
}

#[test]
fn test_present_modules_are_not_fetched_again() {
    let harness = Harness::new();
    clean(harness.run(&ScriptedSynthesizer::new()));
    clean(harness.run(&ScriptedSynthesizer::new()));

    assert_eq!(harness.fetcher.fetched.borrow().len(), 3);
}
