//! Runs against a module mirror on disk

use std::fs;
use std::path::{Path, PathBuf};

use pretty_assertions::assert_eq;
use weave::{run, Collaborators, JsonModelBuilder, ManifestParser, MirrorFetcher, RunError, RunOutput, RunRequest};
use weave_codegen::{SourceEmitter, TemplateSynthesizer};
use weave_core::{Config, DiagnosticKind, Diagnostics, ModulePath, Outcome, TomlBindingStore};
use weave_test_fixtures::{app_config, FixtureType, TestFixtures, APP_MODULE, LIB_MODULE};

struct Workspace {
    config: Config,
    src_dir: PathBuf,
    fetcher: MirrorFetcher,
    store: TomlBindingStore,
    emitter: SourceEmitter,
}

impl Workspace {
    fn new(root: &Path) -> Self {
        let out = root.join("out");
        Self {
            config: app_config(&out),
            src_dir: root.join("src"),
            fetcher: MirrorFetcher::new(root.join("mirror")),
            store: TomlBindingStore::new(root.join("bindings.toml")),
            emitter: SourceEmitter::new(out),
        }
    }

    fn run(&self) -> Outcome<RunOutput, RunError> {
        let request = RunRequest {
            config: &self.config,
            src_dir: &self.src_dir,
        };
        let collaborators = Collaborators {
            fetcher: &self.fetcher,
            parser: &ManifestParser,
            model_builder: &JsonModelBuilder,
            synthesizer: &TemplateSynthesizer,
            binding_store: &self.store,
            emitter: &self.emitter,
        };
        run(&request, &collaborators)
    }
}

fn succeed(outcome: Outcome<RunOutput, RunError>) -> (RunOutput, Diagnostics) {
    match outcome.into_result() {
        Ok(parts) => parts,
        Err(e) => panic!("run failed: {}", e),
    }
}

#[test]
fn test_generates_package_from_mirror() {
    let mut fixtures = TestFixtures::new();
    let root = fixtures.setup(FixtureType::AppMirror);
    let workspace = Workspace::new(&root);

    let (output, _) = succeed(workspace.run());

    assert!(root
        .join("src/example.com/app@v1.0.0/weave-module.toml")
        .exists());
    assert!(root.join("src/std@1.21/io/package.json").exists());
    assert!(root.join("bindings.toml").exists());

    let generated = fs::read_to_string(output.output_dir().join("generated.go")).unwrap();
    assert!(generated.contains("\"app-fprint\""));
    assert!(generated.contains("\"sprint\""));
    assert!(output.output_dir().join("custom.go").exists());
    assert_eq!(output.generic_impls.len(), 1);
}

#[test]
fn test_second_run_is_stable() {
    let mut fixtures = TestFixtures::new();
    let root = fixtures.setup(FixtureType::AppMirror);
    let workspace = Workspace::new(&root);

    let (first, _) = succeed(workspace.run());
    let generated = fs::read_to_string(first.output_dir().join("generated.go")).unwrap();
    let list = fs::read_to_string(root.join("bindings.toml")).unwrap();

    let (second, _) = succeed(workspace.run());
    assert!(second.emit.files_written.is_empty());
    assert_eq!(second.emit.fingerprint, first.emit.fingerprint);
    assert_eq!(second.binding_list.added, 0);
    assert_eq!(
        fs::read_to_string(second.output_dir().join("generated.go")).unwrap(),
        generated
    );
    assert_eq!(fs::read_to_string(root.join("bindings.toml")).unwrap(), list);
}

#[test]
fn test_missing_mirror_module() {
    let mut fixtures = TestFixtures::new();
    let root = fixtures.setup(FixtureType::MissingRequirement);
    let workspace = Workspace::new(&root);

    match workspace.run() {
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
    assert!(!root.join("out").exists());
}

#[test]
fn test_unreadable_package_is_a_warning() {
    let mut fixtures = TestFixtures::new();
    let root = fixtures.setup(FixtureType::BrokenPackage);
    let workspace = Workspace::new(&root);

    let (output, diagnostics) = succeed(workspace.run());
    let failures: Vec<&str> = diagnostics
        .by_kind(DiagnosticKind::ModelBuild)
        .map(|d| d.subject.as_str())
        .collect();
    assert_eq!(failures, vec!["example.com/app/errors"]);
    assert_eq!(output.name_of("example.com/app/errors.Wrap"), None);
    assert_eq!(output.name_of("example.com/app.Run"), Some("app-run"));
}
