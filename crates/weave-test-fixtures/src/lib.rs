//! Test fixtures for weave run testing
//!
//! Provides a small, representative set of source modules, in-memory
//! collaborators that serve them, and a mirror directory laid out the way the
//! file-backed collaborators expect.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use weave_codegen::{EmitInput, EmitReport, Emitter, CodegenError, SynthContext, SynthError, Synthesizer};
use weave_core::module_path::STD_MODULE;
use weave_core::naming::to_kebab_case;
use weave_core::symbols::{Field, Func, Interface, Param, Struct, Value};
use weave_core::{
    BindingCandidate, BindingKey, BindingList, BindingStore, Category, Config, CoreError,
    Dependencies, Diagnostic, DiagnosticKind, Diagnostics, Ident, ModelBuilder, ModelInput,
    ModulePath, ModuleParser, ModuleRequirement, Outcome, ParsedModules, RequiredGenericImpl,
    SourceFetcher, Symbol, SymbolTable, TypeRef, NAME_PLACEHOLDER,
};

pub const APP_MODULE: &str = "example.com/app";
pub const APP_VERSION: &str = "v1.0.0";
pub const LIB_MODULE: &str = "example.com/lib";
pub const LIB_VERSION: &str = "v1.2.0";
pub const HOST_VERSION: &str = "1.21";

/// One package (sub-module) of a fixture module.
#[derive(Debug, Clone)]
pub struct PackageFixture {
    pub path: ModulePath,
    pub name: String,
    pub symbols: SymbolTable,
}

/// A fetchable module with its packages.
#[derive(Debug, Clone)]
pub struct ModuleFixture {
    pub path: ModulePath,
    pub version: String,
    pub host_version: Option<String>,
    pub requires: Vec<ModuleRequirement>,
    pub packages: Vec<PackageFixture>,
}

impl ModuleFixture {
    /// Directory of `package` relative to the module root.
    pub fn relative_dir(&self, package: &ModulePath) -> PathBuf {
        if self.path.as_str() == STD_MODULE {
            return PathBuf::from(package.as_str());
        }
        package
            .as_str()
            .strip_prefix(self.path.as_str())
            .map(|rest| PathBuf::from(rest.trim_start_matches('/')))
            .unwrap_or_default()
    }
}

pub fn func(module: &str, name: &str, params: Vec<Param>, results: Vec<TypeRef>) -> Func {
    Func {
        name: Ident::new(module, name),
        recv: None,
        params,
        results,
        variadic: false,
        doc: format!("{} does something useful.", name),
        internal: false,
    }
}

pub fn strukt(module: &str, name: &str, fields: &[(&str, TypeRef)]) -> Struct {
    Struct {
        name: Ident::new(module, name),
        fields: fields
            .iter()
            .map(|(f, ty)| Field {
                name: f.to_string(),
                ty: ty.clone(),
                doc: String::new(),
            })
            .collect(),
        doc: format!("{} holds settings.", name),
        internal: false,
    }
}

pub fn string() -> TypeRef {
    TypeRef::builtin("string")
}

pub fn error() -> TypeRef {
    TypeRef::builtin("error")
}

fn package(path: &str, name: &str, build: impl FnOnce(&mut SymbolTable)) -> PackageFixture {
    let mut symbols = SymbolTable::new();
    build(&mut symbols);
    PackageFixture {
        path: ModulePath::new(path),
        name: name.to_string(),
        symbols,
    }
}

/// `example.com/app` requiring `example.com/lib`, plus the standard library.
///
/// `example.com/app/errors` collides with std `errors`, `app.Fprint` takes an
/// `io.Writer`, and `app.NewConfig` shadows the synthesized constructor.
pub fn app_scenario() -> Vec<ModuleFixture> {
    let app = ModuleFixture {
        path: ModulePath::new(APP_MODULE),
        version: APP_VERSION.to_string(),
        host_version: Some(HOST_VERSION.to_string()),
        requires: vec![ModuleRequirement {
            path: ModulePath::new(LIB_MODULE),
            version: LIB_VERSION.to_string(),
        }],
        packages: vec![
            package(APP_MODULE, "app", |t| {
                t.add_func(func(APP_MODULE, "Run", vec![], vec![error()]));
                t.add_func(func(
                    APP_MODULE,
                    "Fprint",
                    vec![
                        Param::new("w", TypeRef::named("io", "Writer")),
                        Param::new("s", string()),
                    ],
                    vec![error()],
                ));
                t.add_struct(strukt(APP_MODULE, "Config", &[("Name", string())]));
                t.add_func(func(
                    APP_MODULE,
                    "NewConfig",
                    vec![Param::new("name", string())],
                    vec![TypeRef::Pointer(Box::new(TypeRef::named(APP_MODULE, "Config")))],
                ));
                t.add_value(Value {
                    name: Ident::new(APP_MODULE, "Version"),
                    ty: string(),
                    doc: "Version of the app.".to_string(),
                    constant: true,
                    internal: false,
                });
            }),
            package("example.com/app/errors", "errors", |t| {
                t.add_func(func(
                    "example.com/app/errors",
                    "Wrap",
                    vec![Param::new("err", error())],
                    vec![error()],
                ));
            }),
            package("example.com/app/internal/secret", "secret", |t| {
                t.add_func(func("example.com/app/internal/secret", "Key", vec![], vec![string()]));
            }),
        ],
    };

    let lib = ModuleFixture {
        path: ModulePath::new(LIB_MODULE),
        version: LIB_VERSION.to_string(),
        host_version: None,
        requires: Vec::new(),
        packages: vec![package(LIB_MODULE, "lib", |t| {
            t.add_func(func(LIB_MODULE, "Helper", vec![], vec![]));
        })],
    };

    let std = ModuleFixture {
        path: ModulePath::new(STD_MODULE),
        version: HOST_VERSION.to_string(),
        host_version: None,
        requires: Vec::new(),
        packages: vec![
            package("fmt", "fmt", |t| {
                t.add_func(func("fmt", "Sprint", vec![Param::new("s", string())], vec![string()]));
            }),
            package("errors", "errors", |t| {
                t.add_func(func("errors", "New", vec![Param::new("text", string())], vec![error()]));
            }),
            package("io", "io", |t| {
                let mut write = func(
                    "io",
                    "Write",
                    vec![Param::new("p", TypeRef::Slice(Box::new(TypeRef::builtin("byte"))))],
                    vec![TypeRef::builtin("int"), error()],
                );
                write.doc = "Write writes p.".to_string();
                t.add_interface(Interface {
                    name: Ident::new("io", "Writer"),
                    methods: vec![write],
                    doc: "Writer is the interface that wraps Write.".to_string(),
                    internal: false,
                });
            }),
        ],
    };

    vec![app, lib, std]
}

/// Config binding the app scenario with `fmt` as an extra, unprefixed target.
pub fn app_config(out_dir: &Path) -> Config {
    Config {
        out_dir: out_dir.to_path_buf(),
        package: APP_MODULE.to_string(),
        version: APP_VERSION.to_string(),
        cut_new: false,
        dont_build_flag: None,
        exclude: Vec::new(),
        no_prefix: vec!["fmt".to_string()],
        custom_prefixes: Vec::new(),
        include_std_libs: vec!["fmt".to_string()],
    }
}

fn dir_name(module: &ModulePath, version: &str) -> String {
    format!("{}@{}", module, version)
}

/// Serves fixture modules without touching the filesystem.
#[derive(Debug, Default)]
pub struct MemoryFetcher {
    available: BTreeSet<(ModulePath, String)>,
    present: RefCell<BTreeSet<(ModulePath, String)>>,
    pub fetched: RefCell<Vec<ModulePath>>,
}

impl MemoryFetcher {
    pub fn new(modules: &[ModuleFixture]) -> Self {
        Self {
            available: modules
                .iter()
                .map(|m| (m.path.clone(), m.version.clone()))
                .collect(),
            ..Self::default()
        }
    }

    /// Removes a module so fetching it fails.
    pub fn without(mut self, module: &str) -> Self {
        self.available.retain(|(path, _)| path.as_str() != module);
        self
    }
}

impl SourceFetcher for MemoryFetcher {
    fn dir(&self, dest: &Path, module: &ModulePath, version: &str) -> PathBuf {
        dest.join(dir_name(module, version))
    }

    fn have(&self, _dest: &Path, module: &ModulePath, version: &str) -> Result<bool, CoreError> {
        Ok(self
            .present
            .borrow()
            .contains(&(module.clone(), version.to_string())))
    }

    fn get(&self, dest: &Path, module: &ModulePath, version: &str) -> Result<PathBuf, CoreError> {
        let entry = (module.clone(), version.to_string());
        if !self.available.contains(&entry) {
            return Err(CoreError::Fetch {
                module: module.clone(),
                version: version.to_string(),
                message: "not available".to_string(),
            });
        }
        self.fetched.borrow_mut().push(module.clone());
        self.present.borrow_mut().insert(entry);
        Ok(self.dir(dest, module, version))
    }
}

/// Parses fixture modules by root module path, ignoring the directory.
#[derive(Debug, Default)]
pub struct MemoryParser {
    modules: BTreeMap<ModulePath, ModuleFixture>,
}

impl MemoryParser {
    pub fn new(modules: &[ModuleFixture]) -> Self {
        Self {
            modules: modules.iter().map(|m| (m.path.clone(), m.clone())).collect(),
        }
    }
}

impl ModuleParser for MemoryParser {
    fn parse_modules(
        &self,
        dir: &Path,
        module: &ModulePath,
        exclude: &[String],
    ) -> Result<ParsedModules, CoreError> {
        let fixture = self.modules.get(module).ok_or_else(|| CoreError::Parse {
            module: module.clone(),
            message: "unknown module".to_string(),
        })?;
        let mut parsed = ParsedModules {
            min_host_version: fixture.host_version.clone(),
            requires: fixture.requires.clone(),
            ..ParsedModules::default()
        };
        for package in &fixture.packages {
            if exclude.iter().any(|e| e == package.path.as_str()) {
                continue;
            }
            parsed
                .declared_names
                .insert(package.path.clone(), package.name.clone());
            parsed
                .dirs
                .insert(package.path.clone(), dir.join(fixture.relative_dir(&package.path)));
        }
        Ok(parsed)
    }
}

/// Merges the symbols of every named package; listed packages fail.
#[derive(Debug, Default)]
pub struct MemoryModelBuilder {
    packages: BTreeMap<ModulePath, SymbolTable>,
    failing: BTreeSet<ModulePath>,
}

impl MemoryModelBuilder {
    pub fn new(modules: &[ModuleFixture]) -> Self {
        Self {
            packages: modules
                .iter()
                .flat_map(|m| &m.packages)
                .map(|p| (p.path.clone(), p.symbols.clone()))
                .collect(),
            failing: BTreeSet::new(),
        }
    }

    pub fn failing(mut self, package: &str) -> Self {
        self.failing.insert(ModulePath::new(package));
        self
    }
}

impl ModelBuilder for MemoryModelBuilder {
    fn build(&self, input: ModelInput<'_>) -> Outcome<SymbolTable, CoreError> {
        let mut table = SymbolTable::new();
        let mut diagnostics = Diagnostics::new();
        for path in input.modules.dirs.keys() {
            if !input.module_names.contains(path) {
                continue;
            }
            if self.failing.contains(path) {
                diagnostics.push(Diagnostic::new(
                    DiagnosticKind::ModelBuild,
                    path.as_str(),
                    "scripted load failure",
                ));
                continue;
            }
            if let Some(symbols) = self.packages.get(path) {
                table.merge(symbols.clone());
            }
        }
        Outcome::from_parts(table, diagnostics)
    }
}

/// Synthesizer that fails on demand and records adapter requests.
#[derive(Debug, Default)]
pub struct ScriptedSynthesizer {
    pub failing: BTreeSet<String>,
    pub binding_requires: BTreeMap<String, Vec<Ident>>,
    pub impl_requires: BTreeMap<String, Vec<Ident>>,
    pub failing_impls: BTreeSet<String>,
}

impl ScriptedSynthesizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(mut self, identity: &str) -> Self {
        self.failing.insert(identity.to_string());
        self
    }

    pub fn fail_impl(mut self, key: &str) -> Self {
        self.failing_impls.insert(key.to_string());
        self
    }

    pub fn binding_requires(mut self, identity: &str, iface: Ident) -> Self {
        self.binding_requires
            .entry(identity.to_string())
            .or_default()
            .push(iface);
        self
    }

    pub fn impl_requires(mut self, key: &str, iface: Ident) -> Self {
        self.impl_requires.entry(key.to_string()).or_default().push(iface);
        self
    }
}

impl Synthesizer for ScriptedSynthesizer {
    fn synthesize(
        &self,
        symbol: Symbol<'_>,
        ctx: &SynthContext<'_>,
        deps: &mut Dependencies,
    ) -> Result<BindingCandidate, SynthError> {
        let identity = symbol.identity();
        if self.failing.contains(&identity) {
            return Err(SynthError::Other(format!("scripted failure for {}", identity)));
        }
        for iface in self.binding_requires.get(&identity).into_iter().flatten() {
            deps.require_generic_impl(RequiredGenericImpl::for_interface(iface));
        }
        deps.add_import(symbol.module().clone());

        let (category, source_name, member) = match symbol {
            Symbol::InterfaceMethod { iface, method } => (
                Category::InterfaceMethod,
                &method.name.name,
                format!("{}//{}", to_kebab_case(&iface.name.name), to_kebab_case(&method.name.name)),
            ),
            Symbol::Func(f) => match &f.recv {
                Some(recv) => (
                    Category::Method,
                    &f.name.name,
                    format!("{}//{}", to_kebab_case(&recv.ty.name), to_kebab_case(&f.name.name)),
                ),
                None => (Category::Function, &f.name.name, ctx.policy.function_name(&f.name.name)),
            },
            Symbol::FieldAccessor { owner, field, setter } => (
                if setter { Category::Setter } else { Category::Getter },
                &field.name,
                format!(
                    "{}//{}{}",
                    to_kebab_case(&owner.name.name),
                    to_kebab_case(&field.name),
                    if setter { "!" } else { "?" }
                ),
            ),
            Symbol::Value(v) => (Category::Value, &v.name.name, to_kebab_case(&v.name.name)),
            Symbol::Constructor(s) => (
                Category::Constructor,
                &s.name.name,
                ctx.policy.function_name(&format!("New{}", s.name.name)),
            ),
        };
        let key = BindingKey::new(identity.clone());
        let name_candidates = ctx.policy.name_candidates(
            symbol.module(),
            &member,
            ctx.binding_list.rename(&key),
            ctx.module_names,
        )?;
        Ok(BindingCandidate {
            key,
            module: symbol.module().clone(),
            name_candidates,
            priority: ctx.policy.priority_of(symbol.module()),
            category,
            doc: format!("Calls {}.", identity),
            doc_comment: String::new(),
            source_name: source_name.clone(),
            argsn: 0,
            body: format!("return env.NewError(\"{}\")", NAME_PLACEHOLDER),
        })
    }

    fn synthesize_generic_impl(
        &self,
        request: &RequiredGenericImpl,
        _ctx: &SynthContext<'_>,
        deps: &mut Dependencies,
    ) -> Result<String, SynthError> {
        if self.failing_impls.contains(&request.key) {
            return Err(SynthError::UnknownInterface(request.interface.clone()));
        }
        for iface in self.impl_requires.get(&request.key).into_iter().flatten() {
            deps.require_generic_impl(RequiredGenericImpl::for_interface(iface));
        }
        Ok(format!("// adapter for {} ({})\n", request.key, NAME_PLACEHOLDER))
    }
}

/// Binding list kept in memory; counts saves.
#[derive(Debug, Default)]
pub struct MemoryBindingStore {
    pub list: RefCell<BindingList>,
    pub saves: Cell<usize>,
}

impl MemoryBindingStore {
    pub fn new(list: BindingList) -> Self {
        Self {
            list: RefCell::new(list),
            saves: Cell::new(0),
        }
    }
}

impl BindingStore for MemoryBindingStore {
    fn load(&self) -> Result<BindingList, CoreError> {
        Ok(self.list.borrow().clone())
    }

    fn save(&self, list: &BindingList) -> Result<(), CoreError> {
        *self.list.borrow_mut() = list.clone();
        self.saves.set(self.saves.get() + 1);
        Ok(())
    }
}

/// Owned snapshot of one emit call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedEmit {
    pub package: String,
    /// `(key, display name)` in emit order.
    pub names: Vec<(String, String)>,
    pub generic_impls: Vec<String>,
    pub imports: Vec<ModulePath>,
    pub dont_build_flag: Option<String>,
}

/// Emitter that records its input instead of writing files.
#[derive(Debug, Default)]
pub struct RecordingEmitter {
    pub emitted: RefCell<Vec<RecordedEmit>>,
}

impl RecordingEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<RecordedEmit> {
        self.emitted.borrow().last().cloned()
    }
}

impl Emitter for RecordingEmitter {
    fn emit(&self, input: &EmitInput<'_>) -> Outcome<EmitReport, CodegenError> {
        self.emitted.borrow_mut().push(RecordedEmit {
            package: input.package.to_string(),
            names: input
                .bindings
                .iter()
                .map(|n| (n.key().to_string(), n.name.clone()))
                .collect(),
            generic_impls: input.generic_impls.iter().map(|g| g.key.clone()).collect(),
            imports: input.imports.iter().cloned().collect(),
            dont_build_flag: input.dont_build_flag.map(str::to_string),
        });

        let mut report = EmitReport {
            output_dir: PathBuf::from(input.package),
            generic_impls: input.generic_impls.len(),
            ..EmitReport::default()
        };
        for named in input.bindings {
            let enabled = input.binding_list.is_enabled(named.key());
            let count = report.by_category.entry(named.binding.category).or_default();
            count.total += 1;
            count.written += usize::from(enabled);
            report.total += 1;
            report.written += usize::from(enabled);
        }
        Outcome::Ok(report)
    }
}

/// Test fixture categories
pub enum FixtureType {
    /// Every module of [`app_scenario`] is in the mirror.
    AppMirror,
    /// The mirror lacks `example.com/lib`.
    MissingRequirement,
    /// `example.com/app/errors` declares its name but has an unreadable
    /// symbol dump.
    BrokenPackage,
}

/// Temporary directories holding a module mirror and an output root.
pub struct TestFixtures {
    temp_dir: Option<tempfile::TempDir>,
}

impl Default for TestFixtures {
    fn default() -> Self {
        Self::new()
    }
}

impl TestFixtures {
    pub fn new() -> Self {
        Self { temp_dir: None }
    }

    /// Creates a temporary directory with a `mirror/` laid out as
    /// `<module>@<version>/weave-module.toml` plus one `package.json` per
    /// package directory. Returns the temporary root.
    pub fn setup(&mut self, fixture_type: FixtureType) -> PathBuf {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        let mirror = root.join("mirror");

        for module in app_scenario() {
            if matches!(fixture_type, FixtureType::MissingRequirement)
                && module.path.as_str() == LIB_MODULE
            {
                continue;
            }
            write_module(&mirror, &module);
        }
        if let FixtureType::BrokenPackage = fixture_type {
            let app_dir = mirror.join(dir_name(&ModulePath::new(APP_MODULE), APP_VERSION));
            fs::write(
                app_dir.join("errors").join("package.json"),
                r#"{ "name": "errors", "symbols": { "funcs": 42 } }"#,
            )
            .unwrap();
        }

        self.temp_dir = Some(dir);
        root
    }
}

fn write_module(mirror: &Path, module: &ModuleFixture) {
    let module_dir = mirror.join(dir_name(&module.path, &module.version));
    fs::create_dir_all(&module_dir).unwrap();

    let mut manifest = format!("module = \"{}\"\n", module.path);
    if let Some(host) = &module.host_version {
        manifest.push_str(&format!("host-version = \"{}\"\n", host));
    }
    for req in &module.requires {
        manifest.push_str(&format!(
            "\n[[require]]\npath = \"{}\"\nversion = \"{}\"\n",
            req.path, req.version
        ));
    }
    fs::write(module_dir.join("weave-module.toml"), manifest).unwrap();

    for package in &module.packages {
        let package_dir = module_dir.join(module.relative_dir(&package.path));
        fs::create_dir_all(&package_dir).unwrap();
        let dump = json!({
            "name": package.name,
            "symbols": package.symbols,
        });
        fs::write(
            package_dir.join("package.json"),
            serde_json::to_string_pretty(&dump).unwrap(),
        )
        .unwrap();
    }
}
