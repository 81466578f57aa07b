//! The run orchestrator
//!
//! Stages, in order: fetch and parse modules, name modules, build the model,
//! generate bindings, close over generic implementations, reconcile the binding
//! list, name bindings, emit, save the binding list. Per-symbol failures, model
//! gaps and naming conflicts are collected as diagnostics; everything else
//! aborts the run before the binding list is written.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, info, instrument, warn};
use weave_codegen::{
    generate_bindings, name_bindings, resolve_generic_impls, EmitInput, EmitReport, Emitter,
    GenericImpl, NamingPolicy, SynthContext, Synthesizer,
};
use weave_core::module_path::STD_MODULE;
use weave_core::{
    BindingKey, BindingStore, Config, Dependencies, Diagnostics, ModelBuilder, ModelInput,
    ModuleGraph, ModuleOrder, ModuleParser, ModulePath, ModuleRequirement, NamedBinding, Outcome,
    ParsedModules, ReconcileSummary, SourceFetcher, UniqueModuleNames,
};

use crate::error::RunError;
use crate::stats::RunStats;

/// What to bind and where module trees go.
#[derive(Debug, Clone, Copy)]
pub struct RunRequest<'a> {
    pub config: &'a Config,
    /// Directory module trees are fetched into.
    pub src_dir: &'a Path,
}

/// External collaborators driven by a run.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub fetcher: &'a dyn SourceFetcher,
    pub parser: &'a dyn ModuleParser,
    pub model_builder: &'a dyn ModelBuilder,
    pub synthesizer: &'a dyn Synthesizer,
    pub binding_store: &'a dyn BindingStore,
    pub emitter: &'a dyn Emitter,
}

#[derive(Debug)]
pub struct RunOutput {
    /// Named bindings sorted by key.
    pub bindings: Vec<NamedBinding>,
    pub generic_impls: Vec<GenericImpl>,
    pub imports: BTreeSet<ModulePath>,
    pub module_names: UniqueModuleNames,
    pub module_graph: ModuleGraph,
    pub binding_list: ReconcileSummary,
    pub emit: EmitReport,
    pub stats: RunStats,
}

impl RunOutput {
    pub fn output_dir(&self) -> &Path {
        &self.emit.output_dir
    }

    /// Display name of the binding with `key`.
    pub fn name_of(&self, key: &str) -> Option<&str> {
        self.bindings
            .iter()
            .find(|b| b.key().as_str() == key)
            .map(|b| b.name.as_str())
    }
}

/// Runs every stage. A fatal error leaves nothing to report but the error;
/// otherwise the output comes with every non-fatal diagnostic of the run.
pub fn run(request: &RunRequest<'_>, collaborators: &Collaborators<'_>) -> Outcome<RunOutput, RunError> {
    match run_stages(request, collaborators) {
        Ok((output, diagnostics)) => Outcome::from_parts(output, diagnostics),
        Err(e) => Outcome::Err(e),
    }
}

/// Moves a stage's diagnostics into the run batch, logging each.
fn absorb(run: &mut Diagnostics, stage: Diagnostics) {
    for entry in stage.entries() {
        warn!("{}", entry);
    }
    run.merge(stage);
}

#[instrument(skip_all, fields(package = %request.config.package, version = %request.config.version), level = "info")]
fn run_stages(
    request: &RunRequest<'_>,
    c: &Collaborators<'_>,
) -> Result<(RunOutput, Diagnostics), RunError> {
    let config = request.config;
    let mut stats = RunStats::new();
    let mut diagnostics = Diagnostics::new();

    let started = Instant::now();
    let (parsed, module_graph) = fetch_modules(config, request.src_dir, c.fetcher, c.parser)?;
    stats.fetch = started.elapsed();
    stats.modules = module_graph.len();

    let module_names =
        UniqueModuleNames::assign(&parsed.declared_names, &ModuleOrder::new(config.package.as_str()))?;
    let targets = target_modules(config, &parsed)?;
    info!("{} target packages", targets.len());

    let started = Instant::now();
    let (table, model_diagnostics) = c
        .model_builder
        .build(ModelInput {
            modules: &parsed,
            module_names: &module_names,
        })
        .into_result()?;
    absorb(&mut diagnostics, model_diagnostics);
    stats.parse = started.elapsed();
    stats.symbols = table.len();

    let started = Instant::now();
    let mut binding_list = c.binding_store.load()?;
    let policy = NamingPolicy::from_config(config);
    let mut deps = Dependencies::new();
    let ctx = SynthContext {
        table: &table,
        module_names: &module_names,
        policy: &policy,
        binding_list: &binding_list,
    };
    let (generated, generate_diagnostics) =
        generate_bindings(&targets, &ctx, c.synthesizer, &mut deps).into_result()?;
    absorb(&mut diagnostics, generate_diagnostics);
    let generic_impls = resolve_generic_impls(c.synthesizer, &ctx, &mut deps)?;
    stats.generate = started.elapsed();
    stats.generic_impls = generic_impls.len();

    let started = Instant::now();
    let docs: BTreeMap<BindingKey, String> = generated
        .bindings
        .iter()
        .map(|b| (b.key.clone(), b.doc.clone()))
        .collect();
    let summary = binding_list.reconcile(&docs);
    debug!(
        "binding list: {} added, {} removed, {} docs changed",
        summary.added, summary.removed, summary.changed_docs
    );
    stats.binding_list = started.elapsed();

    let started = Instant::now();
    let (bindings, naming_diagnostics) = name_bindings(generated.bindings).into_result()?;
    absorb(&mut diagnostics, naming_diagnostics);

    let package = config.binding_package();
    let input = EmitInput {
        package: &package,
        bindings: &bindings,
        generic_impls: &generic_impls,
        imports: &deps.imports,
        module_names: &module_names,
        declared_names: &parsed.declared_names,
        binding_list: &binding_list,
        dont_build_flag: config.dont_build_flag.as_deref(),
    };
    let (emit, emit_diagnostics) = c.emitter.emit(&input).into_result()?;
    absorb(&mut diagnostics, emit_diagnostics);
    stats.emit = started.elapsed();

    // Saved last: a fatal stage leaves the stored list untouched.
    let started = Instant::now();
    c.binding_store.save(&binding_list)?;
    stats.binding_list += started.elapsed();

    stats.by_category = emit.by_category.clone();
    stats.written = emit.written;
    stats.total = emit.total;
    stats.warnings = diagnostics.len();

    let output = RunOutput {
        bindings,
        generic_impls,
        imports: deps.imports,
        module_names,
        module_graph,
        binding_list: summary,
        emit,
        stats,
    };
    Ok((output, diagnostics))
}

/// Fetches and parses the primary module, then every module it requires and
/// the standard library at the primary's host version.
#[instrument(skip_all, fields(package = %config.package), level = "info")]
fn fetch_modules(
    config: &Config,
    src_dir: &Path,
    fetcher: &dyn SourceFetcher,
    parser: &dyn ModuleParser,
) -> Result<(ParsedModules, ModuleGraph), RunError> {
    let root = ModulePath::new(config.package.as_str());
    let mut graph = ModuleGraph::new();
    graph.add_module(&root, &config.version);

    let dir = fetch_module(fetcher, src_dir, &root, &config.version, &graph)?;
    let mut parsed = parser.parse_modules(&dir, &root, &config.exclude)?;

    let mut requires: Vec<ModuleRequirement> = parsed.requires.clone();
    match &parsed.min_host_version {
        Some(host) => requires.push(ModuleRequirement {
            path: ModulePath::new(STD_MODULE),
            version: host.clone(),
        }),
        None => debug!("{} names no host version, skipping {}", root, STD_MODULE),
    }
    requires.retain(|r| {
        let excluded = config.is_excluded(&r.path);
        if excluded {
            debug!("excluded requirement {}", r.path);
        }
        !excluded
    });

    let mut queued: BTreeSet<ModulePath> = BTreeSet::new();
    for req in &requires {
        graph.add_requirement(&root, &req.path, &req.version);
    }
    for req in requires {
        if !queued.insert(req.path.clone()) || req.path == root {
            continue;
        }
        let dir = fetch_module(fetcher, src_dir, &req.path, &req.version, &graph)?;
        let sub = parser.parse_modules(&dir, &req.path, &config.exclude)?;
        for nested in &sub.requires {
            graph.add_requirement(&req.path, &nested.path, &nested.version);
        }
        parsed.merge(sub);
    }

    info!(
        "{} modules, {} packages",
        graph.len(),
        parsed.declared_names.len()
    );
    Ok((parsed, graph))
}

fn fetch_module(
    fetcher: &dyn SourceFetcher,
    dest: &Path,
    module: &ModulePath,
    version: &str,
    graph: &ModuleGraph,
) -> Result<PathBuf, RunError> {
    let wrap = |source| {
        let required_by = graph.required_by(module);
        RunError::Fetch {
            module: module.clone(),
            version: version.to_string(),
            required_by: if required_by.is_empty() {
                "configuration".to_string()
            } else {
                required_by
                    .iter()
                    .map(|m| m.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            },
            source,
        }
    };

    if fetcher.have(dest, module, version).map_err(wrap)? {
        debug!("{} {} already present", module, version);
        return Ok(fetcher.dir(dest, module, version));
    }
    info!("Downloading {} {}", module, version);
    fetcher.get(dest, module, version).map_err(wrap)
}

/// Every parsed package under a target root, minus exclusions. A root with
/// no package at all is an error.
fn target_modules(config: &Config, parsed: &ParsedModules) -> Result<BTreeSet<ModulePath>, RunError> {
    let mut targets = BTreeSet::new();
    for root in config.target_roots() {
        let mut found = false;
        for module in parsed.dirs.keys().filter(|m| m.is_within(&root)) {
            found = true;
            if !config.is_excluded(module) {
                targets.insert(module.clone());
            }
        }
        if !found {
            return Err(RunError::UnknownPackage(ModulePath::new(root)));
        }
    }
    Ok(targets)
}
