//! File-backed collaborators
//!
//! A module tree is a directory holding a `weave-module.toml` manifest at its
//! root and one `package.json` symbol dump per package directory:
//!
//! ```text
//! example.com/app@v1.0.0/
//!   weave-module.toml      module, host-version, [[require]]
//!   package.json           { "name": "app", "symbols": { ... } }
//!   widget/package.json    { "name": "widget", "symbols": { ... } }
//! ```
//!
//! Package paths are the module path joined with the package directory. The
//! `std` pseudo-module is the exception: its package paths are the bare
//! directories (`fmt`, `io`).

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace};
use walkdir::WalkDir;
use weave_core::module_path::STD_MODULE;
use weave_core::{
    CoreError, Diagnostic, DiagnosticKind, Diagnostics, ModelBuilder, ModelInput, ModulePath,
    ModuleParser, ModuleRequirement, Outcome, ParsedModules, SourceFetcher, SymbolTable,
};

pub const MANIFEST_FILE: &str = "weave-module.toml";
pub const PACKAGE_FILE: &str = "package.json";

/// `<module>@<version>` below `root`.
pub fn module_dir(root: &Path, module: &ModulePath, version: &str) -> PathBuf {
    root.join(format!("{}@{}", module, version))
}

/// Copies module trees out of a local mirror laid out like the source
/// directory.
#[derive(Debug, Clone)]
pub struct MirrorFetcher {
    mirror: PathBuf,
}

impl MirrorFetcher {
    pub fn new(mirror: impl Into<PathBuf>) -> Self {
        Self {
            mirror: mirror.into(),
        }
    }
}

impl SourceFetcher for MirrorFetcher {
    fn dir(&self, dest: &Path, module: &ModulePath, version: &str) -> PathBuf {
        module_dir(dest, module, version)
    }

    fn have(&self, dest: &Path, module: &ModulePath, version: &str) -> Result<bool, CoreError> {
        Ok(self.dir(dest, module, version).join(MANIFEST_FILE).is_file())
    }

    /// Copies the mirrored tree over whatever is at the target.
    fn get(&self, dest: &Path, module: &ModulePath, version: &str) -> Result<PathBuf, CoreError> {
        let target = self.dir(dest, module, version);

        let source = module_dir(&self.mirror, module, version);
        if !source.is_dir() {
            return Err(CoreError::Fetch {
                module: module.clone(),
                version: version.to_string(),
                message: format!("not found in mirror {}", self.mirror.display()),
            });
        }

        for entry in WalkDir::new(&source).sort_by_file_name() {
            let entry = entry.map_err(|e| CoreError::Fetch {
                module: module.clone(),
                version: version.to_string(),
                message: e.to_string(),
            })?;
            let relative = entry.path().strip_prefix(&source).unwrap_or(entry.path());
            let to = target.join(relative);
            if entry.file_type().is_dir() {
                fs::create_dir_all(&to).map_err(|e| CoreError::io(&to, e))?;
            } else {
                trace!("copy {}", relative.display());
                fs::copy(entry.path(), &to).map_err(|e| CoreError::io(&to, e))?;
            }
        }
        Ok(target)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ModuleManifest {
    module: Option<String>,
    host_version: Option<String>,
    #[serde(default)]
    require: Vec<ModuleRequirement>,
}

#[derive(Debug, Deserialize)]
struct PackageHeader {
    name: String,
}

/// Symbol dump of one package.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackageDump {
    pub name: String,
    #[serde(default)]
    pub symbols: SymbolTable,
}

/// Reads manifests and package names; symbols are left to the model builder.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManifestParser;

fn package_path(module: &ModulePath, relative: &Path) -> ModulePath {
    let relative = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/");
    if module.as_str() == STD_MODULE {
        ModulePath::new(relative)
    } else if relative.is_empty() {
        module.clone()
    } else {
        ModulePath::new(format!("{}/{}", module, relative))
    }
}

impl ModuleParser for ManifestParser {
    #[instrument(skip(self, exclude), fields(module = %module), level = "debug")]
    fn parse_modules(
        &self,
        dir: &Path,
        module: &ModulePath,
        exclude: &[String],
    ) -> Result<ParsedModules, CoreError> {
        let parse_err = |message: String| CoreError::Parse {
            module: module.clone(),
            message,
        };

        let manifest_path = dir.join(MANIFEST_FILE);
        let content =
            fs::read_to_string(&manifest_path).map_err(|e| CoreError::io(&manifest_path, e))?;
        let manifest: ModuleManifest = toml::from_str(&content)
            .map_err(|e| parse_err(format!("{}: {}", manifest_path.display(), e)))?;
        if let Some(declared) = &manifest.module {
            if declared != module.as_str() {
                return Err(parse_err(format!("manifest declares module {}", declared)));
            }
        }

        let mut parsed = ParsedModules {
            min_host_version: manifest.host_version,
            requires: manifest.require,
            ..ParsedModules::default()
        };

        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry.map_err(|e| parse_err(e.to_string()))?;
            if entry.file_name() != PACKAGE_FILE {
                continue;
            }
            let Some(package_dir) = entry.path().parent() else {
                continue;
            };
            let relative = package_dir.strip_prefix(dir).unwrap_or(Path::new(""));
            let path = package_path(module, relative);
            if exclude.iter().any(|e| e == path.as_str()) {
                debug!("excluded {}", path);
                continue;
            }

            let content =
                fs::read_to_string(entry.path()).map_err(|e| CoreError::io(entry.path(), e))?;
            let header: PackageHeader = serde_json::from_str(&content)
                .map_err(|e| parse_err(format!("{}: {}", entry.path().display(), e)))?;
            trace!("package {} declares {}", path, header.name);
            parsed.declared_names.insert(path.clone(), header.name);
            parsed.dirs.insert(path, package_dir.to_path_buf());
        }

        debug!("{} packages", parsed.dirs.len());
        Ok(parsed)
    }
}

/// Loads the symbol dump of every named package.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonModelBuilder;

fn mark_internal(symbols: &mut SymbolTable) {
    symbols.interfaces.values_mut().for_each(|i| i.internal = true);
    symbols.funcs.values_mut().for_each(|f| f.internal = true);
    symbols.structs.values_mut().for_each(|s| s.internal = true);
    symbols.values.values_mut().for_each(|v| v.internal = true);
}

fn load_package(dir: &Path) -> Result<PackageDump, String> {
    let path = dir.join(PACKAGE_FILE);
    let content = fs::read_to_string(&path).map_err(|e| format!("{}: {}", path.display(), e))?;
    serde_json::from_str(&content).map_err(|e| format!("{}: {}", path.display(), e))
}

impl ModelBuilder for JsonModelBuilder {
    #[instrument(skip_all, fields(packages = input.modules.dirs.len()), level = "info")]
    fn build(&self, input: ModelInput<'_>) -> Outcome<SymbolTable, CoreError> {
        let mut table = SymbolTable::new();
        let mut diagnostics = Diagnostics::new();
        let mut loaded: BTreeMap<&ModulePath, usize> = BTreeMap::new();

        for (path, dir) in &input.modules.dirs {
            if !input.module_names.contains(path) {
                continue;
            }
            match load_package(dir) {
                Ok(mut dump) => {
                    if path.is_internal() {
                        mark_internal(&mut dump.symbols);
                    }
                    loaded.insert(path, dump.symbols.len());
                    table.merge(dump.symbols);
                }
                Err(message) => {
                    diagnostics.push(Diagnostic::new(DiagnosticKind::ModelBuild, path.as_str(), message))
                }
            }
        }

        debug!("loaded {} packages, {} symbols", loaded.len(), table.len());
        Outcome::from_parts(table, diagnostics)
    }
}
