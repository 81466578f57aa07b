//! Writing the generated binding package
//!
//! [`SourceEmitter`] lays out `<out-dir>/<package>/`:
//! - `custom.go`: created once for hand-written builtins, never overwritten
//! - `generated.go`: imports, adapters and the generated builtin map
//! - `generated.not.go`: empty builtin map used when the dont-build flag is set

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument};
use weave_core::naming::to_snake_case;
use weave_core::{
    BindingList, Category, Diagnostic, DiagnosticKind, Diagnostics, ModulePath, NamedBinding,
    Outcome, UniqueModuleNames,
};

use crate::closure::GenericImpl;
use crate::code_builder::CodeBuilder;
use crate::error::CodegenError;

/// Modules every generated file uses regardless of the bindings.
pub const RUNTIME_IMPORTS: &[&str] = &[
    "errors",
    "github.com/refaktor/rye/env",
    "github.com/refaktor/rye/evaldo",
    "reflect",
];

/// Everything needed to write the binding package.
#[derive(Debug, Clone, Copy)]
pub struct EmitInput<'a> {
    /// Flat package identifier, also the output sub-directory.
    pub package: &'a str,
    /// Named bindings sorted by key.
    pub bindings: &'a [NamedBinding],
    /// Adapters sorted by key.
    pub generic_impls: &'a [GenericImpl],
    pub imports: &'a BTreeSet<ModulePath>,
    pub module_names: &'a UniqueModuleNames,
    pub declared_names: &'a BTreeMap<ModulePath, String>,
    pub binding_list: &'a BindingList,
    pub dont_build_flag: Option<&'a str>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub written: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmitReport {
    pub output_dir: PathBuf,
    /// Files whose content changed on disk.
    pub files_written: Vec<PathBuf>,
    pub by_category: BTreeMap<Category, CategoryCount>,
    pub written: usize,
    pub total: usize,
    pub generic_impls: usize,
    /// SHA-256 of `generated.go`, hex encoded.
    pub fingerprint: String,
}

pub trait Emitter {
    fn emit(&self, input: &EmitInput<'_>) -> Outcome<EmitReport, CodegenError>;
}

/// Writes Go source files below an output root.
#[derive(Debug, Clone)]
pub struct SourceEmitter {
    out_root: PathBuf,
}

impl SourceEmitter {
    pub fn new(out_root: impl Into<PathBuf>) -> Self {
        Self {
            out_root: out_root.into(),
        }
    }

    pub fn output_dir(&self, package: &str) -> PathBuf {
        self.out_root.join(package)
    }
}

impl Emitter for SourceEmitter {
    #[instrument(skip_all, fields(package = input.package, bindings = input.bindings.len()), level = "info")]
    fn emit(&self, input: &EmitInput<'_>) -> Outcome<EmitReport, CodegenError> {
        let out_dir = self.output_dir(input.package);
        match emit_package(&out_dir, input) {
            Ok((report, diagnostics)) => Outcome::from_parts(report, diagnostics),
            Err(e) => Outcome::Err(e),
        }
    }
}

fn emit_package(
    out_dir: &Path,
    input: &EmitInput<'_>,
) -> Result<(EmitReport, Diagnostics), CodegenError> {
    fs::create_dir_all(out_dir).map_err(|e| CodegenError::io(out_dir, e))?;
    let mut report = EmitReport {
        output_dir: out_dir.to_path_buf(),
        generic_impls: input.generic_impls.len(),
        ..EmitReport::default()
    };
    let mut diagnostics = Diagnostics::new();

    let custom = out_dir.join("custom.go");
    if !custom.exists() {
        write_if_changed(&custom, &render_custom(input.package), &mut report)?;
    }

    let not_file = out_dir.join("generated.not.go");
    match input.dont_build_flag {
        Some(flag) => write_if_changed(&not_file, &render_not_built(input.package, flag), &mut report)?,
        None if not_file.exists() => {
            fs::remove_file(&not_file).map_err(|e| CodegenError::io(&not_file, e))?;
            debug!("removed {}", not_file.display());
        }
        None => {}
    }

    let generated = render_generated(input, &mut report, &mut diagnostics)?;
    report.fingerprint = fingerprint(&generated);
    write_if_changed(&out_dir.join("generated.go"), &generated, &mut report)?;

    info!(
        "wrote {}/{} bindings to {}",
        report.written,
        report.total,
        out_dir.display()
    );
    Ok((report, diagnostics))
}

/// Hex SHA-256 of `content`.
pub fn fingerprint(content: &str) -> String {
    Sha256::digest(content.as_bytes())
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Writes `content` unless the file already holds exactly that.
fn write_if_changed(path: &Path, content: &str, report: &mut EmitReport) -> Result<(), CodegenError> {
    if fs::read_to_string(path).is_ok_and(|existing| existing == content) {
        debug!("{} unchanged", path.display());
        return Ok(());
    }
    fs::write(path, content).map_err(|e| CodegenError::io(path, e))?;
    report.files_written.push(path.to_path_buf());
    Ok(())
}

/// Go string literal for `s`.
fn go_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn render_custom(package: &str) -> String {
    format!(
        r#"// Add your custom builtins to this file.

package {package}

import (
	"github.com/refaktor/rye/env"
)

var builtinsCustom = map[string]*env.Builtin{{
	// Add your custom builtins here:
}}
"#
    )
}

fn render_not_built(package: &str, flag: &str) -> String {
    format!(
        r#"// Code generated by weave. DO NOT EDIT.

//go:build {flag}

package {package}

import "github.com/refaktor/rye/env"

var Builtins = map[string]*env.Builtin{{}}
"#
    )
}

const PRELUDE: &str = r#"var Builtins map[string]*env.Builtin

func init() {
	Builtins = make(map[string]*env.Builtin, len(builtinsGenerated)+len(builtinsCustom))
	for k, v := range builtinsGenerated {
		Builtins[k] = v
	}
	for k, v := range builtinsCustom {
		Builtins[k] = v
	}
}

// Runtime packages are always imported.
var _ = evaldo.BuiltinNames
var _ = env.Object(nil)

func convRyeToGo(ps *env.ProgramState, obj env.Object, out any) error {
	dst := reflect.ValueOf(out).Elem()
	switch v := obj.(type) {
	case env.Native:
		src := reflect.ValueOf(v.Value)
		if !src.Type().AssignableTo(dst.Type()) {
			return errors.New("expected native of type " + dst.Type().String())
		}
		dst.Set(src)
	case env.Integer:
		dst.SetInt(v.Value)
	case env.Decimal:
		dst.SetFloat(v.Value)
	case env.String:
		dst.SetString(v.Value)
	default:
		return errors.New("cannot convert " + reflect.TypeOf(obj).String() + " to " + dst.Type().String())
	}
	return nil
}

func convGoToRye(ps *env.ProgramState, v any) env.Object {
	switch v := v.(type) {
	case nil:
		return *env.NewVoid()
	case bool:
		if v {
			return *env.NewInteger(1)
		}
		return *env.NewInteger(0)
	case int:
		return *env.NewInteger(int64(v))
	case int64:
		return *env.NewInteger(v)
	case float64:
		return *env.NewDecimal(v)
	case string:
		return *env.NewString(v)
	default:
		return *env.NewNative(ps.Idx, v, "Go("+reflect.TypeOf(v).String()+")")
	}
}

func callRyeFunc(ps *env.ProgramState, fn env.Object, args ...env.Object) env.Object {
	evaldo.CallFunctionArgsN(fn.(env.Function), ps, ps.Ctx, args...)
	return ps.Res
}

func ryeResults(ps *env.ProgramState, res env.Object, n int) []env.Object {
	if n == 1 {
		return []env.Object{res}
	}
	if blk, ok := res.(env.Block); ok && blk.Series.Len() == n {
		return blk.Series.GetAll()
	}
	panic("expected block of " + reflect.ValueOf(n).String() + " results")
}
"#;

fn render_generated(
    input: &EmitInput<'_>,
    report: &mut EmitReport,
    diagnostics: &mut Diagnostics,
) -> Result<String, CodegenError> {
    let mut cb = CodeBuilder::new();
    cb.line("// Code generated by weave. DO NOT EDIT.");
    cb.line("");
    cb.line("// You can add custom binding code to custom.go!");
    cb.line("");
    if let Some(flag) = input.dont_build_flag {
        cb.line_fmt(format_args!("//go:build !{}", flag))?;
        cb.line("");
    }
    cb.line_fmt(format_args!("package {}", input.package))?;
    cb.line("");

    let mut imports: BTreeSet<&str> = input.imports.iter().map(ModulePath::as_str).collect();
    imports.extend(RUNTIME_IMPORTS.iter().copied());
    cb.line("import (");
    cb.indent();
    for module in imports {
        let path = ModulePath::new(module);
        match (input.module_names.get(&path), input.declared_names.get(&path)) {
            (Some(unique), Some(declared)) if unique != declared => {
                cb.line_fmt(format_args!("{} {}", unique, go_string(module)))?
            }
            (Some(unique), None) if unique != path.base_name() => {
                cb.line_fmt(format_args!("{} {}", unique, go_string(module)))?
            }
            _ => cb.line(&go_string(module)),
        }
    }
    cb.dedent();
    cb.line(")");
    cb.line("");
    cb.append(PRELUDE);
    cb.line("");

    for generic in input.generic_impls {
        cb.append(&generic.code);
    }

    let mut exported_names: HashSet<String> = HashSet::new();
    for named in input.bindings {
        if !input.binding_list.is_exported(named.key()) {
            continue;
        }
        let func_name = to_snake_case(&named.name);
        if !exported_names.insert(func_name.clone()) {
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::Emit,
                named.key().as_str(),
                format!("exported wrapper ExportedFunc_{} already exists, skipped", func_name),
            ));
            continue;
        }
        cb.line_fmt(format_args!(
            "func ExportedFunc_{}(funcName string, ps *env.ProgramState, arg0, arg1, arg2, arg3, arg4 env.Object) env.Object {{",
            func_name
        ))?;
        cb.indent();
        cb.append(&named.binding.render_body("\" + funcName + \""));
        cb.dedent();
        cb.line("}");
        cb.line("");
    }

    cb.line("var builtinsGenerated = map[string]*env.Builtin{");
    cb.indent();
    for named in input.bindings {
        let enabled = input.binding_list.is_enabled(named.key());
        let count = report.by_category.entry(named.binding.category).or_default();
        count.total += 1;
        count.written += usize::from(enabled);
        report.total += 1;
        if !enabled {
            continue;
        }
        report.written += 1;

        if !named.binding.doc_comment.is_empty() {
            let source_name = &named.binding.source_name;
            // Method-like names show only the member part.
            let shown = named.name.split_once("//").map_or(named.name.as_str(), |(_, m)| m);
            for line in named.binding.doc_comment.lines() {
                let line = if source_name.is_empty() {
                    line.to_string()
                } else {
                    line.replace(source_name.as_str(), shown)
                };
                cb.line(format!("// {}", line).trim_end());
            }
        }
        cb.line_fmt(format_args!("{}: {{", go_string(&named.name)))?;
        cb.indent();
        cb.line_fmt(format_args!("Doc: {},", go_string(&named.binding.doc)))?;
        cb.line_fmt(format_args!("Argsn: {},", named.binding.argsn))?;
        cb.line("Fn: func(ps *env.ProgramState, arg0, arg1, arg2, arg3, arg4 env.Object) env.Object {");
        cb.indent();
        cb.append(&named.render_body());
        cb.dedent();
        cb.line("},");
        cb.dedent();
        cb.line("},");
    }
    cb.dedent();
    cb.line("}");

    Ok(cb.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_go_string_escapes() {
        assert_eq!(go_string("a \"b\"\n"), "\"a \\\"b\\\"\\n\"");
    }

    #[test]
    fn test_fingerprint_is_stable() {
        assert_eq!(fingerprint("abc"), fingerprint("abc"));
        assert_eq!(
            fingerprint(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
