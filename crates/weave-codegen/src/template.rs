//! Default synthesizer producing Go glue code for the Rye runtime
//!
//! Every binding is a builtin taking up to five runtime arguments. Arguments are
//! converted to host values, the symbol is called, and results are converted
//! back. Interface-typed parameters accept runtime values that are converted
//! through a generated adapter, which is requested as a generic implementation.

use tracing::trace;
use weave_core::naming::to_kebab_case;
use weave_core::symbols::{Func, Interface, Param, Struct};
use weave_core::{
    BindingCandidate, BindingKey, Category, Dependencies, Ident, RequiredGenericImpl, Symbol,
    TypeRef, NAME_PLACEHOLDER,
};

use crate::code_builder::CodeBuilder;
use crate::error::SynthError;
use crate::synth::{SynthContext, Synthesizer};

/// Builtins receive `arg0` through `arg4`.
pub const MAX_ARGS: usize = 5;

const UNSUPPORTED_BUILTINS: &[&str] = &["complex64", "complex128", "uintptr", "unsafe.Pointer"];

#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateSynthesizer;

impl TemplateSynthesizer {
    pub fn new() -> Self {
        Self
    }
}

/// Type, import and adapter bookkeeping for one synthesis call.
struct TypeRenderer<'c, 'a> {
    ctx: &'c SynthContext<'a>,
    deps: &'c mut Dependencies,
}

impl<'c, 'a> TypeRenderer<'c, 'a> {
    fn render(&mut self, ty: &TypeRef) -> Result<String, SynthError> {
        Ok(match ty {
            TypeRef::Builtin(name) => {
                if UNSUPPORTED_BUILTINS.contains(&name.as_str()) {
                    return Err(SynthError::UnsupportedType(name.clone()));
                }
                name.clone()
            }
            TypeRef::Named(id) => self.qualified(id)?,
            TypeRef::Pointer(inner) => format!("*{}", self.render(inner)?),
            TypeRef::Slice(inner) => format!("[]{}", self.render(inner)?),
            TypeRef::Map { key, value } => {
                format!("map[{}]{}", self.render(key)?, self.render(value)?)
            }
            TypeRef::Chan(_) => return Err(SynthError::UnsupportedType(ty.to_string())),
            TypeRef::Func { params, results } => {
                let params = self.render_list(params)?;
                match results.len() {
                    0 => format!("func({})", params),
                    1 => format!("func({}) {}", params, self.render(&results[0])?),
                    _ => format!("func({}) ({})", params, self.render_list(results)?),
                }
            }
        })
    }

    fn render_list(&mut self, types: &[TypeRef]) -> Result<String, SynthError> {
        let rendered = types
            .iter()
            .map(|t| self.render(t))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rendered.join(", "))
    }

    /// `qual.Name`, importing the declaring module.
    fn qualified(&mut self, id: &Ident) -> Result<String, SynthError> {
        if !self.ctx.table.knows_type(id) {
            return Err(SynthError::UnknownType(id.clone()));
        }
        if self.ctx.table.type_is_internal(id) {
            return Err(SynthError::UnsupportedType(format!("internal type {}", id)));
        }
        let qual = self.module_name(id)?;
        self.deps.add_import(id.module.clone());
        Ok(format!("{}.{}", qual, id.name))
    }

    fn module_name(&self, id: &Ident) -> Result<String, SynthError> {
        self.ctx
            .module_names
            .get(&id.module)
            .map(str::to_string)
            .ok_or_else(|| SynthError::MissingModuleName(id.module.clone()))
    }

    /// The interface a parameter type names directly, if any.
    fn interface_of(&self, ty: &TypeRef) -> Option<&'a Interface> {
        match ty {
            TypeRef::Named(id) => self.ctx.table.interface(id),
            _ => None,
        }
    }

    /// Conversion of `arg{n}` into `arg{n}Val`, requesting an adapter for
    /// interface-typed parameters.
    fn convert_arg(&mut self, cb: &mut CodeBuilder, n: usize, ty: &TypeRef) -> Result<(), SynthError> {
        let go_ty = self.render(ty)?;
        if let Some(iface) = self.interface_of(ty) {
            let adapter = adapter_fn(&self.module_name(&iface.name)?, &iface.name.name);
            let request = RequiredGenericImpl::for_interface(&iface.name);
            if self.deps.require_generic_impl(request) {
                trace!("requested generic impl {}", iface.name);
            }
            cb.line(&format!("arg{n}Val, err := {adapter}(ps, arg{n})"));
            cb.line("if err != nil {");
        } else {
            cb.line(&format!("var arg{n}Val {go_ty}"));
            cb.line(&format!("if err := convRyeToGo(ps, arg{n}, &arg{n}Val); err != nil {{"));
        }
        cb.indent();
        cb.line("ps.FailureFlag = true");
        cb.line(&format!(
            "return env.NewError(\"{}: arg {}: \" + err.Error())",
            NAME_PLACEHOLDER,
            n + 1
        ));
        cb.dedent();
        cb.line("}");
        Ok(())
    }
}

fn adapter_fn(qual: &str, iface: &str) -> String {
    format!("ryeToIface_{}_{}", qual, iface)
}

fn adapter_type(qual: &str, iface: &str) -> String {
    format!("genericImpl_{}_{}", qual, iface)
}

/// First line of a doc comment, or a generated description.
fn doc_line(doc: &str, fallback: impl FnOnce() -> String) -> String {
    doc.lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(str::to_string)
        .unwrap_or_else(fallback)
}

/// Emits the return path for `call`, which yields `results`.
fn emit_call(cb: &mut CodeBuilder, call: &str, results: &[TypeRef], void_return: &str) {
    let returns_error = matches!(results.last(), Some(TypeRef::Builtin(b)) if b == "error");
    let values = if returns_error {
        results.len() - 1
    } else {
        results.len()
    };

    let mut names: Vec<String> = (0..values).map(|i| format!("res{}", i)).collect();
    if returns_error {
        names.push("err".to_string());
    }

    if names.is_empty() {
        cb.line(call);
    } else {
        cb.line(&format!("{} := {}", names.join(", "), call));
    }
    if returns_error {
        cb.line("if err != nil {");
        cb.indent();
        cb.line("ps.FailureFlag = true");
        cb.line(&format!("return env.NewError(\"{}: \" + err.Error())", NAME_PLACEHOLDER));
        cb.dedent();
        cb.line("}");
    }

    match values {
        0 => cb.line(&format!("return {}", void_return)),
        1 => cb.line("return convGoToRye(ps, res0)"),
        n => {
            let items: Vec<String> = (0..n).map(|i| format!("convGoToRye(ps, res{})", i)).collect();
            cb.line(&format!(
                "return *env.NewBlock(*env.NewTSeries([]env.Object{{{}}}))",
                items.join(", ")
            ));
        }
    }
}

impl TemplateSynthesizer {
    fn call_binding(
        &self,
        symbol: &Symbol<'_>,
        func: &Func,
        receiver: Option<&TypeRef>,
        ctx: &SynthContext<'_>,
        deps: &mut Dependencies,
    ) -> Result<(String, usize), SynthError> {
        let argsn = func.params.len() + usize::from(receiver.is_some());
        if argsn > MAX_ARGS {
            return Err(SynthError::TooManyArguments {
                count: argsn,
                max: MAX_ARGS,
            });
        }

        let mut renderer = TypeRenderer { ctx, deps };
        let mut cb = CodeBuilder::new();
        let mut n = 0;
        if let Some(recv) = receiver {
            cb.line(&format!("var arg0Val {}", renderer.render(recv)?));
            cb.line("if err := convRyeToGo(ps, arg0, &arg0Val); err != nil {");
            cb.indent();
            cb.line("ps.FailureFlag = true");
            cb.line(&format!("return env.NewError(\"{}: arg 1: \" + err.Error())", NAME_PLACEHOLDER));
            cb.dedent();
            cb.line("}");
            n = 1;
        }
        let mut args = Vec::with_capacity(func.params.len());
        for (i, param) in func.params.iter().enumerate() {
            renderer.convert_arg(&mut cb, n, &param.ty)?;
            let spread = if func.variadic && i + 1 == func.params.len() { "..." } else { "" };
            args.push(format!("arg{}Val{}", n, spread));
            n += 1;
        }
        for ty in &func.results {
            renderer.render(ty)?;
        }

        let target = match receiver {
            Some(_) => "arg0Val".to_string(),
            None => {
                let qual = renderer.module_name(&func.name)?;
                renderer.deps.add_import(func.name.module.clone());
                qual
            }
        };
        let call = format!("{}.{}({})", target, func.name.name, args.join(", "));
        let void_return = if receiver.is_some() { "arg0" } else { "*env.NewVoid()" };
        emit_call(&mut cb, &call, &func.results, void_return);

        trace!("synthesized {}", symbol);
        Ok((cb.finish(), argsn))
    }

    fn candidate(
        &self,
        symbol: &Symbol<'_>,
        member: &str,
        category: Category,
        doc: (&str, String),
        source_name: &str,
        (body, argsn): (String, usize),
        ctx: &SynthContext<'_>,
    ) -> Result<BindingCandidate, SynthError> {
        let key = BindingKey::new(symbol.identity());
        let module = symbol.module().clone();
        let name_candidates = ctx.policy.name_candidates(
            &module,
            member,
            ctx.binding_list.rename(&key),
            ctx.module_names,
        )?;
        let (doc_comment, fallback) = doc;
        Ok(BindingCandidate {
            priority: ctx.policy.priority_of(&module),
            doc: doc_line(doc_comment, || fallback),
            doc_comment: doc_comment.to_string(),
            source_name: source_name.to_string(),
            key,
            module,
            name_candidates,
            category,
            argsn,
            body,
        })
    }

    fn accessor_body(
        &self,
        owner: &Struct,
        field: &weave_core::symbols::Field,
        setter: bool,
        ctx: &SynthContext<'_>,
        deps: &mut Dependencies,
    ) -> Result<(String, usize), SynthError> {
        let mut renderer = TypeRenderer { ctx, deps };
        let recv = TypeRef::Pointer(Box::new(TypeRef::Named(owner.name.clone())));
        let mut cb = CodeBuilder::new();
        cb.line(&format!("var arg0Val {}", renderer.render(&recv)?));
        cb.line("if err := convRyeToGo(ps, arg0, &arg0Val); err != nil {");
        cb.indent();
        cb.line("ps.FailureFlag = true");
        cb.line(&format!("return env.NewError(\"{}: arg 1: \" + err.Error())", NAME_PLACEHOLDER));
        cb.dedent();
        cb.line("}");
        if setter {
            renderer.convert_arg(&mut cb, 1, &field.ty)?;
            cb.line(&format!("arg0Val.{} = arg1Val", field.name));
            cb.line("return arg0");
            Ok((cb.finish(), 2))
        } else {
            renderer.render(&field.ty)?;
            cb.line(&format!("return convGoToRye(ps, arg0Val.{})", field.name));
            Ok((cb.finish(), 1))
        }
    }
}

impl Synthesizer for TemplateSynthesizer {
    fn synthesize(
        &self,
        symbol: Symbol<'_>,
        ctx: &SynthContext<'_>,
        deps: &mut Dependencies,
    ) -> Result<BindingCandidate, SynthError> {
        // Work on a scratch copy so a failing symbol leaves no imports or
        // adapter requests behind.
        let mut scratch = deps.clone();
        let candidate = match symbol {
            Symbol::InterfaceMethod { iface, method } => {
                let recv = TypeRef::Named(iface.name.clone());
                let member = format!(
                    "{}//{}",
                    to_kebab_case(&iface.name.name),
                    to_kebab_case(&method.name.name)
                );
                let body = self.call_binding(&symbol, method, Some(&recv), ctx, &mut scratch)?;
                self.candidate(
                    &symbol,
                    &member,
                    Category::InterfaceMethod,
                    (&method.doc, format!("Calls {}.{} on a native.", iface.name, method.name.name)),
                    &method.name.name,
                    body,
                    ctx,
                )?
            }
            Symbol::Func(func) => match &func.recv {
                Some(recv) => {
                    let named = TypeRef::Named(recv.ty.clone());
                    let recv_ty = if recv.pointer {
                        TypeRef::Pointer(Box::new(named))
                    } else {
                        named
                    };
                    let member = format!(
                        "{}//{}",
                        to_kebab_case(&recv.ty.name),
                        to_kebab_case(&func.name.name)
                    );
                    let body = self.call_binding(&symbol, func, Some(&recv_ty), ctx, &mut scratch)?;
                    self.candidate(
                        &symbol,
                        &member,
                        Category::Method,
                        (&func.doc, format!("Calls method {}.", func.identity())),
                        &func.name.name,
                        body,
                        ctx,
                    )?
                }
                None => {
                    let member = ctx.policy.function_name(&func.name.name);
                    let body = self.call_binding(&symbol, func, None, ctx, &mut scratch)?;
                    self.candidate(
                        &symbol,
                        &member,
                        Category::Function,
                        (&func.doc, format!("Calls function {}.", func.name)),
                        &func.name.name,
                        body,
                        ctx,
                    )?
                }
            },
            Symbol::FieldAccessor {
                owner,
                field,
                setter,
            } => {
                let member = format!(
                    "{}//{}{}",
                    to_kebab_case(&owner.name.name),
                    to_kebab_case(&field.name),
                    if setter { "!" } else { "?" }
                );
                let (category, verb) = if setter {
                    (Category::Setter, "Sets")
                } else {
                    (Category::Getter, "Gets")
                };
                let body = self.accessor_body(owner, field, setter, ctx, &mut scratch)?;
                self.candidate(
                    &symbol,
                    &member,
                    category,
                    (&field.doc, format!("{} field {} of {}.", verb, field.name, owner.name)),
                    &field.name,
                    body,
                    ctx,
                )?
            }
            Symbol::Value(value) => {
                let mut renderer = TypeRenderer {
                    ctx,
                    deps: &mut scratch,
                };
                renderer.render(&value.ty)?;
                let qual = renderer.module_name(&value.name)?;
                renderer.deps.add_import(value.name.module.clone());
                let body = format!("return convGoToRye(ps, {}.{})\n", qual, value.name.name);
                let kind = if value.constant { "constant" } else { "variable" };
                self.candidate(
                    &symbol,
                    &to_kebab_case(&value.name.name),
                    Category::Value,
                    (&value.doc, format!("Returns {} {}.", kind, value.name)),
                    &value.name.name,
                    (body, 0),
                    ctx,
                )?
            }
            Symbol::Constructor(strukt) => {
                let mut renderer = TypeRenderer {
                    ctx,
                    deps: &mut scratch,
                };
                let ty = renderer.qualified(&strukt.name)?;
                let body = format!("return convGoToRye(ps, &{}{{}})\n", ty);
                let constructor = format!("New{}", strukt.name.name);
                self.candidate(
                    &symbol,
                    &ctx.policy.function_name(&constructor),
                    Category::Constructor,
                    ("", format!("Creates a new zero-valued {}.", strukt.name)),
                    &constructor,
                    (body, 0),
                    ctx,
                )?
            }
        };

        *deps = scratch;
        Ok(candidate)
    }

    fn synthesize_generic_impl(
        &self,
        request: &RequiredGenericImpl,
        ctx: &SynthContext<'_>,
        deps: &mut Dependencies,
    ) -> Result<String, SynthError> {
        let iface = ctx
            .table
            .interface(&request.interface)
            .ok_or_else(|| SynthError::UnknownInterface(request.interface.clone()))?;

        let mut renderer = TypeRenderer { ctx, deps };
        let iface_ty = renderer.qualified(&iface.name)?;
        let qual = renderer.module_name(&iface.name)?;
        let impl_ty = adapter_type(&qual, &iface.name.name);

        let mut cb = CodeBuilder::new();
        cb.line(&format!(
            "// {} implements {} by calling runtime functions.",
            impl_ty, iface_ty
        ));
        cb.line(&format!("type {} struct {{", impl_ty));
        cb.indent();
        cb.line("ps  *env.ProgramState");
        cb.line("fns map[string]env.Object");
        cb.dedent();
        cb.line("}");
        cb.line("");

        for method in &iface.methods {
            method_adapter(&mut renderer, &mut cb, &impl_ty, method)?;
        }

        cb.line(&format!(
            "func {}(ps *env.ProgramState, obj env.Object) ({}, error) {{",
            adapter_fn(&qual, &iface.name.name),
            iface_ty
        ));
        cb.indent();
        cb.line("if nat, ok := obj.(env.Native); ok {");
        cb.indent();
        cb.line(&format!("if v, ok := nat.Value.({}); ok {{", iface_ty));
        cb.indent();
        cb.line("return v, nil");
        cb.dedent();
        cb.line("}");
        cb.dedent();
        cb.line("}");
        cb.line("dict, ok := obj.(env.Dict)");
        cb.line("if !ok {");
        cb.indent();
        cb.line(&format!(
            "return nil, errors.New(\"{}: expected native or dict of functions\")",
            NAME_PLACEHOLDER
        ));
        cb.dedent();
        cb.line("}");
        cb.line(&format!(
            "impl := &{}{{ps: ps, fns: make(map[string]env.Object, len(dict.Data))}}",
            impl_ty
        ));
        cb.line("for k, v := range dict.Data {");
        cb.indent();
        cb.line("if fn, ok := v.(env.Object); ok {");
        cb.indent();
        cb.line("impl.fns[k] = fn");
        cb.dedent();
        cb.line("}");
        cb.dedent();
        cb.line("}");
        cb.line("return impl, nil");
        cb.dedent();
        cb.line("}");
        cb.line("");

        Ok(cb.finish())
    }
}

/// One method of an adapter type: forwards to the runtime function stored under
/// the kebab-cased method name.
fn method_adapter(
    renderer: &mut TypeRenderer<'_, '_>,
    cb: &mut CodeBuilder,
    impl_ty: &str,
    method: &Func,
) -> Result<(), SynthError> {
    let mut params = Vec::with_capacity(method.params.len());
    for (i, Param { ty, .. }) in method.params.iter().enumerate() {
        let rendered = renderer.render(ty)?;
        if let Some(iface) = renderer.interface_of(ty) {
            let request = RequiredGenericImpl::for_interface(&iface.name);
            renderer.deps.require_generic_impl(request);
        }
        let variadic = method.variadic && i + 1 == method.params.len();
        params.push(if variadic {
            format!("a{} ...{}", i, rendered.trim_start_matches("[]"))
        } else {
            format!("a{} {}", i, rendered)
        });
    }
    let results = renderer.render_list(&method.results)?;
    let signature = match method.results.len() {
        0 => String::new(),
        1 => format!(" {}", results),
        _ => format!(" ({})", results),
    };
    let fn_name = to_kebab_case(&method.name.name);

    cb.line(&format!(
        "func (impl *{}) {}({}){} {{",
        impl_ty,
        method.name.name,
        params.join(", "),
        signature
    ));
    cb.indent();
    cb.line(&format!("fn, ok := impl.fns[\"{}\"]", fn_name));
    cb.line("if !ok {");
    cb.indent();
    cb.line(&format!("panic(\"{}: missing function {}\")", NAME_PLACEHOLDER, fn_name));
    cb.dedent();
    cb.line("}");
    let args: Vec<String> = (0..method.params.len())
        .map(|i| format!("convGoToRye(impl.ps, a{})", i))
        .collect();
    let call = format!("callRyeFunc(impl.ps, fn{}{})", if args.is_empty() { "" } else { ", " }, args.join(", "));

    if method.results.is_empty() {
        cb.line(&call);
    } else {
        cb.line(&format!("res := ryeResults(impl.ps, {}, {})", call, method.results.len()));
        let mut names = Vec::with_capacity(method.results.len());
        for (i, ty) in method.results.iter().enumerate() {
            cb.line(&format!("var r{} {}", i, renderer.render(ty)?));
            cb.line(&format!("if err := convRyeToGo(impl.ps, res[{0}], &r{0}); err != nil {{", i));
            cb.indent();
            cb.line(&format!("panic(\"{}: \" + err.Error())", NAME_PLACEHOLDER));
            cb.dedent();
            cb.line("}");
            names.push(format!("r{}", i));
        }
        cb.line(&format!("return {}", names.join(", ")));
    }
    cb.dedent();
    cb.line("}");
    cb.line("");
    Ok(())
}
