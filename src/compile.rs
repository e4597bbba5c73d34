//! Program entry points.
//!
//! Parses a module with oxc, recognizes top-level
//! `const Name = component(...)` definitions, and drives the four passes per
//! component: build, dependency extraction (inline during build), prune,
//! generate. One component's fatal error never stops its siblings.

#[cfg(feature = "napi")]
use napi_derive::napi;
use oxc_allocator::Allocator;
use oxc_ast::ast::{CallExpression, Declaration, Expression, Statement, VariableDeclaration};
use oxc_parser::Parser;
use oxc_span::SourceType;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::bits::prune;
use crate::builder::BuildCx;
use crate::cache::CompileCache;
use crate::codegen::{generate, CompiledComponent};
use crate::diagnostics::{CompilerError, Diagnostic, ERR_SYNTAX};
use crate::ir::{ComponentArena, ComponentId};

#[derive(Debug, Clone)]
pub struct CompileOptions {
    pub file_path: String,
    pub use_cache: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            file_path: "component.jsx".to_string(),
            use_cache: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompileInput {
    pub file_path: String,
    pub source: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramOutput {
    pub components: Vec<CompiledComponent>,
    pub errors: Vec<CompilerError>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Analyzed but not yet generated program; the unit-testing seam.
pub struct Analysis {
    pub arena: ComponentArena,
    pub roots: Vec<ComponentId>,
    pub errors: Vec<CompilerError>,
    pub diagnostics: Vec<Diagnostic>,
}

fn source_type() -> SourceType {
    SourceType::default()
        .with_typescript(true)
        .with_module(true)
        .with_jsx(true)
}

/// Build and prune every top-level component of `source`.
pub fn analyze(source: &str, file_path: &str) -> Analysis {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, source_type()).parse();

    if !ret.errors.is_empty() {
        let message = format!("Invalid module syntax: {:?}", ret.errors[0]);
        return Analysis {
            arena: ComponentArena::new(),
            roots: Vec::new(),
            errors: vec![CompilerError::new(ERR_SYNTAX, &message, file_path, 1, 1)],
            diagnostics: Vec::new(),
        };
    }

    let mut cx = BuildCx::new(source, file_path);
    let mut roots = Vec::new();
    let mut errors = Vec::new();

    for stmt in &ret.program.body {
        let decl = match stmt {
            Statement::VariableDeclaration(decl) => Some(&**decl),
            Statement::ExportNamedDeclaration(export) => match &export.declaration {
                Some(Declaration::VariableDeclaration(decl)) => Some(&**decl),
                _ => None,
            },
            _ => None,
        };
        let Some(decl) = decl else { continue };

        for (name, ctor) in component_constructors(decl) {
            match cx.build_root(&name, ctor) {
                Ok(id) => roots.push(id),
                Err(err) => errors.push(err),
            }
        }
    }

    for &root in &roots {
        prune(&mut cx.arena, root);
    }

    Analysis {
        arena: cx.arena,
        roots,
        errors,
        diagnostics: cx.diagnostics,
    }
}

fn component_constructors<'a, 'b>(
    decl: &'b VariableDeclaration<'a>,
) -> Vec<(String, &'b Expression<'a>)> {
    let mut out = Vec::new();
    for declarator in &decl.declarations {
        let Some(Expression::CallExpression(call)) = &declarator.init else {
            continue;
        };
        if !is_component_call(call) {
            continue;
        }
        let oxc_ast::ast::BindingPattern::BindingIdentifier(ident) = &declarator.id else {
            continue;
        };
        if let Some(ctor) = call.arguments.first().and_then(|arg| arg.as_expression()) {
            out.push((ident.name.to_string(), ctor));
        }
    }
    out
}

fn is_component_call(call: &CallExpression<'_>) -> bool {
    matches!(&call.callee, Expression::Identifier(ident) if ident.name == "component")
}

/// Compile every top-level component of one source file.
pub fn compile_program(source: &str, options: &CompileOptions) -> ProgramOutput {
    let cache = if options.use_cache {
        let cache = CompileCache::new();
        if let Some(hit) = cache.get(&options.file_path, source) {
            return hit;
        }
        Some(cache)
    } else {
        None
    };

    let analysis = analyze(source, &options.file_path);
    let components = analysis
        .roots
        .iter()
        .map(|&id| generate(&analysis.arena, id, source))
        .collect();

    let output = ProgramOutput {
        components,
        errors: analysis.errors,
        diagnostics: analysis.diagnostics,
    };

    if let Some(cache) = cache {
        cache.set(&options.file_path, source, output.clone());
    }
    output
}

/// Compile independent source files in parallel; one allocator and one arena
/// per file, no shared mutable state.
pub fn compile_many(inputs: &[CompileInput]) -> Vec<ProgramOutput> {
    inputs
        .par_iter()
        .map(|input| {
            compile_program(
                &input.source,
                &CompileOptions {
                    file_path: input.file_path.clone(),
                    use_cache: false,
                },
            )
        })
        .collect()
}

#[cfg(feature = "napi")]
#[napi]
pub fn compile_program_native(source: String, file_path: String) -> String {
    let output = compile_program(
        &source,
        &CompileOptions {
            file_path,
            use_cache: true,
        },
    );
    serde_json::to_string(&output).unwrap_or_else(|_| "{}".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::ERR_SYNTAX;

    #[test]
    fn test_syntax_error_surfaces_as_structural_error() {
        let output = compile_program("const = ;", &CompileOptions::default());
        assert_eq!(output.errors.len(), 1);
        assert_eq!(output.errors[0].code, ERR_SYNTAX);
        assert!(output.components.is_empty());
    }

    #[test]
    fn test_module_without_components_compiles_to_nothing() {
        let output = compile_program("export const n = 1;", &CompileOptions::default());
        assert!(output.components.is_empty());
        assert!(output.errors.is_empty());
    }

    #[test]
    fn test_compile_many_isolates_failures_per_file() {
        let inputs = vec![
            CompileInput {
                file_path: "ok.jsx".to_string(),
                source: "export const Ok = component(() => { let n = 0; return <p>{n}</p>; });"
                    .to_string(),
            },
            CompileInput {
                file_path: "broken.jsx".to_string(),
                source: "export const Broken = component((props) => { return <p />; });"
                    .to_string(),
            },
        ];
        let outputs = compile_many(&inputs);
        assert_eq!(outputs.len(), 2);
        assert_eq!(outputs[0].components.len(), 1);
        assert!(outputs[0].errors.is_empty());
        assert!(outputs[1].components.is_empty());
        assert_eq!(outputs[1].errors.len(), 1);
    }
}
