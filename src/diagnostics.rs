//! Diagnostics for the Pulse compiler.
//!
//! Every surfaced problem carries a stable code, the guarantee it protects,
//! and a source position. Structural errors (`P-ERR-*`) are fatal for the
//! enclosing component only; warnings (`P-WARN-*`) never stop compilation.

#[cfg(feature = "napi")]
use napi_derive::napi;
use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════════════════════════
// DIAGNOSTIC CODES
// ═══════════════════════════════════════════════════════════════════════════════

pub const ERR_SYNTAX: &str = "P-ERR-SYNTAX-001";
pub const ERR_PARAM_NOT_PATTERN: &str = "P-ERR-PARAM-001";
pub const ERR_PARAM_REST: &str = "P-ERR-PARAM-002";
pub const ERR_MACRO_ARG: &str = "P-ERR-MACRO-001";
pub const ERR_BIT_OVERFLOW: &str = "P-ERR-BITS-001";
pub const WARN_SELF_DEPENDENCY: &str = "P-WARN-DEP-001";
pub const WARN_UNRESOLVED_REF: &str = "P-WARN-SCOPE-001";

fn get_guarantee(code: &str) -> &'static str {
    match code {
        ERR_SYNTAX => "Component sources parse as JavaScript/JSX modules.",
        ERR_PARAM_NOT_PATTERN => {
            "The first component parameter is an object destructuring pattern."
        }
        ERR_PARAM_REST => "Rest elements in a props pattern bind a plain identifier.",
        ERR_MACRO_ARG => "Lifecycle and watch macros receive a function argument.",
        ERR_BIT_OVERFLOW => "A component tree declares at most 64 reactive bindings.",
        WARN_SELF_DEPENDENCY => {
            "A statement never schedules itself; reads of a binding it writes are dropped."
        }
        WARN_UNRESOLVED_REF => {
            "Identifiers that resolve to no reactive binding are treated as non-reactive."
        }
        _ => "Unknown invariant.",
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPILER ERROR
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "napi", napi(object))]
pub struct CompilerError {
    pub code: String,
    pub message: String,
    pub guarantee: String,
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub hints: Vec<String>,
}

impl CompilerError {
    pub fn new(code: &str, message: &str, file: &str, line: u32, column: u32) -> Self {
        Self::with_hints(code, message, file, line, column, vec![])
    }

    pub fn with_hints(
        code: &str,
        message: &str,
        file: &str,
        line: u32,
        column: u32,
        hints: Vec<String>,
    ) -> Self {
        CompilerError {
            code: code.to_string(),
            message: message.to_string(),
            guarantee: get_guarantee(code).to_string(),
            file: file.to_string(),
            line,
            column,
            hints,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

/// Non-fatal finding. Compilation of the enclosing component continues.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub code: String,
    pub severity: Severity,
    pub message: String,
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl Diagnostic {
    pub fn warning(code: &str, message: &str, file: &str, line: u32, column: u32) -> Self {
        Diagnostic {
            code: code.to_string(),
            severity: Severity::Warning,
            message: message.to_string(),
            file: file.to_string(),
            line,
            column,
        }
    }
}

/// 1-based line/column of a byte offset, the position scheme every
/// diagnostic in this crate uses.
pub fn line_col(source: &str, offset: u32) -> (u32, u32) {
    let offset = (offset as usize).min(source.len());
    let mut line = 1u32;
    let mut col = 1u32;
    for ch in source[..offset].chars() {
        if ch == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }
    (line, col)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_col() {
        let src = "ab\ncd\nef";
        assert_eq!(line_col(src, 0), (1, 1));
        assert_eq!(line_col(src, 1), (1, 2));
        assert_eq!(line_col(src, 3), (2, 1));
        assert_eq!(line_col(src, 7), (3, 2));
    }

    #[test]
    fn test_error_carries_guarantee() {
        let err = CompilerError::new(ERR_PARAM_NOT_PATTERN, "bad param", "a.js", 1, 1);
        assert_eq!(err.code, ERR_PARAM_NOT_PATTERN);
        assert!(err.guarantee.contains("destructuring"));
    }
}
