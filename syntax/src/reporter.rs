//! Error reporting shared by every pipeline stage.
//!
//! The scanner, parser and resolver all report into one [`Reporter`]. The
//! front end owns it and asks [`Reporter::had_error`] before handing the
//! program to the evaluator.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::span::Span;

/// Pipeline stage a diagnostic came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Scan,
    Parse,
    Resolve,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Scan => "scan",
            Self::Parse => "parse",
            Self::Resolve => "resolve",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub stage: Stage,
    pub span: Span,
    /// Display text of the offending token; empty at end of input.
    pub lexeme: String,
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.lexeme.is_empty() {
            write!(f, "[line {}] Error at end: {}", self.span.line(), self.message)
        } else {
            write!(
                f,
                "[line {}] Error at '{}': {}",
                self.span.line(),
                self.lexeme,
                self.message
            )
        }
    }
}

/// Collects diagnostics and the "had error" flags the front end checks.
///
/// Shared by reference across stages, so it uses interior mutability and
/// is `Send + Sync`.
#[derive(Debug, Default)]
pub struct Reporter {
    diagnostics: Mutex<Vec<Diagnostic>>,
    had_error: AtomicBool,
    had_runtime_error: AtomicBool,
}

impl Reporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&self, stage: Stage, span: Span, lexeme: &str, message: &str) {
        let diagnostic = Diagnostic {
            stage,
            span,
            lexeme: lexeme.to_string(),
            message: message.to_string(),
        };
        log::debug!("{stage} error reported: {diagnostic}");
        self.diagnostics.lock().push(diagnostic);
        self.had_error.store(true, Ordering::SeqCst);
    }

    /// Set by the evaluator when execution fails. The evaluator prints its
    /// own runtime message; only the flag is kept here.
    pub fn set_runtime_error(&self) {
        self.had_runtime_error.store(true, Ordering::SeqCst);
    }

    pub fn had_error(&self) -> bool {
        self.had_error.load(Ordering::SeqCst)
    }

    pub fn had_runtime_error(&self) -> bool {
        self.had_runtime_error.load(Ordering::SeqCst)
    }

    /// Snapshot of everything reported so far, in report order.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.lock().clone()
    }

    /// Forget all diagnostics and flags, e.g. between REPL lines.
    pub fn reset(&self) {
        self.diagnostics.lock().clear();
        self.had_error.store(false, Ordering::SeqCst);
        self.had_runtime_error.store(false, Ordering::SeqCst);
    }
}
