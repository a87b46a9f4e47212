// Shared helpers for the integration tests.

#![allow(dead_code)]

use syntax::{BindingTable, Diagnostic, ExprKind, Program, Reporter, parse_source, resolver};

pub struct Outcome {
    pub program: Program,
    pub bindings: Option<BindingTable>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Run the whole front end over `source`.
pub fn run(source: &str) -> Outcome {
    let reporter = Reporter::new();
    let program = parse_source(source, &reporter);
    let bindings = resolver::resolve_with_reporter(&program, &reporter);
    Outcome {
        program,
        bindings,
        diagnostics: reporter.diagnostics(),
    }
}

/// `(spelling, distance)` for every binding, in source order.
pub fn resolved_names(outcome: &Outcome) -> Vec<(String, usize)> {
    let Some(bindings) = &outcome.bindings else {
        return Vec::new();
    };
    let mut names: Vec<_> = bindings
        .iter()
        .filter_map(|(id, distance)| {
            let token = match &outcome.program.arena.get(id).kind {
                ExprKind::Variable { name, .. } | ExprKind::Assign { name, .. } => name,
                ExprKind::This { keyword } | ExprKind::Super { keyword, .. } => keyword,
                _ => return None,
            };
            Some((token.span.start, token.lexeme.clone(), distance))
        })
        .collect();
    names.sort();
    names
        .into_iter()
        .map(|(_, lexeme, distance)| (lexeme, distance))
        .collect()
}

pub fn messages(outcome: &Outcome) -> Vec<String> {
    outcome.diagnostics.iter().map(ToString::to_string).collect()
}
