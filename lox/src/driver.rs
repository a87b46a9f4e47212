//! Runs the front end over one script and renders what the CLI prints.

use std::fmt;
use std::io::{self, Read, Write};
use std::path::Path;

use syntax::{BindingTable, Diagnostic, ExprKind, Program, Reporter, parse_source, resolver};

/// Input data was incorrect (`EX_DATAERR` in sysexits.h).
pub const EX_DATAERR: i32 = 65;
/// An I/O error occurred (`EX_IOERR` in sysexits.h).
pub const EX_IOERR: i32 = 74;

#[derive(Debug, Clone, Copy, Default)]
pub struct Options {
    pub bindings: bool,
    pub dump_ast: bool,
}

#[derive(Debug)]
pub enum RunError {
    Io(io::Error),
    Diagnostics(Vec<Diagnostic>),
}

impl RunError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Io(_) => EX_IOERR,
            Self::Diagnostics(_) => EX_DATAERR,
        }
    }
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "failed to write output: {err}"),
            Self::Diagnostics(diagnostics) => {
                for (i, diagnostic) in diagnostics.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{diagnostic}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for RunError {}

impl From<io::Error> for RunError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

/// Read the script at `path`, or stdin when `path` is `None` or `-`.
pub fn read_source(path: Option<&Path>) -> io::Result<String> {
    match path {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path),
        _ => {
            let mut source = String::new();
            io::stdin().lock().read_to_string(&mut source)?;
            Ok(source)
        }
    }
}

/// Scan, parse and resolve `source`, writing whatever `options` asks for to
/// `out`.
pub fn run(source: &str, options: Options, out: &mut impl Write) -> Result<(), RunError> {
    let reporter = Reporter::new();
    let program = parse_source(source, &reporter);
    if reporter.had_error() {
        return Err(RunError::Diagnostics(reporter.diagnostics()));
    }
    if options.dump_ast {
        writeln!(out, "{:#?}", program.statements)?;
    }

    let Some(bindings) = resolver::resolve_with_reporter(&program, &reporter) else {
        return Err(RunError::Diagnostics(reporter.diagnostics()));
    };
    if options.bindings {
        for line in binding_lines(&program, &bindings) {
            writeln!(out, "{line}")?;
        }
    }
    Ok(())
}

/// One `line:column name -> distance` entry per resolved reference, in
/// source order.
pub fn binding_lines(program: &Program, bindings: &BindingTable) -> Vec<String> {
    let mut entries: Vec<_> = bindings
        .iter()
        .filter_map(|(id, distance)| {
            let token = match &program.arena.get(id).kind {
                ExprKind::Variable { name, .. } | ExprKind::Assign { name, .. } => name,
                ExprKind::This { keyword } | ExprKind::Super { keyword, .. } => keyword,
                _ => return None,
            };
            Some((token.span.start, &token.lexeme, distance))
        })
        .collect();
    entries.sort();
    entries
        .into_iter()
        .map(|(pos, name, distance)| format!("{pos} {name} -> {distance}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_to_string(source: &str, options: Options) -> Result<String, RunError> {
        let mut out = Vec::new();
        run(source, options, &mut out)?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[test]
    fn quiet_on_success() {
        let output = run_to_string("var a = 1; print a;", Options::default()).unwrap();
        assert!(output.is_empty());
    }

    #[test]
    fn prints_bindings_in_source_order() {
        let options = Options {
            bindings: true,
            ..Options::default()
        };
        let output = run_to_string(
            "var a = 1;\nfun f() {\n  print a;\n}\nf();\n",
            options,
        )
        .unwrap();
        assert_eq!(output, "3:9 a -> 1\n5:1 f -> 0\n");
    }

    #[test]
    fn dump_ast_prints_statements() {
        let options = Options {
            dump_ast: true,
            ..Options::default()
        };
        let output = run_to_string("print 1;", options).unwrap();
        assert!(output.starts_with("[\n    Print("));
    }

    #[test]
    fn resolve_error_exits_with_data_error() {
        let err = run_to_string("print nope;", Options::default()).unwrap_err();
        assert_eq!(err.exit_code(), EX_DATAERR);
        assert_eq!(
            err.to_string(),
            "[line 1] Error at 'nope': Couldn't resolve variable 'nope'."
        );
    }

    #[test]
    fn syntax_error_stops_before_resolution() {
        let err = run_to_string("print ;\nprint nope;", Options::default()).unwrap_err();
        match err {
            RunError::Diagnostics(diagnostics) => {
                assert_eq!(diagnostics.len(), 1);
                assert_eq!(diagnostics[0].stage, syntax::Stage::Parse);
            }
            other => panic!("expected diagnostics, got {other:?}"),
        }
    }

    #[test]
    fn missing_script_is_an_io_error() {
        let err = read_source(Some(Path::new("/definitely/not/here.lox"))).unwrap_err();
        assert_eq!(RunError::from(err).exit_code(), EX_IOERR);
    }
}
