//! # Syntax
//!
//! Front end of the Lox interpreter: a streaming lexer, a recursive-descent
//! parser and the static resolution pass that runs before evaluation.
//!
//! ## Architecture
//!
//! ```text
//!  impl Read (file, stdin, &[u8], …)
//!      │
//!      ▼
//!  ┌────────┐  Token stream  ┌────────┐  Program   ┌──────────┐  BindingTable
//!  │ Lexer  │ ─────────────▶ │ Parser │ ─────────▶ │ Resolver │ ─────────────▶
//!  └────────┘                └────────┘            └──────────┘
//!                      diagnostics ─▶ Reporter ◀─ diagnostics
//! ```
//!
//! ```rust
//! use syntax::{Reporter, parse_source, resolver};
//!
//! let reporter = Reporter::new();
//! let program = parse_source("fun f() { var x = 1; return x; }", &reporter);
//! assert!(!reporter.had_error());
//!
//! match resolver::resolve_with_reporter(&program, &reporter) {
//!     Some(bindings) => println!("{} binding(s)", bindings.len()),
//!     None => {
//!         for diagnostic in reporter.diagnostics() {
//!             eprintln!("{diagnostic}");
//!         }
//!     }
//! }
//! ```

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod reporter;
pub mod resolver;
pub mod span;
pub mod token;

pub use ast::{
    AstArena, ClassDecl, ClassKind, DeclKind, ExprId, ExprKind, ExprNode,
    FunctionDecl, FunctionKind, Literal, Program, Stmt,
};
pub use lexer::Lexer;
pub use parser::{ParseError, Parser, parse_source};
pub use reporter::{Diagnostic, Reporter, Stage};
pub use resolver::{BindingTable, ResolveError, ResolveErrorKind, Resolver};
pub use span::{Pos, Span};
pub use token::{Token, TokenKind};
