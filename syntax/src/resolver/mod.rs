//! Static resolution pass.
//!
//! Runs once between parsing and evaluation. For every variable occurrence
//! it computes how many scopes lie between the occurrence and the
//! declaration it refers to, and it rejects programs that break the
//! context rules:
//!
//! - a variable read in its own initializer,
//! - the same name and declaration kind twice in one scope,
//! - a name bound in no enclosing scope (there is no implicit global),
//! - `this` outside a class, `super` outside a subclass,
//! - `return`, `break` or `continue` outside a function,
//! - a value returned from `init`,
//! - a class inheriting from itself.
//!
//! The first violation ends the pass. The whole program is wrapped in one
//! scope so top-level declarations resolve like any other.
//!
//! ```rust
//! use syntax::{Reporter, parse_source, resolver};
//!
//! let reporter = Reporter::new();
//! let program = parse_source("var a = 1; { print a; }", &reporter);
//! let bindings = resolver::resolve(&program).unwrap();
//! assert_eq!(bindings.iter().map(|(_, d)| d).collect::<Vec<_>>(), vec![1]);
//! ```

mod bindings;
mod error;
mod scope;

#[cfg(test)]
mod tests;

pub use bindings::BindingTable;
pub use error::{ErrorCategory, ResolveError, ResolveErrorKind};
pub use scope::{Binding, DeclKey, ScopeStack};

use crate::ast::{
    AstArena, ClassDecl, ClassKind, DeclKind, ExprId, ExprKind, FunctionDecl,
    FunctionKind, Program, Stmt,
};
use crate::reporter::{Reporter, Stage};
use crate::token::Token;

/// Name of the method that acts as a class constructor.
pub const INITIALIZER_NAME: &str = "init";

/// The function and class kinds enclosing the node being resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Context {
    pub function: FunctionKind,
    pub class: ClassKind,
}

pub struct Resolver<'a> {
    arena: &'a AstArena,
    scopes: ScopeStack,
    bindings: BindingTable,
    context: Context,
}

impl<'a> Resolver<'a> {
    pub fn new(arena: &'a AstArena) -> Self {
        Self {
            arena,
            scopes: ScopeStack::new(),
            bindings: BindingTable::default(),
            context: Context::default(),
        }
    }

    /// Resolve a whole program inside one wrapping scope.
    pub fn resolve(&mut self, statements: &[Stmt]) -> Result<(), ResolveError> {
        log::info!("resolving {} top-level statement(s)", statements.len());
        let result = self.with_scope(|this| this.resolve_statements(statements));
        match &result {
            Ok(()) => log::info!(
                "resolved {} variable occurrence(s)",
                self.bindings.len()
            ),
            Err(err) => log::debug!("resolution stopped: {err}"),
        }
        result
    }

    pub fn bindings(&self) -> &BindingTable {
        &self.bindings
    }

    pub fn into_bindings(self) -> BindingTable {
        self.bindings
    }

    pub fn scope_depth(&self) -> usize {
        self.scopes.depth()
    }

    pub fn context(&self) -> Context {
        self.context
    }

    // ───────────────────────────────────────────────────────────
    //  Scoped state
    // ───────────────────────────────────────────────────────────

    /// Run `f` inside a fresh scope. The scope is popped on every exit,
    /// including an `Err` coming back from `f`.
    fn with_scope<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.scopes.push();
        let result = f(self);
        self.scopes.pop();
        result
    }

    fn with_function<R>(
        &mut self,
        kind: FunctionKind,
        f: impl FnOnce(&mut Self) -> R,
    ) -> R {
        let enclosing = std::mem::replace(&mut self.context.function, kind);
        let result = f(self);
        self.context.function = enclosing;
        result
    }

    fn with_class<R>(&mut self, kind: ClassKind, f: impl FnOnce(&mut Self) -> R) -> R {
        let enclosing = std::mem::replace(&mut self.context.class, kind);
        let result = f(self);
        self.context.class = enclosing;
        result
    }

    fn declare(&mut self, name: &Token, kind: DeclKind) -> Result<(), ResolveError> {
        self.scopes.declare(&name.lexeme, kind).map_err(|existing| {
            ResolveError::new(
                ResolveErrorKind::DuplicateDeclaration,
                name,
                format!(
                    "{} already exists with name '{}'.",
                    existing.kind, name.lexeme
                ),
            )
        })
    }

    fn define(&mut self, name: &Token, kind: DeclKind) {
        self.scopes.define(&name.lexeme, kind);
    }

    // ───────────────────────────────────────────────────────────
    //  Statements
    // ───────────────────────────────────────────────────────────

    fn resolve_statements(&mut self, statements: &[Stmt]) -> Result<(), ResolveError> {
        statements
            .iter()
            .try_for_each(|stmt| self.resolve_stmt(stmt))
    }

    fn resolve_stmt(&mut self, stmt: &Stmt) -> Result<(), ResolveError> {
        match stmt {
            Stmt::Block(statements) => {
                self.with_scope(|this| this.resolve_statements(statements))
            }
            Stmt::Var { name, initializer } => {
                self.declare(name, DeclKind::Variable)?;
                if let Some(initializer) = initializer {
                    self.resolve_expr(*initializer)?;
                }
                self.define(name, DeclKind::Variable);
                Ok(())
            }
            Stmt::Function(function) => {
                self.declare(&function.name, DeclKind::Function)?;
                self.define(&function.name, DeclKind::Function);
                self.resolve_function(function, FunctionKind::Function)
            }
            Stmt::Class(class) => self.resolve_class(class),
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(*condition)?;
                self.resolve_stmt(then_branch)?;
                if let Some(else_branch) = else_branch {
                    self.resolve_stmt(else_branch)?;
                }
                Ok(())
            }
            Stmt::While { condition, body } => {
                self.resolve_expr(*condition)?;
                self.resolve_stmt(body)
            }
            Stmt::Return { keyword, value } => {
                if self.context.function == FunctionKind::None {
                    return Err(context_error(
                        keyword,
                        "Can't return from top-level code.",
                    ));
                }
                if let Some(value) = value {
                    if self.context.function == FunctionKind::Initializer {
                        return Err(context_error(
                            keyword,
                            "Can't return a value from an initializer.",
                        ));
                    }
                    self.resolve_expr(*value)?;
                }
                Ok(())
            }
            // Legal anywhere inside a function body, loop or not.
            Stmt::Break { keyword } => {
                if self.context.function == FunctionKind::None {
                    return Err(context_error(
                        keyword,
                        "Can't break from top-level code.",
                    ));
                }
                Ok(())
            }
            Stmt::Continue { keyword } => {
                if self.context.function == FunctionKind::None {
                    return Err(context_error(
                        keyword,
                        "Can't continue from top-level code.",
                    ));
                }
                Ok(())
            }
            Stmt::Print(expr) | Stmt::Expression(expr) => self.resolve_expr(*expr),
        }
    }

    fn resolve_function(
        &mut self,
        function: &FunctionDecl,
        kind: FunctionKind,
    ) -> Result<(), ResolveError> {
        log::trace!("resolving {:?} '{}'", kind, function.name.lexeme);
        self.with_function(kind, |this| {
            this.with_scope(|this| {
                for param in &function.params {
                    this.declare(param, DeclKind::Variable)?;
                    this.define(param, DeclKind::Variable);
                }
                this.resolve_statements(&function.body)
            })
        })
    }

    fn resolve_class(&mut self, class: &ClassDecl) -> Result<(), ResolveError> {
        self.with_class(ClassKind::Class, |this| {
            this.declare(&class.name, DeclKind::Class)?;
            this.define(&class.name, DeclKind::Class);

            if let Some(superclass) = class.superclass {
                if let ExprKind::Variable { name, .. } = &this.arena.get(superclass).kind {
                    if name.lexeme == class.name.lexeme {
                        return Err(ResolveError::new(
                            ResolveErrorKind::Inheritance,
                            name,
                            "A class can't inherit from itself.",
                        ));
                    }
                }
                // `super` lives in the scope enclosing the class, not in a
                // scope of its own.
                this.scopes.inject("super", DeclKind::Method);
                this.context.class = ClassKind::Subclass;
                this.resolve_expr(superclass)?;
            }

            this.with_scope(|this| {
                this.scopes.inject("this", DeclKind::Property);
                for method in &class.methods {
                    let kind = if method.name.lexeme == INITIALIZER_NAME {
                        FunctionKind::Initializer
                    } else {
                        FunctionKind::Method
                    };
                    this.resolve_function(method, kind)?;
                }
                Ok(())
            })
        })
    }

    // ───────────────────────────────────────────────────────────
    //  Expressions
    // ───────────────────────────────────────────────────────────

    fn resolve_expr(&mut self, id: ExprId) -> Result<(), ResolveError> {
        let arena = self.arena;
        match &arena.get(id).kind {
            ExprKind::Literal(_) => Ok(()),
            ExprKind::Grouping(inner) => self.resolve_expr(*inner),
            ExprKind::Unary { right, .. } => self.resolve_expr(*right),
            ExprKind::Binary { left, right, .. }
            | ExprKind::Logical { left, right, .. } => {
                self.resolve_expr(*left)?;
                self.resolve_expr(*right)
            }
            ExprKind::Variable { name, kind } => {
                self.resolve_variable(id, name, *kind)
            }
            ExprKind::Assign { name, value } => {
                self.resolve_expr(*value)?;
                self.resolve_local(id, name, None)
            }
            ExprKind::This { keyword } => {
                if self.context.class == ClassKind::None {
                    return Err(context_error(
                        keyword,
                        "Can't use 'this' outside of a class.",
                    ));
                }
                self.resolve_local(id, keyword, Some(DeclKind::Property))
            }
            ExprKind::Super { keyword, .. } => {
                match self.context.class {
                    ClassKind::None => {
                        return Err(context_error(
                            keyword,
                            "Can't use 'super' outside of a class.",
                        ));
                    }
                    ClassKind::Class => {
                        return Err(context_error(
                            keyword,
                            "Can't use 'super' in a class with no superclass.",
                        ));
                    }
                    ClassKind::Subclass => {}
                }
                self.resolve_local(id, keyword, Some(DeclKind::Method))
            }
            ExprKind::GetField { object, .. }
            | ExprKind::GetMethod { object, .. } => self.resolve_expr(*object),
            ExprKind::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(*callee)?;
                arguments
                    .iter()
                    .try_for_each(|argument| self.resolve_expr(*argument))
            }
            // The assigned value is resolved before the receiver.
            ExprKind::Set { object, value, .. } => {
                self.resolve_expr(*value)?;
                self.resolve_expr(*object)
            }
        }
    }

    fn resolve_variable(
        &mut self,
        id: ExprId,
        name: &Token,
        kind: Option<DeclKind>,
    ) -> Result<(), ResolveError> {
        if !self.scopes.is_empty()
            && !self.scopes.is_defined_anywhere(&name.lexeme, kind)
            && self.scopes.lookup(&name.lexeme, kind).is_some()
        {
            return Err(ResolveError::new(
                ResolveErrorKind::SelfReference,
                name,
                format!(
                    "Can't read local variable '{}' in its own initializer.",
                    name.lexeme
                ),
            ));
        }
        self.resolve_local(id, name, kind)
    }

    /// Record the hop distance to the innermost scope binding `name`.
    fn resolve_local(
        &mut self,
        id: ExprId,
        name: &Token,
        kind: Option<DeclKind>,
    ) -> Result<(), ResolveError> {
        match self.scopes.lookup(&name.lexeme, kind) {
            Some((distance, _)) => {
                log::debug!(
                    "'{}' at {} resolved at distance {}",
                    name.lexeme,
                    name.span.start,
                    distance
                );
                self.bindings.record(id, distance);
                Ok(())
            }
            None => Err(ResolveError::new(
                ResolveErrorKind::Unresolved,
                name,
                format!("Couldn't resolve variable '{}'.", name.lexeme),
            )),
        }
    }
}

fn context_error(token: &Token, message: &str) -> ResolveError {
    ResolveError::new(ResolveErrorKind::Context, token, message)
}

/// Resolve `program` and return its binding table.
pub fn resolve(program: &Program) -> Result<BindingTable, ResolveError> {
    let mut resolver = Resolver::new(&program.arena);
    resolver.resolve(&program.statements)?;
    Ok(resolver.into_bindings())
}

/// Resolve `program`, reporting a failure to `reporter`.
///
/// The resolution error itself is always reported. The generic failure
/// notice is only logged when scanning and parsing came through clean, so
/// a broken parse doesn't produce a second, vaguer complaint.
pub fn resolve_with_reporter(
    program: &Program,
    reporter: &Reporter,
) -> Option<BindingTable> {
    let earlier_errors = reporter.had_error() || reporter.had_runtime_error();
    match resolve(program) {
        Ok(bindings) => Some(bindings),
        Err(err) => {
            reporter.error(Stage::Resolve, err.span, &err.lexeme, &err.message);
            if !earlier_errors {
                log::error!("failed to resolve program: {err}");
            }
            None
        }
    }
}
