use super::*;
use crate::parser::parse_source;
use crate::span::Pos;

fn parse(src: &str) -> Program {
    let reporter = Reporter::new();
    let program = parse_source(src, &reporter);
    assert!(
        !reporter.had_error(),
        "unexpected syntax errors: {:?}",
        reporter.diagnostics()
    );
    program
}

fn resolve_ok(src: &str) -> (Program, BindingTable) {
    let program = parse(src);
    match resolve(&program) {
        Ok(bindings) => (program, bindings),
        Err(err) => panic!("unexpected resolve error: {err}"),
    }
}

fn resolve_err(src: &str) -> ResolveError {
    let program = parse(src);
    match resolve(&program) {
        Ok(bindings) => panic!("expected an error, resolved {bindings:?}"),
        Err(err) => err,
    }
}

/// Distances recorded for occurrences spelled `spelling`, in source order.
fn distances(program: &Program, bindings: &BindingTable, spelling: &str) -> Vec<usize> {
    let mut found: Vec<(Pos, usize)> = bindings
        .iter()
        .filter_map(|(id, distance)| {
            let token = match &program.arena.get(id).kind {
                ExprKind::Variable { name, .. } | ExprKind::Assign { name, .. } => name,
                ExprKind::This { keyword } | ExprKind::Super { keyword, .. } => keyword,
                _ => return None,
            };
            (token.lexeme == spelling).then_some((token.span.start, distance))
        })
        .collect();
    found.sort();
    found.into_iter().map(|(_, distance)| distance).collect()
}

// ── Scope rules ───────────────────────────────────────────────

#[test]
fn self_reference_in_initializer() {
    let err = resolve_err("var a = a;");
    assert_eq!(err.kind, ResolveErrorKind::SelfReference);
    assert_eq!(
        err.message,
        "Can't read local variable 'a' in its own initializer."
    );
    assert_eq!(err.span.start.column, 9);
}

#[test]
fn self_reference_shadowing_outer_variable() {
    let err = resolve_err("var a = \"global\"; { var a = a; }");
    assert_eq!(err.kind, ResolveErrorKind::SelfReference);
    assert_eq!(err.span.start.column, 29);
}

#[test]
fn self_reference_inside_function_body() {
    let err = resolve_err("var a = 1; fun f() { var a = a + 1; }");
    assert_eq!(err.kind, ResolveErrorKind::SelfReference);
}

#[test]
fn wildcard_reference_sees_undefined_variable_before_function() {
    let err = resolve_err("fun a() {} var a = a;");
    assert_eq!(err.kind, ResolveErrorKind::SelfReference);
}

#[test]
fn duplicate_variable_in_one_scope() {
    let err = resolve_err("{ var a = 1; var a = 2; }");
    assert_eq!(err.kind, ResolveErrorKind::DuplicateDeclaration);
    assert_eq!(err.message, "Variable already exists with name 'a'.");
    assert_eq!(err.category(), ErrorCategory::Scope);
}

#[test]
fn duplicate_at_top_level_is_rejected() {
    let err = resolve_err("var a; var a;");
    assert_eq!(err.kind, ResolveErrorKind::DuplicateDeclaration);
}

#[test]
fn duplicate_function() {
    let err = resolve_err("fun f() {} fun f() {}");
    assert_eq!(err.message, "Function already exists with name 'f'.");
}

#[test]
fn duplicate_parameter() {
    let err = resolve_err("fun f(a, a) {}");
    assert_eq!(err.kind, ResolveErrorKind::DuplicateDeclaration);
    assert_eq!(err.span.start.column, 10);
}

#[test]
fn duplicate_class() {
    let err = resolve_err("class A {} class A {}");
    assert_eq!(err.message, "Class already exists with name 'A'.");
}

#[test]
fn same_name_with_different_kinds_coexists() {
    let (program, bindings) = resolve_ok("fun a() {} var a = 1; print a;");
    assert_eq!(distances(&program, &bindings, "a"), vec![0]);
}

#[test]
fn shadowing_in_nested_block_is_allowed() {
    let (program, bindings) = resolve_ok("var a = 1; { var a = 2; print a; } print a;");
    assert_eq!(distances(&program, &bindings, "a"), vec![0, 0]);
}

#[test]
fn unresolved_variable() {
    let err = resolve_err("print y;");
    assert_eq!(err.kind, ResolveErrorKind::Unresolved);
    assert_eq!(err.message, "Couldn't resolve variable 'y'.");
    assert_eq!(err.lexeme, "y");
}

#[test]
fn assignment_to_undeclared_name() {
    let err = resolve_err("y = 1;");
    assert_eq!(err.kind, ResolveErrorKind::Unresolved);
}

#[test]
fn later_sibling_function_is_not_visible_yet() {
    let err = resolve_err("fun a() { b(); } fun b() {}");
    assert_eq!(err.kind, ResolveErrorKind::Unresolved);
    assert_eq!(err.lexeme, "b");
}

#[test]
fn recursion_and_earlier_siblings_resolve() {
    let (program, bindings) =
        resolve_ok("fun a() { a(); } fun b() { a(); b(); }");
    assert_eq!(distances(&program, &bindings, "a"), vec![1, 1]);
    assert_eq!(distances(&program, &bindings, "b"), vec![1]);
}

// ── Hop distances ─────────────────────────────────────────────

#[test]
fn closure_variable_distance() {
    let (program, bindings) = resolve_ok(
        "fun f(){ var x = 1; fun g(){ return x; } return g(); }",
    );
    assert_eq!(distances(&program, &bindings, "x"), vec![1]);
    assert_eq!(distances(&program, &bindings, "g"), vec![0]);
}

#[test]
fn distance_counts_blocks() {
    let (program, bindings) = resolve_ok("var a = 1; { { { print a; } } }");
    assert_eq!(distances(&program, &bindings, "a"), vec![3]);
}

#[test]
fn parameters_live_in_function_scope() {
    let (program, bindings) = resolve_ok("fun f(a) { print a; { print a; } }");
    assert_eq!(distances(&program, &bindings, "a"), vec![0, 1]);
}

#[test]
fn assignment_records_write_distance() {
    let (program, bindings) = resolve_ok("var a; { a = 2; } a = 3;");
    assert_eq!(distances(&program, &bindings, "a"), vec![1, 0]);
}

#[test]
fn for_loop_variable() {
    let (program, bindings) =
        resolve_ok("for (var i = 0; i < 3; i = i + 1) { print i; }");
    // condition, increment target, increment operand, body
    assert_eq!(distances(&program, &bindings, "i"), vec![0, 1, 1, 2]);
}

#[test]
fn every_occurrence_is_recorded_once() {
    let (_, bindings) = resolve_ok("var a = 1; var b = a + a; print b;");
    assert_eq!(bindings.len(), 3);
}

// ── Classes ───────────────────────────────────────────────────

#[test]
fn this_outside_class() {
    let err = resolve_err("print this;");
    assert_eq!(err.kind, ResolveErrorKind::Context);
    assert_eq!(err.message, "Can't use 'this' outside of a class.");
    assert_eq!(err.category(), ErrorCategory::Context);
}

#[test]
fn this_in_free_function() {
    let err = resolve_err("fun f() { return this; }");
    assert_eq!(err.message, "Can't use 'this' outside of a class.");
}

#[test]
fn this_in_method_resolves_to_class_scope() {
    let (program, bindings) =
        resolve_ok("class A { m() { return this; } n() { { print this; } } }");
    assert_eq!(distances(&program, &bindings, "this"), vec![1, 2]);
}

#[test]
fn this_in_subclass_method() {
    let (program, bindings) =
        resolve_ok("class A {} class B < A { m() { this.x = 1; } }");
    assert_eq!(distances(&program, &bindings, "this"), vec![1]);
}

#[test]
fn this_in_function_nested_in_method() {
    let (program, bindings) =
        resolve_ok("class A { m() { fun f() { return this; } return f; } }");
    assert_eq!(distances(&program, &bindings, "this"), vec![2]);
}

#[test]
fn super_outside_class() {
    let err = resolve_err("super.m();");
    assert_eq!(err.kind, ResolveErrorKind::Context);
    assert_eq!(err.message, "Can't use 'super' outside of a class.");
}

#[test]
fn super_without_superclass() {
    let err = resolve_err("class A { m() { super.m(); } }");
    assert_eq!(err.kind, ResolveErrorKind::Context);
    assert_eq!(err.message, "Can't use 'super' in a class with no superclass.");
}

#[test]
fn super_binding_sits_in_enclosing_scope() {
    let (program, bindings) =
        resolve_ok("class A { m() {} } class B < A { m() { return super.m; } }");
    // method scope -> `this` scope -> scope holding the class declaration
    assert_eq!(distances(&program, &bindings, "super"), vec![2]);
    assert_eq!(distances(&program, &bindings, "A"), vec![0]);
}

#[test]
fn super_in_nested_block_class() {
    let (program, bindings) = resolve_ok(
        "class A {} { class B < A { m() { { super.m(); } } } }",
    );
    assert_eq!(distances(&program, &bindings, "super"), vec![3]);
    assert_eq!(distances(&program, &bindings, "A"), vec![1]);
}

#[test]
fn sibling_subclasses_share_super_binding() {
    resolve_ok("class A {} class B < A {} class C < A {}");
}

#[test]
fn class_cannot_inherit_from_itself() {
    let program = parse("class A < A {}");
    let mut resolver = Resolver::new(&program.arena);
    let err = resolver.resolve(&program.statements).unwrap_err();
    assert_eq!(err.kind, ResolveErrorKind::Inheritance);
    assert_eq!(err.message, "A class can't inherit from itself.");
    assert_eq!(err.category(), ErrorCategory::Inheritance);
    assert_eq!(err.span.start.column, 11);
    // The superclass expression was never resolved.
    assert!(resolver.bindings().is_empty());
}

#[test]
fn superclass_held_in_a_variable() {
    let (program, bindings) = resolve_ok("class A {} var B = A; class C < B {}");
    assert_eq!(distances(&program, &bindings, "A"), vec![0]);
    assert_eq!(distances(&program, &bindings, "B"), vec![0]);
}

#[test]
fn superclass_sees_shadowing_variable() {
    let (program, bindings) = resolve_ok("class A {} { var A = 1; class B < A {} }");
    // the inner `var A`, not the outer class
    assert_eq!(distances(&program, &bindings, "A"), vec![0]);
}

#[test]
fn undeclared_superclass() {
    let err = resolve_err("class B < A {}");
    assert_eq!(err.kind, ResolveErrorKind::Unresolved);
    assert_eq!(err.lexeme, "A");
}

#[test]
fn class_name_resolves_as_plain_reference() {
    let (program, bindings) = resolve_ok("class A {} var a = A(); print a;");
    assert_eq!(distances(&program, &bindings, "A"), vec![0]);
}

#[test]
fn class_body_can_reference_its_own_name() {
    resolve_ok("class A { make() { return A(); } }");
}

#[test]
fn property_access_resolves_receiver_only() {
    let (program, bindings) = resolve_ok("var o; print o.field; o.method(o);");
    assert_eq!(distances(&program, &bindings, "o"), vec![0, 0, 0]);
}

#[test]
fn set_resolves_value_before_object() {
    let err = resolve_err("a.x = b;");
    assert_eq!(err.lexeme, "b");
}

// ── Function context ──────────────────────────────────────────

#[test]
fn return_at_top_level() {
    let err = resolve_err("return;");
    assert_eq!(err.message, "Can't return from top-level code.");
    assert_eq!(err.kind, ResolveErrorKind::Context);
}

#[test]
fn break_at_top_level() {
    let err = resolve_err("break;");
    assert_eq!(err.message, "Can't break from top-level code.");
}

#[test]
fn continue_at_top_level() {
    let err = resolve_err("continue;");
    assert_eq!(err.message, "Can't continue from top-level code.");
}

#[test]
fn break_in_top_level_loop_is_still_rejected() {
    let err = resolve_err("while (true) { break; }");
    assert_eq!(err.message, "Can't break from top-level code.");
}

#[test]
fn break_and_continue_anywhere_in_a_function() {
    resolve_ok("fun f() { break; continue; }");
}

#[test]
fn bare_return_in_initializer() {
    resolve_ok("class A { init() { return; } }");
}

#[test]
fn value_return_in_initializer() {
    let err = resolve_err("class A { init() { return 1; } }");
    assert_eq!(err.kind, ResolveErrorKind::Context);
    assert_eq!(err.message, "Can't return a value from an initializer.");
}

#[test]
fn function_inside_initializer_may_return_value() {
    resolve_ok("class A { init() { fun f() { return 1; } f(); } }");
}

#[test]
fn ordinary_method_may_return_value() {
    resolve_ok("class A { get() { return 1; } }");
}

// ── Pass-level guarantees ─────────────────────────────────────

#[test]
fn scopes_are_balanced_after_success() {
    let program = parse("var a = 1; { fun f(b) { return a + b; } }");
    let mut resolver = Resolver::new(&program.arena);
    resolver.resolve(&program.statements).unwrap();
    assert_eq!(resolver.scope_depth(), 0);
    assert_eq!(resolver.context(), Context::default());
}

#[test]
fn state_is_restored_after_error_deep_inside_class() {
    let program = parse(
        "class A {} class B < A { m() { fun f() { { return nope; } } } }",
    );
    let mut resolver = Resolver::new(&program.arena);
    let err = resolver.resolve(&program.statements).unwrap_err();
    assert_eq!(err.kind, ResolveErrorKind::Unresolved);
    assert_eq!(resolver.scope_depth(), 0);
    assert_eq!(resolver.context(), Context::default());
}

#[test]
fn first_error_aborts_the_pass() {
    let program = parse("print x; print y;");
    let reporter = Reporter::new();
    assert!(resolve_with_reporter(&program, &reporter).is_none());
    let diagnostics = reporter.diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].lexeme, "x");
    assert_eq!(diagnostics[0].stage, Stage::Resolve);
    assert!(reporter.had_error());
}

#[test]
fn earlier_errors_are_kept_alongside_resolution_error() {
    let reporter = Reporter::new();
    let program = parse_source("print ; print z;", &reporter);
    assert!(reporter.had_error());
    assert!(resolve_with_reporter(&program, &reporter).is_none());
    let stages: Vec<Stage> =
        reporter.diagnostics().iter().map(|d| d.stage).collect();
    assert_eq!(stages, vec![Stage::Parse, Stage::Resolve]);
}

#[test]
fn successful_pass_reports_nothing() {
    let program = parse("var a = 1; print a;");
    let reporter = Reporter::new();
    let bindings = resolve_with_reporter(&program, &reporter).unwrap();
    assert_eq!(bindings.len(), 1);
    assert!(!reporter.had_error());
}

#[test]
fn repeated_runs_agree() {
    let src = "var a = 1; fun f(b) { var c = a; { print b + c; } } class K < K {}";
    let program = parse(src);
    assert_eq!(resolve(&program), resolve(&program));
    let ok = parse("var a = 1; fun f(b) { var c = a; { print b + c; } }");
    assert_eq!(resolve(&ok), resolve(&ok));
}
