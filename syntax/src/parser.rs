use crate::ast::{
    AstArena, ClassDecl, ExprId, ExprKind, ExprNode, FunctionDecl,
    Literal, Program, Stmt,
};
use crate::lexer::Lexer;
use crate::reporter::{Reporter, Stage};
use crate::span::{Pos, Span};
use crate::token::{Token, TokenKind};

/// Calls and declarations accept at most this many arguments / parameters.
pub const MAX_ARITY: usize = 255;

#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
    pub span: Span,
    /// Source text of the offending token, empty at end of input.
    pub lexeme: String,
}

impl ParseError {
    pub fn new(message: impl Into<String>, token: &Token) -> Self {
        Self {
            message: message.into(),
            span: token.span,
            lexeme: token.lexeme.clone(),
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at {}", self.message, self.span)
    }
}

impl std::error::Error for ParseError {}

/// Recursive-descent parser producing one top-level statement per
/// iteration.
///
/// After an error the parser skips to the next statement boundary and
/// carries on, so every syntax error in a script is reported in one run.
pub struct Parser<I: Iterator<Item = Token>> {
    tokens: std::iter::Peekable<I>,
    arena: AstArena,
    previous: Option<Token>,
    last_span: Span,
    at_eof: bool,
}

impl<I: Iterator<Item = Token>> Parser<I> {
    pub fn new(tokens: I) -> Self {
        Self {
            tokens: tokens.peekable(),
            arena: AstArena::default(),
            previous: None,
            last_span: Span::point(Pos::origin()),
            at_eof: false,
        }
    }

    pub fn arena(&self) -> &AstArena {
        &self.arena
    }

    pub fn into_arena(self) -> AstArena {
        self.arena
    }

    /// Drain the parser into a [`Program`] plus every error it hit.
    pub fn parse_all(mut self) -> (Program, Vec<ParseError>) {
        let mut statements = Vec::new();
        let mut errors = Vec::new();
        for result in self.by_ref() {
            match result {
                Ok(stmt) => statements.push(stmt),
                Err(err) => errors.push(err),
            }
        }
        let program = Program {
            arena: self.arena,
            statements,
        };
        (program, errors)
    }

    // ───────────────────────────────────────────────────────────
    //  Token plumbing
    // ───────────────────────────────────────────────────────────

    fn alloc_expr(&mut self, kind: ExprKind, span: Span) -> ExprId {
        self.arena.alloc(ExprNode { kind, span })
    }

    fn span_of(&self, id: ExprId) -> Span {
        self.arena.get(id).span
    }

    fn skip_comments(&mut self) {
        while self.tokens.next_if(Token::is_comment).is_some() {}
    }

    fn peek_kind(&mut self) -> &TokenKind {
        self.skip_comments();
        match self.tokens.peek() {
            Some(tok) => &tok.kind,
            None => &TokenKind::Eof,
        }
    }

    fn advance(&mut self) -> Token {
        self.skip_comments();
        let tok = match self.tokens.next() {
            Some(tok) => tok,
            None => Token::new(TokenKind::Eof, Span::point(self.last_span.end), ""),
        };
        self.last_span = tok.span;
        self.previous = Some(tok.clone());
        tok
    }

    /// Token at the cursor without consuming it, for error reporting.
    fn current(&mut self) -> Token {
        self.skip_comments();
        match self.tokens.peek() {
            Some(tok) => tok.clone(),
            None => {
                Token::new(TokenKind::Eof, Span::point(self.last_span.end), "")
            }
        }
    }

    fn check(&mut self, kind: &TokenKind) -> bool {
        std::mem::discriminant(self.peek_kind()) == std::mem::discriminant(kind)
    }

    fn eat(&mut self, kind: &TokenKind) -> Option<Token> {
        self.check(kind).then(|| self.advance())
    }

    fn expect(
        &mut self,
        expected: &TokenKind,
        context: &str,
    ) -> Result<Token, ParseError> {
        if self.check(expected) {
            return Ok(self.advance());
        }
        let found = self.current();
        Err(ParseError::new(
            format!(
                "expected {} {}, found {}",
                expected.name(),
                context,
                found.kind.name()
            ),
            &found,
        ))
    }

    fn expect_identifier(&mut self, what: &str) -> Result<Token, ParseError> {
        self.expect(&TokenKind::Identifier(String::new()), what)
    }

    /// Skip to the start of the next statement. Always consumes the
    /// offending token so a failed declaration can't be retried forever.
    fn synchronize(&mut self) {
        if !self.check(&TokenKind::Eof) {
            self.advance();
        }
        loop {
            if matches!(
                self.previous.as_ref().map(|t| &t.kind),
                Some(TokenKind::Semicolon)
            ) {
                return;
            }
            match self.peek_kind() {
                TokenKind::Eof
                | TokenKind::Class
                | TokenKind::Fun
                | TokenKind::Var
                | TokenKind::For
                | TokenKind::If
                | TokenKind::While
                | TokenKind::Print
                | TokenKind::Return
                | TokenKind::Break
                | TokenKind::Continue => return,
                _ => {
                    self.advance();
                }
            }
        }
    }

    // ───────────────────────────────────────────────────────────
    //  Declarations
    // ───────────────────────────────────────────────────────────

    pub fn parse_declaration(&mut self) -> Result<Stmt, ParseError> {
        match self.peek_kind() {
            TokenKind::Class => {
                self.advance();
                self.parse_class()
            }
            TokenKind::Fun => {
                self.advance();
                Ok(Stmt::Function(self.parse_function("function")?))
            }
            TokenKind::Var => {
                self.advance();
                self.parse_var()
            }
            _ => self.parse_statement(),
        }
    }

    fn parse_class(&mut self) -> Result<Stmt, ParseError> {
        let name = self.expect_identifier("for class name")?;
        let superclass = match self.eat(&TokenKind::Less) {
            Some(_) => {
                let super_name = self.expect_identifier("for superclass name")?;
                let span = super_name.span;
                Some(self.alloc_expr(
                    ExprKind::Variable {
                        name: super_name,
                        kind: None,
                    },
                    span,
                ))
            }
            None => None,
        };
        self.expect(&TokenKind::LBrace, "before class body")?;
        let mut methods = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.check(&TokenKind::Eof) {
            methods.push(self.parse_function("method")?);
        }
        self.expect(&TokenKind::RBrace, "after class body")?;
        Ok(Stmt::Class(ClassDecl {
            name,
            superclass,
            methods,
        }))
    }

    fn parse_function(&mut self, what: &str) -> Result<FunctionDecl, ParseError> {
        let name = self.expect_identifier(&format!("for {what} name"))?;
        self.expect(&TokenKind::LParen, &format!("after {what} name"))?;
        let mut params = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                if params.len() >= MAX_ARITY {
                    let tok = self.current();
                    return Err(ParseError::new(
                        format!("can't have more than {MAX_ARITY} parameters"),
                        &tok,
                    ));
                }
                params.push(self.expect_identifier("for parameter name")?);
                if self.eat(&TokenKind::Comma).is_none() {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RParen, "after parameters")?;
        self.expect(&TokenKind::LBrace, &format!("before {what} body"))?;
        let body = self.parse_block()?;
        Ok(FunctionDecl { name, params, body })
    }

    fn parse_var(&mut self) -> Result<Stmt, ParseError> {
        let name = self.expect_identifier("for variable name")?;
        let initializer = match self.eat(&TokenKind::Equal) {
            Some(_) => Some(self.parse_expression()?),
            None => None,
        };
        self.expect(&TokenKind::Semicolon, "after variable declaration")?;
        Ok(Stmt::Var { name, initializer })
    }

    // ───────────────────────────────────────────────────────────
    //  Statements
    // ───────────────────────────────────────────────────────────

    fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        match self.peek_kind() {
            TokenKind::Print => {
                self.advance();
                let value = self.parse_expression()?;
                self.expect(&TokenKind::Semicolon, "after value")?;
                Ok(Stmt::Print(value))
            }
            TokenKind::Return => {
                let keyword = self.advance();
                let value = if self.check(&TokenKind::Semicolon) {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                self.expect(&TokenKind::Semicolon, "after return value")?;
                Ok(Stmt::Return { keyword, value })
            }
            TokenKind::Break => {
                let keyword = self.advance();
                self.expect(&TokenKind::Semicolon, "after `break`")?;
                Ok(Stmt::Break { keyword })
            }
            TokenKind::Continue => {
                let keyword = self.advance();
                self.expect(&TokenKind::Semicolon, "after `continue`")?;
                Ok(Stmt::Continue { keyword })
            }
            TokenKind::If => {
                self.advance();
                self.parse_if()
            }
            TokenKind::While => {
                self.advance();
                self.expect(&TokenKind::LParen, "after `while`")?;
                let condition = self.parse_expression()?;
                self.expect(&TokenKind::RParen, "after condition")?;
                let body = Box::new(self.parse_statement()?);
                Ok(Stmt::While { condition, body })
            }
            TokenKind::For => {
                let keyword = self.advance();
                self.parse_for(keyword)
            }
            TokenKind::LBrace => {
                self.advance();
                Ok(Stmt::Block(self.parse_block()?))
            }
            _ => {
                let expr = self.parse_expression()?;
                self.expect(&TokenKind::Semicolon, "after expression")?;
                Ok(Stmt::Expression(expr))
            }
        }
    }

    fn parse_if(&mut self) -> Result<Stmt, ParseError> {
        self.expect(&TokenKind::LParen, "after `if`")?;
        let condition = self.parse_expression()?;
        self.expect(&TokenKind::RParen, "after if condition")?;
        let then_branch = Box::new(self.parse_statement()?);
        let else_branch = match self.eat(&TokenKind::Else) {
            Some(_) => Some(Box::new(self.parse_statement()?)),
            None => None,
        };
        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    /// `for (init; cond; incr) body` becomes
    /// `{ init; while (cond) { body; incr; } }`.
    fn parse_for(&mut self, keyword: Token) -> Result<Stmt, ParseError> {
        self.expect(&TokenKind::LParen, "after `for`")?;
        let initializer = match self.peek_kind() {
            TokenKind::Semicolon => {
                self.advance();
                None
            }
            TokenKind::Var => {
                self.advance();
                Some(self.parse_var()?)
            }
            _ => {
                let expr = self.parse_expression()?;
                self.expect(&TokenKind::Semicolon, "after loop initializer")?;
                Some(Stmt::Expression(expr))
            }
        };
        let condition = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(&TokenKind::Semicolon, "after loop condition")?;
        let increment = if self.check(&TokenKind::RParen) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(&TokenKind::RParen, "after for clauses")?;

        let mut body = self.parse_statement()?;
        if let Some(increment) = increment {
            body = Stmt::Block(vec![body, Stmt::Expression(increment)]);
        }
        let condition = match condition {
            Some(condition) => condition,
            None => self
                .alloc_expr(ExprKind::Literal(Literal::Bool(true)), keyword.span),
        };
        let mut stmt = Stmt::While {
            condition,
            body: Box::new(body),
        };
        if let Some(initializer) = initializer {
            stmt = Stmt::Block(vec![initializer, stmt]);
        }
        Ok(stmt)
    }

    /// Statements up to and including the closing `}`.
    fn parse_block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        let mut statements = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.check(&TokenKind::Eof) {
            statements.push(self.parse_declaration()?);
        }
        self.expect(&TokenKind::RBrace, "after block")?;
        Ok(statements)
    }

    // ───────────────────────────────────────────────────────────
    //  Expressions
    // ───────────────────────────────────────────────────────────

    pub fn parse_expression(&mut self) -> Result<ExprId, ParseError> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> Result<ExprId, ParseError> {
        let target = self.parse_or()?;
        let Some(equals) = self.eat(&TokenKind::Equal) else {
            return Ok(target);
        };
        let value = self.parse_assignment()?;
        let span = self.span_of(target).merge(self.span_of(value));
        match &self.arena.get(target).kind {
            ExprKind::Variable { name, .. } => {
                let name = name.clone();
                Ok(self.alloc_expr(ExprKind::Assign { name, value }, span))
            }
            ExprKind::GetField { object, name } => {
                let (object, name) = (*object, name.clone());
                Ok(self.alloc_expr(ExprKind::Set { object, name, value }, span))
            }
            _ => Err(ParseError::new("invalid assignment target", &equals)),
        }
    }

    fn parse_logical(
        &mut self,
        operator_kind: &TokenKind,
        next: fn(&mut Self) -> Result<ExprId, ParseError>,
    ) -> Result<ExprId, ParseError> {
        let mut left = next(self)?;
        while let Some(operator) = self.eat(operator_kind) {
            let right = next(self)?;
            let span = self.span_of(left).merge(self.span_of(right));
            left = self.alloc_expr(
                ExprKind::Logical {
                    left,
                    operator,
                    right,
                },
                span,
            );
        }
        Ok(left)
    }

    fn parse_or(&mut self) -> Result<ExprId, ParseError> {
        self.parse_logical(&TokenKind::Or, Self::parse_and)
    }

    fn parse_and(&mut self) -> Result<ExprId, ParseError> {
        self.parse_logical(&TokenKind::And, Self::parse_equality)
    }

    /// Left-associative binary level over `operators`.
    fn parse_binary(
        &mut self,
        operators: &[TokenKind],
        next: fn(&mut Self) -> Result<ExprId, ParseError>,
    ) -> Result<ExprId, ParseError> {
        let mut left = next(self)?;
        while operators.iter().any(|op| self.check(op)) {
            let operator = self.advance();
            let right = next(self)?;
            let span = self.span_of(left).merge(self.span_of(right));
            left = self.alloc_expr(
                ExprKind::Binary {
                    left,
                    operator,
                    right,
                },
                span,
            );
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<ExprId, ParseError> {
        self.parse_binary(
            &[TokenKind::BangEqual, TokenKind::EqualEqual],
            Self::parse_comparison,
        )
    }

    fn parse_comparison(&mut self) -> Result<ExprId, ParseError> {
        self.parse_binary(
            &[
                TokenKind::Greater,
                TokenKind::GreaterEqual,
                TokenKind::Less,
                TokenKind::LessEqual,
            ],
            Self::parse_term,
        )
    }

    fn parse_term(&mut self) -> Result<ExprId, ParseError> {
        self.parse_binary(&[TokenKind::Minus, TokenKind::Plus], Self::parse_factor)
    }

    fn parse_factor(&mut self) -> Result<ExprId, ParseError> {
        self.parse_binary(&[TokenKind::Slash, TokenKind::Star], Self::parse_unary)
    }

    fn parse_unary(&mut self) -> Result<ExprId, ParseError> {
        if self.check(&TokenKind::Bang) || self.check(&TokenKind::Minus) {
            let operator = self.advance();
            let right = self.parse_unary()?;
            let span = operator.span.merge(self.span_of(right));
            return Ok(self.alloc_expr(ExprKind::Unary { operator, right }, span));
        }
        self.parse_call()
    }

    fn parse_call(&mut self) -> Result<ExprId, ParseError> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.eat(&TokenKind::LParen).is_some() {
                expr = self.finish_call(expr)?;
            } else if self.eat(&TokenKind::Dot).is_some() {
                let name = self.expect_identifier("for property name after `.`")?;
                let span = self.span_of(expr).merge(name.span);
                let kind = if self.check(&TokenKind::LParen) {
                    ExprKind::GetMethod { object: expr, name }
                } else {
                    ExprKind::GetField { object: expr, name }
                };
                expr = self.alloc_expr(kind, span);
            } else {
                return Ok(expr);
            }
        }
    }

    fn finish_call(&mut self, callee: ExprId) -> Result<ExprId, ParseError> {
        let mut arguments = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                if arguments.len() >= MAX_ARITY {
                    let tok = self.current();
                    return Err(ParseError::new(
                        format!("can't have more than {MAX_ARITY} arguments"),
                        &tok,
                    ));
                }
                arguments.push(self.parse_expression()?);
                if self.eat(&TokenKind::Comma).is_none() {
                    break;
                }
            }
        }
        let paren = self.expect(&TokenKind::RParen, "after arguments")?;
        let span = self.span_of(callee).merge(paren.span);
        Ok(self.alloc_expr(
            ExprKind::Call {
                callee,
                paren,
                arguments,
            },
            span,
        ))
    }

    fn parse_primary(&mut self) -> Result<ExprId, ParseError> {
        let tok = self.current();
        let literal = match &tok.kind {
            TokenKind::False => Some(Literal::Bool(false)),
            TokenKind::True => Some(Literal::Bool(true)),
            TokenKind::Nil => Some(Literal::Nil),
            TokenKind::Number(n) => Some(Literal::Number(*n)),
            TokenKind::String(s) => Some(Literal::String(s.clone())),
            _ => None,
        };
        if let Some(literal) = literal {
            self.advance();
            return Ok(self.alloc_expr(ExprKind::Literal(literal), tok.span));
        }

        match tok.kind {
            TokenKind::This => {
                let keyword = self.advance();
                Ok(self.alloc_expr(ExprKind::This { keyword }, tok.span))
            }
            TokenKind::Super => {
                let keyword = self.advance();
                self.expect(&TokenKind::Dot, "after `super`")?;
                let method = self.expect_identifier("for superclass method name")?;
                let span = keyword.span.merge(method.span);
                Ok(self.alloc_expr(ExprKind::Super { keyword, method }, span))
            }
            TokenKind::Identifier(_) => {
                let name = self.advance();
                Ok(self.alloc_expr(ExprKind::Variable { name, kind: None }, tok.span))
            }
            TokenKind::LParen => {
                let open = self.advance();
                let inner = self.parse_expression()?;
                let close = self.expect(&TokenKind::RParen, "after expression")?;
                Ok(self.alloc_expr(
                    ExprKind::Grouping(inner),
                    open.span.merge(close.span),
                ))
            }
            _ => Err(ParseError::new(
                format!("expected expression, found {}", tok.kind.name()),
                &tok,
            )),
        }
    }
}

impl<I: Iterator<Item = Token>> Iterator for Parser<I> {
    type Item = Result<Stmt, ParseError>;

    fn next(&mut self) -> Option<Result<Stmt, ParseError>> {
        if self.at_eof {
            return None;
        }
        if self.check(&TokenKind::Eof) {
            self.at_eof = true;
            return None;
        }
        let result = self.parse_declaration();
        if result.is_err() {
            self.synchronize();
        }
        Some(result)
    }
}

/// Scan and parse `source`, reporting lexical and syntax errors to
/// `reporter`. Statements that failed to parse are left out of the
/// returned program.
pub fn parse_source(source: &str, reporter: &Reporter) -> Program {
    let tokens = Lexer::from_str(source).filter(|tok| match &tok.kind {
        TokenKind::Error(message) => {
            reporter.error(Stage::Scan, tok.span, &tok.lexeme, message);
            false
        }
        _ => true,
    });
    let (program, errors) = Parser::new(tokens).parse_all();
    for err in &errors {
        reporter.error(Stage::Parse, err.span, &err.lexeme, &err.message);
    }
    log::debug!(
        "parsed {} statement(s), {} expression node(s), {} error(s)",
        program.statements.len(),
        program.arena.len(),
        errors.len()
    );
    program
}
