/// Abstract syntax tree for statements and expressions.
///
/// Expressions are allocated in an [`AstArena`] and referred to by
/// [`ExprId`]. The id is the node's identity: the resolver keys its
/// binding table on it, so the evaluator can find the hop distance for the
/// exact variable occurrence it is executing.
///
/// Statements are owned trees that point into the arena for their
/// expressions.
use crate::span::Span;
use crate::token::Token;

/// Stable identity of an expression node inside an [`AstArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(u32);

impl ExprId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for ExprId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExprNode {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AstArena {
    nodes: Vec<ExprNode>,
}

impl AstArena {
    pub fn alloc(&mut self, node: ExprNode) -> ExprId {
        let id = ExprId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Panics if `id` was allocated by a different arena.
    pub fn get(&self, id: ExprId) -> &ExprNode {
        &self.nodes[id.index()]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

// ═══════════════════════════════════════════════════════════════════
// Kind vocabulary shared with the evaluator
// ═══════════════════════════════════════════════════════════════════

/// What introduced a name into a scope.
///
/// Part of a scope key: a function and a variable spelled the same way can
/// live side by side in one scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DeclKind {
    Variable,
    Function,
    Class,
    Method,
    Initializer,
    Property,
}

impl DeclKind {
    /// Order in which an unqualified reference tries the kinds of a scope.
    pub const LOOKUP_ORDER: [DeclKind; 6] = [
        DeclKind::Variable,
        DeclKind::Function,
        DeclKind::Class,
        DeclKind::Method,
        DeclKind::Initializer,
        DeclKind::Property,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Variable => "Variable",
            Self::Function => "Function",
            Self::Class => "Class",
            Self::Method => "Method",
            Self::Initializer => "Initializer",
            Self::Property => "Property",
        }
    }
}

impl std::fmt::Display for DeclKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Kind of function body currently being resolved or executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FunctionKind {
    #[default]
    None,
    Function,
    Method,
    Initializer,
}

/// Kind of class body currently being resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ClassKind {
    #[default]
    None,
    Class,
    Subclass,
}

// ═══════════════════════════════════════════════════════════════════
// Expressions
// ═══════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Nil,
    Bool(bool),
    Number(f64),
    String(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Literal(Literal),
    /// `( expr )`
    Grouping(ExprId),
    /// `-x`, `!x`
    Unary { operator: Token, right: ExprId },
    /// Arithmetic, comparison and equality operators.
    Binary {
        left: ExprId,
        operator: Token,
        right: ExprId,
    },
    /// `and` / `or`, which short-circuit.
    Logical {
        left: ExprId,
        operator: Token,
        right: ExprId,
    },
    /// A name read. `kind` qualifies the lookup; `None` matches any
    /// declaration kind.
    Variable { name: Token, kind: Option<DeclKind> },
    /// `name = value`
    Assign { name: Token, value: ExprId },
    This { keyword: Token },
    /// `super.method`
    Super { keyword: Token, method: Token },
    /// `object.name` read as a field.
    GetField { object: ExprId, name: Token },
    /// `object.name` in callee position.
    GetMethod { object: ExprId, name: Token },
    /// `callee(arguments)`; `paren` is the closing parenthesis.
    Call {
        callee: ExprId,
        paren: Token,
        arguments: Vec<ExprId>,
    },
    /// `object.name = value`
    Set {
        object: ExprId,
        name: Token,
        value: ExprId,
    },
}

// ═══════════════════════════════════════════════════════════════════
// Statements
// ═══════════════════════════════════════════════════════════════════

/// `fun name(params) { body }`, also used for methods.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: Token,
    pub params: Vec<Token>,
    pub body: Vec<Stmt>,
}

/// `class Name < Superclass { methods }`
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    pub name: Token,
    /// Always a plain [`ExprKind::Variable`], looked up like any other read.
    pub superclass: Option<ExprId>,
    pub methods: Vec<FunctionDecl>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Block(Vec<Stmt>),
    Var {
        name: Token,
        initializer: Option<ExprId>,
    },
    Function(FunctionDecl),
    Class(ClassDecl),
    If {
        condition: ExprId,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    While {
        condition: ExprId,
        body: Box<Stmt>,
    },
    Return {
        keyword: Token,
        value: Option<ExprId>,
    },
    Break {
        keyword: Token,
    },
    Continue {
        keyword: Token,
    },
    Print(ExprId),
    Expression(ExprId),
}

/// A parsed script: its statements and the arena that owns their
/// expressions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    pub arena: AstArena,
    pub statements: Vec<Stmt>,
}
