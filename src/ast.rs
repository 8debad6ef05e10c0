//! Abstract syntax tree, grounded on `original_source/src/ast.h`.

use crate::token::Token;
use crate::types::Type;

#[derive(Debug, Clone)]
pub enum Expr {
    Literal(Token),
    Binary(Box<Expr>, Token, Box<Expr>),
    Group(Box<Expr>),
    Unary(Token, Box<Expr>),
    Name(Token),
    Call(Box<Expr>, Vec<Expr>),
    Get(Box<Expr>, Token),
    Set(Box<Expr>, Token, Box<Expr>),
    Assign(Box<Expr>, Box<Expr>),
    Array(Vec<Expr>),
    Map(Vec<(Expr, Expr)>),
    Tuple(Vec<Expr>),
    Index(Box<Expr>, Box<Expr>),
    New(Token, Vec<(Token, Expr)>),
}

impl Expr {
    pub fn line(&self) -> i64 {
        match self {
            Expr::Literal(t) | Expr::Name(t) => t.line,
            Expr::Binary(l, _, _) => l.line(),
            Expr::Group(e) => e.line(),
            Expr::Unary(t, _) => t.line,
            Expr::Call(callee, _) => callee.line(),
            Expr::Get(obj, _) => obj.line(),
            Expr::Set(obj, _, _) => obj.line(),
            Expr::Assign(target, _) => target.line(),
            Expr::Array(elems) | Expr::Tuple(elems) => elems.first().map(Expr::line).unwrap_or(0),
            Expr::Map(pairs) => pairs.first().map(|(k, _)| k.line()).unwrap_or(0),
            Expr::Index(c, _) => c.line(),
            Expr::New(name, _) => name.line,
        }
    }
}

impl Stmt {
    /// Best-effort source line for statement kinds that don't carry one
    /// directly, by looking at whatever expression or nested statement
    /// they wrap. Falls back to `0` when nothing is available (e.g. an
    /// empty `Ret`).
    pub fn line(&self) -> i64 {
        match self {
            Stmt::Expr(e) => e.line(),
            Stmt::Var { line, .. } => *line,
            Stmt::Block(stmts) => stmts.first().map(Stmt::line).unwrap_or(0),
            Stmt::If { cond, .. } => cond.line(),
            Stmt::For { line, .. } => *line,
            Stmt::Do { body, .. } => body.line(),
            Stmt::Out { line, .. } | Stmt::Tin { line, .. } => *line,
            Stmt::Func { line, .. } => *line,
            Stmt::Whole { line, .. } => *line,
            Stmt::Enum { line, .. } => *line,
            Stmt::Inherit(_) => 0,
            Stmt::And { body, .. } => body.line(),
            Stmt::Mod { .. } | Stmt::Use { .. } => 0,
            Stmt::Ret(inner) => inner.as_ref().map(|s| s.line()).unwrap_or(0),
            Stmt::Pub(inner) => inner.line(),
            Stmt::Del(_) => 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub ty: Type,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Expr(Expr),
    Var { name: String, ty: Type, init: Option<Expr>, line: i64 },
    Block(Vec<Stmt>),
    If { cond: Expr, then_branch: Box<Stmt>, ef_branches: Vec<(Expr, Stmt)>, else_branch: Option<Box<Stmt>> },
    For { cond: Option<Expr>, body: Box<Stmt>, line: i64 },
    Do { body: Box<Stmt>, loop_stmt: Box<Stmt> },
    Out { value: Option<Expr>, line: i64 },
    Tin { value: Option<Expr>, line: i64 },
    Func { name: String, args: Vec<Field>, ret: Option<Type>, body: Box<Stmt>, is_interface: bool, line: i64 },
    Whole { name: String, inherit: Vec<String>, body: Box<Stmt>, line: i64 },
    Enum { name: String, fields: Vec<String>, line: i64 },
    Inherit(Vec<String>),
    And { alias: String, body: Box<Stmt> },
    Mod { name: String },
    Use { name: String, alias: Option<String> },
    Ret(Option<Box<Stmt>>),
    Pub(Box<Stmt>),
    Del(String),
}
