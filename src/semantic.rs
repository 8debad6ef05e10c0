//! Semantic pre-pass: the `Whole` -> `Enum` AST rewrite and shallow
//! binary-operand checks, grounded on `original_source/src/semantic.cc`.

use crate::ast::{Expr, Stmt};
use crate::errors::{CompileError, ExcKind};
use crate::token::Kind as TokKind;

type SResult<T> = Result<T, CompileError>;

pub struct Analysis;

impl Analysis {
    pub fn run(stmts: Vec<Stmt>) -> SResult<Vec<Stmt>> {
        stmts.into_iter().map(Self::analysis_stmt).collect()
    }

    fn analysis_stmt(stmt: Stmt) -> SResult<Stmt> {
        match stmt {
            Stmt::Whole { name, inherit, body, line } => Self::rewrite_whole(name, inherit, *body, line),
            Stmt::Block(stmts) => Ok(Stmt::Block(Self::run(stmts)?)),
            Stmt::If { cond, then_branch, ef_branches, else_branch } => {
                let cond = Self::analysis_expr(cond)?;
                let then_branch = Box::new(Self::analysis_stmt(*then_branch)?);
                let mut out_ef = Vec::with_capacity(ef_branches.len());
                for (c, b) in ef_branches {
                    out_ef.push((Self::analysis_expr(c)?, Self::analysis_stmt(b)?));
                }
                let else_branch = else_branch.map(|b| Self::analysis_stmt(*b)).transpose()?.map(Box::new);
                Ok(Stmt::If { cond, then_branch, ef_branches: out_ef, else_branch })
            }
            Stmt::For { cond, body, line } => {
                let cond = cond.map(Self::analysis_expr).transpose()?;
                let body = Box::new(Self::analysis_stmt(*body)?);
                Ok(Stmt::For { cond, body, line })
            }
            Stmt::Do { body, loop_stmt } => Ok(Stmt::Do {
                body: Box::new(Self::analysis_stmt(*body)?),
                loop_stmt: Box::new(Self::analysis_stmt(*loop_stmt)?),
            }),
            Stmt::Out { value, line } => Ok(Stmt::Out { value: value.map(Self::analysis_expr).transpose()?, line }),
            Stmt::Tin { value, line } => Ok(Stmt::Tin { value: value.map(Self::analysis_expr).transpose()?, line }),
            Stmt::Func { name, args, ret, body, is_interface, line } => Ok(Stmt::Func {
                name,
                args,
                ret,
                body: Box::new(Self::analysis_stmt(*body)?),
                is_interface,
                line,
            }),
            Stmt::And { alias, body } => Ok(Stmt::And { alias, body: Box::new(Self::analysis_stmt(*body)?) }),
            Stmt::Ret(inner) => Ok(Stmt::Ret(inner.map(|b| Self::analysis_stmt(*b)).transpose()?.map(Box::new))),
            Stmt::Pub(inner) => Ok(Stmt::Pub(Box::new(Self::analysis_stmt(*inner)?))),
            Stmt::Var { name, ty, init, line } => {
                Ok(Stmt::Var { name, ty, init: init.map(Self::analysis_expr).transpose()?, line })
            }
            Stmt::Expr(e) => Ok(Stmt::Expr(Self::analysis_expr(e)?)),
            other => Ok(other),
        }
    }

    /// Rule 1: a whole whose body is entirely bare-name expressions is
    /// rewritten into an enum; such a whole must not declare inheritance.
    /// Rule 2: a body mixing bare names with real statements is an error.
    fn rewrite_whole(name: String, inherit: Vec<String>, body: Stmt, line: i64) -> SResult<Stmt> {
        let stmts = match body {
            Stmt::Block(s) => s,
            other => vec![other],
        };
        let all_bare_names = stmts.iter().all(|s| matches!(s, Stmt::Expr(Expr::Name(_))));
        let any_bare_names = stmts.iter().any(|s| matches!(s, Stmt::Expr(Expr::Name(_))));

        if all_bare_names && !stmts.is_empty() {
            if !inherit.is_empty() {
                return Err(CompileError {
                    kind: ExcKind::CallInherit,
                    message: format!("enum whole '{name}' cannot declare inheritance"),
                    line,
                });
            }
            let fields = stmts
                .into_iter()
                .map(|s| match s {
                    Stmt::Expr(Expr::Name(tok)) => tok.literal,
                    _ => unreachable!(),
                })
                .collect();
            return Ok(Stmt::Enum { name, fields, line });
        }

        if any_bare_names {
            return Err(CompileError {
                kind: ExcKind::Enumeration,
                message: format!("whole '{name}' mixes bare names with member declarations"),
                line,
            });
        }

        Ok(Stmt::Whole { name, inherit, body: Box::new(Stmt::Block(Self::run(stmts)?)), line })
    }

    fn analysis_expr(expr: Expr) -> SResult<Expr> {
        match expr {
            Expr::Binary(left, op, right) => {
                let left = Self::analysis_expr(*left)?;
                let right = Self::analysis_expr(*right)?;
                Self::check_binary(&left, &op.kind, &right, op.line)?;
                Ok(Expr::Binary(Box::new(left), op, Box::new(right)))
            }
            Expr::Group(inner) => Ok(Expr::Group(Box::new(Self::analysis_expr(*inner)?))),
            Expr::Unary(op, inner) => Ok(Expr::Unary(op, Box::new(Self::analysis_expr(*inner)?))),
            Expr::Call(callee, args) => {
                let callee = Self::analysis_expr(*callee)?;
                let args = args.into_iter().map(Self::analysis_expr).collect::<SResult<_>>()?;
                Ok(Expr::Call(Box::new(callee), args))
            }
            Expr::Get(obj, name) => Ok(Expr::Get(Box::new(Self::analysis_expr(*obj)?), name)),
            Expr::Set(obj, name, val) => {
                Ok(Expr::Set(Box::new(Self::analysis_expr(*obj)?), name, Box::new(Self::analysis_expr(*val)?)))
            }
            Expr::Assign(target, val) => {
                Ok(Expr::Assign(Box::new(Self::analysis_expr(*target)?), Box::new(Self::analysis_expr(*val)?)))
            }
            Expr::Array(elems) => Ok(Expr::Array(elems.into_iter().map(Self::analysis_expr).collect::<SResult<_>>()?)),
            Expr::Tuple(elems) => Ok(Expr::Tuple(elems.into_iter().map(Self::analysis_expr).collect::<SResult<_>>()?)),
            Expr::Map(pairs) => {
                let mut out = Vec::with_capacity(pairs.len());
                for (k, v) in pairs {
                    out.push((Self::analysis_expr(k)?, Self::analysis_expr(v)?));
                }
                Ok(Expr::Map(out))
            }
            Expr::Index(c, i) => Ok(Expr::Index(Box::new(Self::analysis_expr(*c)?), Box::new(Self::analysis_expr(*i)?))),
            Expr::New(name, fields) => {
                let mut out = Vec::with_capacity(fields.len());
                for (n, v) in fields {
                    out.push((n, Self::analysis_expr(v)?));
                }
                Ok(Expr::New(name, out))
            }
            other @ (Expr::Literal(_) | Expr::Name(_)) => Ok(other),
        }
    }

    fn is_string_or_char(e: &Expr) -> bool {
        matches!(e, Expr::Literal(t) if t.kind == TokKind::Str || t.kind == TokKind::Char)
    }

    fn is_array(e: &Expr) -> bool {
        matches!(e, Expr::Array(_))
    }

    fn is_literal_zero(e: &Expr) -> bool {
        match e {
            Expr::Literal(t) if t.kind == TokKind::Num => t.literal == "0",
            Expr::Literal(t) if t.kind == TokKind::Float => {
                t.literal.parse::<f64>().map(|f| f == 0.0).unwrap_or(false)
            }
            _ => false,
        }
    }

    fn check_binary(left: &Expr, op: &TokKind, right: &Expr, line: i64) -> SResult<()> {
        match op {
            TokKind::Add | TokKind::Sub => {
                let mixed = Self::is_string_or_char(left) != Self::is_string_or_char(right)
                    && (Self::is_string_or_char(left) || Self::is_string_or_char(right));
                if mixed {
                    return Err(CompileError {
                        kind: ExcKind::TypeError,
                        message: "cannot mix numeric and string/char operands".into(),
                        line,
                    });
                }
            }
            TokKind::AsAdd | TokKind::AsSub | TokKind::AsMul | TokKind::AsDiv | TokKind::AsSur => {
                if !matches!(left, Expr::Name(_)) {
                    return Err(CompileError {
                        kind: ExcKind::InvalidSyntax,
                        message: "compound assignment requires a name on the left".into(),
                        line,
                    });
                }
            }
            TokKind::Div | TokKind::AsDiv => {
                if Self::is_string_or_char(left) || Self::is_string_or_char(right) {
                    return Err(CompileError { kind: ExcKind::TypeError, message: "cannot divide strings/chars".into(), line });
                }
                if Self::is_array(left) || Self::is_array(right) {
                    return Err(CompileError { kind: ExcKind::TypeError, message: "cannot divide arrays".into(), line });
                }
                if Self::is_literal_zero(right) {
                    return Err(CompileError { kind: ExcKind::DivisionZero, message: "division by literal zero".into(), line });
                }
            }
            TokKind::Mul | TokKind::AsMul => {
                if Self::is_string_or_char(left) && Self::is_string_or_char(right) {
                    return Err(CompileError {
                        kind: ExcKind::TypeError,
                        message: "cannot multiply two strings/chars".into(),
                        line,
                    });
                }
            }
            TokKind::Greater | TokKind::GrEq | TokKind::Less | TokKind::LeEq => {
                if Self::is_string_or_char(left) || Self::is_string_or_char(right) {
                    if matches!(left, Expr::Literal(t) if t.kind == TokKind::Char)
                        && matches!(right, Expr::Literal(t) if t.kind == TokKind::Char)
                    {
                        // char-vs-char ordering is allowed
                    } else {
                        return Err(CompileError {
                            kind: ExcKind::TypeError,
                            message: "cannot order strings".into(),
                            line,
                        });
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }
}
