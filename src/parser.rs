//! Recursive-descent / operator-precedence parser, grounded on
//! `original_source/src/parser.cpp`.

use std::rc::Rc;

use crate::ast::{Expr, Field, Stmt};
use crate::errors::{ExcKind, ParseError};
use crate::token::{Kind, Token};
use crate::types::Type;

type PResult<T> = Result<T, ParseError>;

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    pub fn parse_program(mut self) -> PResult<Vec<Stmt>> {
        let mut stmts = Vec::new();
        while !self.check(Kind::Eof) {
            stmts.push(self.stmt()?);
        }
        Ok(stmts)
    }

    // --- token stream helpers -------------------------------------------------

    fn current(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn check(&self, kind: Kind) -> bool {
        self.current().kind == kind
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, kind: Kind, what: &str) -> PResult<Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(what))
        }
    }

    fn unexpected(&self, what: &str) -> ParseError {
        ParseError {
            kind: ExcKind::Unexpected,
            message: format!("expected {what}, found {}", self.current()),
            line: self.current().line,
        }
    }

    fn invalid(&self, what: &str) -> ParseError {
        ParseError { kind: ExcKind::InvalidSyntax, message: what.to_string(), line: self.current().line }
    }

    // --- statements ------------------------------------------------------------

    fn stmt(&mut self) -> PResult<Stmt> {
        match self.current().kind {
            Kind::Def => self.def_stmt(),
            Kind::If => self.if_stmt(),
            Kind::For => self.for_stmt(),
            Kind::Do => self.do_stmt(),
            Kind::Out => self.out_stmt(),
            Kind::Tin => self.tin_stmt(),
            Kind::And => self.and_stmt(),
            Kind::Mod => self.mod_stmt(),
            Kind::Use => self.use_stmt(),
            Kind::Ret => self.ret_stmt(),
            Kind::LArrow => self.inherit_stmt(),
            Kind::Pub => self.pub_stmt(),
            _ => Ok(Stmt::Expr(self.expr()?)),
        }
    }

    fn block_until(&mut self, terminator: Kind) -> PResult<Vec<Stmt>> {
        let mut stmts = Vec::new();
        while !self.check(terminator) {
            if self.check(Kind::Eof) {
                return Err(self.unexpected("block terminator"));
            }
            stmts.push(self.stmt()?);
        }
        self.advance();
        Ok(stmts)
    }

    /// Parses statements until one of up to three terminator kinds is
    /// encountered, consumes it, and reports which one matched.
    fn block_any(&mut self, terms: &[Kind]) -> PResult<(Vec<Stmt>, Kind)> {
        let mut stmts = Vec::new();
        loop {
            if let Some(&k) = terms.iter().find(|&&k| self.check(k)) {
                self.advance();
                return Ok((stmts, k));
            }
            if self.check(Kind::Eof) {
                return Err(self.unexpected("block terminator"));
            }
            stmts.push(self.stmt()?);
        }
    }

    fn def_stmt(&mut self) -> PResult<Stmt> {
        self.advance(); // def
        if self.check(Kind::LParen) {
            return self.function_or_interface();
        }
        let name = self.expect(Kind::Ident, "identifier")?;
        if self.check(Kind::Colon) {
            self.var_decl(name)
        } else {
            self.whole_decl(name)
        }
    }

    fn var_decl(&mut self, name: Token) -> PResult<Stmt> {
        self.advance(); // :
        let ty = self.parse_type()?;
        let init = if self.check(Kind::Eq) {
            self.advance();
            Some(self.expr()?)
        } else {
            None
        };
        Ok(Stmt::Var { name: name.literal, ty, init, line: name.line })
    }

    fn whole_decl(&mut self, name: Token) -> PResult<Stmt> {
        let mut inherit = Vec::new();
        if self.check(Kind::LArrow) {
            self.advance();
            inherit.push(self.expect(Kind::Ident, "parent name")?.literal);
            while self.check(Kind::Add) {
                self.advance();
                inherit.push(self.expect(Kind::Ident, "parent name")?.literal);
            }
        }
        let body = self.block_until(Kind::End)?;
        Ok(Stmt::Whole { name: name.literal, inherit, body: Box::new(Stmt::Block(body)), line: name.line })
    }

    /// Parses the parenthesized entry list shared by function and
    /// interface declarations. Most entries are `name [+ name]* : Type`,
    /// coalescing several parameter names onto one trailing type. An
    /// entry with no `:` (bare `self`-style receiver marker, e.g. the
    /// `(self)` in `def (self) speak -> str ... end`) contributes no
    /// bound parameter at all — it is consumed purely to let the same
    /// grammar double as a zero-argument receiver convention for both a
    /// whole's interface declarations and its concrete methods.
    fn arg_list(&mut self) -> PResult<Vec<Field>> {
        self.expect(Kind::LParen, "'('")?;
        let mut args = Vec::new();
        if !self.check(Kind::RParen) {
            loop {
                let mut names = vec![self.expect(Kind::Ident, "parameter name")?.literal];
                while self.check(Kind::Add) {
                    self.advance();
                    names.push(self.expect(Kind::Ident, "parameter name")?.literal);
                }
                if self.check(Kind::Colon) {
                    self.advance();
                    let ty = self.parse_type()?;
                    for n in names {
                        args.push(Field { name: n, ty: ty.clone() });
                    }
                }
                if self.check(Kind::Comma) {
                    self.advance();
                    continue;
                }
                break;
            }
        }
        self.expect(Kind::RParen, "')'")?;
        Ok(args)
    }

    fn function_or_interface(&mut self) -> PResult<Stmt> {
        let line = self.current().line;
        let args = self.arg_list()?;
        let is_interface = if self.check(Kind::Mul) {
            self.advance();
            true
        } else {
            false
        };
        let name = self.expect(Kind::Ident, "function name")?;
        let ret = if self.check(Kind::RArrow) {
            self.advance();
            Some(self.parse_type()?)
        } else {
            None
        };
        if is_interface {
            Ok(Stmt::Func { name: name.literal, args, ret, body: Box::new(Stmt::Block(vec![])), is_interface: true, line })
        } else {
            let body = self.block_until(Kind::End)?;
            Ok(Stmt::Func { name: name.literal, args, ret, body: Box::new(Stmt::Block(body)), is_interface: false, line })
        }
    }

    fn if_stmt(&mut self) -> PResult<Stmt> {
        self.advance(); // if
        let cond = self.expr()?;
        let (then_stmts, mut term) = self.block_any(&[Kind::End, Kind::Ef, Kind::Nf])?;
        let then_branch = Box::new(Stmt::Block(then_stmts));
        let mut ef_branches = Vec::new();
        while term == Kind::Ef {
            let ef_cond = self.expr()?;
            let (body, t) = self.block_any(&[Kind::End, Kind::Ef, Kind::Nf])?;
            ef_branches.push((ef_cond, Stmt::Block(body)));
            term = t;
        }
        let else_branch = if term == Kind::Nf {
            let body = self.block_until(Kind::End)?;
            Some(Box::new(Stmt::Block(body)))
        } else {
            None
        };
        Ok(Stmt::If { cond, then_branch, ef_branches, else_branch })
    }

    fn for_stmt(&mut self) -> PResult<Stmt> {
        let line = self.current().line;
        self.advance(); // for
        let cond = if self.check(Kind::RArrow) {
            self.advance();
            None
        } else {
            Some(self.expr()?)
        };
        let body = self.block_until(Kind::End)?;
        Ok(Stmt::For { cond, body: Box::new(Stmt::Block(body)), line })
    }

    fn do_stmt(&mut self) -> PResult<Stmt> {
        self.advance(); // do
        let mut body_stmts = Vec::new();
        while !self.check(Kind::For) {
            if self.check(Kind::Eof) {
                return Err(self.unexpected("'for'"));
            }
            body_stmts.push(self.stmt()?);
        }
        let loop_stmt = self.for_stmt()?;
        Ok(Stmt::Do { body: Box::new(Stmt::Block(body_stmts)), loop_stmt: Box::new(loop_stmt) })
    }

    fn out_stmt(&mut self) -> PResult<Stmt> {
        let line = self.current().line;
        self.advance();
        let value = if self.check(Kind::RArrow) {
            self.advance();
            None
        } else {
            Some(self.expr()?)
        };
        Ok(Stmt::Out { value, line })
    }

    fn tin_stmt(&mut self) -> PResult<Stmt> {
        let line = self.current().line;
        self.advance();
        let value = if self.check(Kind::RArrow) {
            self.advance();
            None
        } else {
            Some(self.expr()?)
        };
        Ok(Stmt::Tin { value, line })
    }

    fn and_stmt(&mut self) -> PResult<Stmt> {
        self.advance(); // and
        self.expect(Kind::RArrow, "'->'")?;
        let alias = self.expect(Kind::Ident, "alias name")?;
        let body = self.block_until(Kind::End)?;
        Ok(Stmt::And { alias: alias.literal, body: Box::new(Stmt::Block(body)) })
    }

    fn mod_stmt(&mut self) -> PResult<Stmt> {
        self.advance();
        let name = self.expect(Kind::Ident, "module name")?;
        Ok(Stmt::Mod { name: name.literal })
    }

    fn use_stmt(&mut self) -> PResult<Stmt> {
        self.advance();
        let name = self.expect(Kind::Ident, "module name")?;
        let alias = if self.check(Kind::As) {
            self.advance();
            Some(self.expect(Kind::Ident, "alias")?.literal)
        } else {
            None
        };
        Ok(Stmt::Use { name: name.literal, alias })
    }

    fn ret_stmt(&mut self) -> PResult<Stmt> {
        self.advance();
        if self.check(Kind::RArrow) {
            self.advance();
            Ok(Stmt::Ret(None))
        } else {
            let e = self.expr()?;
            Ok(Stmt::Ret(Some(Box::new(Stmt::Expr(e)))))
        }
    }

    fn inherit_stmt(&mut self) -> PResult<Stmt> {
        self.advance();
        let mut names = vec![self.expect(Kind::Ident, "parent name")?.literal];
        while self.check(Kind::Add) {
            self.advance();
            names.push(self.expect(Kind::Ident, "parent name")?.literal);
        }
        Ok(Stmt::Inherit(names))
    }

    fn pub_stmt(&mut self) -> PResult<Stmt> {
        self.advance();
        let inner = self.stmt()?;
        Ok(Stmt::Pub(Box::new(inner)))
    }

    // --- types -------------------------------------------------------------

    fn parse_type(&mut self) -> PResult<Type> {
        if self.check(Kind::Ident) {
            let tok = self.advance();
            Ok(match tok.literal.as_str() {
                "int" => Type::Int,
                "float" => Type::Float,
                "str" => Type::Str,
                "char" => Type::Char,
                "bool" => Type::Bool,
                _ => Type::UserRef(tok.literal),
            })
        } else if self.check(Kind::LBracket) {
            self.advance();
            let inner = self.parse_type()?;
            self.expect(Kind::RBracket, "']'")?;
            Ok(Type::Array(Rc::new(inner)))
        } else if self.check(Kind::Less) {
            self.advance();
            let k = self.parse_type()?;
            self.expect(Kind::Comma, "','")?;
            let v = self.parse_type()?;
            self.expect(Kind::Greater, "'>'")?;
            Ok(Type::Map(Rc::new(k), Rc::new(v)))
        } else if self.check(Kind::LParen) {
            self.advance();
            let t = self.parse_type()?;
            self.expect(Kind::RParen, "')'")?;
            Ok(Type::Tuple(Rc::new(t)))
        } else {
            Err(self.invalid("expected a type"))
        }
    }

    // --- expressions: precedence climbing -----------------------------------

    fn expr(&mut self) -> PResult<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> PResult<Expr> {
        let left = self.logical_or()?;
        if self.check(Kind::Eq) {
            self.advance();
            let value = self.assignment()?;
            return match left {
                Expr::Name(_) | Expr::Index(_, _) => Ok(Expr::Assign(Box::new(left), Box::new(value))),
                Expr::Get(obj, name) => Ok(Expr::Set(obj, name, Box::new(value))),
                _ => Err(self.invalid("cannot assign value")),
            };
        }
        Ok(left)
    }

    fn logical_or(&mut self) -> PResult<Expr> {
        let mut left = self.logical_and()?;
        while self.check(Kind::Or) {
            let op = self.advance();
            let right = self.logical_and()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    fn logical_and(&mut self) -> PResult<Expr> {
        let mut left = self.equality()?;
        while self.check(Kind::Addr) {
            let op = self.advance();
            let right = self.equality()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    fn equality(&mut self) -> PResult<Expr> {
        let mut left = self.comparison()?;
        while self.check(Kind::EqEq) || self.check(Kind::BangEq) {
            let op = self.advance();
            let right = self.comparison()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    fn comparison(&mut self) -> PResult<Expr> {
        let mut left = self.additive()?;
        while matches!(self.current().kind, Kind::Greater | Kind::GrEq | Kind::Less | Kind::LeEq) {
            let op = self.advance();
            let right = self.additive()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    fn additive(&mut self) -> PResult<Expr> {
        let mut left = self.multiplicative()?;
        while matches!(self.current().kind, Kind::Add | Kind::Sub | Kind::AsAdd | Kind::AsSub) {
            let op = self.advance();
            let right = self.multiplicative()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    fn multiplicative(&mut self) -> PResult<Expr> {
        let mut left = self.unary()?;
        while matches!(self.current().kind, Kind::Mul | Kind::Div | Kind::AsMul | Kind::AsDiv | Kind::Sur | Kind::AsSur) {
            let op = self.advance();
            let right = self.unary()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    fn unary(&mut self) -> PResult<Expr> {
        if self.check(Kind::Bang) || self.check(Kind::Sub) {
            let op = self.advance();
            let operand = self.unary()?;
            Ok(Expr::Unary(op, Box::new(operand)))
        } else {
            self.call()
        }
    }

    fn call(&mut self) -> PResult<Expr> {
        let mut expr = self.primary()?;
        loop {
            if self.check(Kind::LParen) {
                self.advance();
                let mut args = Vec::new();
                if !self.check(Kind::RParen) {
                    args.push(self.expr()?);
                    while self.check(Kind::Comma) {
                        self.advance();
                        args.push(self.expr()?);
                    }
                }
                self.expect(Kind::RParen, "')'")?;
                expr = Expr::Call(Box::new(expr), args);
            } else if self.check(Kind::Dot) {
                self.advance();
                let name = self.expect(Kind::Ident, "member name")?;
                expr = Expr::Get(Box::new(expr), name);
            } else if self.check(Kind::LBracket) {
                self.advance();
                let idx = self.expr()?;
                self.expect(Kind::RBracket, "']'")?;
                expr = Expr::Index(Box::new(expr), Box::new(idx));
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn primary(&mut self) -> PResult<Expr> {
        match self.current().kind {
            Kind::Num | Kind::Float | Kind::Str | Kind::Char => {
                let tok = self.advance();
                Ok(Expr::Literal(tok))
            }
            Kind::Ident => {
                let tok = self.advance();
                Ok(Expr::Name(tok))
            }
            Kind::LParen => self.group_or_tuple(),
            Kind::LBracket => self.array_lit(),
            Kind::LBrace => self.map_lit(),
            Kind::New => self.new_expr(),
            _ => Err(self.invalid("expected an expression")),
        }
    }

    fn group_or_tuple(&mut self) -> PResult<Expr> {
        self.advance(); // (
        if self.check(Kind::RParen) {
            self.advance();
            return Ok(Expr::Tuple(Vec::new()));
        }
        let first = self.expr()?;
        if self.check(Kind::Comma) {
            let mut elems = vec![first];
            while self.check(Kind::Comma) {
                self.advance();
                elems.push(self.expr()?);
            }
            self.expect(Kind::RParen, "')'")?;
            Ok(Expr::Tuple(elems))
        } else {
            self.expect(Kind::RParen, "')'")?;
            Ok(Expr::Group(Box::new(first)))
        }
    }

    fn array_lit(&mut self) -> PResult<Expr> {
        self.advance(); // [
        let mut elems = Vec::new();
        if !self.check(Kind::RBracket) {
            elems.push(self.expr()?);
            while self.check(Kind::Comma) {
                self.advance();
                elems.push(self.expr()?);
            }
        }
        self.expect(Kind::RBracket, "']'")?;
        Ok(Expr::Array(elems))
    }

    fn map_lit(&mut self) -> PResult<Expr> {
        self.advance(); // {
        let mut pairs = Vec::new();
        if !self.check(Kind::RBrace) {
            loop {
                let k = self.expr()?;
                self.expect(Kind::Colon, "':'")?;
                let v = self.expr()?;
                pairs.push((k, v));
                if self.check(Kind::Comma) {
                    self.advance();
                    continue;
                }
                break;
            }
        }
        self.expect(Kind::RBrace, "'}'")?;
        Ok(Expr::Map(pairs))
    }

    fn new_expr(&mut self) -> PResult<Expr> {
        self.advance(); // new
        let name = self.expect(Kind::Ident, "type name")?;
        let mut fields = Vec::new();
        if self.check(Kind::LBrace) {
            self.advance();
            if !self.check(Kind::RBrace) {
                loop {
                    let fname = self.expect(Kind::Ident, "field name")?;
                    self.expect(Kind::Colon, "':'")?;
                    let fval = self.expr()?;
                    fields.push((fname, fval));
                    if self.check(Kind::Comma) {
                        self.advance();
                        continue;
                    }
                    break;
                }
            }
            self.expect(Kind::RBrace, "'}'")?;
        }
        Ok(Expr::New(name, fields))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn parse(src: &str) -> Vec<Stmt> {
        let tokens = Lexer::new(src).tokenize().unwrap();
        Parser::new(tokens).parse_program().unwrap()
    }

    #[test]
    fn parses_var_decl_with_binary_init() {
        let stmts = parse("def x: int = 3 + 4 * 2");
        assert_eq!(stmts.len(), 1);
        match &stmts[0] {
            Stmt::Var { name, ty, init, .. } => {
                assert_eq!(name, "x");
                assert_eq!(*ty, Type::Int);
                assert!(init.is_some());
            }
            other => panic!("expected Var, got {other:?}"),
        }
    }

    #[test]
    fn parses_array_index_and_assignment() {
        let stmts = parse("a[1] = 2");
        match &stmts[0] {
            Stmt::Expr(Expr::Assign(target, _)) => {
                assert!(matches!(**target, Expr::Index(_, _)));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn parses_if_ef_nf_chain() {
        let stmts = parse("if a puts(1) ef b puts(2) nf puts(3) end");
        match &stmts[0] {
            Stmt::If { ef_branches, else_branch, .. } => {
                assert_eq!(ef_branches.len(), 1);
                assert!(else_branch.is_some());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn parses_for_loop_infinite_form() {
        let stmts = parse("for -> out -> end");
        match &stmts[0] {
            Stmt::For { cond, .. } => assert!(cond.is_none()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn parses_whole_with_inherit_and_interface() {
        let stmts = parse(
            "def (self) *speak -> str\n\
             def Dog <- Animal\n\
             def (self) speak -> str ret \"woof\" end\n\
             end",
        );
        assert!(matches!(stmts[0], Stmt::Func { is_interface: true, .. }));
        match &stmts[1] {
            Stmt::Whole { name, inherit, .. } => {
                assert_eq!(name, "Dog");
                assert_eq!(inherit, &vec!["Animal".to_string()]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn parses_new_with_fields() {
        let stmts = parse("def p: Point = new Point { x: 1, y: 2 }");
        match &stmts[0] {
            Stmt::Var { init: Some(Expr::New(name, fields)), .. } => {
                assert_eq!(name.literal, "Point");
                assert_eq!(fields.len(), 2);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn coalesced_argument_names_share_type() {
        let stmts = parse("def (a + b + c: int) sum -> int ret a end");
        match &stmts[0] {
            Stmt::Func { args, .. } => {
                assert_eq!(args.len(), 3);
                assert!(args.iter().all(|f| f.ty == Type::Int));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
