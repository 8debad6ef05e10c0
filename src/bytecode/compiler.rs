//! AST -> Entity lowering, grounded on `original_source/src/compiler.cpp`.
//! The emitter itself follows the teacher's `CodeBuilder` shape
//! (`bytecode/builder.rs`): one struct owning the instruction stream and
//! pools, with small `emit_*` primitives and an explicit patch helper for
//! forward jumps, generalized here to the parallel-vector Entity model.

use std::collections::HashMap;
use std::rc::Rc;

use crate::ast::{Expr, Stmt};
use crate::bytecode::entity::Entity;
use crate::bytecode::opcode::Opcode;
use crate::errors::{CompileError, ExcKind};
use crate::object::{new_table, EnumObj, FuncObj, InterfaceSpec, Object, WholeObj};
use crate::token::{Kind as TokKind, Token};
use crate::types::Type;

use indexmap::IndexMap;

type CResult<T> = Result<T, CompileError>;

/// One compiled function/whole body in progress: its own entity plus a
/// name-dedup cache, matching `emitName`'s linear-dedup semantics from
/// the original compiler.
struct CodeBuilder {
    entity: Entity,
    name_cache: HashMap<String, usize>,
    /// The line stamped onto the next emitted opcode; updated by
    /// `set_line` as the compiler descends into each statement/expr.
    current_line: i64,
}

impl CodeBuilder {
    fn new(title: impl Into<String>) -> Self {
        Self { entity: Entity::new(title), name_cache: HashMap::new(), current_line: 0 }
    }

    fn set_line(&mut self, line: i64) {
        self.current_line = line;
    }

    fn emit_code(&mut self, op: Opcode) -> usize {
        self.entity.codes.push(op);
        self.entity.lines.push(self.current_line);
        self.entity.codes.len() - 1
    }

    fn emit_offset(&mut self, v: usize) -> usize {
        self.entity.offsets.push(v);
        self.entity.offsets.len() - 1
    }

    fn emit_constant(&mut self, c: Object) -> usize {
        self.entity.constants.push(c);
        self.entity.constants.len() - 1
    }

    fn emit_name(&mut self, name: &str) -> usize {
        if let Some(&idx) = self.name_cache.get(name) {
            return idx;
        }
        let idx = self.entity.names.len();
        self.entity.names.push(name.to_string());
        self.name_cache.insert(name.to_string(), idx);
        idx
    }

    fn emit_type(&mut self, ty: Type) -> usize {
        self.entity.types.push(ty);
        self.entity.types.len() - 1
    }

    fn current_ip(&self) -> usize {
        self.entity.codes.len()
    }

    /// Emits a jump opcode with a placeholder operand, returning the
    /// index into `offsets` to patch once the real target is known.
    fn emit_jump(&mut self, op: Opcode) -> usize {
        self.emit_code(op);
        self.emit_offset(0)
    }

    fn patch_jump(&mut self, offset_idx: usize, target: usize) {
        self.entity.offsets[offset_idx] = target;
    }
}

/// Tracks the patch sites for `out`/`tin` inside the loop currently being
/// compiled. Rather than the original's sentinel-and-rewalk technique,
/// this records exactly which offset slots need patching and to what —
/// the approach the spec's design notes recommend as less brittle.
#[derive(Default)]
struct LoopCtx {
    out_patches: Vec<usize>,
    tin_patches: Vec<usize>,
}

pub struct Compiler {
    stack: Vec<CodeBuilder>,
    loops: Vec<LoopCtx>,
}

impl Compiler {
    pub fn new() -> Self {
        Self { stack: Vec::new(), loops: Vec::new() }
    }

    pub fn compile_program(mut self, stmts: &[Stmt]) -> CResult<Entity> {
        self.stack.push(CodeBuilder::new("main"));
        for stmt in stmts {
            self.compile_stmt(stmt)?;
        }
        Ok(self.stack.pop().unwrap().entity)
    }

    fn cb(&mut self) -> &mut CodeBuilder {
        self.stack.last_mut().expect("code builder stack must not be empty")
    }

    fn compile_stmt(&mut self, stmt: &Stmt) -> CResult<()> {
        self.cb().set_line(stmt.line());
        match stmt {
            Stmt::Expr(e) => {
                self.compile_expr(e)?;
                Ok(())
            }
            Stmt::Var { name, ty, init, line } => self.compile_var(name, ty, init.as_ref(), *line),
            Stmt::Block(stmts) => {
                for s in stmts {
                    self.compile_stmt(s)?;
                }
                Ok(())
            }
            Stmt::If { cond, then_branch, ef_branches, else_branch } => {
                self.compile_if(cond, then_branch, ef_branches, else_branch.as_deref())
            }
            Stmt::For { cond, body, line } => self.compile_for(cond.as_ref(), body, *line),
            Stmt::Do { body, loop_stmt } => {
                self.compile_stmt(body)?;
                self.compile_stmt(loop_stmt)
            }
            Stmt::Out { value, line } => self.compile_break(value.as_ref(), *line, true),
            Stmt::Tin { value, line } => self.compile_break(value.as_ref(), *line, false),
            Stmt::Func { name, args, ret, body, is_interface, line } => {
                if *is_interface {
                    // Interface-only declarations carry no body; they are
                    // collected directly by `compile_whole` and must never
                    // reach here at the top level of a program.
                    return Err(CompileError {
                        kind: ExcKind::InvalidSyntax,
                        message: format!("interface declaration '{name}' outside of a whole body"),
                        line: *line,
                    });
                }
                self.compile_func(name, args, ret.as_ref(), body, *line)
            }
            Stmt::Whole { name, inherit, body, line } => self.compile_whole(name, inherit, body, *line),
            Stmt::Enum { name, fields, line } => self.compile_enum(name, fields, *line),
            Stmt::Inherit(_) => Ok(()),
            Stmt::And { alias, body } => {
                let name_idx = self.cb().emit_name(alias);
                self.cb().emit_code(Opcode::Cha);
                self.cb().emit_offset(name_idx);
                self.compile_stmt(body)?;
                self.cb().emit_code(Opcode::End);
                self.cb().emit_offset(name_idx);
                Ok(())
            }
            Stmt::Mod { name } => {
                let idx = self.cb().emit_name(name);
                self.cb().emit_code(Opcode::Mod);
                self.cb().emit_offset(idx);
                Ok(())
            }
            Stmt::Use { name, alias } => {
                let name_idx = self.cb().emit_name(name);
                if let Some(a) = alias {
                    let alias_idx = self.cb().emit_name(a);
                    self.cb().emit_code(Opcode::Uas);
                    self.cb().emit_offset(name_idx);
                    self.cb().emit_offset(alias_idx);
                } else {
                    self.cb().emit_code(Opcode::Use);
                    self.cb().emit_offset(name_idx);
                }
                Ok(())
            }
            Stmt::Ret(inner) => {
                match inner {
                    Some(s) => {
                        self.compile_stmt(s)?;
                        self.cb().emit_code(Opcode::Ret);
                    }
                    None => {
                        self.cb().emit_code(Opcode::RetN);
                    }
                }
                Ok(())
            }
            Stmt::Pub(inner) => {
                self.compile_stmt(inner)?;
                self.cb().emit_code(Opcode::Pub);
                Ok(())
            }
            Stmt::Del(_) => Ok(()),
        }
    }

    fn compile_var(&mut self, name: &str, ty: &Type, init: Option<&Expr>, line: i64) -> CResult<()> {
        match init {
            Some(e) => self.compile_expr(e)?,
            None => {
                self.cb().emit_code(Opcode::Orig);
            }
        }
        let name_idx = self.cb().emit_name(name);
        let type_idx = self.cb().emit_type(ty.clone());
        self.cb().set_line(line);
        self.cb().emit_code(Opcode::Store);
        self.cb().emit_offset(name_idx);
        self.cb().emit_offset(type_idx);
        Ok(())
    }

    fn compile_if(
        &mut self,
        cond: &Expr,
        then_branch: &Stmt,
        ef_branches: &[(Expr, Stmt)],
        else_branch: Option<&Stmt>,
    ) -> CResult<()> {
        let mut end_patches = Vec::new();

        self.compile_expr(cond)?;
        let mut next_patch = self.cb().emit_jump(Opcode::FJump);
        self.compile_stmt(then_branch)?;
        end_patches.push(self.cb().emit_jump(Opcode::Jump));
        let after_then = self.cb().current_ip();
        self.cb().patch_jump(next_patch, after_then);

        for (ef_cond, ef_body) in ef_branches {
            self.compile_expr(ef_cond)?;
            next_patch = self.cb().emit_jump(Opcode::FJump);
            self.compile_stmt(ef_body)?;
            end_patches.push(self.cb().emit_jump(Opcode::Jump));
            let after = self.cb().current_ip();
            self.cb().patch_jump(next_patch, after);
        }

        if let Some(else_body) = else_branch {
            self.compile_stmt(else_body)?;
        }

        let end_ip = self.cb().current_ip();
        for idx in end_patches {
            self.cb().patch_jump(idx, end_ip);
        }
        Ok(())
    }

    fn compile_for(&mut self, cond: Option<&Expr>, body: &Stmt, line: i64) -> CResult<()> {
        let original = self.cb().current_ip();
        self.loops.push(LoopCtx::default());

        let f_jump_patch = if let Some(c) = cond {
            self.compile_expr(c)?;
            Some(self.cb().emit_jump(Opcode::FJump))
        } else {
            None
        };

        self.compile_stmt(body)?;

        self.cb().set_line(line);
        let back_patch = self.cb().emit_jump(Opcode::Jump);
        self.cb().patch_jump(back_patch, original);

        let after = self.cb().current_ip();
        if let Some(idx) = f_jump_patch {
            self.cb().patch_jump(idx, after);
        }

        let ctx = self.loops.pop().expect("loop context pushed above");
        for idx in ctx.out_patches {
            self.cb().patch_jump(idx, after);
        }
        for idx in ctx.tin_patches {
            self.cb().patch_jump(idx, original);
        }
        Ok(())
    }

    fn compile_break(&mut self, value: Option<&Expr>, line: i64, is_out: bool) -> CResult<()> {
        self.cb().set_line(line);
        if self.loops.is_empty() {
            return Err(CompileError {
                kind: ExcKind::InvalidSyntax,
                message: format!("'{}' used outside of a loop", if is_out { "out" } else { "tin" }),
                line,
            });
        }
        let patch_idx = match value {
            Some(e) => {
                self.compile_expr(e)?;
                self.cb().emit_jump(Opcode::TJump)
            }
            None => self.cb().emit_jump(Opcode::Jump),
        };
        let ctx = self.loops.last_mut().unwrap();
        if is_out {
            ctx.out_patches.push(patch_idx);
        } else {
            ctx.tin_patches.push(patch_idx);
        }
        Ok(())
    }

    fn compile_func(
        &mut self,
        name: &str,
        args: &[crate::ast::Field],
        ret: Option<&Type>,
        body: &Stmt,
        line: i64,
    ) -> CResult<()> {
        self.stack.push(CodeBuilder::new(name));
        self.loops.push(LoopCtx::default()); // functions don't inherit the enclosing loop's out/tin
        self.compile_stmt(body)?;
        self.loops.pop();
        let entity = self.stack.pop().unwrap().entity;

        let func = FuncObj {
            name: name.to_string(),
            params: args.iter().map(|f| (f.name.clone(), f.ty.clone())).collect(),
            ret: ret.cloned(),
            entity: Rc::new(entity),
        };
        let const_idx = self.cb().emit_constant(Object::Func(Rc::new(func)));
        self.cb().set_line(line);
        self.cb().emit_code(Opcode::Func);
        self.cb().emit_offset(const_idx);
        Ok(())
    }

    fn compile_whole(&mut self, name: &str, inherit: &[String], body: &Stmt, line: i64) -> CResult<()> {
        let stmts: &[Stmt] = match body {
            Stmt::Block(s) => s,
            other => std::slice::from_ref(other),
        };

        let mut interface = Vec::new();
        let mut real_stmts = Vec::new();
        for s in stmts {
            if let Stmt::Func { name: fname, args, ret, is_interface: true, .. } = s {
                interface.push(InterfaceSpec {
                    name: fname.clone(),
                    params: args.iter().map(|f| f.ty.clone()).collect(),
                    ret: ret.clone(),
                });
            } else {
                real_stmts.push(s.clone());
            }
        }

        self.stack.push(CodeBuilder::new(name));
        for s in &real_stmts {
            self.compile_stmt(s)?;
        }
        let entity = self.stack.pop().unwrap().entity;

        let whole = WholeObj {
            name: name.to_string(),
            entity: Rc::new(entity),
            interface,
            inherit: inherit.to_vec(),
            table: new_table(),
        };
        let const_idx = self.cb().emit_constant(Object::Whole(Rc::new(whole)));
        self.cb().set_line(line);
        self.cb().emit_code(Opcode::Whole);
        self.cb().emit_offset(const_idx);
        Ok(())
    }

    fn compile_enum(&mut self, name: &str, fields: &[String], line: i64) -> CResult<()> {
        let labels: IndexMap<i64, String> = fields.iter().enumerate().map(|(i, f)| (i as i64, f.clone())).collect();
        let enum_obj = EnumObj { name: name.to_string(), labels };
        let const_idx = self.cb().emit_constant(Object::Enum(Rc::new(enum_obj)));
        self.cb().set_line(line);
        self.cb().emit_code(Opcode::Enum);
        self.cb().emit_offset(const_idx);
        Ok(())
    }

    fn compile_expr(&mut self, expr: &Expr) -> CResult<()> {
        self.cb().set_line(expr.line());
        match expr {
            Expr::Literal(tok) => self.compile_literal(tok),
            Expr::Binary(left, op, right) => self.compile_binary(left, op, right),
            Expr::Group(inner) => self.compile_expr(inner),
            Expr::Unary(op, operand) => {
                self.compile_expr(operand)?;
                let code = match op.kind {
                    TokKind::Bang => Opcode::Bang,
                    TokKind::Sub => Opcode::Not,
                    _ => {
                        return Err(CompileError {
                            kind: ExcKind::InvalidSyntax,
                            message: "invalid unary operator".into(),
                            line: op.line,
                        })
                    }
                };
                self.cb().emit_code(code);
                Ok(())
            }
            Expr::Name(tok) => {
                let idx = self.cb().emit_name(&tok.literal);
                self.cb().emit_code(Opcode::Load);
                self.cb().emit_offset(idx);
                Ok(())
            }
            Expr::Call(callee, args) => {
                self.compile_expr(callee)?;
                for a in args.iter().rev() {
                    self.compile_expr(a)?;
                }
                self.cb().emit_code(Opcode::Call);
                self.cb().emit_offset(args.len());
                Ok(())
            }
            Expr::Get(obj, name) => {
                self.compile_expr(obj)?;
                let idx = self.cb().emit_name(&name.literal);
                self.cb().emit_code(Opcode::Get);
                self.cb().emit_offset(idx);
                Ok(())
            }
            Expr::Set(obj, name, value) => {
                self.compile_expr(value)?;
                self.compile_expr(obj)?;
                let idx = self.cb().emit_name(&name.literal);
                self.cb().emit_code(Opcode::Set);
                self.cb().emit_offset(idx);
                Ok(())
            }
            Expr::Assign(target, value) => self.compile_assign(target, value),
            Expr::Array(elems) => {
                for e in elems.iter().rev() {
                    self.compile_expr(e)?;
                }
                self.cb().emit_code(Opcode::BArr);
                self.cb().emit_offset(elems.len());
                Ok(())
            }
            Expr::Tuple(elems) => {
                for e in elems.iter().rev() {
                    self.compile_expr(e)?;
                }
                self.cb().emit_code(Opcode::BTup);
                self.cb().emit_offset(elems.len());
                Ok(())
            }
            Expr::Map(pairs) => {
                for (k, v) in pairs.iter().rev() {
                    self.compile_expr(k)?;
                    self.compile_expr(v)?;
                }
                self.cb().emit_code(Opcode::BMap);
                self.cb().emit_offset(pairs.len() * 2);
                Ok(())
            }
            Expr::Index(container, index) => {
                self.compile_expr(index)?;
                self.compile_expr(container)?;
                self.cb().emit_code(Opcode::Index);
                Ok(())
            }
            Expr::New(name, fields) => {
                for (fname, fval) in fields {
                    let name_idx = self.cb().emit_name(&fname.literal);
                    self.cb().emit_code(Opcode::Name);
                    self.cb().emit_offset(name_idx);
                    self.compile_expr(fval)?;
                }
                let type_idx = self.cb().emit_name(&name.literal);
                self.cb().emit_code(Opcode::New);
                self.cb().emit_offset(type_idx);
                self.cb().emit_offset(fields.len() * 2);
                Ok(())
            }
        }
    }

    fn compile_literal(&mut self, tok: &Token) -> CResult<()> {
        let obj = match tok.kind {
            TokKind::Num => Object::Int(tok.literal.parse::<i64>().map_err(|_| CompileError {
                kind: ExcKind::TypeError,
                message: format!("invalid integer literal '{}'", tok.literal),
                line: tok.line,
            })?),
            TokKind::Float => Object::Float(tok.literal.parse::<f64>().map_err(|_| CompileError {
                kind: ExcKind::TypeError,
                message: format!("invalid float literal '{}'", tok.literal),
                line: tok.line,
            })?),
            TokKind::Str => {
                let long = tok.is_long_string();
                let text = if long { tok.literal.trim_end_matches('`').to_string() } else { tok.literal.clone() };
                Object::Str(Rc::new(text), long)
            }
            TokKind::Char => Object::Char(*tok.literal.as_bytes().first().unwrap_or(&0)),
            _ => {
                return Err(CompileError {
                    kind: ExcKind::InvalidSyntax,
                    message: "expected a literal token".into(),
                    line: tok.line,
                })
            }
        };
        let idx = self.cb().emit_constant(obj);
        self.cb().emit_code(Opcode::Const);
        self.cb().emit_offset(idx);
        Ok(())
    }

    fn compile_binary(&mut self, left: &Expr, op: &Token, right: &Expr) -> CResult<()> {
        self.compile_expr(left)?;
        self.compile_expr(right)?;
        let code = match op.kind {
            TokKind::Add | TokKind::AsAdd => Opcode::Add,
            TokKind::Sub | TokKind::AsSub => Opcode::Sub,
            TokKind::Mul | TokKind::AsMul => Opcode::Mul,
            TokKind::Div | TokKind::AsDiv => Opcode::Div,
            TokKind::Sur | TokKind::AsSur => Opcode::Sur,
            TokKind::Greater => Opcode::Gr,
            TokKind::Less => Opcode::Le,
            TokKind::GrEq => Opcode::GrE,
            TokKind::LeEq => Opcode::LeE,
            TokKind::EqEq => Opcode::EE,
            TokKind::BangEq => Opcode::NE,
            TokKind::Addr => Opcode::And,
            TokKind::Or => Opcode::Or,
            _ => {
                return Err(CompileError {
                    kind: ExcKind::InvalidSyntax,
                    message: "invalid binary operator".into(),
                    line: op.line,
                })
            }
        };
        self.cb().emit_code(code);

        let is_compound = matches!(
            op.kind,
            TokKind::AsAdd | TokKind::AsSub | TokKind::AsMul | TokKind::AsDiv | TokKind::AsSur
        );
        if is_compound {
            match left {
                Expr::Name(tok) => {
                    let idx = self.cb().emit_name(&tok.literal);
                    self.cb().emit_code(Opcode::Assign);
                    self.cb().emit_offset(idx);
                }
                _ => {
                    return Err(CompileError {
                        kind: ExcKind::InvalidSyntax,
                        message: "compound assignment requires a name on the left".into(),
                        line: op.line,
                    })
                }
            }
        }
        Ok(())
    }

    fn compile_assign(&mut self, target: &Expr, value: &Expr) -> CResult<()> {
        self.compile_expr(value)?;
        match target {
            Expr::Name(tok) => {
                let idx = self.cb().emit_name(&tok.literal);
                self.cb().emit_code(Opcode::Assign);
                self.cb().emit_offset(idx);
                Ok(())
            }
            Expr::Index(container, index) => {
                self.compile_expr(index)?;
                self.compile_expr(container)?;
                self.cb().emit_code(Opcode::Replace);
                Ok(())
            }
            _ => Err(CompileError {
                kind: ExcKind::InvalidSyntax,
                message: "cannot assign value".into(),
                line: target.line(),
            }),
        }
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}
