//! A compiled unit of bytecode plus its pools, grounded on
//! `original_source/src/entity.h`.

use std::fmt::Write as _;

use crate::bytecode::opcode::Opcode;
use crate::object::Object;
use crate::types::Type;

/// Opcodes whose single operand indexes the constant pool.
fn uses_constant_pool(op: Opcode) -> bool {
    matches!(op, Opcode::Const | Opcode::Func | Opcode::Whole | Opcode::Enum)
}

/// Opcodes whose (first) operand indexes the name pool.
fn uses_name_pool(op: Opcode) -> bool {
    matches!(
        op,
        Opcode::Assign
            | Opcode::Load
            | Opcode::Name
            | Opcode::Get
            | Opcode::Set
            | Opcode::Mod
            | Opcode::Use
            | Opcode::Uas
            | Opcode::Cha
            | Opcode::End
            | Opcode::Store
            | Opcode::New
    )
}

/// A compiled function/whole/module body or the top-level program: the
/// parallel `codes`/`offsets` instruction stream plus the three constant
/// pools it indexes into.
#[derive(Debug, Clone)]
pub struct Entity {
    pub title: String,
    pub codes: Vec<Opcode>,
    pub offsets: Vec<usize>,
    pub constants: Vec<Object>,
    pub names: Vec<String>,
    pub types: Vec<Type>,
    /// Source line for each entry in `codes`, parallel to it. Used by the
    /// VM to stamp a real line number onto runtime exceptions.
    pub lines: Vec<i64>,
}

impl Entity {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            codes: Vec::new(),
            offsets: Vec::new(),
            constants: Vec::new(),
            names: Vec::new(),
            types: Vec::new(),
            lines: Vec::new(),
        }
    }

    /// The source line of instruction `ip`, or `0` if out of range.
    pub fn line_at(&self, ip: usize) -> i64 {
        self.lines.get(ip).copied().unwrap_or(0)
    }

    /// Total operand slots the emitted codes require; must equal
    /// `offsets.len()` for a well-formed entity.
    pub fn required_operand_slots(&self) -> usize {
        self.codes.iter().map(|c| c.operand_count()).sum()
    }

    /// The offsets-pool index at which instruction `ip`'s operands begin.
    /// Used to resynchronize the VM's operand pointer after a jump,
    /// instead of re-walking bytecode incrementally in the jump's
    /// direction the way the original VM's `addCounter` does.
    pub fn op_index_at(&self, ip: usize) -> usize {
        self.codes[..ip].iter().map(|c| c.operand_count()).sum()
    }

    pub fn disassemble(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "== {} ==", self.title);
        let mut op_idx = 0usize;
        for (ip, code) in self.codes.iter().enumerate() {
            let n = code.operand_count();
            let operands = &self.offsets[op_idx..op_idx + n];
            op_idx += n;
            let _ = write!(out, "{ip:>4}  {code:<8}");
            match (code, operands) {
                (c, [a]) if uses_constant_pool(*c) => {
                    let _ = write!(out, " {a:>4}  '{}'", self.constants[*a].stringer());
                }
                (c, [a]) if uses_name_pool(*c) => {
                    let _ = write!(out, " {a:>4}  '{}'", self.names[*a]);
                }
                (Opcode::Store, [name_idx, type_idx]) | (Opcode::New, [name_idx, type_idx]) => {
                    let _ = write!(out, " {name_idx:>4} {type_idx:>4}");
                }
                (Opcode::Uas, [a, b]) => {
                    let _ = write!(out, " {:>4} as {:>4}", self.names[*a], self.names.get(*b).cloned().unwrap_or_default());
                }
                (_, []) => {}
                (_, rest) => {
                    let _ = write!(out, " {rest:?}");
                }
            }
            let _ = writeln!(out);
        }
        let _ = writeln!(out, "-- constants --");
        for (i, c) in self.constants.iter().enumerate() {
            let _ = writeln!(out, "  {i:>3} {}", c.stringer());
        }
        let _ = writeln!(out, "-- names --");
        for (i, n) in self.names.iter().enumerate() {
            let _ = writeln!(out, "  {i:>3} {n}");
        }
        let _ = writeln!(out, "-- types --");
        for (i, t) in self.types.iter().enumerate() {
            let _ = writeln!(out, "  {i:>3} {t}");
        }
        out
    }
}
