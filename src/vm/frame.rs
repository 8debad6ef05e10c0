//! Call frame and symbol table, grounded on `original_source/src/frame.h`
//! and `original_source/src/table.h`.

use std::rc::Rc;

use crate::bytecode::entity::Entity;
use crate::object::{new_table, Object, SharedTable};

/// One activation record: the entity being executed, its symbol table,
/// an operand data stack, an optional return slot, and — when this frame
/// is compiling/executing a `mod` body — the module name and the list of
/// names it has published via `pub`.
pub struct Frame {
    pub entity: Rc<Entity>,
    pub table: SharedTable,
    pub data: Vec<Object>,
    pub ret: Option<Object>,
    pub mod_name: Option<String>,
    pub public_names: Vec<String>,
    /// Set by `GET` when the resolved member is a Whole method, so the
    /// following `CALL` binds `self` through the whole's own table
    /// instead of copying the caller's.
    pub pending_self: Option<SharedTable>,
    /// Paired with `pending_self`: the resolved whole's inherit list, to
    /// be installed as the new frame's `inherit` so method bodies can
    /// fall back to parent wholes' methods.
    pub pending_inherit: Vec<String>,
    /// Set by `GET`/`USE` when resolution crossed into a module, so
    /// subsequent bare-name `LOAD`s may fall back to that module's
    /// public bindings.
    pub calling_module: Option<SharedTable>,
    /// Names of the wholes this frame's method body may fall back to on
    /// a `LOAD` miss (populated from `pending_inherit` when a whole
    /// method's call frame is constructed).
    pub inherit: Vec<String>,
    /// Instruction pointer / operand-pool pointer. `op` always points at
    /// the next unread entry in `entity.offsets`; jumps resynchronize it
    /// via `Entity::op_index_at`.
    pub ip: usize,
    pub op: usize,
    /// Set once `RET`/`RET_N` executes so the dispatch loop stops even if
    /// `ip` has not reached the end of the entity.
    pub returned: bool,
}

impl Frame {
    pub fn new(entity: Rc<Entity>, table: SharedTable) -> Self {
        Self {
            entity,
            table,
            data: Vec::new(),
            ret: None,
            mod_name: None,
            public_names: Vec::new(),
            pending_self: None,
            pending_inherit: Vec::new(),
            calling_module: None,
            inherit: Vec::new(),
            ip: 0,
            op: 0,
            returned: false,
        }
    }

    /// Reads the next operand slot and advances the operand pointer.
    pub fn read_operand(&mut self) -> usize {
        let v = self.entity.offsets[self.op];
        self.op += 1;
        v
    }

    /// Jumps to `target` and resynchronizes the operand pointer to match.
    pub fn jump_to(&mut self, target: usize) {
        self.op = self.entity.op_index_at(target);
        self.ip = target;
    }

    pub fn with_fresh_table(entity: Rc<Entity>) -> Self {
        Self::new(entity, new_table())
    }

    pub fn push(&mut self, value: Object) {
        self.data.push(value);
    }

    pub fn pop(&mut self, line: i64) -> Result<Object, crate::errors::Exception> {
        self.data.pop().ok_or_else(|| crate::errors::Exception::runtime("data stack underflow", line))
    }
}
