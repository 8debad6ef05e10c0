//! Module registry and `MOD`/`USE`/`UAS`/`PUB`/`CHA`/`END` opcode
//! handling, grounded on `original_source/src/module.h`/`.cpp` (free
//! `addModule`/`getModule` functions) and the module section of
//! `original_source/src/vm.cc`.

use std::collections::HashMap;
use std::rc::Rc;

use crate::errors::Exception;
use crate::object::{ModuleObj, Object};
use crate::vm::frame::Frame;

/// Unlike the source's process-global free functions, this registry is
/// owned explicitly by the `VM` and threaded through as `&mut`, per the
/// spec's design notes on avoiding true singletons.
#[derive(Default)]
pub struct ModuleRegistry {
    modules: HashMap<String, Vec<Rc<ModuleObj>>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `module` under its name, rejecting it if any already
    /// registered module sharing that name publishes a conflicting name.
    pub fn register(&mut self, module: Rc<ModuleObj>, line: i64) -> Result<(), Exception> {
        if let Some(existing) = self.modules.get(&module.name) {
            for prior in existing {
                if let Some(clash) = module.public.iter().find(|n| prior.public.contains(n)) {
                    return Err(Exception::runtime(
                        format!("module '{}' redeclares public name '{clash}' already registered under that module name", module.name),
                        line,
                    ));
                }
            }
        }
        self.modules.entry(module.name.clone()).or_default().push(module);
        Ok(())
    }

    /// Resolves `use name` to every registered module sharing that name,
    /// supporting the multi-file-same-module-name case.
    pub fn lookup(&self, name: &str) -> Option<Vec<Rc<ModuleObj>>> {
        self.modules.get(name).cloned()
    }
}

pub fn exec_mod(frame: &mut Frame) {
    let idx = frame.read_operand();
    let name = frame.entity.names[idx].clone();
    frame.mod_name = Some(name);
}

pub fn exec_use(frame: &mut Frame, registry: &ModuleRegistry, line: i64) -> Result<(), Exception> {
    let idx = frame.read_operand();
    let name = frame.entity.names[idx].clone();
    bind_use(frame, registry, &name, &name, line)
}

pub fn exec_uas(frame: &mut Frame, registry: &ModuleRegistry, line: i64) -> Result<(), Exception> {
    let name_idx = frame.read_operand();
    let alias_idx = frame.read_operand();
    let name = frame.entity.names[name_idx].clone();
    let alias = frame.entity.names[alias_idx].clone();
    bind_use(frame, registry, &name, &alias, line)
}

fn bind_use(frame: &mut Frame, registry: &ModuleRegistry, name: &str, bind_as: &str, line: i64) -> Result<(), Exception> {
    let mods = registry
        .lookup(name)
        .ok_or_else(|| Exception::runtime(format!("no module named '{name}'"), line))?;
    frame.table.borrow_mut().insert(bind_as.to_string(), Object::Mods(Rc::new(mods)));
    Ok(())
}

pub fn exec_cha(frame: &mut Frame) {
    let _idx = frame.read_operand();
    // CHA/END bracket an aliased block purely for disassembly grouping;
    // no runtime state change accompanies entering the block.
}

pub fn exec_end(frame: &mut Frame) {
    let _idx = frame.read_operand();
}

/// Inspects the previously executed opcode to determine which name to
/// publish, matching the source's `PUB` runtime behavior.
pub fn exec_pub(frame: &mut Frame, line: i64) -> Result<(), Exception> {
    if frame.ip == 0 {
        return Err(Exception::runtime("'pub' with no preceding statement", line));
    }
    let prev_ip = frame.ip - 1;
    let prev_op = frame.entity.codes[prev_ip];
    use crate::bytecode::opcode::Opcode;
    let name = match prev_op {
        Opcode::Func | Opcode::Whole => {
            let const_idx = *frame
                .entity
                .offsets
                .get(frame.entity.op_index_at(prev_ip))
                .ok_or_else(|| Exception::runtime("malformed entity: missing pub operand", line))?;
            match &frame.entity.constants[const_idx] {
                Object::Func(f) => f.name.clone(),
                Object::Whole(w) => w.name.clone(),
                _ => return Err(Exception::runtime("'pub' target is not publishable", line)),
            }
        }
        Opcode::Store => {
            let name_idx = *frame
                .entity
                .offsets
                .get(frame.entity.op_index_at(prev_ip))
                .ok_or_else(|| Exception::runtime("malformed entity: missing pub operand", line))?;
            frame.entity.names[name_idx].clone()
        }
        _ => return Err(Exception::runtime("'pub' must follow a function, whole, or variable declaration", line)),
    };
    frame.public_names.push(name);
    Ok(())
}

/// Called when a frame that declared `mod name` terminates: materializes
/// the frame's table and public list into a `Module` and registers it.
pub fn finalize_module(frame: &Frame, registry: &mut ModuleRegistry, line: i64) -> Result<(), Exception> {
    if let Some(name) = &frame.mod_name {
        let module = ModuleObj { name: name.clone(), table: frame.table.clone(), public: frame.public_names.clone() };
        registry.register(Rc::new(module), line)?;
    }
    Ok(())
}
