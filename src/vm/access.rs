//! `GET`/`SET`/`INDEX`/`REPLACE`/`NEW` opcode handling, plus the shared
//! `typeChecker`/`setOriginalValue`/`objValueEquation` helpers, grounded
//! on the corresponding sections of `original_source/src/vm.cc`.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::errors::Exception;
use crate::object::{MapKey, Object, WholeObj};
use crate::types::Type;
use crate::vm::frame::Frame;
use crate::vm::VM;

/// `setOriginalValue`: the zero value a declared-but-uninitialized
/// variable receives (compiled as `ORIG` ahead of `STORE`).
pub fn default_for_type(ty: &Type, line: i64) -> Result<Object, Exception> {
    Ok(match ty {
        Type::Int => Object::Int(0),
        Type::Float => Object::Float(0.0),
        Type::Str => Object::str(""),
        Type::Char => Object::Char(0),
        Type::Bool => Object::Bool(false),
        Type::Array(_) => Object::Array(Rc::new(RefCell::new(Vec::new()))),
        Type::Tuple(_) => Object::Tuple(Rc::new(Vec::new())),
        Type::Map(_, _) => Object::Map(Rc::new(RefCell::new(IndexMap::new()))),
        other => return Err(Exception::runtime(format!("type '{other}' has no default value"), line)),
    })
}

/// `typeChecker`: recurses into array/tuple/map element types. A
/// `Bool`-declared slot accepts a raw `Int` too (the form a boolean
/// literal takes before `STORE`'s coercion runs), matching the source's
/// literal-before-coercion pipeline.
pub fn check_type(value: &Object, ty: &Type, line: i64) -> Result<(), Exception> {
    let ok = match (ty, value) {
        (Type::Int, Object::Int(_)) => true,
        (Type::Float, Object::Float(_)) => true,
        (Type::Str, Object::Str(_, _)) => true,
        (Type::Char, Object::Char(_)) => true,
        (Type::Bool, Object::Bool(_) | Object::Int(_)) => true,
        (Type::Array(elem), Object::Array(items)) => {
            for item in items.borrow().iter() {
                check_type(item, elem, line)?;
            }
            true
        }
        (Type::Tuple(elem), Object::Tuple(items)) => {
            for item in items.iter() {
                check_type(item, elem, line)?;
            }
            true
        }
        (Type::Map(kt, vt), Object::Map(entries)) => {
            for (k, v) in entries.borrow().iter() {
                check_type(&k.to_object(), kt, line)?;
                check_type(v, vt, line)?;
            }
            true
        }
        (Type::Func(_, _), Object::Func(_) | Object::Builtin(_)) => true,
        (Type::UserRef(name), Object::Whole(w)) => &w.name == name,
        (Type::UserRef(name), Object::Enum(e)) => &e.name == name,
        _ => false,
    };
    if ok {
        Ok(())
    } else {
        Err(Exception::runtime(format!("type error, require: {ty}, found: {}", value.kind_name()), line))
    }
}

/// Converts a raw `Int` into `Bool` for a `Bool`-declared slot, matching
/// `STORE`'s post-`typeChecker` coercion. A no-op for every other type.
pub fn coerce_bool(value: Object, ty: &Type) -> Object {
    match (ty, value) {
        (Type::Bool, Object::Int(i)) => Object::Bool(i != 0),
        (_, value) => value,
    }
}

/// `objValueEquation`: equality between two values already known to
/// share a key-representable type, used by `INDEX`/`REPLACE` on `Map`.
fn map_key_equal(needle: &Object, key: &MapKey) -> bool {
    MapKey::from_object(needle).map(|n| &n == key).unwrap_or(false)
}

pub fn exec_index(frame: &mut Frame, line: i64) -> Result<(), Exception> {
    let container = frame.pop(line)?;
    let index = frame.pop(line)?;
    let result = match &container {
        Object::Array(items) => {
            let i = as_index(&index, line)?;
            let items = items.borrow();
            items.get(i).cloned().ok_or_else(|| {
                Exception::runtime(format!("array out of bounds, index: {i} max: {}", items.len().saturating_sub(1)), line)
            })?
        }
        Object::Map(entries) => {
            let entries = entries.borrow();
            entries
                .iter()
                .find(|(k, _)| map_key_equal(&index, k))
                .map(|(_, v)| v.clone())
                .ok_or_else(|| Exception::runtime(format!("map does not have this key: {}", index.stringer()), line))?
        }
        Object::Str(s, _) => {
            let i = as_index(&index, line)?;
            let byte = *s.as_bytes().get(i).ok_or_else(|| {
                Exception::runtime(format!("string out of bounds, index: {i} max: {}", s.len().saturating_sub(1)), line)
            })?;
            Object::Char(byte)
        }
        other => return Err(Exception::runtime(format!("{} is not indexable", other.kind_name()), line)),
    };
    frame.push(result);
    Ok(())
}

fn as_index(obj: &Object, line: i64) -> Result<usize, Exception> {
    match obj {
        Object::Int(i) if *i >= 0 => Ok(*i as usize),
        Object::Int(_) => Err(Exception::runtime("index cannot be negative", line)),
        other => Err(Exception::runtime(format!("subscript index must be an int, found {}", other.kind_name()), line)),
    }
}

pub fn exec_replace(frame: &mut Frame, line: i64) -> Result<(), Exception> {
    let container = frame.pop(line)?;
    let index = frame.pop(line)?;
    let value = frame.pop(line)?;
    match &container {
        Object::Array(items) => {
            let i = as_index(&index, line)?;
            let mut items = items.borrow_mut();
            let len = items.len();
            let slot = items.get_mut(i).ok_or_else(|| {
                Exception::runtime(format!("array out of bounds, index: {i} max: {}", len.saturating_sub(1)), line)
            })?;
            *slot = value;
        }
        Object::Map(entries) => {
            let mut entries = entries.borrow_mut();
            if let Some((_, slot)) = entries.iter_mut().find(|(k, _)| map_key_equal(&index, k)) {
                *slot = value;
            } else {
                let key = MapKey::from_object(&index)
                    .ok_or_else(|| Exception::runtime("map key must be int, str, char, or bool", line))?;
                entries.insert(key, value);
            }
        }
        other => return Err(Exception::runtime(format!("{} does not support index assignment", other.kind_name()), line)),
    }
    Ok(())
}

pub fn exec_get(vm: &mut VM, name_idx_name: String, line: i64) -> Result<(), Exception> {
    let frame = vm.frames.last_mut().unwrap();
    let obj = frame.pop(line)?;
    match obj {
        Object::Tuple(items) => {
            let i: usize = name_idx_name
                .parse()
                .map_err(|_| Exception::runtime("tuple member access requires a numeric field", line))?;
            let value = items
                .get(i)
                .cloned()
                .ok_or_else(|| Exception::runtime(format!("tuple out of bounds, index: {i} max: {}", items.len().saturating_sub(1)), line))?;
            vm.frames.last_mut().unwrap().push(value);
        }
        Object::Enum(e) => {
            let idx = e
                .labels
                .iter()
                .find(|(_, label)| **label == name_idx_name)
                .map(|(i, _)| *i)
                .ok_or_else(|| Exception::runtime(format!("'{name_idx_name}' is not a member of enum '{}'", e.name), line))?;
            vm.frames.last_mut().unwrap().push(Object::Int(idx));
        }
        Object::Whole(w) => {
            let member = w.table.borrow().get(&name_idx_name).cloned();
            match member {
                Some(value) => {
                    if matches!(value, Object::Func(_)) {
                        let frame = vm.frames.last_mut().unwrap();
                        frame.pending_self = Some(w.table.clone());
                        frame.pending_inherit = w.inherit.clone();
                    }
                    vm.frames.last_mut().unwrap().push(value);
                }
                None => return Err(Exception::runtime(format!("'{name_idx_name}' is not a member of '{}'", w.name), line)),
            }
        }
        Object::Mods(mods) => {
            let found = mods.iter().find(|m| m.public.iter().any(|p| p == &name_idx_name));
            match found {
                Some(module) => {
                    let value = module
                        .table
                        .borrow()
                        .get(&name_idx_name)
                        .cloned()
                        .ok_or_else(|| Exception::runtime(format!("'{name_idx_name}' not found in module", ), line))?;
                    let frame = vm.frames.last_mut().unwrap();
                    frame.calling_module = Some(module.table.clone());
                    frame.push(value);
                }
                None => {
                    let names: Vec<&str> = mods.iter().map(|m| m.name.as_str()).collect();
                    return Err(Exception::runtime(
                        format!("module(s) '{}' have no public name '{name_idx_name}'", names.join(", ")),
                        line,
                    ));
                }
            }
        }
        other => return Err(Exception::runtime(format!("{} has no members", other.kind_name()), line)),
    }
    Ok(())
}

/// `SET`: assigns `obj.name = value`. The source's handler pops only one
/// value and stores the whole object into its own field (an apparent
/// bug — the computed value is left on the stack and discarded); this
/// pops both and stores the actual right-hand value, matching what
/// `Expr::Set` was compiled to mean.
pub fn exec_set(frame: &mut Frame, name: String, line: i64) -> Result<(), Exception> {
    let obj = frame.pop(line)?;
    let value = frame.pop(line)?;
    match obj {
        Object::Whole(w) => {
            w.table.borrow_mut().insert(name, value);
            Ok(())
        }
        other => Err(Exception::runtime(format!("cannot set a field on {}", other.kind_name()), line)),
    }
}

pub fn exec_new(vm: &mut VM, type_name: String, field_count: usize, line: i64) -> Result<(), Exception> {
    let frame = vm.frames.last_mut().unwrap();
    let mut pairs = Vec::with_capacity(field_count / 2);
    for _ in 0..(field_count / 2) {
        let value = frame.pop(line)?;
        let key = frame.pop(line)?;
        let key = match key {
            Object::Str(s, _) => (*s).clone(),
            other => return Err(Exception::runtime(format!("constructor field name must be a string, found {}", other.kind_name()), line)),
        };
        pairs.push((key, value));
    }

    let whole = match lookup_name(frame, &type_name) {
        Some(Object::Whole(w)) => w,
        Some(_) => return Err(Exception::runtime(format!("'{type_name}' is not a whole", ), line)),
        None => return Err(Exception::runtime(format!("not defined whole of '{type_name}'", ), line)),
    };

    for (key, value) in pairs {
        whole.table.borrow_mut().insert(key, value);
    }

    check_interface_conformance(vm, &whole, line)?;

    vm.frames.last_mut().unwrap().push(Object::Whole(whole));
    Ok(())
}

fn lookup_name(frame: &Frame, name: &str) -> Option<Object> {
    frame.table.borrow().get(name).cloned()
}

/// For each inherited parent, checks that the whole's own table provides
/// a `Func` member matching every entry in the parent's declared
/// `interface`: same name, matching parameter kinds (positional), and a
/// matching return kind.
fn check_interface_conformance(vm: &mut VM, whole: &Rc<WholeObj>, line: i64) -> Result<(), Exception> {
    if whole.inherit.is_empty() {
        return Ok(());
    }
    let root = vm.frames.first().expect("main frame always present");
    for parent_name in &whole.inherit {
        let parent = match lookup_name(root, parent_name) {
            Some(Object::Whole(w)) => w,
            Some(_) => return Err(Exception::runtime(format!("inheritance '{parent_name}' is not a whole"), line)),
            None => return Err(Exception::runtime(format!("inheritance '{parent_name}' does not exist"), line)),
        };
        for spec in &parent.interface {
            let table = whole.table.borrow();
            let member = table
                .get(&spec.name)
                .ok_or_else(|| Exception::runtime(format!("not inherited method '{}' of subclass", spec.name), line))?;
            let func = match member {
                Object::Func(f) => f,
                _ => return Err(Exception::runtime(format!("subclass inheritance '{}' is not a function", spec.name), line)),
            };
            if func.ret.as_ref().map(Type::kind_name) != spec.ret.as_ref().map(Type::kind_name) {
                return Err(Exception::runtime(format!("bad return type for subclass inheritance '{}'", spec.name), line));
            }
            if func.params.len() != spec.params.len() {
                return Err(Exception::runtime(format!("inconsistent arguments for subclass inheritance '{}'", spec.name), line));
            }
            for ((_, actual_ty), expected_ty) in func.params.iter().zip(spec.params.iter()) {
                if !actual_ty.conforms(expected_ty) {
                    return Err(Exception::runtime(
                        format!("subclass inheritance parameter {actual_ty} does not match {expected_ty}"),
                        line,
                    ));
                }
            }
        }
    }
    Ok(())
}
