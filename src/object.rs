//! Runtime value representation, grounded on
//! `original_source/src/object.hpp`, re-architected per the spec's design
//! notes as tagged enum variants (replacing the source's virtual-dispatch
//! class hierarchy) with `Rc`-shared heap payloads instead of raw
//! pointers.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::bytecode::entity::Entity;
use crate::types::Type;

/// A frame's symbol table. Plain `HashMap` — the source's `table.h` uses
/// `std::map` (ordered by key) which callers never rely on for order, so
/// no insertion-ordered structure is needed here.
pub type Table = HashMap<String, Object>;
pub type SharedTable = Rc<RefCell<Table>>;

pub fn new_table() -> SharedTable {
    Rc::new(RefCell::new(Table::new()))
}

/// A hashable projection of an `Object`, used as `Map` keys. Only the
/// primitive kinds the language allows as map keys are representable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MapKey {
    Int(i64),
    Str(String),
    Char(u8),
    Bool(bool),
}

impl MapKey {
    pub fn from_object(obj: &Object) -> Option<MapKey> {
        match obj {
            Object::Int(i) => Some(MapKey::Int(*i)),
            Object::Str(s, _) => Some(MapKey::Str((**s).clone())),
            Object::Char(c) => Some(MapKey::Char(*c)),
            Object::Bool(b) => Some(MapKey::Bool(*b)),
            _ => None,
        }
    }

    pub fn to_object(&self) -> Object {
        match self {
            MapKey::Int(i) => Object::Int(*i),
            MapKey::Str(s) => Object::Str(Rc::new(s.clone()), false),
            MapKey::Char(c) => Object::Char(*c),
            MapKey::Bool(b) => Object::Bool(*b),
        }
    }
}

#[derive(Debug, Clone)]
pub struct InterfaceSpec {
    pub name: String,
    pub params: Vec<Type>,
    pub ret: Option<Type>,
}

#[derive(Debug)]
pub struct FuncObj {
    pub name: String,
    pub params: Vec<(String, Type)>,
    pub ret: Option<Type>,
    pub entity: Rc<Entity>,
}

#[derive(Debug)]
pub struct WholeObj {
    pub name: String,
    pub entity: Rc<Entity>,
    pub interface: Vec<InterfaceSpec>,
    pub inherit: Vec<String>,
    pub table: SharedTable,
}

#[derive(Debug)]
pub struct EnumObj {
    pub name: String,
    pub labels: IndexMap<i64, String>,
}

#[derive(Debug)]
pub struct ModuleObj {
    pub name: String,
    pub table: SharedTable,
    pub public: Vec<String>,
}

/// Runtime value. Containers share their payload by `Rc` so aliasing
/// matches the source's pointer semantics without needing raw pointers or
/// a tracing collector.
#[derive(Debug, Clone)]
pub enum Object {
    Int(i64),
    Float(f64),
    Str(Rc<String>, bool),
    Char(u8),
    Bool(bool),
    Array(Rc<RefCell<Vec<Object>>>),
    Tuple(Rc<Vec<Object>>),
    Map(Rc<RefCell<IndexMap<MapKey, Object>>>),
    Enum(Rc<EnumObj>),
    Func(Rc<FuncObj>),
    Whole(Rc<WholeObj>),
    Module(Rc<ModuleObj>),
    Mods(Rc<Vec<Rc<ModuleObj>>>),
    /// A name pre-bound to one of the seven language builtins.
    Builtin(&'static str),
}

impl Object {
    pub fn str(s: impl Into<String>) -> Object {
        Object::Str(Rc::new(s.into()), false)
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Object::Int(_) => "int",
            Object::Float(_) => "float",
            Object::Str(_, _) => "str",
            Object::Char(_) => "char",
            Object::Bool(_) => "bool",
            Object::Array(_) => "array",
            Object::Tuple(_) => "tuple",
            Object::Map(_) => "map",
            Object::Enum(_) => "enum",
            Object::Func(_) => "func",
            Object::Whole(_) => "whole",
            Object::Module(_) => "module",
            Object::Mods(_) => "module",
            Object::Builtin(_) => "func",
        }
    }

    pub fn truthy(&self) -> bool {
        match self {
            Object::Int(i) => *i != 0,
            Object::Float(f) => *f != 0.0,
            Object::Bool(b) => *b,
            Object::Str(s, _) => !s.is_empty(),
            _ => true,
        }
    }

    /// `rawStringer` equivalent: the bare textual form used when
    /// concatenating into output (no quoting of strings/chars).
    pub fn stringer(&self) -> String {
        match self {
            Object::Int(i) => i.to_string(),
            Object::Float(f) => f.to_string(),
            Object::Str(s, _) => (**s).clone(),
            Object::Char(c) => (*c as char).to_string(),
            Object::Bool(b) => b.to_string(),
            Object::Array(items) => {
                let items = items.borrow();
                format!("[{}]", items.iter().map(Object::stringer).collect::<Vec<_>>().join(", "))
            }
            Object::Tuple(items) => {
                format!("({})", items.iter().map(Object::stringer).collect::<Vec<_>>().join(", "))
            }
            Object::Map(entries) => {
                let entries = entries.borrow();
                let body = entries
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k.to_object().stringer(), v.stringer()))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{{{body}}}")
            }
            Object::Enum(e) => format!("<enum {}>", e.name),
            Object::Func(f) => format!("<func {}>", f.name),
            Object::Whole(w) => format!("<whole {}>", w.name),
            Object::Module(m) => format!("<module {}>", m.name),
            Object::Mods(mods) => format!("<modules {}>", mods.first().map(|m| m.name.as_str()).unwrap_or("")),
            Object::Builtin(name) => format!("<builtin {name}>"),
        }
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.stringer())
    }
}
