//! Static type expressions produced by the parser, grounded on
//! `original_source/src/type.h`.

use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Int,
    Float,
    Str,
    Char,
    Bool,
    Array(Rc<Type>),
    Map(Rc<Type>, Rc<Type>),
    Tuple(Rc<Type>),
    Func(Vec<Type>, Option<Rc<Type>>),
    UserRef(String),
}

impl Type {
    /// A coarse kind tag used where the VM only needs to compare variant
    /// identity, not full structural equality (e.g. interface conformance
    /// checks in `NEW`).
    pub fn kind_name(&self) -> &'static str {
        match self {
            Type::Int => "int",
            Type::Float => "float",
            Type::Str => "str",
            Type::Char => "char",
            Type::Bool => "bool",
            Type::Array(_) => "array",
            Type::Map(_, _) => "map",
            Type::Tuple(_) => "tuple",
            Type::Func(_, _) => "func",
            Type::UserRef(_) => "user",
        }
    }

    /// Structural-equality-ish match used for interface conformance:
    /// user types match by name, everything else by kind (and, for
    /// containers, recursively).
    pub fn conforms(&self, other: &Type) -> bool {
        match (self, other) {
            (Type::Array(a), Type::Array(b)) => a.conforms(b),
            (Type::Map(k1, v1), Type::Map(k2, v2)) => k1.conforms(k2) && v1.conforms(v2),
            (Type::Tuple(a), Type::Tuple(b)) => a.conforms(b),
            (Type::UserRef(a), Type::UserRef(b)) => a == b,
            (Type::Func(_, _), Type::Func(_, _)) => true,
            _ => self.kind_name() == other.kind_name(),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => write!(f, "int"),
            Type::Float => write!(f, "float"),
            Type::Str => write!(f, "str"),
            Type::Char => write!(f, "char"),
            Type::Bool => write!(f, "bool"),
            Type::Array(t) => write!(f, "[{t}]"),
            Type::Map(k, v) => write!(f, "<{k},{v}>"),
            Type::Tuple(t) => write!(f, "({t})"),
            Type::Func(args, ret) => {
                write!(f, "(")?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{a}")?;
                }
                write!(f, ")")?;
                if let Some(r) = ret {
                    write!(f, " -> {r}")?;
                }
                Ok(())
            }
            Type::UserRef(name) => write!(f, "{name}"),
        }
    }
}
