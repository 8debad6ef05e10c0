//! Arithmetic, comparison, and logical opcode handling, grounded on the
//! binary-operator cases of `original_source/src/vm.cc`.

use crate::bytecode::opcode::Opcode;
use crate::errors::{ExcKind, Exception};
use crate::object::Object;

type VResult<T> = Result<T, Exception>;

fn as_num(obj: &Object) -> Option<f64> {
    match obj {
        Object::Int(i) => Some(*i as f64),
        Object::Float(f) => Some(*f),
        _ => None,
    }
}

fn both_int(a: &Object, b: &Object) -> Option<(i64, i64)> {
    match (a, b) {
        (Object::Int(x), Object::Int(y)) => Some((*x, *y)),
        _ => None,
    }
}

pub fn exec_add(a: Object, b: Object, line: i64) -> VResult<Object> {
    if let (Object::Str(x, xl), Object::Str(y, _)) = (&a, &b) {
        if *xl {
            return Err(Exception::runtime("cannot concatenate a long string", line));
        }
        return Ok(Object::str(format!("{x}{y}")));
    }
    match (as_num(&a), as_num(&b)) {
        (Some(x), Some(y)) => Ok(numeric_result(&a, &b, x + y)),
        _ => Err(Exception::runtime(format!("cannot add {} and {}", a.kind_name(), b.kind_name()), line)),
    }
}

pub fn exec_sub(a: Object, b: Object, line: i64) -> VResult<Object> {
    match (as_num(&a), as_num(&b)) {
        (Some(x), Some(y)) => Ok(numeric_result(&a, &b, x - y)),
        _ => Err(Exception::runtime(format!("cannot subtract {} and {}", a.kind_name(), b.kind_name()), line)),
    }
}

pub fn exec_mul(a: Object, b: Object, line: i64) -> VResult<Object> {
    match (as_num(&a), as_num(&b)) {
        (Some(x), Some(y)) => Ok(numeric_result(&a, &b, x * y)),
        _ => Err(Exception::runtime(format!("cannot multiply {} and {}", a.kind_name(), b.kind_name()), line)),
    }
}

pub fn exec_div(a: Object, b: Object, line: i64) -> VResult<Object> {
    let (x, y) = match (as_num(&a), as_num(&b)) {
        (Some(x), Some(y)) => (x, y),
        _ => return Err(Exception::runtime(format!("cannot divide {} by {}", a.kind_name(), b.kind_name()), line)),
    };
    if y == 0.0 {
        return Err(Exception::new(ExcKind::DivisionZero, "division by zero", line));
    }
    // Division always promotes to float when the left operand is Int,
    // per the literal text of the division-lowering rule (section 4.5).
    Ok(Object::Float(x / y))
}

pub fn exec_sur(a: Object, b: Object, line: i64) -> VResult<Object> {
    match both_int(&a, &b) {
        Some((x, y)) => {
            if y == 0 {
                return Err(Exception::new(ExcKind::DivisionZero, "modulo by zero", line));
            }
            Ok(Object::Int(x % y))
        }
        None => Err(Exception::runtime("'%' requires two ints", line)),
    }
}

fn numeric_result(a: &Object, b: &Object, value: f64) -> Object {
    if matches!(a, Object::Int(_)) && matches!(b, Object::Int(_)) {
        Object::Int(value as i64)
    } else {
        Object::Float(value)
    }
}

fn compare(a: &Object, b: &Object, line: i64) -> VResult<std::cmp::Ordering> {
    match (as_num(a), as_num(b)) {
        (Some(x), Some(y)) => Ok(x.partial_cmp(&y).unwrap_or(std::cmp::Ordering::Equal)),
        _ => match (a, b) {
            (Object::Char(x), Object::Char(y)) => Ok(x.cmp(y)),
            _ => Err(Exception::runtime(format!("cannot order {} and {}", a.kind_name(), b.kind_name()), line)),
        },
    }
}

pub fn exec_gr(a: Object, b: Object, line: i64) -> VResult<Object> {
    Ok(Object::Bool(compare(&a, &b, line)?.is_gt()))
}
pub fn exec_le(a: Object, b: Object, line: i64) -> VResult<Object> {
    Ok(Object::Bool(compare(&a, &b, line)?.is_lt()))
}
pub fn exec_gre(a: Object, b: Object, line: i64) -> VResult<Object> {
    Ok(Object::Bool(compare(&a, &b, line)?.is_ge()))
}
pub fn exec_lee(a: Object, b: Object, line: i64) -> VResult<Object> {
    Ok(Object::Bool(compare(&a, &b, line)?.is_le()))
}

fn values_equal(a: &Object, b: &Object) -> bool {
    match (a, b) {
        (Object::Int(x), Object::Int(y)) => x == y,
        (Object::Float(x), Object::Float(y)) => x == y,
        (Object::Int(x), Object::Float(y)) | (Object::Float(y), Object::Int(x)) => *x as f64 == *y,
        (Object::Str(x, _), Object::Str(y, _)) => x == y,
        (Object::Char(x), Object::Char(y)) => x == y,
        (Object::Bool(x), Object::Bool(y)) => x == y,
        (Object::Bool(x), Object::Int(y)) | (Object::Int(y), Object::Bool(x)) => *x == (*y != 0),
        (Object::Bool(x), Object::Float(y)) | (Object::Float(y), Object::Bool(x)) => *x == (*y != 0.0),
        _ => false,
    }
}

pub fn exec_ee(a: Object, b: Object) -> Object {
    Object::Bool(values_equal(&a, &b))
}
pub fn exec_ne(a: Object, b: Object) -> Object {
    Object::Bool(!values_equal(&a, &b))
}

/// `&`/`|` only accept Int, Float, or Bool operands, treating any
/// numeric value greater than zero (or a `true` Bool) as truthy —
/// stricter than `Object::truthy()`, which accepts any type.
fn logical_truth(obj: &Object, line: i64) -> VResult<bool> {
    match obj {
        Object::Int(i) => Ok(*i > 0),
        Object::Float(f) => Ok(*f > 0.0),
        Object::Bool(b) => Ok(*b),
        other => Err(Exception::runtime(
            format!("only number and boolean type to '&'/'|' operator, got {}", other.kind_name()),
            line,
        )),
    }
}

pub fn exec_and(a: Object, b: Object, line: i64) -> VResult<Object> {
    Ok(Object::Bool(logical_truth(&a, line)? && logical_truth(&b, line)?))
}
pub fn exec_or(a: Object, b: Object, line: i64) -> VResult<Object> {
    Ok(Object::Bool(logical_truth(&a, line)? || logical_truth(&b, line)?))
}

pub fn exec_bang(a: Object) -> Object {
    Object::Bool(!a.truthy())
}

pub fn exec_not(a: Object, line: i64) -> VResult<Object> {
    match a {
        Object::Int(i) => Ok(Object::Int(-i)),
        Object::Float(f) => Ok(Object::Float(-f)),
        other => Err(Exception::runtime(format!("cannot negate {}", other.kind_name()), line)),
    }
}

pub fn binary_handler(op: Opcode, a: Object, b: Object, line: i64) -> VResult<Object> {
    match op {
        Opcode::Add => exec_add(a, b, line),
        Opcode::Sub => exec_sub(a, b, line),
        Opcode::Mul => exec_mul(a, b, line),
        Opcode::Div => exec_div(a, b, line),
        Opcode::Sur => exec_sur(a, b, line),
        Opcode::Gr => exec_gr(a, b, line),
        Opcode::Le => exec_le(a, b, line),
        Opcode::GrE => exec_gre(a, b, line),
        Opcode::LeE => exec_lee(a, b, line),
        Opcode::EE => Ok(exec_ee(a, b)),
        Opcode::NE => Ok(exec_ne(a, b)),
        Opcode::And => exec_and(a, b, line),
        Opcode::Or => exec_or(a, b, line),
        _ => Err(Exception::runtime("not a binary opcode", line)),
    }
}
