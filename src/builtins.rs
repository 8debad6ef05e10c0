//! The seven language builtins plus the pre-registered global constants,
//! grounded on `original_source/src/builtin.cc`.

use std::thread::sleep;
use std::time::Duration;

use rand::distributions::{Alphanumeric, DistString};
use rand::Rng;

use crate::errors::Exception;
use crate::object::{new_table, Object, SharedTable};

pub const BUILTIN_NAMES: &[&str] = &["puts", "put", "putl", "len", "sleep", "type", "randomStr"];

pub fn is_builtin(name: &str) -> bool {
    BUILTIN_NAMES.contains(&name)
}

/// Pre-populates a frame table with the seven builtins plus the global
/// constants the original interpreter registers at startup
/// (`regBuiltinName`): `T`/`F` booleans and the `_VERSION_`/`_AUTHOR_`/
/// `_LICENSE_`/`_WEBSITE_` string constants. Not named in the distilled
/// spec's builtin section but present in the source this was distilled
/// from, and nothing in the spec's non-goals excludes it.
pub fn register_builtin_names(table: &SharedTable) {
    let mut t = table.borrow_mut();
    for name in BUILTIN_NAMES {
        t.insert((*name).to_string(), Object::Builtin(name));
    }
    t.insert("T".to_string(), Object::Bool(true));
    t.insert("F".to_string(), Object::Bool(false));
    t.insert("_VERSION_".to_string(), Object::str("0.1.0"));
    t.insert("_AUTHOR_".to_string(), Object::str("Drift Language Contributors"));
    t.insert("_LICENSE_".to_string(), Object::str("MIT"));
    t.insert("_WEBSITE_".to_string(), Object::str("https://example.invalid/drift"));
}

pub fn root_table() -> SharedTable {
    let table = new_table();
    register_builtin_names(&table);
    table
}

pub fn call(name: &str, mut args: Vec<Object>, line: i64) -> Result<Option<Object>, Exception> {
    match name {
        "puts" => {
            if args.is_empty() {
                println!();
            } else {
                for a in args.iter() {
                    println!("{}", a.stringer());
                }
            }
            Ok(None)
        }
        "put" => {
            print!("{}", args.iter().map(Object::stringer).collect::<Vec<_>>().join("\t"));
            Ok(None)
        }
        "putl" => {
            println!("{}", args.iter().map(Object::stringer).collect::<Vec<_>>().join("\t"));
            Ok(None)
        }
        "len" => {
            if args.len() != 1 {
                return Err(Exception::runtime("'len' takes exactly one argument", line));
            }
            let n = match &args[0] {
                Object::Array(a) => a.borrow().len() as i64,
                Object::Tuple(t) => t.len() as i64,
                Object::Map(m) => m.borrow().len() as i64,
                Object::Str(s, _) => s.len() as i64,
                Object::Char(_) => 1,
                other => return Err(Exception::runtime(format!("'len' does not accept {}", other.kind_name()), line)),
            };
            Ok(Some(Object::Int(n)))
        }
        "sleep" | "bsleep" => {
            if args.len() != 1 {
                return Err(Exception::runtime(format!("'{name}' takes exactly one argument"), line));
            }
            match args.remove(0) {
                Object::Int(ms) if ms >= 0 => {
                    sleep(Duration::from_millis(ms as u64));
                    Ok(None)
                }
                _ => Err(Exception::runtime(format!("'{name}' requires a non-negative int"), line)),
            }
        }
        "type" => {
            if args.len() != 1 {
                return Err(Exception::runtime("'type' takes exactly one argument", line));
            }
            Ok(Some(Object::str(args[0].kind_name())))
        }
        "randomStr" => {
            if args.len() != 2 {
                return Err(Exception::runtime("'randomStr' takes exactly two arguments (length, isUpper)", line));
            }
            let length = match &args[0] {
                Object::Int(n) if *n >= 0 => *n as usize,
                _ => return Err(Exception::runtime("'randomStr' length must be a non-negative int", line)),
            };
            let is_upper = match &args[1] {
                Object::Bool(b) => *b,
                _ => return Err(Exception::runtime("'randomStr' second argument must be a bool", line)),
            };
            let mut rng = rand::thread_rng();
            let mut s = Alphanumeric.sample_string(&mut rng, length);
            s.retain(|c| c.is_ascii_alphabetic());
            while s.len() < length {
                let extra: char = rng.sample(rand::distributions::Uniform::new_inclusive(b'a', b'z')) as char;
                s.push(extra);
            }
            s.truncate(length);
            if is_upper {
                s = s.to_uppercase();
            } else {
                s = s.to_lowercase();
            }
            Ok(Some(Object::str(s)))
        }
        other => Err(Exception::runtime(format!("unknown builtin '{other}'"), line)),
    }
}
