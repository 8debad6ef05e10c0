//! `CALL`/`RET`/`RET_N` handling, grounded on the FUNC/CALL section of
//! `original_source/src/vm.cc`.

use std::cell::RefCell;
use std::rc::Rc;

use crate::builtins;
use crate::errors::Exception;
use crate::object::{FuncObj, Object};
use crate::vm::frame::Frame;
use crate::vm::VM;

pub fn exec_call(vm: &mut VM, line: i64) -> Result<(), Exception> {
    let argc = {
        let frame = vm.frames.last_mut().unwrap();
        frame.read_operand()
    };

    let mut args = Vec::with_capacity(argc);
    for _ in 0..argc {
        let frame = vm.frames.last_mut().unwrap();
        args.push(frame.pop(line)?);
    }

    let callee = {
        let frame = vm.frames.last_mut().unwrap();
        frame.pop(line)?
    };

    let (pending_self, pending_inherit) = {
        let frame = vm.frames.last_mut().unwrap();
        (frame.pending_self.take(), std::mem::take(&mut frame.pending_inherit))
    };

    match callee {
        Object::Builtin(name) => {
            let result = builtins::call(name, args, line)?;
            if let Some(value) = result {
                vm.frames.last_mut().unwrap().push(value);
            }
            Ok(())
        }
        Object::Func(func) => call_user_func(vm, &func, args, pending_self, pending_inherit, line),
        other => Err(Exception::runtime(format!("{} is not callable", other.kind_name()), line)),
    }
}

fn call_user_func(
    vm: &mut VM,
    func: &Rc<FuncObj>,
    args: Vec<Object>,
    pending_self: Option<crate::object::SharedTable>,
    pending_inherit: Vec<String>,
    line: i64,
) -> Result<(), Exception> {
    if func.params.len() != args.len() {
        return Err(Exception::runtime(
            format!("'{}' expects {} argument(s), got {}", func.name, func.params.len(), args.len()),
            line,
        ));
    }

    let is_method = pending_self.is_some();
    let table = match pending_self {
        Some(shared) => shared,
        None => {
            let caller_table = vm.frames.last().unwrap().table.borrow().clone();
            Rc::new(RefCell::new(caller_table))
        }
    };

    for ((param_name, param_ty), value) in func.params.iter().zip(args.into_iter()) {
        crate::vm::access::check_type(&value, param_ty, line)?;
        let value = crate::vm::access::coerce_bool(value, param_ty);
        table.borrow_mut().insert(param_name.clone(), value);
    }

    let mut frame = Frame::new(func.entity.clone(), table);
    if is_method {
        frame.inherit = pending_inherit;
    }
    frame.ip = 0;
    frame.op = 0;
    vm.frames.push(frame);
    vm.run_frame()?;
    let finished = vm.frames.pop().unwrap();

    match (&func.ret, finished.ret) {
        (Some(ret_ty), Some(value)) => {
            crate::vm::access::check_type(&value, ret_ty, line)?;
            vm.frames.last_mut().unwrap().push(value);
            Ok(())
        }
        (Some(_), None) => Err(Exception::runtime(format!("'{}' is missing its return value", func.name), line)),
        (None, Some(_)) => Err(Exception::runtime(format!("'{}' returned a value but declares no return type", func.name), line)),
        (None, None) => Ok(()),
    }
}

pub fn exec_ret(frame: &mut Frame, line: i64) -> Result<(), Exception> {
    let value = frame.pop(line)?;
    frame.ret = Some(value);
    frame.returned = true;
    Ok(())
}

pub fn exec_retn(frame: &mut Frame) {
    frame.ret = None;
    frame.returned = true;
}
