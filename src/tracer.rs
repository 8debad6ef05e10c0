//! Execution tracer: the observability substitute for a logging crate,
//! following the teacher's own tracer-hook idiom (the grounding crate
//! pulls in neither `log` nor `tracing`, and instead defines its own
//! trait with a no-op and a stderr implementation).

use crate::bytecode::opcode::Opcode;

/// Events the VM reports around dispatch. Kept small and data-oriented so
/// a tracer can format them however it likes (the `-d`/`-b` CLI flags
/// wire `StderrTracer` in; ordinary runs use `NoopTracer`).
pub enum TraceEvent<'a> {
    Instruction { ip: usize, op: Opcode },
    FramePush { title: &'a str },
    FramePop { title: &'a str },
    ModuleRegistered { name: &'a str },
}

pub trait VmTracer {
    fn trace(&mut self, event: TraceEvent<'_>);
}

pub struct NoopTracer;

impl VmTracer for NoopTracer {
    fn trace(&mut self, _event: TraceEvent<'_>) {}
}

pub struct StderrTracer;

impl VmTracer for StderrTracer {
    fn trace(&mut self, event: TraceEvent<'_>) {
        match event {
            TraceEvent::Instruction { ip, op } => eprintln!("[trace] {ip:>4}  {op}"),
            TraceEvent::FramePush { title } => eprintln!("[trace] -> frame '{title}'"),
            TraceEvent::FramePop { title } => eprintln!("[trace] <- frame '{title}'"),
            TraceEvent::ModuleRegistered { name } => eprintln!("[trace] module '{name}' registered"),
        }
    }
}
