//! CLI entry point: thin argument dispatch over the `drift` library,
//! grounded on the grounding crate's `ouros-cli/src/main.rs` (manual
//! `env::args()` matching, `ExitCode`, no argv-parser dependency) and
//! `original_source/src/drift.cc`'s `main`/`usage`/`version`.

use std::path::Path;
use std::process::ExitCode;
use std::{env, fs};

use drift::tracer::StderrTracer;
use drift::{module_loader, repl, Interpreter};

const VERSION: &str = "Drift 0.1.0 (REPL Mode)";

fn usage() {
    println!("\n\t\tTHE DRIFT PROGRAMMING LANGUAGE\n");
    println!("USAGE:");
    println!("\t\t> drift                   # REPL MODE");
    println!("\t\t> drift <ft file>         # FILE MODE\n");
    println!("\t\t> drift -v                # PRINT VERSION\n");
    println!("\t\t> drift -d [ft file]      # DEBUG DUMP (TOKENS + STATEMENTS)");
    println!("\t\t> drift -b [ft file]      # DISASSEMBLE COMPILED ENTITIES\n");
}

fn main() -> ExitCode {
    let args: Vec<String> = env::args().skip(1).collect();

    let mut debug = false;
    let mut dis = false;
    let mut path: Option<String> = None;

    for arg in &args {
        match arg.as_str() {
            "-v" => {
                println!("{VERSION}");
                return ExitCode::SUCCESS;
            }
            "-u" => {
                usage();
                return ExitCode::SUCCESS;
            }
            "-d" => debug = true,
            "-b" => dis = true,
            other => path = Some(other.to_string()),
        }
    }

    let tracer: Box<dyn drift::tracer::VmTracer> = if debug || dis { Box::new(StderrTracer) } else { Box::new(drift::tracer::NoopTracer) };
    let mut interp = Interpreter::with_tracer(tracer);

    if let Err(err) = module_loader::load_std_dir(&mut interp, Path::new(&module_loader::std_dir())) {
        eprintln!("\x1b[31m{err}\x1b[0m");
        return ExitCode::FAILURE;
    }

    match path {
        Some(path) => {
            let source = match fs::read_to_string(&path) {
                Ok(s) => s,
                Err(e) => {
                    eprintln!("error reading '{path}': {e}");
                    return ExitCode::FAILURE;
                }
            };
            if let Err(err) = interp.run(&source, debug, dis) {
                println!("\x1b[31m{err}\x1b[0m");
            }
            ExitCode::SUCCESS
        }
        None => {
            repl::run(&mut interp, debug, dis);
            ExitCode::SUCCESS
        }
    }
}
