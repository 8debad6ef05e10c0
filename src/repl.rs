//! The interactive read-eval-print loop, grounded on
//! `original_source/src/drift.cc`'s `repl()`.

use std::io::{self, Write};

use crate::Interpreter;

const BANNER: &str = "Drift 0.1.0 (REPL Mode)";

/// Reads lines from stdin until EOF, running each non-blank one against
/// `interp`. Errors are printed in ANSI red and do not end the session,
/// matching the source's "catch, print, keep going" REPL error policy.
pub fn run(interp: &mut Interpreter, debug: bool, dis: bool) {
    println!("\n{BANNER}\n");

    let stdin = io::stdin();
    loop {
        print!("ft >> ");
        let _ = io::stdout().flush();

        let mut line = String::new();
        if stdin.read_line(&mut line).unwrap_or(0) == 0 {
            break; // EOF
        }
        let line = line.trim_end_matches(['\n', '\r']);
        if line.is_empty() {
            continue;
        }

        if let Err(err) = interp.run(line, debug, dis) {
            println!("\x1b[31m{err}\x1b[0m");
        }
    }
}
