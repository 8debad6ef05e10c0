//! Standard-module preload: walks a directory of `.ft` files and runs
//! each one once against a shared interpreter so its `mod` declaration
//! registers into the VM's module registry, grounded on
//! `original_source/src/system.cpp` (`getAllFileWithPath`) and
//! `drift.cc`'s `loadStdModules`.

use std::fs;
use std::path::Path;

use crate::errors::{DriftError, ResourceError};
use crate::Interpreter;

/// Default standard-module directory, relative to the current working
/// directory, overridable via `DRIFT_STD_PATH`.
pub const DEFAULT_STD_DIR: &str = "std";

pub fn std_dir() -> String {
    std::env::var("DRIFT_STD_PATH").unwrap_or_else(|_| DEFAULT_STD_DIR.to_string())
}

/// Compiles and runs every `.ft` file directly under `dir`, in sorted
/// order for determinism, against `interp`'s VM. A missing directory is
/// not an error — the standard library is optional. The first file that
/// fails to lex, parse, compile, or run aborts the whole preload.
pub fn load_std_dir(interp: &mut Interpreter, dir: &Path) -> Result<(), DriftError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return Ok(()),
    };

    let mut paths: Vec<_> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "ft"))
        .collect();
    paths.sort();

    for path in paths {
        let source = fs::read_to_string(&path)
            .map_err(|e| DriftError::Resource(ResourceError { message: format!("failed to read '{}': {e}", path.display()) }))?;
        interp.run(&source, false, false)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_std_dir_is_not_an_error() {
        let mut interp = Interpreter::new();
        let result = load_std_dir(&mut interp, Path::new("/does/not/exist/drift-std"));
        assert!(result.is_ok());
    }

    #[test]
    fn loads_and_registers_a_module_file() {
        let dir = std::env::temp_dir().join(format!("drift-std-test-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("greet.ft"), "mod greet pub def hello: int = 1\n").unwrap();

        let mut interp = Interpreter::new();
        let result = load_std_dir(&mut interp, &dir);
        assert!(result.is_ok());

        fs::remove_dir_all(&dir).ok();
    }
}
