use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use vm::stdlib::register_shared_builtins;
use vm::BuiltinTable;

/// Writes the builtin header to `output`, or to `out` when no file is given.
pub fn write_header(output: Option<&Path>, out: &mut dyn Write) -> Result<()> {
    let mut table = BuiltinTable::new();
    register_shared_builtins(&mut table);
    let header = table.header();

    match output {
        Some(path) => {
            std::fs::write(path, header)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            writeln!(out, "wrote {} builtins to {}", table.len(), path.display())?;
        }
        None => out.write_all(header.as_bytes())?,
    }
    Ok(())
}
