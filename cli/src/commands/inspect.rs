use std::io::Write;
use std::path::Path;

use anyhow::Result;
use vm::{Role, RuntimeConfig};

use crate::open_progs;

pub fn inspect_file(path: &Path, role: Role, config: RuntimeConfig, out: &mut dyn Write) -> Result<()> {
    let reg = open_progs(path, role, config)?;
    let vm = reg.active()?;

    writeln!(out, "{}", vm.summary())?;
    for warning in &vm.image().warnings {
        writeln!(out, "warning: {warning:?}")?;
    }
    writeln!(
        out,
        "{} globals, {} fields, {} functions ({} builtin)",
        vm.image().global_defs.len(),
        vm.image().field_defs.len(),
        vm.image().functions.len(),
        vm.image().functions.iter().filter(|f| f.is_builtin()).count()
    )?;
    Ok(())
}
