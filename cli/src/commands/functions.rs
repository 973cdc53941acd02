use std::io::Write;
use std::path::Path;

use anyhow::Result;
use vm::{Role, RuntimeConfig};

use crate::open_progs;

pub fn list_file(path: &Path, role: Role, config: RuntimeConfig, out: &mut dyn Write) -> Result<()> {
    let reg = open_progs(path, role, config)?;
    reg.list_functions(out)?;
    Ok(())
}
