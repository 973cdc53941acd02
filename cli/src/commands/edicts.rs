use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;
use vm::{parse_entity_lump, Role, RuntimeConfig};

use crate::open_progs;

/// Loads `path` as the server program, spawns the optional entity lump into
/// it and runs the server's `edicts` console command.
pub fn edicts_file(path: &Path, lump: Option<&Path>, config: RuntimeConfig, out: &mut dyn Write) -> Result<()> {
    let mut reg = open_progs(path, Role::Server, config)?;

    if let Some(lump) = lump {
        let text = std::fs::read_to_string(lump)
            .with_context(|| format!("Failed to read entity lump {}", lump.display()))?;
        let spawned = parse_entity_lump(reg.active_mut()?, &text)?;
        info!(entities = spawned.len(), "spawned entity lump");
    }

    reg.run_command("edicts", &[], out)?;
    Ok(())
}
