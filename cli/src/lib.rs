pub mod commands;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use vm::{DiskFileSystem, Role, RuntimeConfig, VmRegistry};

/// Reads a TOML runtime config, or the defaults when no path is given.
pub fn load_config(path: Option<&Path>) -> Result<RuntimeConfig> {
    let Some(path) = path else {
        return Ok(RuntimeConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("Invalid config {}", path.display()))
}

/// Creates a registry rooted at the progs file's directory and loads the
/// file as `role`, leaving that instance bound.
pub fn open_progs(path: &Path, role: Role, mut config: RuntimeConfig) -> Result<VmRegistry> {
    let file = path
        .file_name()
        .and_then(|f| f.to_str())
        .with_context(|| format!("Not a progs file: {}", path.display()))?;
    let root = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let role_config = config
        .role_mut(role)
        .with_context(|| format!("{role} is not a loadable role"))?;
    role_config.filename = Some(file.to_string());

    let mut reg = VmRegistry::new(config, DiskFileSystem::new(root));
    reg.create_from_config(role)?;
    reg.bind(role);
    Ok(reg)
}
