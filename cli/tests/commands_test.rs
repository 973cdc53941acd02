use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use vm::{ImageBuilder, Role, RuntimeConfig, ValueType};

fn progs_bytes() -> Vec<u8> {
    let mut b = ImageBuilder::new();
    for ordinal in 1..=11 {
        b.builtin(&format!("builtin{ordinal}"), ordinal, 1);
    }
    b.function("worldspawn", "world.qc", 0);
    b.function("monster_think", "ai.qc", 1);
    b.global_float("gravity", 800.0);
    b.field("classname", ValueType::String);
    b.field("health", ValueType::Float);
    b.vector_field("origin");
    b.to_bytes()
}

fn write_progs(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("server.dat");
    std::fs::write(&path, progs_bytes()).unwrap();
    path
}

fn write_text(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    let mut f = std::fs::File::create(&path).unwrap();
    f.write_all(content.as_bytes()).unwrap();
    path
}

fn output(f: impl FnOnce(&mut Vec<u8>) -> anyhow::Result<()>) -> String {
    let mut out = Vec::new();
    f(&mut out).unwrap();
    String::from_utf8(out).unwrap()
}

// ======================================================================
// config
// ======================================================================

#[test]
fn load_config_defaults_without_path() {
    assert_eq!(cli::load_config(None).unwrap(), RuntimeConfig::default());
}

#[test]
fn load_config_reads_toml() {
    let dir = TempDir::new().unwrap();
    let path = write_text(dir.path(), "qcvm.toml", "developer = true\n[menu]\nentity_capacity = 4\n");
    let config = cli::load_config(Some(path.as_path())).unwrap();
    assert!(config.developer);
    assert_eq!(config.menu.entity_capacity, Some(4));
}

#[test]
fn load_config_rejects_bad_toml() {
    let dir = TempDir::new().unwrap();
    let path = write_text(dir.path(), "bad.toml", "developer = \"maybe\"\n");
    let err = cli::load_config(Some(path.as_path())).unwrap_err();
    assert!(format!("{err}").contains("Invalid config"), "got: {err}");
}

// ======================================================================
// inspect / functions
// ======================================================================

#[test]
fn inspect_prints_summary() {
    let dir = TempDir::new().unwrap();
    let path = write_progs(&dir);
    let text = output(|out| {
        cli::commands::inspect::inspect_file(&path, Role::Server, RuntimeConfig::default(), out)
    });
    assert!(text.contains("game qcvm: 'server.dat'"), "got: {text}");
    assert!(text.contains("Functions: 14"));
    assert!(text.contains("(11 builtin)"));
}

#[test]
fn inspect_fatal_checksum_fails() {
    let dir = TempDir::new().unwrap();
    let path = write_text(
        dir.path(),
        "qcvm.toml",
        "[client]\nexpected_checksum = 1\nchecksum_policy = \"fatal\"\n",
    );
    let config = cli::load_config(Some(path.as_path())).unwrap();
    let progs = write_progs(&dir);

    let err = cli::commands::inspect::inspect_file(&progs, Role::Client, config, &mut Vec::new())
        .unwrap_err();
    assert!(format!("{err}").contains("checksum"), "got: {err}");
}

#[test]
fn inspect_missing_file_fails() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.dat");
    let result =
        cli::commands::inspect::inspect_file(&path, Role::Menu, RuntimeConfig::default(), &mut Vec::new());
    assert!(result.is_err());
}

#[test]
fn functions_lists_script_functions() {
    let dir = TempDir::new().unwrap();
    let path = write_progs(&dir);
    let text = output(|out| {
        cli::commands::functions::list_file(&path, Role::Server, RuntimeConfig::default(), out)
    });
    assert_eq!(
        text,
        "#12 world.qc:worldspawn()\n#13 ai.qc:monster_think(#1)\n"
    );
}

// ======================================================================
// edicts / builtins
// ======================================================================

#[test]
fn edicts_spawns_lump() {
    let dir = TempDir::new().unwrap();
    let path = write_progs(&dir);
    let lump = write_text(
        dir.path(),
        "start.ent",
        "{\n\"classname\" \"worldspawn\"\n}\n{\n\"classname\" \"monster_army\"\n\"health\" \"30\"\n}\n",
    );

    let text = output(|out| {
        cli::commands::edicts::edicts_file(&path, Some(lump.as_path()), RuntimeConfig::default(), out)
    });
    assert!(text.starts_with("2 entities"), "got: {text}");
    assert!(text.contains("EDICT 1:"));
    assert!(text.contains("monster_army"));
}

#[test]
fn edicts_without_lump_is_empty() {
    let dir = TempDir::new().unwrap();
    let path = write_progs(&dir);
    let text = output(|out| {
        cli::commands::edicts::edicts_file(&path, None, RuntimeConfig::default(), out)
    });
    assert_eq!(text, "0 entities\n");
}

#[test]
fn builtins_header_to_stdout_and_file() {
    let text = output(|out| cli::commands::builtins::write_header(None, out));
    assert!(text.contains("// number of builtins: 11"));
    assert!(text.contains("vlen = #4; // both"));

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("builtins.qh");
    let note = output(|out| cli::commands::builtins::write_header(Some(path.as_path()), out));
    assert!(note.starts_with("wrote 11 builtins"));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), text);
}
