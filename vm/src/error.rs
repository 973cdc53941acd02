use memory::MemoryError;
use thiserror::Error;

use crate::role::Role;

/// Failures while reading or validating a progs image. All of them are fatal
/// for the instance being created.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("couldn't load \"{path}\"")]
    NotFound { path: String },

    #[error("\"{path}\" is empty")]
    EmptyFile { path: String },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image truncated: {what} needs {need} bytes, have {have}")]
    Truncated {
        what: &'static str,
        need: usize,
        have: usize,
    },

    #[error("wrong version {found} (should be {expected})")]
    VersionMismatch { found: i32, expected: i32 },

    #[error("checksum mismatch: computed {computed:#010x}, expected {expected:#010x}")]
    ChecksumMismatch { computed: u32, expected: u32 },

    #[error("fielddefs[{index}] carries the save-global flag")]
    InvalidFieldFlag { index: usize },

    #[error("{table} table (offset {offset}, count {count}) lies outside the {size}-byte image")]
    TableOutOfBounds {
        table: &'static str,
        offset: i32,
        count: i32,
        size: usize,
    },

    #[error("{table}[{index}] references string offset {offset} outside the {size}-byte string table")]
    BadStringOffset {
        table: &'static str,
        index: usize,
        offset: i32,
        size: usize,
    },

    #[error("{table}[{index}] offset {offset} exceeds {limit} slots")]
    BadDefOffset {
        table: &'static str,
        index: usize,
        offset: u16,
        limit: usize,
    },

    #[error("{table}[{index}] has unknown type {tag}")]
    UnknownType {
        table: &'static str,
        index: usize,
        tag: u16,
    },

    #[error("functions[{index}]: {reason}")]
    BadFunction { index: usize, reason: String },

    #[error(transparent)]
    Allocation(#[from] MemoryError),
}

/// Lifecycle and registry failures.
#[derive(Debug, Error)]
pub enum VmError {
    #[error("tried to create second instance of {0} script VM")]
    AlreadyExists(Role),

    #[error("{0} is not a loadable role")]
    InvalidRole(Role),

    #[error("failed to load {role} progs \"{path}\": {source}")]
    Load {
        role: Role,
        path: String,
        #[source]
        source: LoadError,
    },

    #[error("no script VM is bound")]
    NoActiveInstance,

    #[error("no {0} script VM")]
    NoInstance(Role),

    #[error("no free entities (capacity {0})")]
    NoFreeEntities(usize),

    #[error("entity data: {0}")]
    Epair(#[from] EpairError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error(transparent)]
    Memory(#[from] MemoryError),
}

/// Failures while applying a textual key/value pair.
#[derive(Debug, Error)]
pub enum EpairError {
    /// Soft failure: callers decide whether the key may be ignored.
    #[error("can't find field {0}")]
    UnknownField(String),

    #[error("can't find function {0}")]
    UnknownFunction(String),

    #[error("global slot {ofs} out of range ({count} globals)")]
    GlobalOutOfRange { ofs: usize, count: usize },

    #[error("entity lump: {0}")]
    Syntax(String),

    #[error(transparent)]
    Memory(#[from] MemoryError),
}

impl EpairError {
    /// Whether the error must abort the level load.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, EpairError::UnknownField(_))
    }
}

/// Errors raised by builtins and their dispatcher.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("builtin #{0} is not registered")]
    InvalidBuiltin(u32),

    #[error("builtin {name} can't run on the {role} VM")]
    WrongContext { name: String, role: Role },

    #[error("builtin {0} requires developer mode")]
    DeveloperOnly(String),

    #[error("progs has no global named {0}")]
    MissingGlobal(&'static str),

    #[error("bad string reference {0}")]
    BadString(i32),

    #[error("no world collision model is attached")]
    NoWorld,

    #[error("{function}: {reason}")]
    Execution { function: String, reason: String },

    #[error(transparent)]
    Memory(#[from] MemoryError),
}

/// Errors from diagnostic console commands.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("unknown command {0}")]
    UnknownCommand(String),

    #[error("usage: {0}")]
    Usage(&'static str),

    #[error("no {0} script VM")]
    NoInstance(Role),

    #[error("no script VM is bound")]
    NoActiveInstance,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Memory(#[from] MemoryError),
}
