pub mod builder;
pub mod builtins;
pub mod commands;
pub mod config;
pub mod epair;
pub mod error;
pub mod fs;
pub mod globals;
pub mod host;
pub mod image;
pub mod instance;
pub mod loader;
pub mod lump;
pub mod profile;
pub mod registry;
pub mod role;
pub mod save;
pub mod specs;
pub mod stdlib;
pub mod symbols;
pub mod value;
pub mod world;
pub mod writer;

pub use builder::ImageBuilder;
pub use builtins::{BuiltinEntry, BuiltinFn, BuiltinTable, CallContext, ExecOn};
pub use commands::{CommandFn, CommandTable};
pub use config::{RoleConfig, RoleSettings, RuntimeConfig};
pub use epair::{parse_epair, EpairTarget};
pub use error::{CommandError, EpairError, LoadError, RuntimeError, VmError};
pub use fs::{DiskFileSystem, FileSystem, MemoryFileSystem};
pub use host::{ClientGame, DrawGate, Executor};
pub use image::{BinaryImage, Def, FunctionDef, FunctionId, ValueType};
pub use instance::{VmInstance, TEMP_STRINGS};
pub use loader::{parse, parse_with, ChecksumPolicy, LoadOptions, LoadWarning};
pub use lump::{parse_entity, parse_entity_lump, parse_globals};
pub use profile::Profiler;
pub use registry::VmRegistry;
pub use role::Role;
pub use save::{write_entity, write_globals};
pub use value::StringRef;
pub use world::{clip_move, Sweep, Trace, WorldQuery};
pub use writer::{encode, encode_le};
