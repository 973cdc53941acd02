//! In-memory form of a compiled progs image.
//!
//! Every table is byte-order normalized and bounds-validated by the loader;
//! offsets stored here (`StringOfs`, def offsets, statement indices) are known
//! to be in range for the image that owns them.

use std::borrow::Cow;
use std::fmt;

use crate::loader::LoadWarning;

/// The progs format revision this runtime implements.
pub const PROG_VERSION: i32 = 6;
/// FTEQCC's extended format. Loads, but not every opcode is supported.
pub const FTE_PROG_VERSION: i32 = 7;

/// Def type bit marking a global for inclusion in save games.
pub const DEF_SAVEGLOBAL: u16 = 1 << 15;

pub const HEADER_SIZE: usize = 60;
pub const STATEMENT_SIZE: usize = 8;
pub const DEF_SIZE: usize = 8;
pub const FUNCTION_SIZE: usize = 36;
pub const MAX_PARMS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Void,
    String,
    Float,
    Vector,
    Entity,
    Field,
    Function,
    Pointer,
}

impl ValueType {
    pub fn from_u16(tag: u16) -> Option<Self> {
        Some(match tag {
            0 => ValueType::Void,
            1 => ValueType::String,
            2 => ValueType::Float,
            3 => ValueType::Vector,
            4 => ValueType::Entity,
            5 => ValueType::Field,
            6 => ValueType::Function,
            7 => ValueType::Pointer,
            _ => return None,
        })
    }

    pub fn as_u16(self) -> u16 {
        match self {
            ValueType::Void => 0,
            ValueType::String => 1,
            ValueType::Float => 2,
            ValueType::Vector => 3,
            ValueType::Entity => 4,
            ValueType::Field => 5,
            ValueType::Function => 6,
            ValueType::Pointer => 7,
        }
    }

    /// Number of 32-bit slots a value of this type occupies.
    pub fn slot_count(self) -> usize {
        match self {
            ValueType::Vector => 3,
            _ => 1,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Void => "void",
            ValueType::String => "string",
            ValueType::Float => "float",
            ValueType::Vector => "vector",
            ValueType::Entity => "entity",
            ValueType::Field => "field",
            ValueType::Function => "function",
            ValueType::Pointer => "pointer",
        };
        f.write_str(name)
    }
}

/// Byte offset into the image string blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct StringOfs(pub u32);

/// Index into the function table. Function 0 is the null function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct FunctionId(pub u32);

impl FunctionId {
    pub const NULL: Self = Self(0);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A `(byte offset, element count)` pair from the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TableRange {
    pub offset: i32,
    pub count: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Header {
    pub version: i32,
    /// CRC of the defs header the script was compiled against.
    pub defs_crc: i32,
    pub statements: TableRange,
    pub global_defs: TableRange,
    pub field_defs: TableRange,
    pub functions: TableRange,
    /// `count` is the blob size in bytes.
    pub strings: TableRange,
    pub globals: TableRange,
    /// Script field slots per entity.
    pub entity_fields: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Statement {
    pub op: u16,
    pub a: u16,
    pub b: u16,
    pub c: u16,
}

/// A global or field definition. `offset` is a 32-bit slot index: into the
/// globals array for globals, into the entity field block for fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Def {
    pub ty: ValueType,
    pub save_global: bool,
    pub offset: u16,
    pub name: StringOfs,
}

impl Def {
    pub fn slot(&self) -> usize {
        self.offset as usize
    }

    /// Slot range covered by the value.
    pub fn slots(&self) -> std::ops::Range<usize> {
        self.slot()..self.slot() + self.ty.slot_count()
    }
}

pub type GlobalDef = Def;
pub type FieldDef = Def;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDef {
    /// Entry statement; negative for builtin stubs (`-ordinal`).
    pub first_statement: i32,
    pub parm_start: i32,
    pub locals: i32,
    /// Call counter, bumped by the interpreter and drained by the profiler.
    pub profile: u32,
    pub name: StringOfs,
    pub file: StringOfs,
    pub num_parms: i32,
    pub parm_size: [u8; MAX_PARMS],
}

impl FunctionDef {
    pub fn is_builtin(&self) -> bool {
        self.first_statement < 0
    }

    pub fn builtin_ordinal(&self) -> Option<u32> {
        self.is_builtin().then(|| self.first_statement.unsigned_abs())
    }
}

/// Concatenated NUL-terminated strings addressed by byte offset.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StringBlob {
    data: Vec<u8>,
}

impl StringBlob {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn contains(&self, ofs: u32) -> bool {
        (ofs as usize) < self.data.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Bytes from `ofs` up to (not including) the next NUL or the blob end.
    pub fn get_bytes(&self, ofs: StringOfs) -> Option<&[u8]> {
        let tail = self.data.get(ofs.0 as usize..)?;
        let end = tail.iter().position(|&b| b == 0).unwrap_or(tail.len());
        Some(&tail[..end])
    }

    pub fn get(&self, ofs: StringOfs) -> Option<Cow<'_, str>> {
        self.get_bytes(ofs).map(String::from_utf8_lossy)
    }
}

/// A loaded, normalized progs image. Owned by exactly one `VmInstance`.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryImage {
    pub header: Header,
    pub statements: Vec<Statement>,
    pub global_defs: Vec<GlobalDef>,
    pub field_defs: Vec<FieldDef>,
    pub functions: Vec<FunctionDef>,
    /// Initial global values, raw 32-bit slots.
    pub globals: Vec<u32>,
    pub strings: StringBlob,
    /// CRC-32 of the raw file bytes.
    pub checksum: u32,
    /// Size of the file the image was parsed from.
    pub byte_size: usize,
    pub warnings: Vec<LoadWarning>,
}

impl BinaryImage {
    pub fn version(&self) -> i32 {
        self.header.version
    }

    pub fn entity_fields(&self) -> usize {
        self.header.entity_fields as usize
    }

    pub fn string(&self, ofs: StringOfs) -> Cow<'_, str> {
        self.strings.get(ofs).unwrap_or(Cow::Borrowed(""))
    }

    pub fn def_name(&self, def: &Def) -> Cow<'_, str> {
        self.string(def.name)
    }

    pub fn function(&self, id: FunctionId) -> Option<&FunctionDef> {
        self.functions.get(id.index())
    }

    pub fn function_name(&self, id: FunctionId) -> Cow<'_, str> {
        self.function(id)
            .map(|f| self.string(f.name))
            .unwrap_or(Cow::Borrowed(""))
    }

    /// True when the tables (not the load bookkeeping) are identical.
    pub fn same_tables(&self, other: &BinaryImage) -> bool {
        self.header.version == other.header.version
            && self.header.defs_crc == other.header.defs_crc
            && self.header.entity_fields == other.header.entity_fields
            && self.statements == other.statements
            && self.global_defs == other.global_defs
            && self.field_defs == other.field_defs
            && self.functions == other.functions
            && self.globals == other.globals
            && self.strings == other.strings
    }
}
