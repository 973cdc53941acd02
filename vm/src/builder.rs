use byteorder::{ByteOrder, LittleEndian};
use rustc_hash::FxHashMap;

use crate::globals::RESERVED_OFS;
use crate::image::*;
use crate::writer;

/// Assembles progs images from named definitions. Used by tooling and tests
/// that need images without going through the script compiler.
///
/// Follows the compiler's conventions: string offset 0 is the empty string,
/// function 0 and statement 0 are null entries, and the first
/// `RESERVED_OFS` global slots hold the return value and parameters.
#[derive(Debug, Clone)]
pub struct ImageBuilder {
    version: i32,
    defs_crc: i32,
    strings: Vec<u8>,
    interned: FxHashMap<String, u32>,
    statements: Vec<Statement>,
    global_defs: Vec<GlobalDef>,
    field_defs: Vec<FieldDef>,
    functions: Vec<FunctionDef>,
    globals: Vec<u32>,
    entity_fields: usize,
}

/// Offset for a def of type `ty` starting at slot `next`. Defs address their
/// slots with 16 bits, so a def that would end past slot 65535 panics rather
/// than wrapping onto slot 0.
fn slot_offset(next: usize, ty: ValueType, what: &str) -> u16 {
    match u16::try_from(next + ty.slot_count() - 1) {
        Ok(_) => next as u16,
        Err(_) => panic!("{what} slots exhausted: {ty:?} at slot {next} exceeds 16-bit offsets"),
    }
}

impl Default for ImageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageBuilder {
    pub fn new() -> Self {
        let mut b = Self {
            version: PROG_VERSION,
            defs_crc: 0,
            strings: vec![0],
            interned: FxHashMap::default(),
            statements: vec![Statement::default()],
            global_defs: Vec::new(),
            field_defs: Vec::new(),
            functions: Vec::new(),
            globals: vec![0; RESERVED_OFS],
            entity_fields: 0,
        };
        b.interned.insert(String::new(), 0);
        b.functions.push(FunctionDef {
            first_statement: 0,
            parm_start: 0,
            locals: 0,
            profile: 0,
            name: StringOfs(0),
            file: StringOfs(0),
            num_parms: 0,
            parm_size: [0; MAX_PARMS],
        });
        b
    }

    pub fn version(mut self, version: i32) -> Self {
        self.version = version;
        self
    }

    pub fn defs_crc(mut self, crc: i32) -> Self {
        self.defs_crc = crc;
        self
    }

    /// Offset of `s` in the string blob, appending it on first use.
    pub fn intern(&mut self, s: &str) -> StringOfs {
        if let Some(&ofs) = self.interned.get(s) {
            return StringOfs(ofs);
        }
        let ofs = self.strings.len() as u32;
        self.strings.extend_from_slice(s.as_bytes());
        self.strings.push(0);
        self.interned.insert(s.to_string(), ofs);
        StringOfs(ofs)
    }

    /// Allocates global slots for a new def and returns its offset.
    ///
    /// # Panics
    ///
    /// If the def would end past the 16-bit slot range.
    pub fn global(&mut self, name: &str, ty: ValueType) -> u16 {
        self.global_def(name, ty, false)
    }

    /// Like [`global`](Self::global) but flagged for save games.
    pub fn saved_global(&mut self, name: &str, ty: ValueType) -> u16 {
        self.global_def(name, ty, true)
    }

    fn global_def(&mut self, name: &str, ty: ValueType, save_global: bool) -> u16 {
        let offset = slot_offset(self.globals.len(), ty, "global");
        self.globals.resize(self.globals.len() + ty.slot_count(), 0);
        let name = self.intern(name);
        self.global_defs.push(Def {
            ty,
            save_global,
            offset,
            name,
        });
        offset
    }

    /// Adds a def for an existing slot, e.g. a second name for the same global.
    pub fn global_alias(&mut self, name: &str, ty: ValueType, offset: u16) -> &mut Self {
        let name = self.intern(name);
        self.global_defs.push(Def {
            ty,
            save_global: false,
            offset,
            name,
        });
        self
    }

    pub fn global_float(&mut self, name: &str, value: f32) -> u16 {
        let ofs = self.global(name, ValueType::Float);
        self.globals[ofs as usize] = value.to_bits();
        ofs
    }

    pub fn global_vector(&mut self, name: &str, value: [f32; 3]) -> u16 {
        let ofs = self.global(name, ValueType::Vector);
        for (i, v) in value.into_iter().enumerate() {
            self.globals[ofs as usize + i] = v.to_bits();
        }
        ofs
    }

    /// Function-typed global initialized to `func`, the way the compiler
    /// emits named function references.
    pub fn global_function(&mut self, name: &str, func: FunctionId) -> u16 {
        let ofs = self.global(name, ValueType::Function);
        self.globals[ofs as usize] = func.0;
        ofs
    }

    pub fn set_global(&mut self, ofs: u16, raw: u32) -> &mut Self {
        self.globals[ofs as usize] = raw;
        self
    }

    /// Allocates entity field slots and returns the field offset.
    ///
    /// # Panics
    ///
    /// If the field would end past the 16-bit slot range.
    pub fn field(&mut self, name: &str, ty: ValueType) -> u16 {
        let offset = slot_offset(self.entity_fields, ty, "field");
        self.entity_fields += ty.slot_count();
        let name = self.intern(name);
        self.field_defs.push(Def {
            ty,
            save_global: false,
            offset,
            name,
        });
        offset
    }

    /// Adds a vector field plus the `_x`, `_y`, `_z` component defs the
    /// compiler emits alongside it.
    pub fn vector_field(&mut self, name: &str) -> u16 {
        let ofs = self.field(name, ValueType::Vector);
        for (i, axis) in ["_x", "_y", "_z"].iter().enumerate() {
            let comp = self.intern(&format!("{name}{axis}"));
            self.field_defs.push(Def {
                ty: ValueType::Float,
                save_global: false,
                offset: ofs + i as u16,
                name: comp,
            });
        }
        ofs
    }

    /// Adds a script function whose body is a single `DONE` statement.
    pub fn function(&mut self, name: &str, file: &str, num_parms: i32) -> FunctionId {
        let first_statement = self.statements.len() as i32;
        self.statements.push(Statement::default());
        self.push_function(name, file, first_statement, num_parms)
    }

    /// Adds a builtin stub bound to `ordinal`.
    pub fn builtin(&mut self, name: &str, ordinal: u32, num_parms: i32) -> FunctionId {
        self.push_function(name, "", -(ordinal as i32), num_parms)
    }

    fn push_function(&mut self, name: &str, file: &str, first_statement: i32, num_parms: i32) -> FunctionId {
        let name = self.intern(name);
        let file = self.intern(file);
        let mut parm_size = [0u8; MAX_PARMS];
        for size in parm_size.iter_mut().take(num_parms.clamp(0, MAX_PARMS as i32) as usize) {
            *size = 1;
        }
        let id = FunctionId(self.functions.len() as u32);
        self.functions.push(FunctionDef {
            first_statement,
            parm_start: self.globals.len() as i32,
            locals: 0,
            profile: 0,
            name,
            file,
            num_parms,
            parm_size,
        });
        id
    }

    pub fn statement(&mut self, op: u16, a: u16, b: u16, c: u16) -> &mut Self {
        self.statements.push(Statement { op, a, b, c });
        self
    }

    pub fn build(&self) -> BinaryImage {
        let mut image = BinaryImage {
            header: Header {
                version: self.version,
                defs_crc: self.defs_crc,
                entity_fields: self.entity_fields as i32,
                ..Header::default()
            },
            statements: self.statements.clone(),
            global_defs: self.global_defs.clone(),
            field_defs: self.field_defs.clone(),
            functions: self.functions.clone(),
            globals: self.globals.clone(),
            strings: StringBlob::new(self.strings.clone()),
            checksum: 0,
            byte_size: 0,
            warnings: Vec::new(),
        };
        image.header = writer::layout_header(&image);
        let bytes = writer::encode_le(&image);
        image.checksum = crc32fast::hash(&bytes);
        image.byte_size = bytes.len();
        image
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_bytes_with::<LittleEndian>()
    }

    pub fn to_bytes_with<B: ByteOrder>(&self) -> Vec<u8> {
        writer::encode::<B>(&self.build())
    }
}
