use memory::{ArenaTag, EntityHandle, EntityLayout, EntityPool, MemoryError, NativeLayout, StringArena};
use std::borrow::Cow;
use std::collections::VecDeque;
use std::fmt;

use crate::error::{LoadError, VmError};
use crate::image::{BinaryImage, Def, FieldDef, FunctionDef, FunctionId, GlobalDef};
use crate::loader::{self, LoadOptions};
use crate::role::Role;
use crate::symbols::SymbolTable;
use crate::value::StringRef;

/// How many temp strings stay alive at once. Making another frees the oldest.
pub const TEMP_STRINGS: usize = 16;

/// One loaded progs program with its entity storage.
///
/// Instances are created already loaded: the image is parsed once, before
/// the instance exists, so there is no way to load a second image into it.
/// All symbol resolution is done through an instance reference rather than
/// a process-wide "current" program.
#[derive(Debug)]
pub struct VmInstance {
    role: Role,
    /// Progs file the image came from, empty when built in memory.
    filename: String,
    image: BinaryImage,
    symbols: SymbolTable,
    /// Live global values, seeded from the image.
    globals: Vec<u32>,
    entities: EntityPool,
    /// Number of entity slots handed out since the last level start.
    num_entities: usize,
    strings: StringArena,
    /// Live temp handles, oldest first.
    temp_strings: VecDeque<u32>,
}

impl VmInstance {
    /// Parses `bytes` and allocates an entity pool of `capacity` records.
    pub fn load(
        role: Role,
        bytes: &[u8],
        opts: &LoadOptions,
        native: NativeLayout,
        capacity: usize,
    ) -> Result<Self, LoadError> {
        let image = loader::parse(bytes, opts)?;
        Self::from_image(role, image, native, capacity)
    }

    pub fn from_image(
        role: Role,
        image: BinaryImage,
        native: NativeLayout,
        capacity: usize,
    ) -> Result<Self, LoadError> {
        let layout = EntityLayout::new(native, image.entity_fields())?;
        let entities = EntityPool::new(layout, capacity)?;
        let symbols = SymbolTable::build(&image);
        let globals = image.globals.clone();

        Ok(Self {
            role,
            filename: String::new(),
            image,
            symbols,
            globals,
            entities,
            num_entities: 0,
            strings: StringArena::new(),
            temp_strings: VecDeque::with_capacity(TEMP_STRINGS),
        })
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = filename.into();
        self
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn image(&self) -> &BinaryImage {
        &self.image
    }

    pub fn checksum(&self) -> u32 {
        self.image.checksum
    }

    pub fn byte_size(&self) -> usize {
        self.image.byte_size
    }

    pub fn entities(&self) -> &EntityPool {
        &self.entities
    }

    pub fn entities_mut(&mut self) -> &mut EntityPool {
        &mut self.entities
    }

    /// Record stride: native prefix + script field block.
    pub fn entity_size(&self) -> usize {
        self.entities.stride()
    }

    pub fn entity_fields_size(&self) -> usize {
        self.entities.layout().field_block_size()
    }

    pub fn strings(&self) -> &StringArena {
        &self.strings
    }

    // --- Symbol resolution ---

    pub fn find_global(&self, name: &str) -> Option<&GlobalDef> {
        self.symbols
            .global_index(name)
            .map(|i| &self.image.global_defs[i])
    }

    pub fn find_field(&self, name: &str) -> Option<&FieldDef> {
        self.symbols
            .field_index(name)
            .map(|i| &self.image.field_defs[i])
    }

    pub fn find_function(&self, name: &str) -> Option<FunctionId> {
        self.symbols
            .function_index(name)
            .map(|i| FunctionId(i as u32))
    }

    pub fn global_at(&self, ofs: u16) -> Option<&GlobalDef> {
        self.symbols
            .global_index_at(ofs)
            .map(|i| &self.image.global_defs[i])
    }

    pub fn field_at(&self, ofs: u16) -> Option<&FieldDef> {
        self.symbols
            .field_index_at(ofs)
            .map(|i| &self.image.field_defs[i])
    }

    pub fn function(&self, id: FunctionId) -> Option<&FunctionDef> {
        self.image.function(id)
    }

    pub fn def_name(&self, def: &Def) -> Cow<'_, str> {
        self.image.def_name(def)
    }

    /// Bumps a function's call counter. Called by the interpreter on entry.
    pub fn record_call(&mut self, id: FunctionId) {
        if let Some(f) = self.image.functions.get_mut(id.index()) {
            f.profile = f.profile.saturating_add(1);
        }
    }

    pub(crate) fn functions_mut(&mut self) -> &mut [FunctionDef] {
        &mut self.image.functions
    }

    // --- Globals ---

    pub fn globals(&self) -> &[u32] {
        &self.globals
    }

    pub fn globals_mut(&mut self) -> &mut [u32] {
        &mut self.globals
    }

    pub fn global_float(&self, ofs: usize) -> Option<f32> {
        self.globals.get(ofs).map(|&s| f32::from_bits(s))
    }

    pub fn set_global_float(&mut self, ofs: usize, value: f32) -> bool {
        match self.globals.get_mut(ofs) {
            Some(slot) => {
                *slot = value.to_bits();
                true
            }
            None => false,
        }
    }

    pub fn global_vector(&self, ofs: usize) -> Option<[f32; 3]> {
        let s = self.globals.get(ofs..ofs + 3)?;
        Some([f32::from_bits(s[0]), f32::from_bits(s[1]), f32::from_bits(s[2])])
    }

    pub fn set_global_vector(&mut self, ofs: usize, value: [f32; 3]) -> bool {
        match self.globals.get_mut(ofs..ofs + 3) {
            Some(s) => {
                for (slot, v) in s.iter_mut().zip(value) {
                    *slot = v.to_bits();
                }
                true
            }
            None => false,
        }
    }

    /// Writes a float to the global named `name`. Returns false if the progs
    /// has no such global.
    pub fn set_float_by_name(&mut self, name: &str, value: f32) -> bool {
        match self.find_global(name).map(|d| d.slot()) {
            Some(ofs) => self.set_global_float(ofs, value),
            None => false,
        }
    }

    /// Reads a function reference stored in a function-typed global.
    pub fn function_global(&self, name: &str) -> Option<FunctionId> {
        let def = self.find_global(name)?;
        let raw = *self.globals.get(def.slot())?;
        (raw != 0 && (raw as usize) < self.image.functions.len()).then_some(FunctionId(raw))
    }

    // --- Strings ---

    /// Resolves a script string reference against the image blob or the
    /// runtime arena.
    pub fn string(&self, r: StringRef) -> Option<Cow<'_, str>> {
        match r.arena_handle() {
            Some(handle) => self.strings.get(handle).map(Cow::Borrowed),
            None => self.image.strings.get(r.blob_offset()?),
        }
    }

    /// Stores `text` in the runtime arena. Only the last [`TEMP_STRINGS`]
    /// temp strings are kept; references to older ones stop resolving.
    pub fn new_string(&mut self, text: String, tag: ArenaTag) -> Result<StringRef, MemoryError> {
        if tag == ArenaTag::Temp && self.temp_strings.len() >= TEMP_STRINGS {
            if let Some(oldest) = self.temp_strings.pop_front() {
                self.strings.free(oldest);
            }
        }
        let handle = self.strings.alloc(text, tag)?;
        if tag == ArenaTag::Temp {
            self.temp_strings.push_back(handle);
        }
        Ok(StringRef::from_arena(handle))
    }

    pub fn free_strings(&mut self, tag: ArenaTag) -> usize {
        if tag == ArenaTag::Temp {
            self.temp_strings.clear();
        }
        self.strings.free_tag(tag)
    }

    // --- Entities ---

    pub fn num_entities(&self) -> usize {
        self.num_entities
    }

    /// Hands out the next unused record.
    pub fn alloc_entity(&mut self) -> Result<usize, VmError> {
        if self.num_entities >= self.entities.capacity() {
            return Err(VmError::NoFreeEntities(self.entities.capacity()));
        }
        let num = self.num_entities;
        self.entities.clear_entity(num)?;
        self.num_entities += 1;
        Ok(num)
    }

    pub fn entity_handle(&self, num: usize) -> Result<EntityHandle, VmError> {
        Ok(self.entities.handle_for(num)?)
    }

    /// Resets per-level state: level strings, entity records and the
    /// entity count. Globals keep their values.
    pub fn new_level(&mut self) {
        self.free_strings(ArenaTag::Level);
        self.free_strings(ArenaTag::Temp);
        self.entities.clear();
        self.num_entities = 0;
    }

    pub fn summary(&self) -> LoadSummary<'_> {
        LoadSummary { vm: self }
    }
}

/// Human-readable report printed after an instance is created.
pub struct LoadSummary<'a> {
    vm: &'a VmInstance,
}

impl fmt::Display for LoadSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let vm = self.vm;
        let img = &vm.image;
        let pool = &vm.entities;
        writeln!(f, "-------------------------------------")?;
        if vm.filename.is_empty() {
            writeln!(f, "{} qcvm", vm.role)?;
        } else {
            writeln!(f, "{} qcvm: '{}'", vm.role, vm.filename)?;
        }
        writeln!(f, "          Functions: {}", img.functions.len())?;
        writeln!(f, "         Statements: {}", img.statements.len())?;
        writeln!(f, "         GlobalDefs: {}", img.global_defs.len())?;
        writeln!(f, "            Globals: {}", img.globals.len())?;
        writeln!(f, "      Entity fields: {}", img.field_defs.len())?;
        writeln!(
            f,
            " Allocated entities: {}, {} bytes",
            pool.capacity(),
            pool.total_bytes()
        )?;
        writeln!(f, "        Entity size: {} bytes", pool.stride())?;
        writeln!(f)?;
        writeln!(f, "           Checksum: {:#010x}", img.checksum)?;
        writeln!(
            f,
            "      Programs size: {} bytes ({}Kb)",
            img.byte_size,
            img.byte_size / 1024
        )?;
        write!(f, "-------------------------------------")
    }
}
